use crate::core::interfaces::CssProcessor;
use crate::utils::{KuraError, Logger, Result};
use lightningcss::{
    printer::PrinterOptions,
    stylesheet::{MinifyOptions, ParserOptions as CssParserOptions, StyleSheet},
};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"url\(\s*(?:"([^"]*)"|'([^']*)'|([^)'"\s]+))\s*\)"#)
        .expect("url() pattern is valid")
});

/// Compiles SCSS/SASS with grass, reads plain CSS as-is, and runs the final
/// stylesheet through lightningcss.
pub struct StylesheetProcessor {
    minify: bool,
    load_paths: Vec<PathBuf>,
}

impl StylesheetProcessor {
    pub fn new(minify: bool) -> Self {
        Self {
            minify,
            load_paths: Vec::new(),
        }
    }

    /// Extra directories searched by `@import`/`@use`.
    pub fn with_load_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.load_paths.extend(paths);
        self
    }

    pub fn is_scss_file(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("scss") | Some("sass")
        )
    }

    fn compile_scss(&self, entry: &str, path: &Path) -> Result<String> {
        let _timer = crate::utils::Timer::start(&format!("Compiling SCSS {}", file_label(path)));

        let syntax = if path.extension().and_then(|s| s.to_str()) == Some("sass") {
            grass::InputSyntax::Sass
        } else {
            grass::InputSyntax::Scss
        };

        let mut options = grass::Options::default()
            .input_syntax(syntax)
            .style(if self.minify {
                grass::OutputStyle::Compressed
            } else {
                grass::OutputStyle::Expanded
            });
        for load_path in &self.load_paths {
            options = options.load_path(load_path);
        }

        grass::from_path(path, &options).map_err(|e| KuraError::Stylesheet {
            entry: entry.to_string(),
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn fallback_minify(&self, content: &str) -> String {
        if self.minify {
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("")
        } else {
            content.to_string()
        }
    }
}

impl CssProcessor for StylesheetProcessor {
    fn process_stylesheet(&self, entry: &str, path: &Path) -> Result<String> {
        Logger::processing_stylesheet(&file_label(path));

        if Self::is_scss_file(path) {
            self.compile_scss(entry, path)
        } else {
            std::fs::read_to_string(path).map_err(|e| KuraError::Stylesheet {
                entry: entry.to_string(),
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
    }

    fn finalize(&self, css: &str, path: &Path) -> String {
        let mut stylesheet = match StyleSheet::parse(css, CssParserOptions::default()) {
            Ok(stylesheet) => stylesheet,
            Err(e) => {
                Logger::warn(&format!(
                    "CSS parse error for {} ({}), using fallback minification",
                    path.display(),
                    e
                ));
                return self.fallback_minify(css);
            }
        };

        if self.minify {
            if let Err(e) = stylesheet.minify(MinifyOptions::default()) {
                Logger::warn(&format!("CSS minify failed for {}: {}", path.display(), e));
            }
        }

        match stylesheet.to_css(PrinterOptions {
            minify: self.minify,
            ..Default::default()
        }) {
            Ok(result) => result.code,
            Err(e) => {
                Logger::warn(&format!(
                    "CSS printing failed for {} ({}), using fallback minification",
                    path.display(),
                    e
                ));
                self.fallback_minify(css)
            }
        }
    }

    fn supports_minification(&self) -> bool {
        self.minify
    }
}

impl Default for StylesheetProcessor {
    fn default() -> Self {
        Self::new(false)
    }
}

/// A `url()` reference that points at a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalUrl<'a> {
    /// Path part, without query or fragment.
    pub path: &'a str,
    /// `?v=4.7.0` or `#iefix` style suffix, kept on the rewritten URL.
    pub suffix: &'a str,
}

/// Split a `url()` target into path and suffix, or `None` when it is not a
/// local file (data URIs, absolute URLs, fragment-only references).
pub fn local_url(raw: &str) -> Option<LocalUrl<'_>> {
    let raw = raw.trim();
    if raw.is_empty()
        || raw.starts_with('#')
        || raw.starts_with("//")
        || raw.starts_with('/')
        || raw.starts_with("data:")
        || raw.contains("://")
    {
        return None;
    }

    let split = raw.find(['?', '#']).unwrap_or(raw.len());
    let (path, suffix) = raw.split_at(split);
    if path.is_empty() {
        return None;
    }
    Some(LocalUrl { path, suffix })
}

/// Replace every local `url()` in `css` with whatever `rewrite` returns for
/// it. `rewrite` sees the path part only; the suffix is re-attached.
pub fn rewrite_urls<F>(css: &str, mut rewrite: F) -> Result<String>
where
    F: FnMut(&str) -> Result<String>,
{
    let mut failure = None;
    let rewritten = URL_RE.replace_all(css, |caps: &Captures| {
        let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        if failure.is_some() {
            return whole.to_string();
        }

        let raw = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();

        match local_url(raw) {
            Some(url) => match rewrite(url.path) {
                Ok(target) => format!("url(\"{}{}\")", target, url.suffix),
                Err(e) => {
                    failure = Some(e);
                    whole.to_string()
                }
            },
            None => whole.to_string(),
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(rewritten.into_owned()),
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}
