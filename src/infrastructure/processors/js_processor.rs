use crate::core::{interfaces::JsProcessor, models::*};
use crate::utils::{KuraError, Logger, Result};
use once_cell::sync::Lazy;
use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_span::SourceType;
use regex::{Captures, Regex};

/// Free names that resolve to a package without an import, as jQuery-era
/// code expects. Dotted names are substituted as expressions.
pub const PROVIDE_TABLE: &[(&str, &str)] = &[
    ("$", "jquery"),
    ("jQuery", "jquery"),
    ("window.jQuery", "jquery"),
    ("Popper", "popper.js"),
];

/// Defines the module registry once per page, however many chunks load.
pub const RUNTIME: &str = r#"(function (g) {
  if (g.__kura) return;
  var defs = {}, cache = {};
  function req(id) {
    if (cache[id]) return cache[id].exports;
    var def = defs[id];
    if (!def) throw new Error("kura: unknown module " + id);
    var module = cache[id] = { exports: {} };
    def.call(module.exports, module, module.exports, req);
    return module.exports;
  }
  g.__kura = {
    define: function (id, fn) { if (!defs[id]) defs[id] = fn; },
    require: req,
    interop: function (m) { return m && m.__esModule ? m["default"] : m; },
    reexport: function (to, from) {
      Object.keys(from).forEach(function (k) {
        if (k !== "default" && k !== "__esModule") to[k] = from[k];
      });
    },
    style: function (css) {
      if (typeof document === "undefined") return;
      var el = document.createElement("style");
      el.appendChild(document.createTextNode(css));
      document.head.appendChild(el);
    }
  };
})(typeof window !== "undefined" ? window : this);
"#;

const IDENT: &str = r"[A-Za-z_$][\w$]*";

static IMPORT_FROM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s+([\w$*{}\s,]+?)\s+from\s*['"]([^'"]+)['"][ \t]*;?"#)
        .expect("import pattern is valid")
});
static SIDE_EFFECT_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s*['"]([^'"]+)['"][ \t]*;?"#).expect("import pattern is valid")
});
static EXPORT_FROM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*export\s*\{([^}]*)\}\s*from\s*['"]([^'"]+)['"][ \t]*;?"#)
        .expect("export pattern is valid")
});
static EXPORT_ALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*export\s*\*\s*from\s*['"]([^'"]+)['"][ \t]*;?"#)
        .expect("export pattern is valid")
});
static REQUIRE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\brequire\s*\(\s*['"]([^'"]+)['"]\s*\)"#).expect("require pattern is valid")
});
static EXPORT_DEFAULT_DECL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?m)^([ \t]*)export\s+default\s+((?:async\s+)?function\s*\*?\s*({IDENT})|class\s+({IDENT}))"
    ))
    .expect("export pattern is valid")
});
static EXPORT_DEFAULT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^([ \t]*)export\s+default\s+").expect("export pattern is valid")
});
static EXPORT_DECL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?m)^([ \t]*)export\s+((?:const|let|var)\s+({IDENT})|(?:async\s+)?function\s*\*?\s*({IDENT})|class\s+({IDENT}))"
    ))
    .expect("export pattern is valid")
});
static EXPORT_LIST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*export\s*\{([^}]*)\}[ \t]*;?").expect("export pattern is valid")
});

/// Only statement-position `import`/`export` counts; the words inside
/// comments or strings do not.
fn is_es_module(source: &str) -> bool {
    [
        &*IMPORT_FROM_RE,
        &*SIDE_EFFECT_IMPORT_RE,
        &*EXPORT_FROM_RE,
        &*EXPORT_ALL_RE,
        &*EXPORT_DEFAULT_RE,
        &*EXPORT_DECL_RE,
        &*EXPORT_LIST_RE,
    ]
    .iter()
    .any(|re| re.is_match(source))
}

struct ProvideMatcher {
    name: &'static str,
    specifier: &'static str,
    uses: Regex,
    declares: Option<Regex>,
}

static PROVIDE_MATCHERS: Lazy<Vec<ProvideMatcher>> = Lazy::new(|| {
    PROVIDE_TABLE
        .iter()
        .map(|&(name, specifier)| {
            let escaped = regex::escape(name);
            // `${` opens a template substitution, not a jQuery call.
            let follow = if name == "$" { r"(?:[^\w${]|$)" } else { r"(?:[^\w$]|$)" };
            let uses = Regex::new(&format!(r#"(?m)(?:^|[^\w$.'"\\]){escaped}{follow}"#))
                .expect("provide pattern is valid");
            let declares = (!name.contains('.')).then(|| {
                Regex::new(&format!(
                    r"(?:\b(?:var|let|const|function|class|import|as)\s+){escaped}(?:[^\w$]|$)"
                ))
                .expect("provide pattern is valid")
            });
            ProvideMatcher {
                name,
                specifier,
                uses,
                declares,
            }
        })
        .collect()
});

/// Every module specifier the transform will rewrite, in source order.
pub fn scan_specifiers(content: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();
    let mut collect = |re: &Regex, group: usize| {
        for caps in re.captures_iter(content) {
            if let Some(m) = caps.get(group) {
                found.push((m.start(), m.as_str().to_string()));
            }
        }
    };
    collect(&IMPORT_FROM_RE, 2);
    collect(&SIDE_EFFECT_IMPORT_RE, 1);
    collect(&EXPORT_FROM_RE, 2);
    collect(&EXPORT_ALL_RE, 1);
    collect(&REQUIRE_RE, 1);

    found.sort_by_key(|(pos, _)| *pos);
    let mut seen = std::collections::HashSet::new();
    found
        .into_iter()
        .map(|(_, spec)| spec)
        .filter(|spec| seen.insert(spec.clone()))
        .collect()
}

/// Provide-table names this module uses without declaring them.
pub fn detect_provided(content: &str) -> Vec<(&'static str, &'static str)> {
    PROVIDE_MATCHERS
        .iter()
        .filter(|m| m.uses.is_match(content))
        .filter(|m| !m.declares.as_ref().is_some_and(|d| d.is_match(content)))
        .map(|m| (m.name, m.specifier))
        .collect()
}

/// Rewrites ES modules and CommonJS into registry definitions.
#[derive(Debug, Clone, Default)]
pub struct RegistryJsProcessor;

impl RegistryJsProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Syntax problems are reported but never fail the build.
    fn check_syntax(&self, module: &ModuleInfo) {
        let allocator = Allocator::default();
        let source_type = SourceType::from_path(&module.path).unwrap_or_else(|_| SourceType::default());
        let result = Parser::new(&allocator, &module.content, source_type).parse();

        if let Some(first) = result.errors.first() {
            Logger::warn(&format!(
                "{}: {} syntax issue(s), first: {}",
                module.id,
                result.errors.len(),
                first
            ));
        }
    }

    fn transform_script(&self, module: &ModuleInfo) -> Result<String> {
        let mut exported: Vec<(String, String)> = Vec::new();
        let mut counter = 0usize;
        let mut next_temp = || {
            counter += 1;
            format!("__kura_i{}", counter - 1)
        };
        let is_esm = is_es_module(&module.content);

        let code = replace_all_fallible(&EXPORT_FROM_RE, &module.content, |caps| {
            let temp = next_temp();
            let mut out = format!("var {} = {};", temp, require_expr(module, &caps[2])?);
            for (imported, local) in parse_specifier_list(&caps[1]) {
                out.push_str(&format!(" exports.{} = {}.{};", local, temp, imported));
            }
            Ok(out)
        })?;

        let code = replace_all_fallible(&EXPORT_ALL_RE, &code, |caps| {
            Ok(format!("__kura.reexport(exports, {});", require_expr(module, &caps[1])?))
        })?;

        let code = replace_all_fallible(&IMPORT_FROM_RE, &code, |caps| {
            let temp = next_temp();
            let mut out = format!("var {} = {};", temp, require_expr(module, &caps[2])?);
            for binding in parse_import_clause(&caps[1]) {
                let line = match binding {
                    ImportBinding::Default(local) => {
                        format!(" var {} = __kura.interop({});", local, temp)
                    }
                    ImportBinding::Namespace(local) => format!(" var {} = {};", local, temp),
                    ImportBinding::Named { imported, local } if imported == "default" => {
                        format!(" var {} = __kura.interop({});", local, temp)
                    }
                    ImportBinding::Named { imported, local } => {
                        format!(" var {} = {}.{};", local, temp, imported)
                    }
                };
                out.push_str(&line);
            }
            Ok(out)
        })?;

        let code = replace_all_fallible(&SIDE_EFFECT_IMPORT_RE, &code, |caps| {
            Ok(format!("{};", require_expr(module, &caps[1])?))
        })?;

        let code = replace_all_fallible(&REQUIRE_RE, &code, |caps| require_expr(module, &caps[1]))?;

        let code = replace_all_fallible(&EXPORT_DEFAULT_DECL_RE, &code, |caps| {
            let name = caps.get(3).or_else(|| caps.get(4)).map(|m| m.as_str()).unwrap_or_default();
            exported.push(("default".to_string(), name.to_string()));
            Ok(format!("{}{}", &caps[1], &caps[2]))
        })?;

        let code = EXPORT_DEFAULT_RE
            .replace_all(&code, r#"${1}exports["default"] = "#)
            .into_owned();

        let code = replace_all_fallible(&EXPORT_DECL_RE, &code, |caps| {
            let name = caps
                .get(3)
                .or_else(|| caps.get(4))
                .or_else(|| caps.get(5))
                .map(|m| m.as_str())
                .unwrap_or_default();
            exported.push((name.to_string(), name.to_string()));
            Ok(format!("{}{}", &caps[1], &caps[2]))
        })?;

        let code = replace_all_fallible(&EXPORT_LIST_RE, &code, |caps| {
            for (local, exported_as) in parse_specifier_list(&caps[1]) {
                exported.push((exported_as, local));
            }
            Ok(String::new())
        })?;

        let code = self.substitute_provided(module, code)?;

        let mut out = String::new();
        if is_esm {
            out.push_str("Object.defineProperty(exports, \"__esModule\", { value: true });\n");
        }
        for binding in module.provided.iter().filter(|b| !b.name.contains('.')) {
            out.push_str(&format!(
                "var {} = __kura_require({});\n",
                binding.name,
                serde_json::to_string(&binding.id)?
            ));
        }
        out.push_str(&code);
        for (name, local) in &exported {
            let target = if name == "default" {
                "exports[\"default\"]".to_string()
            } else {
                format!("exports.{}", name)
            };
            out.push_str(&format!("\n{} = {};", target, local));
        }
        Ok(out)
    }

    /// Replace dotted provided names (`window.jQuery`) where they are read.
    fn substitute_provided(&self, module: &ModuleInfo, code: String) -> Result<String> {
        let mut code = code;
        for binding in module.provided.iter().filter(|b| b.name.contains('.')) {
            let re = Regex::new(&format!(r"(^|[^\w$.]){}\b", regex::escape(&binding.name)))?;
            let replacement = format!("__kura_require({})", serde_json::to_string(&binding.id)?);
            let source = code.clone();
            code = replace_all_fallible(&re, &source, |caps| {
                let end = caps.get(0).map(|m| m.end()).unwrap_or_default();
                let rest = source[end..].trim_start();
                let assigned = rest.starts_with('=') && !rest.starts_with("==");
                if assigned {
                    Ok(caps[0].to_string())
                } else {
                    Ok(format!("{}{}", &caps[1], replacement))
                }
            })?;
        }
        Ok(code)
    }
}

impl JsProcessor for RegistryJsProcessor {
    fn process_module(&self, module: &ModuleInfo) -> Result<String> {
        let body = match module.module_type {
            ModuleType::JavaScript => {
                self.check_syntax(module);
                self.transform_script(module)?
            }
            ModuleType::Json => {
                serde_json::from_str::<serde_json::Value>(&module.content).map_err(|e| {
                    KuraError::build(format!("Invalid JSON in {}: {}", module.path.display(), e))
                })?;
                format!("module.exports = {};", module.content.trim())
            }
            ModuleType::Css => format!("__kura.style({});", serde_json::to_string(&module.content)?),
            // Compiled into the entry's extracted stylesheet instead.
            ModuleType::Scss => String::new(),
            // Content is the file's public URL.
            ModuleType::Unknown => {
                format!("module.exports = {};", serde_json::to_string(&module.content)?)
            }
        };

        Ok(format!(
            "__kura.define({}, function (module, exports, __kura_require) {{\n{}\n}});\n",
            serde_json::to_string(&module.id)?,
            body
        ))
    }

    fn bundle_chunk(&self, definitions: &[String], entry_id: Option<&str>) -> String {
        let mut chunk = String::from(RUNTIME);
        for definition in definitions {
            chunk.push_str(definition);
        }
        if let Some(id) = entry_id {
            chunk.push_str(&format!("__kura.require({:?});\n", id));
        }
        chunk
    }
}

fn require_expr(module: &ModuleInfo, specifier: &str) -> Result<String> {
    let id = module.dependency_id(specifier).ok_or_else(|| {
        KuraError::build(format!("'{}' in {} was not resolved", specifier, module.id))
    })?;
    Ok(format!("__kura_require({})", serde_json::to_string(id)?))
}

fn replace_all_fallible<F>(re: &Regex, text: &str, mut replace: F) -> Result<String>
where
    F: FnMut(&Captures) -> Result<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        out.push_str(&text[last..m.start()]);
        out.push_str(&replace(&caps)?);
        last = m.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ImportBinding {
    Default(String),
    Namespace(String),
    Named { imported: String, local: String },
}

/// `Foo, { a, b as c }` / `* as ns`
fn parse_import_clause(clause: &str) -> Vec<ImportBinding> {
    let mut bindings = Vec::new();
    let (head, braces) = match (clause.find('{'), clause.rfind('}')) {
        (Some(open), Some(close)) if open < close => (&clause[..open], Some(&clause[open + 1..close])),
        _ => (clause, None),
    };

    for part in head.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.strip_prefix('*') {
            Some(rest) => {
                let local = rest.trim().trim_start_matches("as").trim();
                bindings.push(ImportBinding::Namespace(local.to_string()));
            }
            None => bindings.push(ImportBinding::Default(part.to_string())),
        }
    }

    if let Some(list) = braces {
        for (imported, local) in parse_specifier_list(list) {
            bindings.push(ImportBinding::Named { imported, local });
        }
    }
    bindings
}

/// `a, b as c` → `[(a, a), (b, c)]`
fn parse_specifier_list(list: &str) -> Vec<(String, String)> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let mut parts = s.split_whitespace();
            let first = parts.next().unwrap_or_default().to_string();
            match (parts.next(), parts.next()) {
                (Some("as"), Some(alias)) => (first, alias.to_string()),
                _ => (first.clone(), first),
            }
        })
        .collect()
}
