use colored::*;
use std::time::Instant;

pub struct KuraUI {
    start_time: Instant,
}

impl KuraUI {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    pub fn show_banner(&self, mode: &str) {
        println!(
            "\n  {} {} {}",
            "KURA".bright_cyan().bold(),
            env!("CARGO_PKG_VERSION").bright_white(),
            format!("({})", mode).bright_black()
        );
        println!();
    }

    pub fn show_completion(&self, stats: CompletionStats) {
        let build_time = self.start_time.elapsed();

        println!();
        for file in &stats.output_files {
            let size_kb = file.size as f64 / 1024.0;
            let size_str = if size_kb < 1.0 {
                format!("{} B", file.size)
            } else {
                format!("{:.2} kB", size_kb)
            };

            println!(
                "  {}{} {}",
                stats.outdir_label.bright_black(),
                file.name.bright_cyan(),
                format!("({})", size_str).bright_black()
            );
        }

        println!();
        println!(
            "  {} {} entries, {} static assets",
            "📦".bright_green(),
            stats.entry_count.to_string().bright_cyan().bold(),
            stats.asset_count.to_string().bright_cyan().bold()
        );
        println!(
            "  {} built in {}",
            "✓".bright_green(),
            format!("{:.0}ms", build_time.as_secs_f64() * 1000.0)
                .bright_white()
                .bold()
        );
    }
}

impl Default for KuraUI {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct CompletionStats {
    pub outdir_label: String,
    pub output_files: Vec<OutputFileInfo>,
    pub entry_count: usize,
    pub asset_count: usize,
}

#[derive(Clone)]
pub struct OutputFileInfo {
    pub name: String,
    pub size: usize,
}
