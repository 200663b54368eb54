//! Terminal output: status lines, sizes, durations and the build summary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use console::Term;
use owo_colors::OwoColorize;
use sysbundle_bundler::{ArtifactSource, BuildSummary};

static COLORS: AtomicBool = AtomicBool::new(true);

/// Decide once whether stderr output is colored.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color
        && std::env::var_os("NO_COLOR").is_none()
        && (std::env::var_os("FORCE_COLOR").is_some()
            || Term::stderr().features().colors_supported());
    COLORS.store(enabled, Ordering::Relaxed);
}

fn colors() -> bool {
    COLORS.load(Ordering::Relaxed)
}

pub(crate) fn paint(text: &str, style: impl Fn(&str) -> String) -> String {
    if colors() { style(text) } else { text.to_string() }
}

pub fn success(message: &str) {
    eprintln!("{} {}", paint("✓", |s| s.green().bold().to_string()), message);
}

pub fn info(message: &str) {
    eprintln!("{} {}", paint("ℹ", |s| s.blue().bold().to_string()), message);
}

pub fn warning(message: &str) {
    eprintln!(
        "{} {}",
        paint("⚠", |s| s.yellow().bold().to_string()),
        paint(message, |s| s.yellow().to_string())
    );
}

/// Human-readable size: `512 B`, `1.50 KB`, `2.00 MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.2} {}", UNITS[unit])
    }
}

pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    if total_ms < 1000 {
        format!("{total_ms}ms")
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// One line per job and platform module, then totals.
pub fn print_build_summary(summary: &BuildSummary) {
    let width = (Term::stderr().size().1 as usize).min(80);
    let rule = "─".repeat(width);

    eprintln!("\n{}", paint("Build Summary", |s| s.bold().underline().to_string()));
    eprintln!("{rule}");

    for report in &summary.jobs {
        let tag = match (report.source, report.minified) {
            (ArtifactSource::Cache, _) => "cached",
            (ArtifactSource::Compiled, true) => "minified",
            (ArtifactSource::Compiled, false) => "compiled",
        };
        eprintln!(
            "  {} {} {} {}",
            paint("▸", |s| s.blue().to_string()),
            paint(&report.entry, |s| s.bright_white().bold().to_string()),
            paint(&format_size(report.bytes), |s| s.dimmed().to_string()),
            paint(&format!("({tag})"), |s| s.dimmed().to_string()),
        );
    }
    for output in &summary.platforms {
        eprintln!(
            "  {} {} {}",
            paint("▸", |s| s.magenta().to_string()),
            paint(&output.name, |s| s.bright_white().bold().to_string()),
            paint(&format_size(output.bytes), |s| s.dimmed().to_string()),
        );
    }

    eprintln!("{rule}");

    let total: u64 = summary
        .jobs
        .iter()
        .map(|r| r.bytes)
        .chain(summary.platforms.iter().map(|p| p.bytes))
        .sum();
    eprintln!(
        "  {} {} in {} ({} cache hits, {} side files)",
        paint("Total:", |s| s.bold().to_string()),
        paint(&format_size(total), |s| s.green().to_string()),
        paint(&format_duration(summary.elapsed), |s| s.green().to_string()),
        summary.cache.hits,
        summary.side_files.len(),
    );
}
