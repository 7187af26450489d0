//! Terminal output utilities
//!
//! Provides consistent formatting for CLI output.

use flavor_core::Error;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

static QUIET: AtomicBool = AtomicBool::new(false);

/// Output format selected with `--format`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Machine-readable JSON
    Json,
}

impl OutputFormat {
    /// Whether JSON output was requested
    pub fn is_json(self) -> bool {
        self == OutputFormat::Json
    }
}

/// Status message helpers
pub struct Status;

impl Status {
    /// Suppress success, info and step messages; errors and warnings still print
    pub fn set_quiet(quiet: bool) {
        QUIET.store(quiet, Ordering::Relaxed);
    }

    fn quiet() -> bool {
        QUIET.load(Ordering::Relaxed)
    }

    /// Print a success message
    pub fn success(message: &str) {
        if !Self::quiet() {
            println!("{} {}", "✓".green(), message);
        }
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        if !Self::quiet() {
            println!("{} {}", "ℹ".blue(), message);
        }
    }

    /// Print a header
    pub fn header(message: &str) {
        if !Self::quiet() {
            println!();
            println!("{}", message.bold());
            println!("{}", "─".repeat(message.chars().count()));
        }
    }
}

/// Print a flavor error with its code, context and suggestion
pub fn print_error(err: &Error) {
    eprintln!("{} {} {}", "✗".red(), err.code.to_string().dimmed(), err.message);
    if let Some(context) = &err.context {
        eprintln!("  {} {}", "context:".dimmed(), context);
    }
    if let Some(suggestion) = &err.suggestion {
        eprintln!("  {} {}", "hint:".cyan(), suggestion);
    }
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render key/value rows with the keys padded to a common width
pub fn format_table(rows: &[(String, String)]) -> String {
    let width = rows.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
    rows.iter()
        .map(|(k, v)| {
            let shown = if v.is_empty() { "\"\"" } else { v.as_str() };
            format!("  {k:<width$}  {shown}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a file size for display
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_table_aligns_keys() {
        let rows = vec![
            ("displayName".to_string(), "App Dev".to_string()),
            ("identifierSuffix".to_string(), ".dev".to_string()),
        ];
        assert_eq!(
            format_table(&rows),
            "  displayName       App Dev\n  identifierSuffix  .dev"
        );
    }

    #[test]
    fn test_format_table_marks_empty_values() {
        let rows = vec![("identifierSuffix".to_string(), String::new())];
        assert_eq!(format_table(&rows), "  identifierSuffix  \"\"");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(1, "asset", "assets"), "1 asset");
        assert_eq!(format_count(3, "asset", "assets"), "3 assets");
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
        assert!(OutputFormat::Json.is_json());
    }
}
