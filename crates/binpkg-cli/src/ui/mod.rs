//! Terminal output.

pub mod console;

pub use console::ConsoleReporter;

use crossterm::style::Stylize;

/// Human-readable byte count (binary units).
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    #[allow(clippy::cast_precision_loss)]
    let scaled = |unit: u64| bytes as f64 / unit as f64;
    match bytes {
        b if b >= GB => format!("{:.1} GB", scaled(GB)),
        b if b >= MB => format!("{:.1} MB", scaled(MB)),
        b if b >= KB => format!("{:.1} KB", scaled(KB)),
        b => format!("{b} B"),
    }
}

/// Print a terminal error line to stderr.
pub fn print_error(err: &dyn std::fmt::Display) {
    eprintln!("{} {err}", "error:".red().bold());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_sizes() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
