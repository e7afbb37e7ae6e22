//! Console reporter.
//!
//! Writes one line per pipeline event to stderr so stdout stays clean for
//! command output. On a terminal, download progress is redrawn in place.

use std::io::{IsTerminal, Write, stderr};
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use binpkg_core::Reporter;
use binpkg_schema::{Architecture, PackageName, Version};
use crossterm::{
    QueueableCommand,
    cursor::MoveToColumn,
    style::Stylize,
    terminal::{Clear, ClearType},
};

use super::format_size;

/// Minimum gap between two progress redraws.
const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// [`Reporter`] that prints to stderr.
#[derive(Debug)]
pub struct ConsoleReporter {
    quiet: bool,
    interactive: bool,
    last_draw: Mutex<Option<Instant>>,
}

impl ConsoleReporter {
    /// Create a reporter. With `quiet`, only failures print.
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            interactive: stderr().is_terminal(),
            last_draw: Mutex::new(None),
        }
    }

    fn line(&self, text: &str) {
        let mut err = stderr().lock();
        if self.interactive {
            let _ = err.queue(MoveToColumn(0));
            let _ = err.queue(Clear(ClearType::CurrentLine));
        }
        let _ = writeln!(err, "{text}");
    }

    fn should_redraw(&self, finished: bool) -> bool {
        let Ok(mut last) = self.last_draw.lock() else {
            return false;
        };
        let now = Instant::now();
        let due = last.is_none_or(|t| now.duration_since(t) >= REDRAW_INTERVAL);
        if due || finished {
            *last = Some(now);
            return true;
        }
        false
    }
}

impl Reporter for ConsoleReporter {
    fn resolved(&self, name: &PackageName, version: &Version, arch: Architecture, url: &str) {
        if self.quiet {
            return;
        }
        self.line(&format!(
            "{} {} {} {}",
            name.as_str().bold(),
            version.as_str().dark_grey(),
            arch.as_str().cyan(),
            url.dark_grey()
        ));
    }

    fn downloading(&self, name: &PackageName, version: &Version, current: u64, total: Option<u64>) {
        if self.quiet || !self.interactive {
            return;
        }
        let finished = total.is_some_and(|t| current >= t);
        if !self.should_redraw(finished) {
            return;
        }
        let mut err = stderr().lock();
        let _ = err.queue(MoveToColumn(0));
        let _ = err.queue(Clear(ClearType::CurrentLine));
        let _ = write!(
            err,
            "{} {} {}",
            name.as_str().bold(),
            version.as_str().dark_grey(),
            progress_text(current, total)
        );
        let _ = err.flush();
    }

    fn retrying(
        &self,
        name: &PackageName,
        version: &Version,
        attempt: u32,
        delay: Duration,
        reason: &str,
    ) {
        if self.quiet {
            return;
        }
        self.line(&format!(
            "{} {} {} attempt {attempt} failed ({reason}), retrying in {}ms",
            name.as_str().bold(),
            version.as_str().dark_grey(),
            "retry".yellow(),
            delay.as_millis()
        ));
    }

    fn verifying(&self, name: &PackageName, version: &Version) {
        if self.quiet {
            return;
        }
        self.line(&format!(
            "{} {} verifying",
            name.as_str().bold(),
            version.as_str().dark_grey()
        ));
    }

    fn installing(&self, name: &PackageName, version: &Version, dest: &Path) {
        if self.quiet {
            return;
        }
        self.line(&format!(
            "{} {} installing to {}",
            name.as_str().bold(),
            version.as_str().dark_grey(),
            dest.display()
        ));
    }

    fn done(&self, name: &PackageName, version: &Version, detail: &str, size: Option<u64>) {
        if self.quiet {
            return;
        }
        let size = size.map(|s| format!(" ({})", format_size(s))).unwrap_or_default();
        self.line(&format!(
            "{} {} {} {detail}{size}",
            name.as_str().bold(),
            version.as_str().dark_grey(),
            "installed".green().bold()
        ));
    }

    fn failed(&self, name: &PackageName, version: &Version, reason: &str) {
        self.line(&format!(
            "{} {} {} {reason}",
            name.as_str().bold(),
            version.as_str().dark_grey(),
            "failed".red().bold()
        ));
    }

    fn info(&self, msg: &str) {
        if !self.quiet {
            self.line(msg);
        }
    }
}

/// Progress as shown on the download line.
fn progress_text(current: u64, total: Option<u64>) -> String {
    match total.filter(|&t| t > 0) {
        Some(t) => format!(
            "fetching {} / {} ({}%)",
            format_size(current),
            format_size(t),
            current.saturating_mul(100) / t
        ),
        None => format!("fetching {}", format_size(current)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_with_known_total() {
        assert_eq!(
            progress_text(512 * 1024, Some(1024 * 1024)),
            "fetching 512.0 KB / 1.0 MB (50%)"
        );
    }

    #[test]
    fn progress_without_total() {
        assert_eq!(progress_text(10, None), "fetching 10 B");
        assert_eq!(progress_text(10, Some(0)), "fetching 10 B");
    }

    #[test]
    fn redraws_are_throttled() {
        let reporter = ConsoleReporter::new(true);
        assert!(reporter.should_redraw(false));
        assert!(!reporter.should_redraw(false));
        assert!(reporter.should_redraw(true));
    }
}
