//! Human-readable rendering of change sets

pub mod notify;

pub use notify::{DesktopNotifier, NoopNotifier, Notifier};

use crate::diff::ChangeSet;
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Semantic color slots used by the report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Added,
    Deleted,
    Modified,
    Moved,
    Clean,
    Notice,
}

/// Styling capability for report text
pub trait Palette: Send + Sync {
    fn paint(&self, text: &str, tone: Tone) -> String;
}

/// No styling; used for report files and when color is disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainPalette;

impl Palette for PlainPalette {
    fn paint(&self, text: &str, _tone: Tone) -> String {
        text.to_string()
    }
}

/// ANSI terminal colors
#[derive(Debug, Default, Clone, Copy)]
pub struct AnsiPalette;

impl Palette for AnsiPalette {
    fn paint(&self, text: &str, tone: Tone) -> String {
        match tone {
            Tone::Added | Tone::Clean => text.green().to_string(),
            Tone::Deleted => text.red().to_string(),
            Tone::Modified => text.yellow().to_string(),
            Tone::Moved => text.blue().to_string(),
            Tone::Notice => text.cyan().to_string(),
        }
    }
}

pub struct Reporter {
    palette: Box<dyn Palette>,
    show_size: bool,
}

impl Reporter {
    pub fn new(palette: Box<dyn Palette>, show_size: bool) -> Self {
        Self { palette, show_size }
    }

    pub fn plain(show_size: bool) -> Self {
        Self::new(Box::new(PlainPalette), show_size)
    }

    pub fn paint(&self, text: &str, tone: Tone) -> String {
        self.palette.paint(text, tone)
    }

    /// Render every change, moves first, then additions, deletions and modifications
    pub fn render(&self, changes: &ChangeSet) -> String {
        if changes.is_empty() {
            return self.paint("No changes detected.", Tone::Clean);
        }

        let mut lines = Vec::new();

        if !changes.moved.is_empty() {
            lines.push(self.header("Moved", changes.moved.len(), Tone::Moved));
            for m in &changes.moved {
                lines.push(format!(
                    "  {} → {}{}",
                    m.old_path(),
                    m.new_path(),
                    self.size_suffix(m.to.size)
                ));
            }
        }

        if !changes.added.is_empty() {
            lines.push(self.header("Added", changes.added.len(), Tone::Added));
            for r in &changes.added {
                lines.push(format!(
                    "  + {}{} (mtime: {})",
                    r.path,
                    self.size_suffix(r.size),
                    format_time(r.modified)
                ));
            }
        }

        if !changes.deleted.is_empty() {
            lines.push(self.header("Deleted", changes.deleted.len(), Tone::Deleted));
            for r in &changes.deleted {
                lines.push(format!("  - {}", r.path));
            }
        }

        if !changes.modified.is_empty() {
            lines.push(self.header("Modified", changes.modified.len(), Tone::Modified));
            for m in &changes.modified {
                lines.push(format!(
                    "  * {}{} (mtime: {})",
                    m.path(),
                    self.size_suffix(m.after.size),
                    format_time(m.after.modified)
                ));
            }
        }

        lines.join("\n")
    }

    fn header(&self, label: &str, count: usize, tone: Tone) -> String {
        format!("\n{}", self.paint(&format!("{} files ({}):", label, count), tone))
    }

    fn size_suffix(&self, size: u64) -> String {
        if self.show_size { format!(" [{}]", format_size(size)) } else { String::new() }
    }
}

/// Append a framed, timestamped report to `path`
pub fn append_report(path: &Path, report: &str, now: DateTime<Local>) -> std::io::Result<()> {
    let rule = "=".repeat(50);
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file)?;
    writeln!(file, "{}", rule)?;
    writeln!(file, "Report: {}", now.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(file, "{}", rule)?;
    writeln!(file, "{}", report)?;
    Ok(())
}

/// Local wall-clock rendering of a file timestamp
pub fn format_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Binary-prefixed size, e.g. `512B`, `1.5KB`, `3.0GB`
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 { format!("{}B", bytes) } else { format!("{:.1}{}", size, UNITS[unit]) }
}
