use crate::engine::DirectoryReport;
use crate::roles::DirectoryRole;
use crate::scanner::ScanResult;
use chrono::{DateTime, Local, Utc};
use indicatif::{HumanBytes, HumanDuration};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

/// Line-oriented destination for report output.
///
/// The core never prints directly. The CLI implements this with colored
/// stdout output; tests and the parallel mode use [`BufferSink`].
pub trait ReportSink: Send + Sync {
    fn emit(&self, event: &ReportEvent);
}

/// Sink that discards everything.
pub struct SilentSink;

impl ReportSink for SilentSink {
    fn emit(&self, _event: &ReportEvent) {}
}

/// Sink that keeps every event in memory, in emission order.
#[derive(Default)]
pub struct BufferSink {
    events: Mutex<Vec<ReportEvent>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn take(&self) -> Vec<ReportEvent> {
        self.events
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.events().iter().map(|e| e.to_string()).collect()
    }
}

impl ReportSink for BufferSink {
    fn emit(&self, event: &ReportEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// Dry run, nothing was touched.
    Found,
    Deleted,
    Failed(String),
    /// Deletion requested but withheld because no backup covers the file.
    Skipped,
}

impl RowOutcome {
    pub fn mark(&self) -> &'static str {
        match self {
            RowOutcome::Found => "-",
            RowOutcome::Deleted => "✔",
            RowOutcome::Failed(_) => "✘",
            RowOutcome::Skipped => "!",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportRow {
    pub seq: usize,
    pub outcome: RowOutcome,
    pub name: String,
    pub size: u64,
    pub mode: u32,
    pub modified: Option<SystemTime>,
    pub human: bool,
}

#[derive(Debug, Clone)]
pub enum ReportEvent {
    Directory {
        role: DirectoryRole,
        path: PathBuf,
    },
    Row(ReportRow),
    DirectorySummary {
        role: DirectoryRole,
        result: ScanResult,
        human: bool,
    },
    Warning(String),
    RunSummary {
        result: ScanResult,
        known_uuids: usize,
        directories: usize,
        human: bool,
        cancelled: bool,
    },
}

impl fmt::Display for ReportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportEvent::Directory { role, path } => {
                write!(f, "{} {}", role, path.display())
            }
            ReportEvent::Row(row) => {
                write!(
                    f,
                    "{}.\t{}\t{}\t{}\t{}\t{}",
                    row.seq,
                    row.outcome.mark(),
                    row.name,
                    format_size(row.size, row.human),
                    format_mode(row.mode),
                    row.modified
                        .map(|t| format_time(t, row.human))
                        .unwrap_or_else(|| "?".to_string()),
                )?;
                if let RowOutcome::Failed(reason) = &row.outcome {
                    write!(f, "\t{}", reason)?;
                }
                Ok(())
            }
            ReportEvent::DirectorySummary {
                role,
                result,
                human,
            } => {
                write!(
                    f,
                    "{} orphaned files in {}, {}",
                    result.count,
                    role,
                    format_size(result.bytes, *human)
                )?;
                if result.deleted > 0 || result.fails > 0 || result.skipped > 0 {
                    write!(
                        f,
                        " ({} deleted, {} failed, {} skipped)",
                        result.deleted, result.fails, result.skipped
                    )?;
                }
                Ok(())
            }
            ReportEvent::Warning(message) => f.write_str(message),
            ReportEvent::RunSummary {
                result,
                known_uuids,
                directories,
                human,
                cancelled,
            } => {
                write!(
                    f,
                    "{} orphaned files of {} known identifiers, {} failed deletions",
                    result.count, known_uuids, result.fails
                )?;
                if *directories > 1 && result.bytes > 0 {
                    write!(
                        f,
                        "\n{} of drive space consumed",
                        format_size(result.bytes, *human)
                    )?;
                }
                if *cancelled {
                    f.write_str("\nrun cancelled before completion")?;
                }
                Ok(())
            }
        }
    }
}

pub fn format_size(bytes: u64, human: bool) -> String {
    if human {
        HumanBytes(bytes).to_string()
    } else {
        format!("{} bytes", bytes)
    }
}

pub fn format_time(time: SystemTime, human: bool) -> String {
    if human {
        match SystemTime::now().duration_since(time) {
            Ok(age) => format!("{} ago", HumanDuration(age)),
            Err(_) => "in the future".to_string(),
        }
    } else {
        DateTime::<Local>::from(time)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}

/// Render a unix mode the way `ls -l` does, e.g. `-rw-r--r--`.
pub fn format_mode(mode: u32) -> String {
    let kind = match mode & 0o170000 {
        0o040000 => 'd',
        0o120000 => 'l',
        0o060000 => 'b',
        0o020000 => 'c',
        0o010000 => 'p',
        0o140000 => 's',
        _ => '-',
    };
    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

#[derive(Debug, Serialize)]
struct CsvRecord<'a> {
    role: &'a str,
    directory: String,
    name: &'a str,
    size: u64,
    mode: String,
    modified: String,
    deleted: bool,
}

/// Write every orphan entry of the run to a CSV file at `path`.
pub fn write_csv(path: &Path, directories: &[DirectoryReport]) -> Result<usize, csv::Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    let mut rows = 0;
    for dir in directories {
        for entry in &dir.entries {
            wtr.serialize(CsvRecord {
                role: dir.role.name(),
                directory: dir.path.to_string_lossy().into_owned(),
                name: &entry.name,
                size: entry.size,
                mode: format_mode(entry.mode),
                modified: entry
                    .modified
                    .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
                    .unwrap_or_default(),
                deleted: entry.deleted,
            })?;
            rows += 1;
        }
    }
    wtr.flush()?;
    Ok(rows)
}
