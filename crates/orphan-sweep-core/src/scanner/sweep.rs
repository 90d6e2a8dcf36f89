use super::listing::classify_directory;
use super::{OrphanEntry, ScanResult};
use crate::backup::{archive_entries, BackupReceipt, BackupTarget};
use crate::cancel::CancelToken;
use crate::error::Error;
use crate::index::UuidSet;
use crate::report::{ReportEvent, ReportRow, ReportSink, RowOutcome};
use crate::roles::DirectoryRole;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub delete: bool,
    pub human: bool,
}

/// Outcome of one directory pass.
#[derive(Debug, Clone)]
pub struct DirectoryReport {
    pub role: DirectoryRole,
    pub path: PathBuf,
    pub result: ScanResult,
    pub entries: Vec<OrphanEntry>,
    /// Archive written before deleting, when one was needed and succeeded.
    pub archive: Option<PathBuf>,
    /// The pass stopped early; orphans after the last reported row were not touched.
    pub cancelled: bool,
}

impl DirectoryReport {
    fn empty(role: DirectoryRole, path: &Path) -> Self {
        Self {
            role,
            path: path.to_path_buf(),
            result: ScanResult::default(),
            entries: Vec::new(),
            archive: None,
            cancelled: false,
        }
    }
}

/// Reconcile one directory against `uuids`, optionally deleting its orphans.
///
/// With `delete` set on a backup-eligible role, orphans are archived into
/// `backup` first and only files covered by the resulting receipt are removed.
/// A missing or unreadable directory is a warning and yields an empty report.
/// Cancellation stops the pass between files: the report then holds every row
/// handled so far and has `cancelled` set.
pub fn scan(
    dir: &Path,
    uuids: &UuidSet,
    role: DirectoryRole,
    options: ScanOptions,
    backup: Option<&BackupTarget>,
    sink: &dyn ReportSink,
    cancel: &CancelToken,
) -> Result<DirectoryReport, Error> {
    sink.emit(&ReportEvent::Directory {
        role,
        path: dir.to_path_buf(),
    });

    if !dir.is_dir() {
        warn!("{} directory {} does not exist", role, dir.display());
        sink.emit(&ReportEvent::Warning(format!(
            "{} directory {} does not exist, skipping",
            role,
            dir.display()
        )));
        return Ok(DirectoryReport::empty(role, dir));
    }

    let listing = match classify_directory(dir, uuids, role, cancel) {
        Ok(listing) => listing,
        Err(Error::Cancelled) => {
            return Ok(interrupted(DirectoryReport::empty(role, dir), options, sink));
        }
        Err(err) => {
            error!("Could not list {}: {}", dir.display(), err);
            sink.emit(&ReportEvent::Warning(format!(
                "could not list {}: {}",
                dir.display(),
                err
            )));
            return Ok(DirectoryReport::empty(role, dir));
        }
    };
    debug!(
        "{}: {} orphans, {} kept, {} ignored, {} subdirectories skipped",
        dir.display(),
        listing.orphans.len(),
        listing.kept,
        listing.ignored,
        listing.subdirectories
    );

    let mut report = DirectoryReport::empty(role, dir);

    let receipt = if options.delete && role.is_backup_eligible() {
        match backup_before_delete(role, &listing.orphans, backup, sink, cancel) {
            Ok(receipt) => receipt,
            Err(_) => return Ok(interrupted(report, options, sink)),
        }
    } else {
        None
    };
    report.archive = receipt.as_ref().map(|r| r.archive().to_path_buf());

    for (index, mut entry) in listing.orphans.into_iter().enumerate() {
        if options.delete && cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        let outcome = if !options.delete {
            RowOutcome::Found
        } else if role.is_backup_eligible() && !covered(receipt.as_ref(), &entry.name) {
            RowOutcome::Skipped
        } else {
            match fs::remove_file(&entry.path) {
                Ok(()) => {
                    entry.deleted = true;
                    RowOutcome::Deleted
                }
                Err(err) => {
                    warn!("Failed to remove '{}': {}", entry.path.display(), err);
                    RowOutcome::Failed(err.to_string())
                }
            }
        };

        report.result.count += 1;
        report.result.bytes += entry.size;
        match outcome {
            RowOutcome::Deleted => report.result.deleted += 1,
            RowOutcome::Failed(_) => report.result.fails += 1,
            RowOutcome::Skipped => report.result.skipped += 1,
            RowOutcome::Found => {}
        }

        sink.emit(&ReportEvent::Row(ReportRow {
            seq: index + 1,
            outcome,
            name: entry.name.clone(),
            size: entry.size,
            mode: entry.mode,
            modified: entry.modified,
            human: options.human,
        }));
        report.entries.push(entry);
    }

    for unreadable in &listing.unreadable {
        report.result.fails += 1;
        sink.emit(&ReportEvent::Warning(format!(
            "could not read {}: {}",
            unreadable.name, unreadable.reason
        )));
    }

    if report.cancelled {
        return Ok(interrupted(report, options, sink));
    }

    info!(
        "{}: {} orphaned files, {} bytes",
        role, report.result.count, report.result.bytes
    );
    emit_summary(&report, options, sink);

    Ok(report)
}

fn emit_summary(report: &DirectoryReport, options: ScanOptions, sink: &dyn ReportSink) {
    sink.emit(&ReportEvent::DirectorySummary {
        role: report.role,
        result: report.result,
        human: options.human,
    });
}

fn interrupted(
    mut report: DirectoryReport,
    options: ScanOptions,
    sink: &dyn ReportSink,
) -> DirectoryReport {
    report.cancelled = true;
    warn!(
        "{} pass cancelled after {} deletions",
        report.role, report.result.deleted
    );
    sink.emit(&ReportEvent::Warning(format!(
        "cancelled, remaining {} files left untouched",
        report.role
    )));
    emit_summary(&report, options, sink);
    report
}

fn covered(receipt: Option<&BackupReceipt>, name: &str) -> bool {
    receipt.is_some_and(|r| r.covers(name))
}

/// Errors only on cancellation; any other backup problem withholds deletion.
fn backup_before_delete(
    role: DirectoryRole,
    orphans: &[OrphanEntry],
    backup: Option<&BackupTarget>,
    sink: &dyn ReportSink,
    cancel: &CancelToken,
) -> Result<Option<BackupReceipt>, Error> {
    if orphans.is_empty() {
        return Ok(None);
    }
    let Some(target) = backup else {
        warn!("No backup directory for {}, deletions withheld", role);
        sink.emit(&ReportEvent::Warning(format!(
            "no backup directory available, {} deletions withheld",
            role
        )));
        return Ok(None);
    };

    match archive_entries(role, orphans, target, cancel) {
        Ok(receipt) => Ok(receipt),
        Err(Error::Cancelled) => Err(Error::Cancelled),
        Err(err) => {
            error!("Backup of {} failed: {}", role, err);
            sink.emit(&ReportEvent::Warning(format!(
                "backup failed, {} deletions withheld: {}",
                role, err
            )));
            Ok(None)
        }
    }
}
