use crate::cancel::CancelToken;
use crate::error::Error;
use crate::index::UuidSet;
use crate::roles::{DirectoryRole, BACKUP_ARCHIVE_EXTENSION, BACKUP_ARCHIVE_PREFIX};
use crate::scanner::{classify_directory, OrphanEntry};
use chrono::{DateTime, Local};
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where and when a run writes its backup archives.
#[derive(Debug, Clone)]
pub struct BackupTarget {
    pub dir: PathBuf,
    pub timestamp: DateTime<Local>,
}

impl BackupTarget {
    pub fn new(dir: impl Into<PathBuf>, timestamp: DateTime<Local>) -> Self {
        Self {
            dir: dir.into(),
            timestamp,
        }
    }

    pub fn archive_path(&self, tag: &str) -> PathBuf {
        self.dir.join(archive_name(tag, &self.timestamp))
    }
}

/// Proof that a finalized, non-empty archive holds a set of files.
///
/// Only this module can build one, so holding a receipt means the archive was
/// written, flushed and synced before any deletion is attempted.
#[derive(Debug, Clone)]
pub struct BackupReceipt {
    archive: PathBuf,
    names: BTreeSet<String>,
}

impl BackupReceipt {
    pub fn archive(&self) -> &Path {
        &self.archive
    }

    pub fn covers(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// `bak-<tag>-<YYYY-Mon-D-HHMMSS>.tar`
pub fn archive_name(tag: &str, timestamp: &DateTime<Local>) -> String {
    format!(
        "{}{}-{}.{}",
        BACKUP_ARCHIVE_PREFIX,
        tag,
        timestamp.format("%Y-%b-%-d-%H%M%S"),
        BACKUP_ARCHIVE_EXTENSION
    )
}

/// Classify `dir` and archive its orphans.
///
/// Returns `Ok(None)` when the role is not backup-eligible or there is nothing
/// to archive; in both cases no file is left in the backup directory.
pub fn backup(
    dir: &Path,
    uuids: &UuidSet,
    role: DirectoryRole,
    target: &BackupTarget,
    cancel: &CancelToken,
) -> Result<Option<BackupReceipt>, Error> {
    if !role.is_backup_eligible() {
        return Ok(None);
    }
    let listing = classify_directory(dir, uuids, role, cancel)?;
    archive_entries(role, &listing.orphans, target, cancel)
}

/// Write `entries` into a new tar archive for `role` inside `target.dir`.
///
/// The archive is created with create-new semantics and never overwrites an
/// existing file. An archive that ends up empty, or whose writing fails at any
/// point, is removed before returning.
pub fn archive_entries(
    role: DirectoryRole,
    entries: &[OrphanEntry],
    target: &BackupTarget,
    cancel: &CancelToken,
) -> Result<Option<BackupReceipt>, Error> {
    let Some(tag) = role.backup_tag() else {
        return Ok(None);
    };
    if entries.is_empty() {
        debug!("Nothing to back up for {}", role);
        return Ok(None);
    }

    let archive = target.archive_path(tag);
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&archive)
        .map_err(|source| Error::Backup {
            archive: archive.clone(),
            source,
        })?;

    let mut builder = tar::Builder::new(BufWriter::new(file));
    builder.follow_symlinks(false);

    let names = match append_entries(&mut builder, entries, cancel) {
        Ok(names) => names,
        Err(err) => {
            drop(builder);
            discard(&archive);
            return Err(wrap(err, &archive));
        }
    };

    if let Err(source) = finish(builder) {
        discard(&archive);
        return Err(Error::Backup { archive, source });
    }

    if names.is_empty() {
        discard(&archive);
        return Ok(None);
    }

    info!(
        "Backed up {} {} files to {}",
        names.len(),
        role,
        archive.display()
    );
    Ok(Some(BackupReceipt { archive, names }))
}

fn append_entries(
    builder: &mut tar::Builder<BufWriter<File>>,
    entries: &[OrphanEntry],
    cancel: &CancelToken,
) -> Result<BTreeSet<String>, AppendError> {
    let mut names = BTreeSet::new();
    for entry in entries {
        if cancel.is_cancelled() {
            return Err(AppendError::Cancelled);
        }
        builder
            .append_path_with_name(&entry.path, &entry.name)
            .map_err(AppendError::Io)?;
        names.insert(entry.name.clone());
    }
    Ok(names)
}

enum AppendError {
    Cancelled,
    Io(io::Error),
}

fn wrap(err: AppendError, archive: &Path) -> Error {
    match err {
        AppendError::Cancelled => Error::Cancelled,
        AppendError::Io(source) => Error::Backup {
            archive: archive.to_path_buf(),
            source,
        },
    }
}

fn finish(builder: tar::Builder<BufWriter<File>>) -> io::Result<()> {
    let writer = builder.into_inner()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

fn discard(archive: &Path) {
    match fs::remove_file(archive) {
        Ok(()) => debug!("Removed unusable archive {}", archive.display()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(
            "Could not remove unusable archive {}: {}",
            archive.display(),
            err
        ),
    }
}
