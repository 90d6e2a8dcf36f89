mod listing;
mod sweep;

pub use listing::{classify_directory, uuid_candidate, DirectoryListing, UnreadableEntry};
pub use sweep::{scan, DirectoryReport, ScanOptions};

use std::path::PathBuf;
use std::time::SystemTime;

/// Counters for one directory pass, or the sum over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Orphans found.
    pub count: usize,
    /// Deletion attempts (or entry reads) that failed.
    pub fails: usize,
    /// Total size of the orphans found.
    pub bytes: u64,
    pub deleted: usize,
    /// Orphans left on disk because no backup covered them.
    pub skipped: usize,
}

impl ScanResult {
    pub fn merge(&mut self, other: &ScanResult) {
        self.count += other.count;
        self.fails += other.fails;
        self.bytes += other.bytes;
        self.deleted += other.deleted;
        self.skipped += other.skipped;
    }
}

/// A file that no database record references.
#[derive(Debug, Clone)]
pub struct OrphanEntry {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    /// Unix `st_mode`, file type bits included.
    pub mode: u32,
    pub modified: Option<SystemTime>,
    pub is_symlink: bool,
    /// Set once the file has been removed from disk.
    pub deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_is_additive() {
        let mut total = ScanResult::default();
        total.merge(&ScanResult {
            count: 2,
            fails: 1,
            bytes: 300,
            deleted: 1,
            skipped: 0,
        });
        total.merge(&ScanResult {
            count: 1,
            fails: 0,
            bytes: 50,
            deleted: 0,
            skipped: 1,
        });
        assert_eq!(
            total,
            ScanResult {
                count: 3,
                fails: 1,
                bytes: 350,
                deleted: 1,
                skipped: 1,
            }
        );
    }
}
