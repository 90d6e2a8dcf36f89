use super::OrphanEntry;
use crate::cancel::CancelToken;
use crate::error::Error;
use crate::index::UuidSet;
use crate::roles::DirectoryRole;
use std::fs::Metadata;
use std::io;
use std::path::Path;
use tracing::{trace, warn};
use walkdir::WalkDir;

/// Immediate files of one directory, split by classification.
#[derive(Debug, Default)]
pub struct DirectoryListing {
    pub orphans: Vec<OrphanEntry>,
    pub kept: usize,
    pub ignored: usize,
    pub subdirectories: usize,
    /// Orphan candidates whose metadata could not be read.
    pub unreadable: Vec<UnreadableEntry>,
}

#[derive(Debug, Clone)]
pub struct UnreadableEntry {
    pub name: String,
    pub reason: String,
}

/// Strip the last extension from a filename, `abc.zip` -> `abc`.
/// Dotfiles such as `.gitkeep` are returned unchanged.
pub fn uuid_candidate(name: &str) -> &str {
    match name.rfind('.') {
        Some(i) if i > 0 => &name[..i],
        _ => name,
    }
}

/// List the immediate entries of `dir` and classify every file.
///
/// A file is an orphan when its uuid candidate is not in `uuids` and the role
/// does not ignore it. Subdirectories are counted but never descended into;
/// symlinks are classified as files and not followed. Entries come back in
/// filename order.
pub fn classify_directory(
    dir: &Path,
    uuids: &UuidSet,
    role: DirectoryRole,
    cancel: &CancelToken,
) -> Result<DirectoryListing, Error> {
    let mut listing = DirectoryListing::default();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry_result in walker {
        cancel.check()?;

        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => return Err(Error::Io(io::Error::from(err))),
            Err(err) => {
                let name = err
                    .path()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                warn!("Error reading entry in {}: {}", dir.display(), err);
                listing.unreadable.push(UnreadableEntry {
                    name,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        if entry.file_type().is_dir() {
            listing.subdirectories += 1;
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let stem = uuid_candidate(&name);

        if role.is_ignored(&name) {
            trace!("ignored: {}", name);
            listing.ignored += 1;
            continue;
        }
        if uuids.contains(stem) {
            listing.kept += 1;
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!("Error getting metadata for {}: {}", entry.path().display(), err);
                listing.unreadable.push(UnreadableEntry {
                    name,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        listing.orphans.push(OrphanEntry {
            name,
            path: entry.path().to_path_buf(),
            size: metadata.len(),
            mode: file_mode(&metadata),
            modified: metadata.modified().ok(),
            is_symlink: entry.path_is_symlink(),
            deleted: false,
        });
    }

    Ok(listing)
}

#[cfg(unix)]
fn file_mode(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    metadata.mode()
}

#[cfg(not(unix))]
fn file_mode(metadata: &Metadata) -> u32 {
    let kind = if metadata.file_type().is_symlink() {
        0o120000
    } else {
        0o100000
    };
    let perm = if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    };
    kind | perm
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const KEPT: &str = "11111111-1111-1111-1111-111111111111";
    const ORPHAN: &str = "22222222-2222-2222-2222-222222222222";

    #[test]
    fn test_uuid_candidate() {
        assert_eq!(uuid_candidate("abc.zip"), "abc");
        assert_eq!(uuid_candidate("abc.tar.gz"), "abc.tar");
        assert_eq!(uuid_candidate("abc"), "abc");
        assert_eq!(uuid_candidate(".gitkeep"), ".gitkeep");
    }

    #[test]
    fn test_classify_splits_kept_ignored_orphan() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join(format!("{}.bin", KEPT)), b"keep").unwrap();
        fs::write(tmp.path().join(format!("{}.bin", ORPHAN)), vec![0u8; 100]).unwrap();
        fs::write(tmp.path().join("blank.png"), b"png").unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("nested").join("deep.bin"), b"deep").unwrap();

        let uuids: UuidSet = [KEPT].into_iter().collect();
        let listing =
            classify_directory(tmp.path(), &uuids, DirectoryRole::Preview, &CancelToken::new())
                .unwrap();

        assert_eq!(listing.kept, 1);
        assert_eq!(listing.ignored, 1);
        assert_eq!(listing.subdirectories, 1);
        assert!(listing.unreadable.is_empty());
        assert_eq!(listing.orphans.len(), 1);
        let orphan = &listing.orphans[0];
        assert_eq!(orphan.name, format!("{}.bin", ORPHAN));
        assert_eq!(orphan.size, 100);
        assert!(!orphan.deleted);
        assert!(!orphan.is_symlink);
    }

    #[test]
    fn test_uuid_without_extension_matches() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join(KEPT), b"raw").unwrap();
        let uuids: UuidSet = [KEPT].into_iter().collect();
        let listing =
            classify_directory(tmp.path(), &uuids, DirectoryRole::Downloads, &CancelToken::new())
                .unwrap();
        assert_eq!(listing.kept, 1);
        assert!(listing.orphans.is_empty());
    }

    #[test]
    fn test_emulator_assets_depend_on_role() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("dosee-core.js"), b"js").unwrap();
        let uuids = UuidSet::new();

        let emu =
            classify_directory(tmp.path(), &uuids, DirectoryRole::Emulator, &CancelToken::new())
                .unwrap();
        assert!(emu.orphans.is_empty());

        let downloads =
            classify_directory(tmp.path(), &uuids, DirectoryRole::Downloads, &CancelToken::new())
                .unwrap();
        assert_eq!(downloads.orphans.len(), 1);
    }

    #[test]
    fn test_ignore_list_needs_exact_name() {
        let tmp = tempdir().unwrap();
        let placeholder_png = "00000000-0000-0000-0000-000000000000.png";
        for name in [placeholder_png, "blank.png.bak", "dosee-core.js.old", "dosee-core.js"] {
            fs::write(tmp.path().join(name), b"x").unwrap();
        }

        let listing = classify_directory(
            tmp.path(),
            &UuidSet::new(),
            DirectoryRole::Emulator,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(listing.ignored, 1);
        let names: Vec<&str> = listing.orphans.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec![placeholder_png, "blank.png.bak", "dosee-core.js.old"]);
    }

    #[test]
    fn test_orphans_sorted_by_name() {
        let tmp = tempdir().unwrap();
        for name in ["c.bin", "a.bin", "b.bin"] {
            fs::write(tmp.path().join(name), b"x").unwrap();
        }
        let listing = classify_directory(
            tmp.path(),
            &UuidSet::new(),
            DirectoryRole::Downloads,
            &CancelToken::new(),
        )
        .unwrap();
        let names: Vec<&str> = listing.orphans.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["a.bin", "b.bin", "c.bin"]);
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let tmp = tempdir().unwrap();
        let missing = tmp.path().join("gone");
        let result = classify_directory(
            &missing,
            &UuidSet::new(),
            DirectoryRole::Downloads,
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_is_classified_not_followed() {
        let tmp = tempdir().unwrap();
        let target_dir = tempdir().unwrap();
        fs::write(target_dir.path().join("real.bin"), vec![0u8; 64]).unwrap();
        std::os::unix::fs::symlink(
            target_dir.path().join("real.bin"),
            tmp.path().join("link.bin"),
        )
        .unwrap();

        let listing = classify_directory(
            tmp.path(),
            &UuidSet::new(),
            DirectoryRole::Downloads,
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(listing.orphans.len(), 1);
        assert!(listing.orphans[0].is_symlink);
        assert_eq!(listing.orphans[0].mode & 0o170000, 0o120000);
    }

    #[test]
    fn test_cancelled_listing() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a.bin"), b"x").unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let result =
            classify_directory(tmp.path(), &UuidSet::new(), DirectoryRole::Downloads, &cancel);
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
