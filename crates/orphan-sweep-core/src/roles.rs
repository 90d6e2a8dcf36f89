use std::fmt;

/// Reserved all-zero identifier used by placeholder records.
pub const PLACEHOLDER_UUID: &str = "00000000-0000-0000-0000-000000000000";

const COMMON_IGNORES: &[&str] = &[PLACEHOLDER_UUID, "blank.png", ".gitkeep"];

/// Runtime assets shipped alongside the DOS emulator downloads.
const EMULATOR_IGNORES: &[&str] = &[
    "g_drive.zip",
    "s_drive.zip",
    "u_drive.zip",
    "dosee-core.js",
    "dosee-core.mem",
];

/// Prefix and extension of the archives written by the backup step.
pub const BACKUP_ARCHIVE_PREFIX: &str = "bak-";
pub const BACKUP_ARCHIVE_EXTENSION: &str = "tar";

/// The kind of asset directory being reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DirectoryRole {
    Downloads,
    Emulator,
    Backup,
    /// Full size screenshots (`img-captures`).
    Preview,
    /// 400px thumbnails (`img-400xthumbs`).
    Thumbnail,
}

impl DirectoryRole {
    pub const ALL: [DirectoryRole; 5] = [
        DirectoryRole::Downloads,
        DirectoryRole::Emulator,
        DirectoryRole::Backup,
        DirectoryRole::Preview,
        DirectoryRole::Thumbnail,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DirectoryRole::Downloads => "downloads",
            DirectoryRole::Emulator => "emulator",
            DirectoryRole::Backup => "backup",
            DirectoryRole::Preview => "preview",
            DirectoryRole::Thumbnail => "thumbnail",
        }
    }

    /// Tag used in backup archive names. Only backup-eligible roles have one.
    pub fn backup_tag(&self) -> Option<&'static str> {
        match self {
            DirectoryRole::Downloads => Some("uuid"),
            DirectoryRole::Preview => Some("img-captures"),
            DirectoryRole::Thumbnail => Some("img-400xthumbs"),
            DirectoryRole::Emulator | DirectoryRole::Backup => None,
        }
    }

    pub fn is_backup_eligible(&self) -> bool {
        self.backup_tag().is_some()
    }

    /// Filenames that are never orphans in a directory of this role.
    pub fn ignore_list(&self) -> Vec<&'static str> {
        let mut names = COMMON_IGNORES.to_vec();
        if *self == DirectoryRole::Emulator {
            names.extend_from_slice(EMULATOR_IGNORES);
        }
        names
    }

    /// Whether the filename `name` is protected for this role. Matching is on
    /// the full name, so `blank.png.bak` is not covered by `blank.png`.
    pub fn is_ignored(&self, name: &str) -> bool {
        if self.ignore_list().contains(&name) {
            return true;
        }
        *self == DirectoryRole::Backup && is_backup_archive_name(name)
    }
}

impl fmt::Display for DirectoryRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

pub fn is_backup_archive_name(name: &str) -> bool {
    name.starts_with(BACKUP_ARCHIVE_PREFIX)
        && name
            .rsplit_once('.')
            .is_some_and(|(_, ext)| ext == BACKUP_ARCHIVE_EXTENSION)
}
