use crate::error::Error;
use crate::roles::DirectoryRole;
use std::fmt;
use std::str::FromStr;

/// The subset of directory roles reconciled in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanScope {
    All,
    Download,
    Emulation,
    Image,
}

impl ScanScope {
    /// Ordered list of roles visited for this scope.
    pub fn resolve(&self) -> Vec<DirectoryRole> {
        match self {
            ScanScope::All => DirectoryRole::ALL.to_vec(),
            ScanScope::Download => vec![DirectoryRole::Downloads, DirectoryRole::Backup],
            ScanScope::Emulation => vec![DirectoryRole::Emulator],
            ScanScope::Image => vec![DirectoryRole::Preview, DirectoryRole::Thumbnail],
        }
    }
}

impl FromStr for ScanScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(ScanScope::All),
            "download" => Ok(ScanScope::Download),
            "emulation" => Ok(ScanScope::Emulation),
            "image" => Ok(ScanScope::Image),
            _ => Err(Error::UnknownScope(s.to_string())),
        }
    }
}

impl fmt::Display for ScanScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanScope::All => "all",
            ScanScope::Download => "download",
            ScanScope::Emulation => "emulation",
            ScanScope::Image => "image",
        };
        f.write_str(name)
    }
}
