pub mod backup;
pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod report;
pub mod roles;
pub mod scanner;
pub mod scope;
pub mod storage;

pub use crate::cancel::CancelToken;
pub use crate::config::{AppConfig, DirectoryRoleConfig};
pub use crate::engine::{CleanEngine, CleanOptions, CleanSummary, DirectoryReport};
pub use crate::error::Error;
pub use crate::index::UuidSet;
pub use crate::report::{BufferSink, ReportEvent, ReportSink, SilentSink};
pub use crate::roles::DirectoryRole;
pub use crate::scanner::{OrphanEntry, ScanResult};
pub use crate::scope::ScanScope;
