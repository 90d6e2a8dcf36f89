use crate::backup::BackupTarget;
use crate::cancel::CancelToken;
use crate::config::AppConfig;
use crate::error::Error;
use crate::index::{build_uuid_index, UuidSet};
use crate::report::{BufferSink, ReportEvent, ReportSink};
use crate::roles::DirectoryRole;
use crate::scanner::{self, ScanOptions, ScanResult};
use crate::scope::ScanScope;
use crate::storage::{Database, UuidSource};
use chrono::Local;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

pub use crate::scanner::DirectoryReport;

#[derive(Debug, Clone, Copy)]
pub struct CleanOptions {
    /// Remove orphans (after backing them up where the role requires it).
    pub delete: bool,
    /// Humanized sizes and ages in report rows.
    pub human: bool,
    /// Scan directories concurrently on the rayon pool.
    pub parallel: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            delete: false,
            human: true,
            parallel: false,
        }
    }
}

#[derive(Debug)]
pub struct CleanSummary {
    pub result: ScanResult,
    /// Rows in the files table.
    pub total_records: i64,
    pub known_uuids: usize,
    pub directories: Vec<DirectoryReport>,
    /// The run was interrupted; later directories may not have been scanned.
    pub cancelled: bool,
}

pub struct CleanEngine {
    config: AppConfig,
    cancel: CancelToken,
}

impl CleanEngine {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn open_database(&self) -> Result<Database, Error> {
        let path = self
            .config
            .database_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or(Error::DatabaseNotConfigured)?;
        Ok(Database::open(path)?)
    }

    /// Run the orphan reconciliation against the configured database:
    /// 1. Parse the scope and validate the role paths it needs
    /// 2. Build the uuid index once
    /// 3. Scan (backup, delete) every resolved directory in order
    /// 4. Merge the per-directory counters into one summary
    pub fn clean(
        &self,
        scope: &str,
        options: CleanOptions,
        sink: &dyn ReportSink,
    ) -> Result<CleanSummary, Error> {
        let scope: ScanScope = scope.parse()?;
        self.validate(scope, options)?;
        let db = self.open_database()?;
        self.run(scope, &db, options, sink)
    }

    /// Same as [`CleanEngine::clean`] with an explicit uuid source.
    pub fn clean_with_source(
        &self,
        scope: &str,
        source: &dyn UuidSource,
        options: CleanOptions,
        sink: &dyn ReportSink,
    ) -> Result<CleanSummary, Error> {
        let scope: ScanScope = scope.parse()?;
        self.validate(scope, options)?;
        self.run(scope, source, options, sink)
    }

    /// Create any role directory that does not exist yet. Returns the created paths.
    pub fn make_directories(&self) -> Result<Vec<PathBuf>, Error> {
        self.config.directories.validate(&DirectoryRole::ALL)?;
        let mut created = Vec::new();
        for role in DirectoryRole::ALL {
            let path = Path::new(self.config.directories.path(role));
            if path.is_dir() {
                continue;
            }
            fs::create_dir_all(path)?;
            info!("Created {} directory {}", role, path.display());
            created.push(path.to_path_buf());
        }
        Ok(created)
    }

    fn validate(&self, scope: ScanScope, options: CleanOptions) -> Result<(), Error> {
        let mut roles = scope.resolve();
        if options.delete {
            roles.push(DirectoryRole::Backup);
        }
        self.config.directories.validate(&roles)
    }

    fn run(
        &self,
        scope: ScanScope,
        source: &dyn UuidSource,
        options: CleanOptions,
        sink: &dyn ReportSink,
    ) -> Result<CleanSummary, Error> {
        let start = Instant::now();
        let (total_records, uuids) = build_uuid_index(source, &self.cancel)?;

        let roles = scope.resolve();
        info!("Scanning {} directories for scope '{}'", roles.len(), scope);

        let backup = options.delete.then(|| {
            BackupTarget::new(
                self.config.directories.path(DirectoryRole::Backup),
                Local::now(),
            )
        });
        let scan_options = ScanOptions {
            delete: options.delete,
            human: options.human,
        };

        let directories = if options.parallel {
            self.scan_parallel(&roles, &uuids, scan_options, backup.as_ref(), sink)?
        } else {
            let mut directories = Vec::with_capacity(roles.len());
            for role in &roles {
                let report = self.scan_role(*role, &uuids, scan_options, backup.as_ref(), sink)?;
                let stop = report.cancelled;
                directories.push(report);
                if stop {
                    break;
                }
            }
            directories
        };
        let cancelled = directories.iter().any(|d| d.cancelled);

        let mut result = ScanResult::default();
        for dir in &directories {
            result.merge(&dir.result);
        }

        sink.emit(&ReportEvent::RunSummary {
            result,
            known_uuids: uuids.len(),
            directories: directories.len(),
            human: options.human,
            cancelled,
        });
        debug!("Clean completed in {:.2}s", start.elapsed().as_secs_f64());

        Ok(CleanSummary {
            result,
            total_records,
            known_uuids: uuids.len(),
            directories,
            cancelled,
        })
    }

    /// Each directory pass writes into its own buffer; buffers are replayed
    /// into `sink` in role order once every pass has finished.
    fn scan_parallel(
        &self,
        roles: &[DirectoryRole],
        uuids: &UuidSet,
        options: ScanOptions,
        backup: Option<&BackupTarget>,
        sink: &dyn ReportSink,
    ) -> Result<Vec<DirectoryReport>, Error> {
        let passes: Vec<(Result<DirectoryReport, Error>, Vec<ReportEvent>)> = roles
            .par_iter()
            .map(|role| {
                let buffer = BufferSink::new();
                let report = self.scan_role(*role, uuids, options, backup, &buffer);
                (report, buffer.take())
            })
            .collect();

        let mut directories = Vec::with_capacity(passes.len());
        for (report, events) in passes {
            for event in &events {
                sink.emit(event);
            }
            directories.push(report?);
        }
        Ok(directories)
    }

    fn scan_role(
        &self,
        role: DirectoryRole,
        uuids: &UuidSet,
        options: ScanOptions,
        backup: Option<&BackupTarget>,
        sink: &dyn ReportSink,
    ) -> Result<DirectoryReport, Error> {
        let dir = Path::new(self.config.directories.path(role));
        scanner::scan(dir, uuids, role, options, backup, sink, &self.cancel)
    }
}
