use crate::error::Error;
use crate::roles::DirectoryRole;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding the `files` table.
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default)]
    pub directories: DirectoryRoleConfig,
}

/// One filesystem path per directory role.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DirectoryRoleConfig {
    pub downloads: String,
    pub emulator: String,
    pub backup: String,
    pub preview: String,
    pub thumbnail: String,
}

impl DirectoryRoleConfig {
    pub fn path(&self, role: DirectoryRole) -> &str {
        match role {
            DirectoryRole::Downloads => &self.downloads,
            DirectoryRole::Emulator => &self.emulator,
            DirectoryRole::Backup => &self.backup,
            DirectoryRole::Preview => &self.preview,
            DirectoryRole::Thumbnail => &self.thumbnail,
        }
    }

    /// Check that every role in `roles` has a non-empty path.
    pub fn validate(&self, roles: &[DirectoryRole]) -> Result<(), Error> {
        match roles.iter().find(|role| self.path(**role).trim().is_empty()) {
            Some(role) => Err(Error::MissingRolePath(*role)),
            None => Ok(()),
        }
    }
}

/// Load `Config.{toml,yaml,json}` from the working directory (optional),
/// then apply `SWEEP_*` environment overrides, e.g. `SWEEP_DIRECTORIES__DOWNLOADS`.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("SWEEP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
