use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;

pub const DEFAULT_STORAGE_KEY: &str = "hr_db_v1";
pub const DEFAULT_DATABASE_NAME: &str = "records";
pub const DEFAULT_MAP_SIZE: usize = 10 * 1024 * 1024;

/// Where and how the record document is persisted.
///
/// Hosts usually hand this over as JSON; only `path` is required:
///
/// ```json
/// { "path": "/data/hardware_revive", "storage_key": "hr_db_v1", "map_size": 10485760 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory of the LMDB environment. Created if missing.
    pub path: PathBuf,

    /// Key under which the whole document is stored.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Named LMDB database inside the environment.
    #[serde(default = "default_database_name")]
    pub database_name: String,

    /// Maximum size of the memory map in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            storage_key: default_storage_key(),
            database_name: default_database_name(),
            map_size: default_map_size(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, AppResponse> {
        let config: StoreConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppResponse> {
        if self.path.as_os_str().is_empty() {
            return Err(AppResponse::ValidationError("Store path must not be empty".to_string()));
        }
        if self.storage_key.is_empty() {
            return Err(AppResponse::ValidationError("Storage key must not be empty".to_string()));
        }
        if self.database_name.is_empty() {
            return Err(AppResponse::ValidationError("Database name must not be empty".to_string()));
        }
        if self.map_size == 0 {
            return Err(AppResponse::ValidationError("Map size must be greater than zero".to_string()));
        }
        Ok(())
    }
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_database_name() -> String {
    DEFAULT_DATABASE_NAME.to_string()
}

fn default_map_size() -> usize {
    DEFAULT_MAP_SIZE
}
