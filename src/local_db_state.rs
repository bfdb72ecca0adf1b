use std::fs;
use std::path::{Path, PathBuf};

use lmdb::{Database, DatabaseFlags, Environment, Transaction, WriteFlags};
use log::{debug, info, warn};

use crate::app_response::AppResponse;
use crate::storage::DocumentStorage;
use crate::store_config::StoreConfig;

/// LMDB environment holding the persisted record document.
pub struct AppDbState {
    env: Environment,
    db: Database,
    path: PathBuf,
}

impl AppDbState {
    pub fn init(config: &StoreConfig) -> Result<Self, AppResponse> {
        config.validate()?;

        if !config.path.exists() {
            info!("Creating storage directory at: {}", config.path.display());
            fs::create_dir_all(&config.path)?;
        }

        let env = Environment::new()
            .set_max_dbs(1)
            .set_map_size(config.map_size)
            .open(&config.path)?;
        let db = env.create_db(Some(config.database_name.as_str()), DatabaseFlags::empty())?;

        info!(
            "Opened LMDB environment at {} (database '{}')",
            config.path.display(),
            config.database_name
        );

        Ok(Self { env, db, path: config.path.clone() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes pending writes and releases the environment.
    pub fn close_database(self) -> Result<(), AppResponse> {
        if let Err(e) = self.env.sync(true) {
            warn!("Failed to sync LMDB environment at {}: {}", self.path.display(), e);
            return Err(AppResponse::from(e));
        }
        info!("Closed LMDB environment at {}", self.path.display());
        Ok(())
    }
}

impl DocumentStorage for AppDbState {
    fn read(&self, key: &str) -> Result<Option<String>, AppResponse> {
        let txn = self.env.begin_ro_txn()?;
        let bytes = match txn.get(self.db, &key) {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(lmdb::Error::NotFound) => None,
            Err(e) => return Err(AppResponse::from(e)),
        };
        txn.commit()?;

        // An undecodable value cannot hold a document; it reads as absent.
        match bytes.map(String::from_utf8) {
            None => Ok(None),
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(e)) => {
                warn!("Value under '{}' is not valid UTF-8, treating it as corrupt: {}", key, e);
                Ok(None)
            }
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), AppResponse> {
        self.write_bytes(key, value.as_bytes())
    }
}

impl AppDbState {
    pub(crate) fn write_bytes(&self, key: &str, value: &[u8]) -> Result<(), AppResponse> {
        let mut txn = self.env.begin_rw_txn()?;
        txn.put(self.db, &key, &value, WriteFlags::empty())?;
        txn.commit()?;
        debug!("Wrote {} bytes under '{}'", value.len(), key);
        Ok(())
    }
}
