//! Persistence configuration and the working-directory layout.
//!
//! ```text
//! <working_directory>/
//!   schema.json
//!   sequence.json
//!   data/
//!     datastore.bin
//!     transaction_log.bin
//!     fulltext_hints.json
//!     LOCK
//!   rollback/            (only during a staged import)
//! <backup_directory>/datastore.bin
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sc_01_reliable_storage::adapters::lock::DEFAULT_LOCK_TIMEOUT;
use serde::{Deserialize, Serialize};

use super::errors::PersistenceError;

pub const DATA_DIRECTORY: &str = "data";
pub const STORAGE_FILE: &str = "datastore.bin";
pub const TRANSACTION_LOG_FILE: &str = "transaction_log.bin";
pub const SCHEMA_FILE: &str = "schema.json";
pub const SEQUENCE_FILE: &str = "sequence.json";
pub const ROLLBACK_DIRECTORY: &str = "rollback";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub working_directory: PathBuf,
    /// Directory of the mirrored storage file; no mirror when `None`.
    pub backup_directory: Option<PathBuf>,
    /// Delay applied to two-stage transactions.
    pub two_stage_delay_ms: i32,
    /// Hold an exclusive lock on the data directory while running.
    pub lock_data_directory: bool,
    /// How long startup waits for another holder of the lock.
    pub lock_timeout_ms: u64,
    /// Tries per transaction before the apply thread halts on it.
    pub apply_attempts: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            working_directory: PathBuf::from("."),
            backup_directory: None,
            two_stage_delay_ms: 300,
            lock_data_directory: true,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT.as_millis() as u64,
            apply_attempts: 3,
        }
    }
}

impl PersistenceConfig {
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SC_WORKING_DIRECTORY`: working directory (default: `.`)
    /// - `SC_BACKUP_DIRECTORY`: backup directory (default: none)
    /// - `SC_TWO_STAGE_DELAY_MS`: two-stage delay (default: 300)
    /// - `SC_LOCK_DATA_DIRECTORY`: lock the data directory (default: true)
    /// - `SC_LOCK_TIMEOUT_MS`: lock wait (default: 30000)
    /// - `SC_APPLY_ATTEMPTS`: tries per failing transaction (default: 3)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            working_directory: env::var("SC_WORKING_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or(defaults.working_directory),

            backup_directory: env::var("SC_BACKUP_DIRECTORY")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),

            two_stage_delay_ms: env::var("SC_TWO_STAGE_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.two_stage_delay_ms),

            lock_data_directory: env::var("SC_LOCK_DATA_DIRECTORY")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(defaults.lock_data_directory),

            lock_timeout_ms: env::var("SC_LOCK_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.lock_timeout_ms),

            apply_attempts: env::var("SC_APPLY_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.apply_attempts),
        }
    }

    pub fn with_backup_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.backup_directory = Some(directory.into());
        self
    }

    pub fn with_two_stage_delay_ms(mut self, delay_ms: i32) -> Self {
        self.two_stage_delay_ms = delay_ms;
        self
    }

    pub fn with_lock_data_directory(mut self, lock: bool) -> Self {
        self.lock_data_directory = lock;
        self
    }

    pub fn with_lock_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    pub fn with_apply_attempts(mut self, attempts: u32) -> Self {
        self.apply_attempts = attempts;
        self
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), PersistenceError> {
        if self.two_stage_delay_ms < 0 {
            return Err(PersistenceError::InvalidConfig(format!(
                "two_stage_delay_ms must not be negative, got {}",
                self.two_stage_delay_ms
            )));
        }
        if self.apply_attempts == 0 {
            return Err(PersistenceError::InvalidConfig(
                "apply_attempts must be at least 1".to_string(),
            ));
        }
        if let Some(backup) = &self.backup_directory {
            if backup == &self.data_directory() {
                return Err(PersistenceError::InvalidConfig(
                    "backup directory must differ from the data directory".to_string(),
                ));
            }
        }
        Ok(())
    }

    // =========================================================================
    // PATHS
    // =========================================================================

    pub fn data_directory(&self) -> PathBuf {
        self.working_directory.join(DATA_DIRECTORY)
    }

    pub fn storage_path(&self) -> PathBuf {
        self.data_directory().join(STORAGE_FILE)
    }

    pub fn transaction_log_path(&self) -> PathBuf {
        self.data_directory().join(TRANSACTION_LOG_FILE)
    }

    pub fn schema_path(&self) -> PathBuf {
        self.working_directory.join(SCHEMA_FILE)
    }

    pub fn sequence_path(&self) -> PathBuf {
        self.working_directory.join(SEQUENCE_FILE)
    }

    pub fn backup_storage_path(&self) -> Option<PathBuf> {
        self.backup_directory
            .as_deref()
            .map(|directory| directory.join(STORAGE_FILE))
    }

    pub fn rollback_directory(&self) -> PathBuf {
        self.working_directory.join(ROLLBACK_DIRECTORY)
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }
}
