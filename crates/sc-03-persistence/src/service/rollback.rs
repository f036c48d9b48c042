//! # Directory Rollback
//!
//! Staged imports move the current data aside before writing new data, then
//! either restore it or delete it. Whole directories and files are moved, so
//! the engine must be stopped around every call.
//!
//! ```text
//! store_data_for_rollback:  data/, schema.json, sequence.json -> rollback/
//! rollback_data:            rollback/* -> working directory (current data discarded)
//! delete_rollback_data:     rm -r rollback/
//! ```

use std::fs;
use std::path::Path;

use sc_telemetry::{log_event, logging::subsystems};

use crate::domain::config::{PersistenceConfig, DATA_DIRECTORY, SCHEMA_FILE, SEQUENCE_FILE};
use crate::domain::errors::PersistenceError;

const MOVED_ENTRIES: [&str; 3] = [DATA_DIRECTORY, SCHEMA_FILE, SEQUENCE_FILE];

/// Move the current data aside and leave an empty data directory.
pub fn store_data_for_rollback(config: &PersistenceConfig) -> Result<(), PersistenceError> {
    let rollback = config.rollback_directory();
    remove_path(&rollback)?;
    fs::create_dir_all(&rollback).map_err(|e| rollback_error("create", &rollback, e))?;

    for entry in MOVED_ENTRIES {
        move_path(&config.working_directory.join(entry), &rollback.join(entry))?;
    }
    fs::create_dir_all(config.data_directory())?;

    log_event!(
        info,
        subsystems::PERSISTENCE,
        "Data stored for rollback",
        rollback_directory = %rollback.display()
    );
    Ok(())
}

/// Discard the current data and restore what `store_data_for_rollback` moved.
pub fn rollback_data(config: &PersistenceConfig) -> Result<(), PersistenceError> {
    let rollback = config.rollback_directory();
    if !rollback.is_dir() {
        return Err(PersistenceError::Rollback(format!(
            "no rollback data in {}",
            rollback.display()
        )));
    }

    for entry in MOVED_ENTRIES {
        let current = config.working_directory.join(entry);
        remove_path(&current)?;
        move_path(&rollback.join(entry), &current)?;
    }
    remove_path(&rollback)?;

    log_event!(
        warn,
        subsystems::PERSISTENCE,
        "Data rolled back",
        working_directory = %config.working_directory.display()
    );
    Ok(())
}

/// Forget the moved-aside data once an import succeeded.
pub fn delete_rollback_data(config: &PersistenceConfig) -> Result<(), PersistenceError> {
    remove_path(&config.rollback_directory())
}

fn move_path(from: &Path, to: &Path) -> Result<(), PersistenceError> {
    if !from.exists() {
        return Ok(());
    }
    fs::rename(from, to).map_err(|e| rollback_error("move", from, e))
}

fn remove_path(path: &Path) -> Result<(), PersistenceError> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else if path.exists() {
        fs::remove_file(path)
    } else {
        return Ok(());
    };
    result.map_err(|e| rollback_error("remove", path, e))
}

fn rollback_error(action: &str, path: &Path, e: std::io::Error) -> PersistenceError {
    PersistenceError::Rollback(format!("cannot {} {}: {}", action, path.display(), e))
}
