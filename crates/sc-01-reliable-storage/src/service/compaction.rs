//! # Compaction
//!
//! Rewrites `datastore.bin` with the indexed active blocks only, in file
//! order, through a temp file that replaces the original by rename.
//! Must not run concurrently with writes.

use std::io::BufWriter;

use sc_telemetry::{log_event, logging::subsystems, STORAGE_COMPACTIONS};

use super::*;

impl ReliableStorage {
    pub(crate) fn compact(&mut self) -> Result<(), StorageError> {
        // An unscanned index would drop every block.
        if !self.loaded {
            self.load_local(false)?;
        }
        let before = self.storage_size()?;
        let temp_path = self.temp_path();

        let mut live: Vec<(String, BlockLocation)> = self
            .index
            .iter()
            .filter(|(_, location)| location.is_active())
            .map(|(key, location)| (key.clone(), *location))
            .collect();
        live.sort_by_key(|(_, location)| location.offset);

        let mut new_index = HashMap::with_capacity(live.len());
        {
            let mut writer = BufWriter::new(File::create(&temp_path)?);
            let mut offset = 0u64;
            for (key, location) in live {
                let block = self
                    .read_at(location.offset)?
                    .ok_or_else(|| StorageError::KeyNotFound(key.clone()))?;
                writer.write_all(&block.to_bytes())?;
                new_index.insert(
                    key,
                    BlockLocation {
                        offset,
                        ..location
                    },
                );
                offset += block.storage_size;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        // Windows cannot rename over an open file.
        self.file = None;
        let renamed = fs::rename(&temp_path, &self.path);
        self.file = Some(open_data_file(&self.path)?);
        renamed?;
        self.index = new_index;
        self.inactive_blocks = 0;

        if let Some(backup) = self.backup.as_mut() {
            backup.compact()?;
        }

        metric_inc!(STORAGE_COMPACTIONS);
        log_event!(
            info,
            subsystems::STORAGE,
            "Storage compacted",
            path = %self.path.display(),
            bytes_before = before,
            bytes_after = self.storage_size()?,
            blocks = self.index.len()
        );
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
