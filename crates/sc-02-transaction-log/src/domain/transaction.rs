//! # Transaction Records
//!
//! ## File layout (`transaction_log.bin`, little-endian)
//!
//! ```text
//! header:  last_offset:i64                      (end of the last complete record)
//! record:  status:i32 | timestamp_ticks:i64 | len:i32 | payload[len]
//!          | offset:i64 | id:i64 | delay_ms:i32 | end_marker:i64 (0xABCD)
//! ```
//!
//! Timestamps are 100ns ticks since 0001-01-01 UTC. The status field comes
//! first so a state change is a 4-byte rewrite at the record offset.

use std::fmt;
use std::io::{self, Read};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::errors::TransactionLogError;

/// Size of the file header holding the last offset.
pub const HEADER_SIZE: u64 = 8;

/// Sentinel closing every record.
pub const RECORD_END_MARKER: i64 = 0xABCD;

/// Bytes of a record besides its payload.
pub const RECORD_OVERHEAD: u64 = 4 + 8 + 4 + 8 + 8 + 4 + 8;

/// Ticks between 0001-01-01 and the Unix epoch.
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TransactionStatus {
    ToProcess = 0,
    Processing = 1,
    Processed = 2,
    Canceled = 3,
}

impl TransactionStatus {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(TransactionStatus::ToProcess),
            1 => Some(TransactionStatus::Processing),
            2 => Some(TransactionStatus::Processed),
            3 => Some(TransactionStatus::Canceled),
            _ => None,
        }
    }

    /// Still waiting in the queue after a reload.
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            TransactionStatus::ToProcess | TransactionStatus::Processing
        )
    }

    /// Allowed state machine edges.
    pub fn can_move_to(self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (ToProcess, Processing)
                | (ToProcess, Canceled)
                | (Processing, Processed)
                | (Processing, ToProcess)
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TransactionStatus::ToProcess => "ToProcess",
            TransactionStatus::Processing => "Processing",
            TransactionStatus::Processed => "Processed",
            TransactionStatus::Canceled => "Canceled",
        };
        f.write_str(text)
    }
}

pub fn ticks_from_system_time(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since) => UNIX_EPOCH_TICKS + (since.as_nanos() / 100) as i64,
        Err(before) => UNIX_EPOCH_TICKS - (before.duration().as_nanos() / 100) as i64,
    }
}

pub fn system_time_from_ticks(ticks: i64) -> SystemTime {
    let relative = ticks - UNIX_EPOCH_TICKS;
    let magnitude = Duration::from_nanos(relative.unsigned_abs().saturating_mul(100));
    if relative >= 0 {
        UNIX_EPOCH + magnitude
    } else {
        UNIX_EPOCH - magnitude
    }
}

/// One logged transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionData {
    /// Process-wide monotonic id.
    pub id: i64,
    /// Enqueue time in ticks.
    pub timestamp: i64,
    /// Opaque payload supplied by the caller.
    pub data: Vec<u8>,
    /// Record position in the log file.
    pub offset: u64,
    /// Delay before the transaction may be applied; 0 applies immediately.
    pub delay_ms: i32,
    pub status: TransactionStatus,
}

impl TransactionData {
    pub fn is_delayed(&self) -> bool {
        self.delay_ms > 0
    }

    pub fn enqueued_at(&self) -> SystemTime {
        system_time_from_ticks(self.timestamp)
    }

    /// Delay left at `now`; zero once it has elapsed.
    pub fn remaining_delay(&self, now: SystemTime) -> Duration {
        let delay = Duration::from_millis(self.delay_ms.max(0) as u64);
        let elapsed = now.duration_since(self.enqueued_at()).unwrap_or_default();
        delay.saturating_sub(elapsed)
    }

    pub fn record_size(&self) -> u64 {
        RECORD_OVERHEAD + self.data.len() as u64
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.record_size() as usize);
        buf.extend_from_slice(&(self.status as i32).to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&(self.data.len() as i32).to_le_bytes());
        buf.extend_from_slice(&self.data);
        buf.extend_from_slice(&(self.offset as i64).to_le_bytes());
        buf.extend_from_slice(&self.id.to_le_bytes());
        buf.extend_from_slice(&self.delay_ms.to_le_bytes());
        buf.extend_from_slice(&RECORD_END_MARKER.to_le_bytes());
        buf
    }

    /// Decode the record that starts at `offset`.
    pub fn decode<R: Read>(reader: &mut R, offset: u64) -> Result<Self, TransactionLogError> {
        let truncated = |e: io::Error| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                TransactionLogError::corrupted(offset, "truncated record")
            } else {
                TransactionLogError::Io(e)
            }
        };

        let raw_status = read_i32(reader).map_err(truncated)?;
        let status = TransactionStatus::from_i32(raw_status).ok_or_else(|| {
            TransactionLogError::corrupted(offset, format!("unknown status {}", raw_status))
        })?;
        let timestamp = read_i64(reader).map_err(truncated)?;
        let len = read_i32(reader).map_err(truncated)?;
        if len < 0 {
            return Err(TransactionLogError::corrupted(
                offset,
                format!("negative payload length {}", len),
            ));
        }
        let mut data = Vec::new();
        reader.by_ref().take(len as u64).read_to_end(&mut data)?;
        if data.len() != len as usize {
            return Err(TransactionLogError::corrupted(offset, "truncated payload"));
        }
        let stored_offset = read_i64(reader).map_err(truncated)?;
        let id = read_i64(reader).map_err(truncated)?;
        let delay_ms = read_i32(reader).map_err(truncated)?;
        let end = read_i64(reader).map_err(truncated)?;

        if end != RECORD_END_MARKER {
            return Err(TransactionLogError::corrupted(offset, "end marker mismatch"));
        }
        if stored_offset != offset as i64 {
            return Err(TransactionLogError::corrupted(
                offset,
                format!("record claims offset {}", stored_offset),
            ));
        }

        Ok(Self {
            id,
            timestamp,
            data,
            offset,
            delay_ms,
            status,
        })
    }
}

fn read_i32<R: Read>(reader: &mut R) -> io::Result<i32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(i32::from_le_bytes(bytes))
}

fn read_i64<R: Read>(reader: &mut R) -> io::Result<i64> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes)?;
    Ok(i64::from_le_bytes(bytes))
}
