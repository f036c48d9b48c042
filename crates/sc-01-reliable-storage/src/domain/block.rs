//! # Persistent Block
//!
//! The binary unit of durable storage. One block holds the latest stored
//! version of one object.
//!
//! ## Layout (write order, little-endian)
//!
//! ```text
//! begin_marker:i32 | primary_key:str | last_tx_id:i32 | status:i32 | last_tx_id:i32
//! | used_size:i32 | reserved_size:i32 | payload[used] | padding[reserved-used]
//! | hash:i32 | end_marker:i32
//! ```
//!
//! The transaction id is written twice. The second copy is never read back
//! but must stay in the layout for file compatibility.
//!
//! ## Hash
//!
//! `compute_hash` is a multiplicative rolling hash over 4-byte groups. It
//! detects torn or scrambled writes; it is not tamper-resistant. Trailing
//! 1-3 payload bytes are not covered, which existing files depend on.

use std::io::{self, Read, Write};

use super::codec::{self, Field};
use super::errors::{CorruptionKind, StorageError};

/// Sentinel opening every block.
pub const BEGIN_MARKER: i32 = 0x5555_5555;

/// Sentinel closing every block.
pub const END_MARKER: i32 = 0x4444_4444;

/// Primary key of synthetic blocks covering repaired regions.
pub const DIRTY_KEY: &str = "#";

/// Smallest block `make_dirty_block` can produce (key `#`, one payload byte).
pub const MIN_DIRTY_BLOCK_SIZE: u64 = 35;

/// Life-cycle state of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum BlockStatus {
    /// Holds the live copy of its key.
    Active = 0,
    /// Logically deleted, space reclaimed by compaction.
    Deleted = 1,
    /// Superseded copy or repaired garbage.
    Dirty = 2,
}

impl BlockStatus {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(BlockStatus::Active),
            1 => Some(BlockStatus::Deleted),
            2 => Some(BlockStatus::Dirty),
            _ => None,
        }
    }
}

/// Hash over the payload, 4 bytes at a time:
/// `h = 31^4*h + 31^3*b0 + 31^2*b1 + 31*b2 + b3`.
pub fn compute_hash(data: &[u8]) -> i32 {
    const P1: i32 = 31;
    const P2: i32 = 31 * 31;
    const P3: i32 = 31 * 31 * 31;
    const P4: i32 = 31 * 31 * 31 * 31;

    data.chunks_exact(4).fold(0i32, |hash, group| {
        hash.wrapping_mul(P4)
            .wrapping_add(P3.wrapping_mul(i32::from(group[0])))
            .wrapping_add(P2.wrapping_mul(i32::from(group[1])))
            .wrapping_add(P1.wrapping_mul(i32::from(group[2])))
            .wrapping_add(i32::from(group[3]))
    })
}

/// Result of parsing bytes at a given offset.
#[derive(Debug)]
pub enum BlockRead {
    /// A block was parsed. It may still fail `is_valid_block`.
    Block(PersistentBlock),
    /// The stream ended exactly at the offset.
    EndOfStream,
    /// The bytes cannot be parsed as a block at all.
    Unparseable(CorruptionKind),
}

/// One durable record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentBlock {
    pub primary_key: String,
    pub last_transaction_id: i32,
    pub status: BlockStatus,
    pub used_data_size: i32,
    pub reserved_data_size: i32,
    pub hash: i32,
    raw_data: Vec<u8>,

    /// Position in the file (computed, not persisted).
    pub offset: u64,
    /// Bytes occupied on disk (computed, not persisted).
    pub storage_size: u64,

    begin_marker_ok: bool,
    end_marker_ok: bool,
    hash_ok: bool,
}

impl PersistentBlock {
    /// Build an active block whose reserved size equals its payload size.
    pub fn new(data: &[u8], primary_key: &str, transaction_id: i32) -> Self {
        let used = data.len() as i32;
        let mut block = Self {
            primary_key: primary_key.to_string(),
            last_transaction_id: transaction_id,
            status: BlockStatus::Active,
            used_data_size: used,
            reserved_data_size: used,
            hash: compute_hash(data),
            raw_data: data.to_vec(),
            offset: 0,
            storage_size: 0,
            begin_marker_ok: true,
            end_marker_ok: true,
            hash_ok: true,
        };
        block.storage_size = block.on_disk_size();
        block
    }

    /// Synthetic dirty block occupying exactly `size` bytes on disk.
    ///
    /// Returns `None` when `size` is below `MIN_DIRTY_BLOCK_SIZE`.
    pub fn make_dirty_block(size: u64) -> Option<Self> {
        if size < MIN_DIRTY_BLOCK_SIZE || size > i32::MAX as u64 {
            return None;
        }
        let mut block = Self::new(&[0u8], DIRTY_KEY, 0);
        block.status = BlockStatus::Dirty;
        block.reserved_data_size = (size - Self::overhead(DIRTY_KEY)) as i32;
        block.storage_size = size;
        Some(block)
    }

    /// Bytes taken by every field except payload and padding.
    pub fn overhead(primary_key: &str) -> u64 {
        (codec::string_size(primary_key) + 8 * 4) as u64
    }

    /// Total bytes this block occupies when written.
    pub fn on_disk_size(&self) -> u64 {
        Self::overhead(&self.primary_key) + self.reserved_data_size.max(0) as u64
    }

    /// Distance from the block start to its status field.
    pub fn status_field_offset(&self) -> u64 {
        // begin marker, key, transaction id
        4 + codec::string_size(&self.primary_key) as u64 + 4
    }

    /// Grow the reserved area. Smaller values than the used size are ignored.
    pub fn set_reserved_data_size(&mut self, reserved: i32) {
        self.reserved_data_size = reserved.max(self.used_data_size);
        self.storage_size = self.on_disk_size();
    }

    pub fn raw_data(&self) -> &[u8] {
        &self.raw_data
    }

    pub fn into_raw_data(self) -> Vec<u8> {
        self.raw_data
    }

    pub fn hash_ok(&self) -> bool {
        self.hash_ok
    }

    /// Both markers match and the payload hash matches.
    pub fn is_valid_block(&self) -> bool {
        self.begin_marker_ok && self.end_marker_ok && self.hash_ok
    }

    /// Serialize in file layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.on_disk_size() as usize);
        codec::put_i32(&mut buf, BEGIN_MARKER);
        codec::put_string(&mut buf, &self.primary_key);
        codec::put_i32(&mut buf, self.last_transaction_id);
        codec::put_i32(&mut buf, self.status as i32);
        codec::put_i32(&mut buf, self.last_transaction_id);
        codec::put_i32(&mut buf, self.used_data_size);
        codec::put_i32(&mut buf, self.reserved_data_size);
        buf.extend_from_slice(&self.raw_data);
        let padding = (self.reserved_data_size - self.used_data_size).max(0) as usize;
        buf.resize(buf.len() + padding, 0);
        codec::put_i32(&mut buf, self.hash);
        codec::put_i32(&mut buf, END_MARKER);
        buf
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_bytes())
    }

    /// Strict read: any failed check becomes a `BlockCorrupted` error.
    ///
    /// Returns `Ok(None)` when the stream ends exactly at `offset`.
    pub fn read<R: Read>(reader: &mut R, offset: u64) -> Result<Option<Self>, StorageError> {
        match Self::parse(reader, offset)? {
            BlockRead::EndOfStream => Ok(None),
            BlockRead::Unparseable(kind) => Err(StorageError::corrupted(offset, kind)),
            BlockRead::Block(block) => {
                if !block.end_marker_ok {
                    return Err(StorageError::corrupted(offset, CorruptionKind::EndMarker));
                }
                if !block.hash_ok {
                    return Err(StorageError::corrupted(offset, CorruptionKind::Hash));
                }
                Ok(Some(block))
            }
        }
    }

    /// Lenient read used for scan-ahead and update decisions.
    ///
    /// Only I/O errors are returned as errors; every validation failure is
    /// reported through `BlockRead`.
    pub fn parse<R: Read>(reader: &mut R, offset: u64) -> io::Result<BlockRead> {
        let begin = match codec::read_i32(reader)? {
            Field::Value(value) => value,
            Field::EndOfStream => return Ok(BlockRead::EndOfStream),
            Field::Truncated => return Ok(BlockRead::Unparseable(CorruptionKind::Incomplete)),
        };
        if begin != BEGIN_MARKER {
            return Ok(BlockRead::Unparseable(CorruptionKind::BeginMarker));
        }

        let primary_key = match codec::read_string(reader) {
            Ok(Some((key, _))) => key,
            Ok(None) => return Ok(BlockRead::Unparseable(CorruptionKind::Incomplete)),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Ok(BlockRead::Unparseable(CorruptionKind::ImpossibleSize))
            }
            Err(e) => return Err(e),
        };

        let mut header = [0i32; 5];
        for field in header.iter_mut() {
            match codec::read_i32(reader)? {
                Field::Value(value) => *field = value,
                _ => return Ok(BlockRead::Unparseable(CorruptionKind::Incomplete)),
            }
        }
        let [last_transaction_id, raw_status, _duplicated_tx_id, used, reserved] = header;

        let Some(status) = BlockStatus::from_i32(raw_status) else {
            return Ok(BlockRead::Unparseable(CorruptionKind::ImpossibleSize));
        };
        if used < 0 || reserved < used {
            return Ok(BlockRead::Unparseable(CorruptionKind::ImpossibleSize));
        }

        let Some(raw_data) = codec::read_bytes(reader, used as usize)? else {
            return Ok(BlockRead::Unparseable(CorruptionKind::Incomplete));
        };
        let padding = (reserved - used) as u64;
        if io::copy(&mut reader.by_ref().take(padding), &mut io::sink())? != padding {
            return Ok(BlockRead::Unparseable(CorruptionKind::Incomplete));
        }

        let hash = match codec::read_i32(reader)? {
            Field::Value(value) => value,
            _ => return Ok(BlockRead::Unparseable(CorruptionKind::Incomplete)),
        };
        let end = match codec::read_i32(reader)? {
            Field::Value(value) => value,
            _ => return Ok(BlockRead::Unparseable(CorruptionKind::Incomplete)),
        };

        let hash_ok = compute_hash(&raw_data) == hash;
        let storage_size = Self::overhead(&primary_key) + reserved as u64;

        Ok(BlockRead::Block(Self {
            primary_key,
            last_transaction_id,
            status,
            used_data_size: used,
            reserved_data_size: reserved,
            hash,
            raw_data,
            offset,
            storage_size,
            begin_marker_ok: true,
            end_marker_ok: end == END_MARKER,
            hash_ok,
        }))
    }
}
