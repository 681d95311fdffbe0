//! Record codec
//!
//! Fixed 24-byte big-endian layout:
//! `correction:i64 | wall_clock_save_time:i64 | state_tag:i32 | checksum:u32`.
//! The checksum XOR-folds the five 32-bit payload words into a fixed seed.
//! It is weak (order-insensitive) and kept only for format compatibility.

use crate::error::DecodeError;
use crate::models::{LifecycleState, PersistedRecord};

/// Length of the payload covered by the checksum
pub const PAYLOAD_LEN: usize = 20;
/// Total encoded length
pub const RECORD_LEN: usize = PAYLOAD_LEN + 4;

const CHECKSUM_SEED: u32 = 0xFFAA_BBCC;

/// Encode a record into its on-disk form
pub fn encode(record: &PersistedRecord) -> [u8; RECORD_LEN] {
    let mut buf = [0u8; RECORD_LEN];
    buf[0..8].copy_from_slice(&record.correction.to_be_bytes());
    buf[8..16].copy_from_slice(&record.wall_clock_save_time.to_be_bytes());
    buf[16..20].copy_from_slice(&record.state.tag().to_be_bytes());

    let checksum = checksum(&buf[..PAYLOAD_LEN]);
    buf[PAYLOAD_LEN..].copy_from_slice(&checksum.to_be_bytes());
    buf
}

/// Decode and verify a record
///
/// Only the first [`RECORD_LEN`] bytes are considered.
pub fn decode(bytes: &[u8]) -> Result<PersistedRecord, DecodeError> {
    if bytes.len() < RECORD_LEN {
        return Err(DecodeError::Truncated(bytes.len()));
    }

    let stored = read_u32(bytes, PAYLOAD_LEN);
    let computed = checksum(&bytes[..PAYLOAD_LEN]);
    if stored != computed {
        return Err(DecodeError::Integrity { stored, computed });
    }

    let tag = read_u32(bytes, 16) as i32;
    let state = LifecycleState::from_tag(tag).ok_or(DecodeError::InvalidStateTag(tag))?;

    Ok(PersistedRecord {
        correction: read_i64(bytes, 0),
        wall_clock_save_time: read_i64(bytes, 8),
        state,
    })
}

/// XOR-fold of big-endian 32-bit words, seeded with `0xFFAABBCC`
pub fn checksum(payload: &[u8]) -> u32 {
    payload
        .chunks_exact(4)
        .map(|word| u32::from_be_bytes([word[0], word[1], word[2], word[3]]))
        .fold(CHECKSUM_SEED, |acc, word| acc ^ word)
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[at..at + 4]);
    u32::from_be_bytes(word)
}

fn read_i64(bytes: &[u8], at: usize) -> i64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[at..at + 8]);
    i64::from_be_bytes(word)
}
