//! DCTX container: magic, version, CRC32 of the body, then a bincode body.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{BinaryDictionary, DictError};

pub(crate) const MAGIC: &[u8; 4] = b"DCTX";
pub(crate) const VERSION: u8 = 1;
/// magic(4) + version(1) + crc32(4)
pub(crate) const HEADER_SIZE: usize = 9;

pub(crate) fn encode<T: Serialize>(body: &T) -> Result<Vec<u8>, DictError> {
    let body = bincode::serialize(body).map_err(DictError::Serialize)?;
    let mut buf = Vec::with_capacity(HEADER_SIZE + body.len());
    buf.extend_from_slice(MAGIC);
    buf.push(VERSION);
    buf.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
    buf.extend_from_slice(&body);
    Ok(buf)
}

pub(crate) fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, DictError> {
    if data.len() < 5 {
        return Err(DictError::InvalidHeader);
    }
    if &data[..4] != MAGIC {
        return Err(DictError::InvalidMagic);
    }
    if data[4] != VERSION {
        return Err(DictError::UnsupportedVersion(data[4]));
    }
    if data.len() < HEADER_SIZE {
        return Err(DictError::InvalidHeader);
    }
    let mut crc = [0u8; 4];
    crc.copy_from_slice(&data[5..HEADER_SIZE]);
    let expected = u32::from_le_bytes(crc);
    let body = &data[HEADER_SIZE..];
    let actual = crc32fast::hash(body);
    if expected != actual {
        return Err(DictError::ChecksumMismatch { expected, actual });
    }
    bincode::deserialize(body).map_err(DictError::Deserialize)
}

/// Concatenates several dictionaries into one blob. Returns the blob and the
/// `(offset, length)` of each dictionary inside it, in input order.
pub fn pack(dicts: &[&BinaryDictionary]) -> Result<(Vec<u8>, Vec<(u64, u64)>), DictError> {
    let mut blob = Vec::new();
    let mut ranges = Vec::with_capacity(dicts.len());
    for dict in dicts {
        let bytes = dict.to_bytes()?;
        ranges.push((blob.len() as u64, bytes.len() as u64));
        blob.extend_from_slice(&bytes);
    }
    Ok((blob, ranges))
}
