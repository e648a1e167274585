//! Single-file persistence for a [`VectorStore`].
//!
//! This module only serializes and deserializes stores; it has no notion of
//! searching or projection.
//!
//! # Storage Format
//!
//! All integers and floats little-endian:
//! - Header (16 bytes): magic `NSIX`, version, dimension, entry count
//! - Entries, in insertion order: `u32` id byte length, UTF-8 id bytes,
//!   then `dimension` f32 values
//!
//! A dimension of 0 is only valid with zero entries (an empty store that
//! never fixed its dimension). The file must be consumed exactly.
//!
//! # Atomicity
//!
//! Writes go to a temporary file in the destination directory, are synced,
//! and are then renamed over the destination. Readers see either the old
//! file or the complete new one.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use memmap2::MmapOptions;
use tracing::debug;

use crate::error::{IndexError, IndexResult};
use crate::vector::store::VectorStore;
use crate::vector::types::{IndexEntry, VectorDimension};

/// Current storage format version.
const STORAGE_VERSION: u32 = 1;

/// Size of the storage header in bytes.
const HEADER_SIZE: usize = 16;

/// Magic bytes to identify vector store files.
const MAGIC_BYTES: &[u8; 4] = b"NSIX";

/// Number of bytes per f32 value.
pub(crate) const BYTES_PER_F32: usize = 4;

/// Number of bytes in an id length prefix.
const BYTES_PER_LEN: usize = 4;

/// Forward-only little-endian reader over a byte slice.
pub(crate) struct ByteCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub(crate) fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.offset.checked_add(len)?;
        let slice = self.bytes.get(self.offset..end)?;
        self.offset = end;
        Some(slice)
    }

    pub(crate) fn read_u32(&mut self) -> Option<u32> {
        let b = self.take(4)?;
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn read_f32_vec(&mut self, count: usize) -> Option<Vec<f32>> {
        let bytes = self.take(count.checked_mul(BYTES_PER_F32)?)?;
        Some(
            bytes
                .chunks_exact(BYTES_PER_F32)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        )
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }
}

/// Writes `store` to `path`, replacing any existing file atomically.
///
/// Parent directories are created as needed. On failure the destination is
/// left as it was and the temporary file is removed.
pub fn write_store(path: impl AsRef<Path>, store: &VectorStore) -> IndexResult<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    std::fs::create_dir_all(parent).map_err(|e| IndexError::io(parent, e))?;

    let mut temp = tempfile::Builder::new()
        .prefix(".nearshot-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| IndexError::io(parent, e))?;

    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        encode_store(store, &mut writer).map_err(|e| IndexError::io(path, e))?;
        writer.flush().map_err(|e| IndexError::io(path, e))?;
    }
    temp.as_file()
        .sync_all()
        .map_err(|e| IndexError::io(path, e))?;

    temp.persist(path)
        .map_err(|e| IndexError::io(path, e.error))?;

    debug!(
        "Wrote {} entries (dimension {:?}) to {}",
        store.len(),
        store.dimension().map(|d| d.get()),
        path.display()
    );

    Ok(())
}

/// Reads a store from `path`.
///
/// `expected` is the dimension the caller requires, if it has one. A missing
/// or unreadable file is [`IndexError::Io`]; anything structurally wrong,
/// including a dimension other than `expected`, is [`IndexError::Format`].
pub fn read_store(
    path: impl AsRef<Path>,
    expected: Option<VectorDimension>,
) -> IndexResult<VectorStore> {
    let path = path.as_ref();

    let file = File::open(path).map_err(|e| IndexError::io(path, e))?;
    let file_len = file.metadata().map_err(|e| IndexError::io(path, e))?.len() as usize;

    if file_len < HEADER_SIZE {
        return Err(IndexError::format(
            path,
            "File too small to contain header",
        ));
    }

    // SAFETY: the map is dropped before this function returns and nothing
    // in this process writes to the file meanwhile; writers replace it by
    // rename instead of editing in place.
    let mmap = unsafe { MmapOptions::new().map(&file) }.map_err(|e| IndexError::io(path, e))?;

    let store = decode_store(&mmap, expected).map_err(|reason| IndexError::format(path, reason))?;

    debug!(
        "Read {} entries (dimension {:?}) from {}",
        store.len(),
        store.dimension().map(|d| d.get()),
        path.display()
    );

    Ok(store)
}

/// Serializes a store into `writer`.
pub fn encode_store(store: &VectorStore, writer: &mut impl Write) -> io::Result<()> {
    let count = u32::try_from(store.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many entries"))?;
    let dimension = store.dimension().map_or(0, |d| d.get());
    let dimension = u32::try_from(dimension)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "dimension too large"))?;

    writer.write_all(MAGIC_BYTES)?;
    writer.write_all(&STORAGE_VERSION.to_le_bytes())?;
    writer.write_all(&dimension.to_le_bytes())?;
    writer.write_all(&count.to_le_bytes())?;

    for entry in store.entries() {
        let id = entry.id.as_bytes();
        let id_len = u32::try_from(id.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "identifier too long"))?;

        writer.write_all(&id_len.to_le_bytes())?;
        writer.write_all(id)?;
        for &value in &entry.vector {
            writer.write_all(&value.to_le_bytes())?;
        }
    }

    Ok(())
}

/// Parses a serialized store, validating it against `expected`.
pub fn decode_store(bytes: &[u8], expected: Option<VectorDimension>) -> Result<VectorStore, String> {
    let mut cursor = ByteCursor::new(bytes);

    let magic = cursor.take(4).ok_or("File too small to contain header")?;
    if magic != MAGIC_BYTES {
        return Err("Invalid magic bytes".to_string());
    }

    let version = cursor.read_u32().ok_or("Truncated header")?;
    if version != STORAGE_VERSION {
        return Err(format!(
            "Unsupported version {version}, expected {STORAGE_VERSION}"
        ));
    }

    let dimension = cursor.read_u32().ok_or("Truncated header")? as usize;
    let count = cursor.read_u32().ok_or("Truncated header")? as usize;

    let file_dimension = match (dimension, count) {
        (0, 0) => None,
        (0, _) => return Err(format!("Dimension 0 with {count} entries")),
        (d, _) => Some(VectorDimension::new(d).map_err(|e| e.to_string())?),
    };

    let dimension = match (expected, file_dimension) {
        (Some(expected), Some(found)) if expected != found => {
            return Err(format!(
                "Dimension mismatch: index expects {expected}, file holds {found}"
            ));
        }
        (Some(expected), _) => Some(expected),
        (None, found) => found,
    };

    // Each entry needs at least its length prefix and vector
    let min_entry_size = BYTES_PER_LEN + file_dimension.map_or(0, |d| d.get()) * BYTES_PER_F32;
    let capacity = count.min(cursor.remaining() / min_entry_size.max(1));
    let mut entries = Vec::with_capacity(capacity);

    for position in 0..count {
        let id_len = cursor
            .read_u32()
            .ok_or_else(|| format!("Truncated entry {position}"))? as usize;
        let id_bytes = cursor
            .take(id_len)
            .ok_or_else(|| format!("Truncated identifier in entry {position}"))?;
        let id = std::str::from_utf8(id_bytes)
            .map_err(|e| format!("Identifier in entry {position} is not UTF-8: {e}"))?;
        let vector = cursor
            .read_f32_vec(file_dimension.map_or(0, |d| d.get()))
            .ok_or_else(|| format!("Truncated vector in entry {position}"))?;

        entries.push(IndexEntry::new(id, vector));
    }

    if cursor.remaining() != 0 {
        return Err(format!(
            "{} trailing bytes after {count} entries",
            cursor.remaining()
        ));
    }

    VectorStore::from_entries(dimension, entries).map_err(|e| e.to_string())
}
