//! Baseline and chunk file framing.
//!
//! Both files are gzip streams: an 8-byte magic, a bincode header, then
//! `count` bincode bodies (records for a baseline, entries for a chunk).

use crate::checksum::{DigestWriter, FileDigests};
use crate::error::{PackError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use repodex_core::{ArtifactCoordinate, ArtifactRecord, StoreEntry};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Version of the baseline/chunk/manifest formats.
pub const PACK_FORMAT_VERSION: u32 = 1;

pub const BASELINE_MAGIC: &[u8; 8] = b"RPDXBASE";
pub const CHUNK_MAGIC: &[u8; 8] = b"RPDXCHNK";

pub const MANIFEST_FILE: &str = "repodex-index.manifest.json";

/// Each publish writes its baseline under a fresh name, so the file the
/// current manifest points at is never overwritten.
pub fn baseline_file_name(generation: u64) -> String {
    format!("repodex-index.baseline-{generation}.gz")
}

pub fn chunk_file_name(chunk_id: u64) -> String {
    format!("repodex-index.{chunk_id}.gz")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineHeader {
    pub format_version: u32,
    pub repository_id: String,
    pub record_count: u64,
    /// Store high-water mark at export time.
    pub high_water: u64,
    /// Newest chunk whose changes the baseline already contains.
    pub chunk_id: Option<u64>,
    pub created_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkHeader {
    pub format_version: u32,
    pub repository_id: String,
    pub chunk_id: u64,
    /// Exclusive lower bound of the versions carried.
    pub from_version: u64,
    /// Inclusive upper bound of the versions carried.
    pub to_version: u64,
    pub entry_count: u64,
    pub created_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkOp {
    Upsert(ArtifactRecord),
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkEntry {
    pub coordinate: ArtifactCoordinate,
    pub record_version: u64,
    pub op: ChunkOp,
}

impl From<StoreEntry> for ChunkEntry {
    fn from(entry: StoreEntry) -> Self {
        match entry {
            StoreEntry::Live(record) => ChunkEntry {
                coordinate: record.coordinate.clone(),
                record_version: record.record_version,
                op: ChunkOp::Upsert(record),
            },
            StoreEntry::Tombstone {
                coordinate,
                record_version,
            } => ChunkEntry {
                coordinate,
                record_version,
                op: ChunkOp::Delete,
            },
        }
    }
}

impl From<ChunkEntry> for StoreEntry {
    fn from(entry: ChunkEntry) -> Self {
        match entry.op {
            ChunkOp::Upsert(record) => StoreEntry::Live(record),
            ChunkOp::Delete => StoreEntry::Tombstone {
                coordinate: entry.coordinate,
                record_version: entry.record_version,
            },
        }
    }
}

/// Headers shared by both file kinds.
pub trait PackHeader: Serialize + DeserializeOwned {
    const MAGIC: &'static [u8; 8];

    fn format_version(&self) -> u32;
    fn repository_id(&self) -> &str;
    fn body_count(&self) -> u64;
}

impl PackHeader for BaselineHeader {
    const MAGIC: &'static [u8; 8] = BASELINE_MAGIC;

    fn format_version(&self) -> u32 {
        self.format_version
    }

    fn repository_id(&self) -> &str {
        &self.repository_id
    }

    fn body_count(&self) -> u64 {
        self.record_count
    }
}

impl PackHeader for ChunkHeader {
    const MAGIC: &'static [u8; 8] = CHUNK_MAGIC;

    fn format_version(&self) -> u32 {
        self.format_version
    }

    fn repository_id(&self) -> &str {
        &self.repository_id
    }

    fn body_count(&self) -> u64 {
        self.entry_count
    }
}

/// Write a complete pack file and sync it to disk.
pub fn write_pack_file<H, B>(path: &Path, header: &H, bodies: &[B]) -> Result<FileDigests>
where
    H: PackHeader,
    B: Serialize,
{
    let io_err = |e| PackError::io(path, e);
    let file = File::create(path).map_err(io_err)?;
    let mut encoder = GzEncoder::new(DigestWriter::new(BufWriter::new(file)), Compression::default());

    encoder.write_all(H::MAGIC).map_err(io_err)?;
    bincode::serialize_into(&mut encoder, header).map_err(|e| encode_error(path, e))?;
    for body in bodies {
        bincode::serialize_into(&mut encoder, body).map_err(|e| encode_error(path, e))?;
    }

    let digest_writer = encoder.finish().map_err(io_err)?;
    let (buffered, digests) = digest_writer.finish();
    let file = buffered
        .into_inner()
        .map_err(|e| PackError::io(path, e.into_error()))?;
    file.sync_all().map_err(io_err)?;
    Ok(digests)
}

/// Write `bytes` to `path` and sync it to disk.
pub fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let io_err = |e| PackError::io(path, e);
    let mut file = File::create(path).map_err(io_err)?;
    file.write_all(bytes).map_err(io_err)?;
    file.sync_all().map_err(io_err)
}

/// Streaming reader over a pack file.
pub struct PackReader<H> {
    header: H,
    remaining: u64,
    decoder: BufReader<GzDecoder<BufReader<File>>>,
    path: std::path::PathBuf,
}

impl<H: PackHeader> PackReader<H> {
    /// Open `path`, check the magic and format version, read the header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| PackError::io(path, e))?;
        let mut decoder = BufReader::new(GzDecoder::new(BufReader::new(file)));

        let mut magic = [0u8; 8];
        decoder
            .read_exact(&mut magic)
            .map_err(|e| PackError::format(path, format!("unreadable header: {e}")))?;
        if &magic != H::MAGIC {
            return Err(PackError::format(path, "unexpected file type"));
        }

        let header: H = bincode::deserialize_from(&mut decoder)
            .map_err(|e| PackError::format(path, format!("corrupt header: {e}")))?;
        if header.format_version() != PACK_FORMAT_VERSION {
            return Err(PackError::IncompatibleFormat {
                path: path.to_path_buf(),
                found: header.format_version(),
                expected: PACK_FORMAT_VERSION,
            });
        }

        Ok(Self {
            remaining: header.body_count(),
            header,
            decoder,
            path: path.to_path_buf(),
        })
    }

    pub fn header(&self) -> &H {
        &self.header
    }

    /// Check the file belongs to `repository_id`.
    pub fn expect_repository(&self, repository_id: &str) -> Result<()> {
        if self.header.repository_id() == repository_id {
            Ok(())
        } else {
            Err(PackError::RepositoryMismatch {
                path: self.path.clone(),
                expected: repository_id.to_string(),
                found: self.header.repository_id().to_string(),
            })
        }
    }

    /// Next body, `None` once `count` bodies were read.
    pub fn next_body<B: DeserializeOwned>(&mut self) -> Result<Option<B>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let body = bincode::deserialize_from(&mut self.decoder)
            .map_err(|e| PackError::format(&self.path, format!("corrupt entry: {e}")))?;
        self.remaining -= 1;
        Ok(Some(body))
    }

    pub fn read_all<B: DeserializeOwned>(mut self) -> Result<Vec<B>> {
        let mut out = Vec::with_capacity(self.remaining.min(1 << 16) as usize);
        while let Some(body) = self.next_body()? {
            out.push(body);
        }
        Ok(out)
    }
}

pub fn read_header<H: PackHeader>(path: &Path) -> Result<H> {
    Ok(PackReader::<H>::open(path)?.header)
}

fn encode_error(path: &Path, err: bincode::Error) -> PackError {
    match *err {
        bincode::ErrorKind::Io(e) => PackError::io(path, e),
        other => PackError::format(path, other.to_string()),
    }
}
