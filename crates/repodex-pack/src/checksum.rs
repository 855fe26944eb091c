use crate::error::{PackError, Result};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Digests and length of a file's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigests {
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
    pub size: u64,
}

/// Pass-through writer hashing every byte that reaches `inner`.
pub struct DigestWriter<W> {
    inner: W,
    md5: Md5,
    sha1: Sha1,
    sha256: Sha256,
    size: u64,
}

impl<W: Write> DigestWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            md5: Md5::new(),
            sha1: Sha1::new(),
            sha256: Sha256::new(),
            size: 0,
        }
    }

    pub fn finish(self) -> (W, FileDigests) {
        let digests = FileDigests {
            md5: hex::encode(self.md5.finalize()),
            sha1: hex::encode(self.sha1.finalize()),
            sha256: hex::encode(self.sha256.finalize()),
            size: self.size,
        };
        (self.inner, digests)
    }
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        let written = &buf[..n];
        self.md5.update(written);
        self.sha1.update(written);
        self.sha256.update(written);
        self.size += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

pub fn digest_file(path: &Path) -> Result<FileDigests> {
    let mut file = File::open(path).map_err(|e| PackError::io(path, e))?;
    let mut writer = DigestWriter::new(io::sink());
    io::copy(&mut file, &mut writer).map_err(|e| PackError::io(path, e))?;
    Ok(writer.finish().1)
}

/// `<file>.md5` and `<file>.sha1`.
pub fn sidecar_paths(path: &Path) -> [PathBuf; 2] {
    let with_suffix = |suffix: &str| {
        let mut name = path.as_os_str().to_os_string();
        name.push(suffix);
        PathBuf::from(name)
    };
    [with_suffix(".md5"), with_suffix(".sha1")]
}

/// Sidecar paths of `path`, each with the hex digest it holds.
pub fn sidecars<'a>(path: &Path, digests: &'a FileDigests) -> [(PathBuf, &'a str); 2] {
    let [md5_path, sha1_path] = sidecar_paths(path);
    [(md5_path, &digests.md5), (sha1_path, &digests.sha1)]
}

/// Fails with [`PackError::ChecksumMismatch`] unless `path` hashes to
/// `expected_sha256`.
pub fn verify_sha256(path: &Path, expected_sha256: &str) -> Result<()> {
    let actual = digest_file(path)?.sha256;
    if actual.eq_ignore_ascii_case(expected_sha256) {
        Ok(())
    } else {
        Err(PackError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected_sha256.to_string(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn test_known_digests() {
        let mut writer = DigestWriter::new(Vec::new());
        writer.write_all(b"abc").unwrap();
        let (bytes, digests) = writer.finish();

        assert_eq!(bytes, b"abc");
        assert_eq!(digests.size, 3);
        assert_eq!(digests.md5, "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(digests.sha1, "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(
            digests.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sidecars_and_verify() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repodex-index.gz");
        fs::write(&path, b"abc").unwrap();

        let digests = digest_file(&path).unwrap();
        let [(md5_path, md5), (sha1_path, sha1)] = sidecars(&path, &digests);
        assert_eq!(md5_path, dir.path().join("repodex-index.gz.md5"));
        assert_eq!(md5, "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(sha1_path, dir.path().join("repodex-index.gz.sha1"));
        assert_eq!(sha1, "a9993e364706816aba3e25717850c26c9cd0d89d");

        verify_sha256(&path, &digests.sha256).unwrap();
        let err = verify_sha256(&path, "00").unwrap_err();
        assert!(matches!(err, PackError::ChecksumMismatch { .. }));
    }
}
