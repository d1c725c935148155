use std::fs;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{PackError, Result};

/// Size of each read fed to the digest.
pub const CHUNK_SIZE: usize = 4096;

/// Stream `reader` through SHA-256 in [`CHUNK_SIZE`] reads and return the lowercase hex digest.
pub fn hash_reader<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    feed(&mut [&mut hasher], reader)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Hash a file on disk. Returns the digest together with the number of bytes read.
pub fn hash_file(path: &Path) -> Result<(String, u64)> {
    let mut file = fs::File::open(path).map_err(|e| PackError::read(path, e))?;
    let mut hasher = Sha256::new();
    let size = feed(&mut [&mut hasher], &mut file).map_err(|e| PackError::read(path, e))?;
    Ok((format!("{:x}", hasher.finalize()), size))
}

/// A single digest over the concatenated bytes of several files.
///
/// Folder identity in the raw modes is the hash of every member's bytes in
/// traversal order, not a hash of member hashes.
pub struct FolderDigest {
    hasher: Sha256,
    total: u64,
}

impl FolderDigest {
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
            total: 0,
        }
    }

    /// Append the contents of `path`, returning how many bytes it contributed.
    pub fn append_file(&mut self, path: &Path) -> Result<u64> {
        let mut file = fs::File::open(path).map_err(|e| PackError::read(path, e))?;
        let read =
            feed(&mut [&mut self.hasher], &mut file).map_err(|e| PackError::read(path, e))?;
        self.total += read;
        Ok(read)
    }

    /// Append `path` and hash it on its own in the same pass.
    ///
    /// Returns the member's own digest and size; both digests always see the same bytes.
    pub fn append_member(&mut self, path: &Path) -> Result<(String, u64)> {
        let mut file = fs::File::open(path).map_err(|e| PackError::read(path, e))?;
        let mut member = Sha256::new();
        let read = feed(&mut [&mut self.hasher, &mut member], &mut file)
            .map_err(|e| PackError::read(path, e))?;
        self.total += read;
        Ok((format!("{:x}", member.finalize()), read))
    }

    pub fn finish(self) -> (String, u64) {
        (format!("{:x}", self.hasher.finalize()), self.total)
    }
}

impl Default for FolderDigest {
    fn default() -> Self {
        Self::new()
    }
}

fn feed<R: Read>(hashers: &mut [&mut Sha256], reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        for hasher in hashers.iter_mut() {
            hasher.update(&buf[..read]);
        }
        total += read as u64;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const DIGITS_SHA256: &str = "84d89877f0d4041efb6bf91a16f0248f2fd573e6af05c19f96bedb9f882f7882";

    /// Hands out at most `step` bytes per read to move chunk boundaries around.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device went away"))
        }
    }

    #[test]
    fn hashes_known_content() {
        let digest = hash_reader(&mut Cursor::new(b"0123456789")).unwrap();
        assert_eq!(digest, DIGITS_SHA256);
    }

    #[test]
    fn digest_ignores_chunk_boundaries() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        let whole = hash_reader(&mut Cursor::new(&data)).unwrap();
        for step in [1, 7, 4095, 4096, 4097] {
            let mut trickle = Trickle { data: &data, step };
            assert_eq!(hash_reader(&mut trickle).unwrap(), whole, "step {step}");
        }
    }

    #[test]
    fn surfaces_read_errors() {
        assert!(hash_reader(&mut Broken).is_err());
    }

    #[test]
    fn hash_file_reports_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("update.exe");
        fs::write(&path, "0123456789").unwrap();

        let (digest, size) = hash_file(&path).unwrap();
        assert_eq!(digest, DIGITS_SHA256);
        assert_eq!(size, 10);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = hash_file(&dir.path().join("nope.bin")).unwrap_err();
        assert!(matches!(err, PackError::Read { .. }));
    }

    #[test]
    fn folder_digest_is_hash_of_concatenation() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, "01234").unwrap();
        fs::write(&b, "56789").unwrap();

        let mut digest = FolderDigest::new();
        digest.append_file(&a).unwrap();
        digest.append_file(&b).unwrap();
        let (hash, total) = digest.finish();

        assert_eq!(hash, DIGITS_SHA256);
        assert_eq!(total, 10);
    }

    #[test]
    fn member_digest_comes_from_the_same_read() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, "01234").unwrap();
        fs::write(&b, "56789").unwrap();

        let mut digest = FolderDigest::new();
        let (a_hash, a_size) = digest.append_member(&a).unwrap();
        let (b_hash, b_size) = digest.append_member(&b).unwrap();
        let (folder_hash, total) = digest.finish();

        assert_eq!(a_hash, hash_file(&a).unwrap().0);
        assert_eq!(b_hash, hash_file(&b).unwrap().0);
        assert_eq!((a_size, b_size), (5, 5));
        assert_eq!(folder_hash, DIGITS_SHA256);
        assert_eq!(total, 10);
    }

    #[test]
    fn member_read_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut digest = FolderDigest::new();
        let err = digest.append_member(&dir.path().join("gone.txt")).unwrap_err();
        assert!(matches!(err, PackError::Read { .. }));
    }
}
