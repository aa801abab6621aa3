//! SHA-256 content digests
//!
//! Two files are considered identical iff their digests are bit-equal. Input is
//! always consumed in [`HASH_CHUNK_SIZE`] chunks so memory use does not grow
//! with file size. The canonical text form is `sha256:<hex>`.

use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::constants::HASH_CHUNK_SIZE;
use crate::{Error, Result};

/// Prefix for the canonical string form of a digest
const PREFIX: &str = "sha256:";

/// A SHA-256 digest of a byte sequence.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex without the `sha256:` prefix.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in self.0 {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", PREFIX, self.to_hex())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({self})")
    }
}

/// Hash everything readable from `reader`, chunk by chunk.
pub fn hash_reader<R: Read>(mut reader: R) -> std::io::Result<ContentDigest> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; HASH_CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(ContentDigest(hasher.finalize().into()))
}

/// Hash an in-memory byte slice.
pub fn hash_bytes(bytes: &[u8]) -> ContentDigest {
    // Reading from a slice cannot fail.
    hash_reader(bytes).unwrap_or_else(|_| ContentDigest(Sha256::digest(bytes).into()))
}

/// Hash the contents of a file on disk.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn hash_file(path: &Path) -> Result<ContentDigest> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    hash_reader(file).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_display_has_prefix() {
        let digest = hash_bytes(b"hello world");
        assert!(digest.to_string().starts_with("sha256:"));
    }

    #[test]
    fn digest_known_value() {
        let digest = hash_bytes(b"hello world");
        assert_eq!(
            digest.to_string(),
            "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn different_content_different_digest() {
        assert_ne!(hash_bytes(b"aaa"), hash_bytes(b"bbb"));
    }

    #[test]
    fn input_larger_than_one_chunk() {
        let data = vec![7u8; HASH_CHUNK_SIZE * 3 + 17];
        let chunked = hash_bytes(&data);
        let oneshot = ContentDigest(Sha256::digest(&data).into());
        assert_eq!(chunked, oneshot);
    }

    #[test]
    fn file_digest_matches_bytes_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::write(&path, "hello world").unwrap();

        assert_eq!(hash_file(&path).unwrap(), hash_bytes(b"hello world"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = hash_file(&dir.path().join("nope")).unwrap_err();
        assert!(err.is_not_found());
    }
}
