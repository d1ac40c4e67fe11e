//! Streaming BLAKE3 content hashing.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use blake3::Hasher;

use twinfold_core::ContentHash;

/// Hash a file's full content, reading `chunk_size` bytes at a time.
pub fn hash_file(path: &Path, chunk_size: usize) -> io::Result<ContentHash> {
    let file = File::open(path)?;
    hash_reader(file, chunk_size)
}

/// Hash everything a reader yields, never holding more than one chunk.
pub fn hash_reader<R: Read>(mut reader: R, chunk_size: usize) -> io::Result<ContentHash> {
    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(ContentHash::new(*hasher.finalize().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_chunk_size_does_not_change_digest() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let whole = ContentHash::new(*blake3::hash(&data).as_bytes());

        for chunk in [1, 7, 4096, 64 * 1024] {
            assert_eq!(hash_reader(data.as_slice(), chunk).unwrap(), whole);
        }
    }

    #[test]
    fn test_hash_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a"), "foo").unwrap();
        fs::write(temp.path().join("b"), "foo").unwrap();
        fs::write(temp.path().join("c"), "bar").unwrap();

        let a = hash_file(&temp.path().join("a"), 2).unwrap();
        let b = hash_file(&temp.path().join("b"), 4096).unwrap();
        let c = hash_file(&temp.path().join("c"), 4096).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);

        assert!(hash_file(&temp.path().join("missing"), 4096).is_err());
    }
}
