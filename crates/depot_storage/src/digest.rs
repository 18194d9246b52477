//! Single-pass content hashing and byte counting.

use sha2::{Digest, Sha256};

/// Hashing and counting tee on the write path.
///
/// Every chunk headed for a backend passes through `update` exactly once, so
/// the finalized size and hash always reflect the bytes actually persisted.
/// The payload is never buffered or read back.
pub struct DigestTee {
    hasher: Sha256,
    size: i64,
}

impl DigestTee {
    /// Create a fresh tee.
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
            size: 0,
        }
    }

    /// Feed one chunk into the digest and the byte count.
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.size += chunk.len() as i64;
    }

    /// Finalize into `(size, lowercase hex SHA-256)`.
    pub fn finalize(self) -> (i64, String) {
        (self.size, format!("{:x}", self.hasher.finalize()))
    }
}

impl Default for DigestTee {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_hashes_to_empty_digest() {
        let (size, hash) = DigestTee::new().finalize();
        assert_eq!(size, 0);
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn chunked_updates_match_one_shot() {
        let mut tee = DigestTee::new();
        tee.update(b"Hello ");
        tee.update(b"World");
        let (size, hash) = tee.finalize();
        assert_eq!(size, 11);
        assert_eq!(
            hash,
            "a591a6d40bf420404a011733cfb7b190d62c65bf0bcda32b57b277d9ad9f146e"
        );
    }
}
