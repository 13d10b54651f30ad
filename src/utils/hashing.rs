// Content hashing for output filenames.
//
// Every emitted file is named after a digest of its own bytes (per-artifact
// granularity). The build-wide salt is mixed in first, so changing it renames
// every output while unchanged content with an unchanged salt is stable.

pub const MIN_HASH_LENGTH: usize = 4;
pub const MAX_HASH_LENGTH: usize = 64;
pub const DEFAULT_HASH_LENGTH: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHasher {
    salt: String,
    length: usize,
}

impl ContentHasher {
    /// `length` is clamped to the digest size (64 hex chars) and a floor of 4.
    pub fn new(salt: impl Into<String>, length: usize) -> Self {
        Self {
            salt: salt.into(),
            length: length.clamp(MIN_HASH_LENGTH, MAX_HASH_LENGTH),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn hash(&self, content: &[u8]) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(content);
        let hex = hasher.finalize().to_hex();
        hex.as_str()[..self.length].to_string()
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new("", DEFAULT_HASH_LENGTH)
    }
}

/// Full, unsalted digest used to decide whether two files are the same bytes.
pub fn content_digest(content: &[u8]) -> String {
    blake3::hash(content).to_hex().to_string()
}

/// Render `{name}.{hash}.{ext}`.
pub fn hashed_filename(name: &str, hash: &str, ext: &str) -> String {
    format!("{}.{}.{}", name, hash, ext)
}
