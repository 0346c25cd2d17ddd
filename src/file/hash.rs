//! Content digests for deduplication.
//!
//! Digests are SHA-256, lowercase hex. They fingerprint content for equality
//! checks only.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

use crate::Result;

const BUFFER_SIZE: usize = 8 * 1024;

/// Length of a hex-encoded digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Hash an in-memory byte slice.
pub fn hash_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Hash a byte stream, consuming it exactly once.
///
/// Reads through a fixed buffer so the whole stream is never held in memory.
pub async fn hash_reader<R>(reader: R) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, reader);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer).await?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Hash the content of a file on disk.
pub async fn hash_file(path: &Path) -> Result<String> {
    let file = tokio::fs::File::open(path).await?;
    hash_reader(file).await
}
