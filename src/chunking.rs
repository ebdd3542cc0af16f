//! Fixed-size block chunking and hashing
//!
//! A file of `n` bytes is split into `ceil(n / block_size)` blocks. The last
//! block may be shorter and is never padded; an empty file has no blocks.

use std::path::Path;
use tokio::fs as afs;
use tokio::io::AsyncReadExt;

use crate::error::ChunkError;
use crate::util;

/// Default block size in bytes
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Upper bound on the block size (64 MiB)
pub const MAX_BLOCK_SIZE: usize = 64 << 20;

/// Chunking configuration
///
/// Every client sharing a store must use the same block size, otherwise
/// identical content produces different hash lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
	pub block_size: usize,
}

impl Default for ChunkConfig {
	fn default() -> Self {
		ChunkConfig { block_size: DEFAULT_BLOCK_SIZE }
	}
}

impl ChunkConfig {
	pub fn new(block_size: usize) -> Self {
		ChunkConfig { block_size }
	}

	/// Validate the configuration
	pub fn validate(&self) -> Result<(), ChunkError> {
		if self.block_size == 0 {
			return Err(ChunkError::InvalidConfig { message: "block size must be > 0".to_string() });
		}
		if self.block_size > MAX_BLOCK_SIZE {
			return Err(ChunkError::InvalidConfig {
				message: format!("block size must be <= {}", MAX_BLOCK_SIZE),
			});
		}
		Ok(())
	}
}

/// Hash a single block
pub fn hash_block(data: &[u8]) -> String {
	util::hash(data)
}

/// Hash list of in-memory content
pub fn hash_blocks(data: &[u8], config: ChunkConfig) -> Vec<String> {
	data.chunks(config.block_size).map(hash_block).collect()
}

/// Read a file as ordered block payloads
pub async fn read_blocks(path: &Path, config: ChunkConfig) -> Result<Vec<Vec<u8>>, ChunkError> {
	config.validate()?;
	let mut file = afs::File::open(path).await?;
	let mut blocks = Vec::new();

	loop {
		let mut buf = Vec::with_capacity(config.block_size);
		(&mut file).take(config.block_size as u64).read_to_end(&mut buf).await?;
		if buf.is_empty() {
			break;
		}
		let short = buf.len() < config.block_size;
		blocks.push(buf);
		if short {
			break;
		}
	}

	Ok(blocks)
}

/// Ordered hash list of a file
pub async fn hash_file(path: &Path, config: ChunkConfig) -> Result<Vec<String>, ChunkError> {
	let blocks = read_blocks(path, config).await?;
	Ok(blocks.iter().map(|b| hash_block(b)).collect())
}


// vim: ts=4
