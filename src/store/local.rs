//! Directory-backed store shared by several processes
//!
//! Layout of a store directory:
//!
//! ```text
//! <root>/blocks/<hash>   block payloads
//! <root>/meta.json       filename -> metadata map
//! <root>/.lock           held while a metadata update is in progress
//! ```
//!
//! Every write goes to a temporary file first and is renamed into place, so
//! readers never observe a partial block or a half-written metadata map.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::{BlockStore, BlockStoreResolver, MetaStore, StoreResult};
use crate::checkpoint::temp_path;
use crate::error::StoreError;
use crate::logging::*;
use crate::types::{FileMetadata, RemoteSnapshot};
use crate::util;

const BLOCKS_DIR: &str = "blocks";
const META_FILE: &str = "meta.json";
const LOCK_FILE: &str = ".lock";

/// How long an update waits for another process to release the lock
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(20);
const LOCK_RETRIES: u32 = 250;

pub struct DirStore {
	root: PathBuf,
}

impl DirStore {
	/// Open a store directory, creating it if needed
	pub fn open(root: &Path) -> StoreResult<Self> {
		std::fs::create_dir_all(root.join(BLOCKS_DIR))?;
		Ok(DirStore { root: root.to_path_buf() })
	}

	/// Open an existing store directory
	pub fn connect(root: &Path) -> StoreResult<Self> {
		if !root.join(BLOCKS_DIR).is_dir() {
			return Err(StoreError::unavailable(format!("no store at {}", root.display())));
		}
		Ok(DirStore { root: root.to_path_buf() })
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	fn block_path(&self, hash: &str) -> StoreResult<PathBuf> {
		if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
			return Err(StoreError::NotFound { key: hash.to_string() });
		}
		Ok(self.root.join(BLOCKS_DIR).join(hash))
	}

	async fn read_meta(&self) -> StoreResult<RemoteSnapshot> {
		match tokio::fs::read(self.root.join(META_FILE)).await {
			Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(RemoteSnapshot::new()),
			Err(e) => Err(e.into()),
		}
	}

	async fn write_meta(&self, files: &RemoteSnapshot) -> StoreResult<()> {
		let path = self.root.join(META_FILE);
		let tmp = temp_path(&path);
		tokio::fs::write(&tmp, serde_json::to_vec_pretty(files)?).await?;
		tokio::fs::rename(&tmp, &path).await?;
		Ok(())
	}

	async fn lock(&self) -> StoreResult<StoreLock> {
		let path = self.root.join(LOCK_FILE);
		for _ in 0..LOCK_RETRIES {
			match tokio::fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
				Ok(_) => {
					// Record our PID so a stale lock can be traced back
					tokio::fs::write(&path, std::process::id().to_string()).await?;
					return Ok(StoreLock { path });
				}
				Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
					tokio::time::sleep(LOCK_RETRY_DELAY).await;
				}
				Err(e) => return Err(e.into()),
			}
		}
		Err(StoreError::unavailable(format!(
			"store is locked by another process (if stale, delete {})",
			path.display()
		)))
	}
}

/// RAII guard for the store's metadata lock
struct StoreLock {
	path: PathBuf,
}

impl Drop for StoreLock {
	fn drop(&mut self) {
		let _ = std::fs::remove_file(&self.path);
	}
}

#[async_trait]
impl BlockStore for DirStore {
	async fn get_block(&self, hash: &str) -> StoreResult<Vec<u8>> {
		match tokio::fs::read(self.block_path(hash)?).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				Err(StoreError::NotFound { key: hash.to_string() })
			}
			Err(e) => Err(e.into()),
		}
	}

	async fn put_block(&self, data: &[u8]) -> StoreResult<String> {
		let hash = util::hash(data);
		let path = self.block_path(&hash)?;
		if tokio::fs::try_exists(&path).await? {
			return Ok(hash);
		}
		let tmp = temp_path(&path);
		tokio::fs::write(&tmp, data).await?;
		tokio::fs::rename(&tmp, &path).await?;
		Ok(hash)
	}

	async fn has_blocks(&self, hashes: &[String]) -> StoreResult<Vec<String>> {
		let mut present = Vec::new();
		for hash in hashes {
			if tokio::fs::try_exists(self.block_path(hash)?).await? {
				present.push(hash.clone());
			}
		}
		Ok(present)
	}
}

#[async_trait]
impl MetaStore for DirStore {
	async fn get_file_info_map(&self) -> StoreResult<RemoteSnapshot> {
		self.read_meta().await
	}

	async fn update_file(&self, meta: &FileMetadata) -> StoreResult<u64> {
		let _lock = self.lock().await?;
		let mut files = self.read_meta().await?;
		if let Some(current) = files.get(&meta.filename) {
			if meta.version != current.version + 1 {
				return Err(StoreError::VersionConflict {
					filename: meta.filename.clone(),
					attempted: meta.version,
					current: current.version,
				});
			}
		}
		files.insert(meta.filename.clone(), meta.clone());
		self.write_meta(&files).await?;
		debug!("Stored {} version {} in {}", meta.filename, meta.version, self.root.display());
		Ok(meta.version)
	}

	async fn get_block_store_addr(&self) -> StoreResult<String> {
		Ok(self.root.to_string_lossy().into_owned())
	}
}

/// Resolves a locator to the store directory it names
pub struct DirResolver;

impl BlockStoreResolver for DirResolver {
	fn resolve(&self, addr: &str) -> StoreResult<Arc<dyn BlockStore>> {
		Ok(Arc::new(DirStore::connect(Path::new(addr))?))
	}
}


// vim: ts=4
