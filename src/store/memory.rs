//! In-process block and metadata stores
//!
//! Both are plain maps behind a single `tokio::sync::Mutex`. The metadata
//! version check and the write happen inside one critical section, so two
//! clients racing on the same filename cannot both succeed.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{BlockStore, MetaStore, Remote, StaticResolver, StoreResult};
use crate::error::StoreError;
use crate::logging::*;
use crate::types::{FileMetadata, RemoteSnapshot};
use crate::util;

/// Locator reported by a `MemoryStore`'s metadata service
pub const MEMORY_BLOCK_STORE_ADDR: &str = "memory://blocks";

#[derive(Default)]
pub struct MemoryBlockStore {
	blocks: Mutex<HashMap<String, Arc<Vec<u8>>>>,
}

impl MemoryBlockStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of distinct blocks stored
	pub async fn len(&self) -> usize {
		self.blocks.lock().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.blocks.lock().await.is_empty()
	}

	/// Drop a block (used to simulate store-side loss)
	pub async fn remove(&self, hash: &str) -> bool {
		self.blocks.lock().await.remove(hash).is_some()
	}
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
	async fn get_block(&self, hash: &str) -> StoreResult<Vec<u8>> {
		let blocks = self.blocks.lock().await;
		blocks
			.get(hash)
			.map(|data| data.as_ref().clone())
			.ok_or_else(|| StoreError::NotFound { key: hash.to_string() })
	}

	async fn put_block(&self, data: &[u8]) -> StoreResult<String> {
		let hash = util::hash(data);
		let mut blocks = self.blocks.lock().await;
		blocks.entry(hash.clone()).or_insert_with(|| Arc::new(data.to_vec()));
		Ok(hash)
	}

	async fn has_blocks(&self, hashes: &[String]) -> StoreResult<Vec<String>> {
		let blocks = self.blocks.lock().await;
		Ok(hashes.iter().filter(|h| blocks.contains_key(h.as_str())).cloned().collect())
	}
}

pub struct MemoryMetaStore {
	files: Mutex<RemoteSnapshot>,
	block_store_addr: String,
}

impl MemoryMetaStore {
	pub fn new(block_store_addr: impl Into<String>) -> Self {
		MemoryMetaStore { files: Mutex::new(RemoteSnapshot::new()), block_store_addr: block_store_addr.into() }
	}
}

#[async_trait]
impl MetaStore for MemoryMetaStore {
	async fn get_file_info_map(&self) -> StoreResult<RemoteSnapshot> {
		Ok(self.files.lock().await.clone())
	}

	async fn update_file(&self, meta: &FileMetadata) -> StoreResult<u64> {
		let mut files = self.files.lock().await;
		if let Some(current) = files.get(&meta.filename) {
			if meta.version != current.version + 1 {
				debug!(
					"Rejecting {} version {} (store has {})",
					meta.filename, meta.version, current.version
				);
				return Err(StoreError::VersionConflict {
					filename: meta.filename.clone(),
					attempted: meta.version,
					current: current.version,
				});
			}
		}
		files.insert(meta.filename.clone(), meta.clone());
		Ok(meta.version)
	}

	async fn get_block_store_addr(&self) -> StoreResult<String> {
		Ok(self.block_store_addr.clone())
	}
}

/// A metadata store and its block store, wired together in memory
///
/// Cloning shares the underlying maps, so several clients can sync against
/// the same store.
#[derive(Clone)]
pub struct MemoryStore {
	pub meta: Arc<MemoryMetaStore>,
	pub blocks: Arc<MemoryBlockStore>,
}

impl Default for MemoryStore {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryStore {
	pub fn new() -> Self {
		MemoryStore {
			meta: Arc::new(MemoryMetaStore::new(MEMORY_BLOCK_STORE_ADDR)),
			blocks: Arc::new(MemoryBlockStore::new()),
		}
	}

	/// Client handle for the sync engine
	pub fn remote(&self) -> Remote {
		let resolver = StaticResolver::new().with(MEMORY_BLOCK_STORE_ADDR, self.blocks.clone());
		Remote::new(self.meta.clone(), Arc::new(resolver))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_put_block_is_idempotent() {
		let store = MemoryBlockStore::new();
		let h1 = store.put_block(b"abcd").await.unwrap();
		let h2 = store.put_block(b"abcd").await.unwrap();
		assert_eq!(h1, h2);
		assert_eq!(h1, util::hash(b"abcd"));
		assert_eq!(store.len().await, 1);
		assert_eq!(store.get_block(&h1).await.unwrap(), b"abcd");
	}

	#[tokio::test]
	async fn test_get_missing_block() {
		let store = MemoryBlockStore::new();
		assert!(matches!(store.get_block("nope").await, Err(StoreError::NotFound { .. })));
	}

	#[tokio::test]
	async fn test_has_blocks_keeps_input_order() {
		let store = MemoryBlockStore::new();
		let a = store.put_block(b"a").await.unwrap();
		let c = store.put_block(b"c").await.unwrap();
		let query = vec![c.clone(), util::hash(b"b"), a.clone()];
		assert_eq!(store.has_blocks(&query).await.unwrap(), vec![c, a]);
	}

	#[tokio::test]
	async fn test_update_file_compare_and_swap() {
		let meta = MemoryMetaStore::new("x");

		// Unseen filenames are accepted at any version
		assert_eq!(meta.update_file(&FileMetadata::new("f", 3, vec![])).await.unwrap(), 3);

		// Only current + 1 is accepted afterwards
		let stale = meta.update_file(&FileMetadata::new("f", 3, vec![])).await;
		assert!(matches!(stale, Err(StoreError::VersionConflict { current: 3, .. })));
		assert!(meta.update_file(&FileMetadata::new("f", 5, vec![])).await.is_err());
		assert_eq!(meta.update_file(&FileMetadata::tombstone("f", 4)).await.unwrap(), 4);

		// Tombstones are kept and can be revived
		let snapshot = meta.get_file_info_map().await.unwrap();
		assert!(snapshot["f"].is_tombstone());
		assert!(meta.update_file(&FileMetadata::new("f", 5, vec![])).await.is_ok());
	}

	#[tokio::test]
	async fn test_concurrent_updates_single_winner() {
		let meta = Arc::new(MemoryMetaStore::new("x"));
		meta.update_file(&FileMetadata::new("f", 1, vec![])).await.unwrap();

		let mut handles = Vec::new();
		for i in 0..16 {
			let meta = meta.clone();
			handles.push(tokio::spawn(async move {
				meta.update_file(&FileMetadata::new("f", 2, vec![format!("h{}", i)])).await.is_ok()
			}));
		}

		let mut winners = 0;
		for handle in handles {
			if handle.await.unwrap() {
				winners += 1;
			}
		}
		assert_eq!(winners, 1);
		assert_eq!(meta.get_file_info_map().await.unwrap()["f"].version, 2);
	}
}

// vim: ts=4
