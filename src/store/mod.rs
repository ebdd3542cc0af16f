//! Remote store interfaces consumed by the sync engine
//!
//! The remote side is split into two services: a content-addressed block
//! store and a versioned metadata store. The sync engine depends only on the
//! traits below; `memory` and `local` provide in-process and
//! directory-backed implementations.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::StoreError;
use crate::types::{FileMetadata, RemoteSnapshot};

pub mod local;
pub mod memory;

pub use local::{DirResolver, DirStore};
pub use memory::{MemoryBlockStore, MemoryMetaStore, MemoryStore};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Content-addressed block storage
#[async_trait]
pub trait BlockStore: Send + Sync {
	/// Fetch a block by hash
	async fn get_block(&self, hash: &str) -> StoreResult<Vec<u8>>;

	/// Store a block; the key is derived from the bytes. Storing an existing
	/// block is a no-op. Returns the block hash.
	async fn put_block(&self, data: &[u8]) -> StoreResult<String>;

	/// Subset of `hashes` present in the store, in input order
	async fn has_blocks(&self, hashes: &[String]) -> StoreResult<Vec<String>>;
}

/// Versioned file metadata storage
#[async_trait]
pub trait MetaStore: Send + Sync {
	/// Snapshot of every file known to the store, tombstones included
	async fn get_file_info_map(&self) -> StoreResult<RemoteSnapshot>;

	/// Compare-and-swap update: accepted iff `meta.version` is exactly one
	/// above the stored version, or the filename is unseen
	async fn update_file(&self, meta: &FileMetadata) -> StoreResult<u64>;

	/// Locator of the block store holding this namespace's blocks
	async fn get_block_store_addr(&self) -> StoreResult<String>;
}

/// Turns a block store locator into a usable handle
pub trait BlockStoreResolver: Send + Sync {
	fn resolve(&self, addr: &str) -> StoreResult<Arc<dyn BlockStore>>;
}

/// Resolver over a fixed set of known block stores
#[derive(Default, Clone)]
pub struct StaticResolver {
	stores: HashMap<String, Arc<dyn BlockStore>>,
}

impl StaticResolver {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, addr: impl Into<String>, store: Arc<dyn BlockStore>) -> Self {
		self.stores.insert(addr.into(), store);
		self
	}
}

impl BlockStoreResolver for StaticResolver {
	fn resolve(&self, addr: &str) -> StoreResult<Arc<dyn BlockStore>> {
		self.stores
			.get(addr)
			.cloned()
			.ok_or_else(|| StoreError::unavailable(format!("unknown block store {}", addr)))
	}
}

/// Resolver that ignores the locator and always returns the same store
pub struct SingleResolver(pub Arc<dyn BlockStore>);

impl BlockStoreResolver for SingleResolver {
	fn resolve(&self, _addr: &str) -> StoreResult<Arc<dyn BlockStore>> {
		Ok(self.0.clone())
	}
}

/// Client-side view of the remote: metadata store plus block store lookup
#[derive(Clone)]
pub struct Remote {
	meta: Arc<dyn MetaStore>,
	resolver: Arc<dyn BlockStoreResolver>,
}

impl Remote {
	pub fn new(meta: Arc<dyn MetaStore>, resolver: Arc<dyn BlockStoreResolver>) -> Self {
		Remote { meta, resolver }
	}

	/// Remote whose blocks always live in `blocks`
	pub fn local(meta: Arc<dyn MetaStore>, blocks: Arc<dyn BlockStore>) -> Self {
		Remote::new(meta, Arc::new(SingleResolver(blocks)))
	}

	/// Remote backed by a store directory shared between processes
	pub fn open_dir(root: &std::path::Path) -> StoreResult<Self> {
		let store = Arc::new(DirStore::open(root)?);
		Ok(Remote::new(store, Arc::new(DirResolver)))
	}

	pub fn meta(&self) -> &dyn MetaStore {
		self.meta.as_ref()
	}

	/// Ask the metadata store where blocks live and connect to it
	pub async fn block_store(&self) -> StoreResult<Arc<dyn BlockStore>> {
		let addr = self.meta.get_block_store_addr().await?;
		self.resolver.resolve(&addr)
	}

	/// Authoritative metadata of a single file
	pub async fn file_info(&self, filename: &str) -> StoreResult<FileMetadata> {
		let mut snapshot = self.meta.get_file_info_map().await?;
		snapshot.remove(filename).ok_or_else(|| StoreError::NotFound { key: filename.to_string() })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_static_resolver_unknown_addr() {
		let resolver = StaticResolver::new().with("a", Arc::new(MemoryBlockStore::new()));
		assert!(resolver.resolve("a").is_ok());
		assert!(matches!(resolver.resolve("b"), Err(StoreError::RemoteUnavailable { .. })));
	}

	#[tokio::test]
	async fn test_remote_file_info() {
		let store = MemoryStore::new();
		let remote = store.remote();
		store.meta.update_file(&FileMetadata::new("a", 1, vec![])).await.unwrap();

		assert_eq!(remote.file_info("a").await.unwrap().version, 1);
		assert!(matches!(remote.file_info("b").await, Err(StoreError::NotFound { .. })));
		assert!(remote.block_store().await.is_ok());
	}

	#[tokio::test]
	async fn test_local_remote_ignores_locator() {
		let blocks = Arc::new(MemoryBlockStore::new());
		let hash = blocks.put_block(b"abc").await.unwrap();
		let remote = Remote::local(Arc::new(MemoryMetaStore::new("elsewhere")), blocks);

		let store = remote.block_store().await.unwrap();
		assert_eq!(store.get_block(&hash).await.unwrap(), b"abc");
	}
}

// vim: ts=4
