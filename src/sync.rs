//! Public entry points for running a sync pass

use std::path::PathBuf;

use crate::checkpoint::CheckpointLog;
use crate::config::Config;
use crate::error::SyncError;
use crate::scan;
use crate::store::Remote;
use crate::sync_impl;
use crate::types::{ChangeSet, SyncResult};

/// Run one sync pass with an explicit configuration
pub async fn sync(config: &Config, remote: &Remote) -> Result<SyncResult, SyncError> {
	sync_impl::sync(config, remote).await
}

/// Classify local files against the checkpoint log without contacting a store
pub async fn status(config: &Config) -> Result<ChangeSet, SyncError> {
	config.validate()?;
	let log = CheckpointLog::load(&config.index_path()).await?;
	let changes =
		scan::detect_changes(&config.base_dir, &config.index_file, &log, config.chunk_config()).await?;
	Ok(changes)
}

/// Builder for configuring and running a sync pass
///
/// ```rust,ignore
/// let store = blocksync::store::MemoryStore::new();
/// let result = SyncBuilder::new()
///     .base_dir("./dir")
///     .block_size(4096)
///     .sync(&store.remote())
///     .await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct SyncBuilder {
	config: Config,
}

impl SyncBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Start from an existing configuration
	pub fn config(mut self, config: Config) -> Self {
		self.config = config;
		self
	}

	pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.config.base_dir = dir.into();
		self
	}

	pub fn block_size(mut self, block_size: usize) -> Self {
		self.config.block_size = block_size;
		self
	}

	pub fn index_file(mut self, name: impl Into<String>) -> Self {
		self.config.index_file = name.into();
		self
	}

	pub fn build(self) -> Config {
		self.config
	}

	pub async fn sync(self, remote: &Remote) -> Result<SyncResult, SyncError> {
		sync(&self.config, remote).await
	}
}


// vim: ts=4
