//! Configuration for blocksync
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (Config::default())
//! 2. Config file (TOML, or JSON5 for `.json`/`.json5`)
//! 3. Environment variables (BLOCKSYNC_* prefix)
//! 4. CLI flags (highest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::checkpoint::DEFAULT_INDEX_FILE;
use crate::chunking::{ChunkConfig, DEFAULT_BLOCK_SIZE};
use crate::error::ConfigError;
use crate::util;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "BLOCKSYNC_";

/// Configuration for a sync client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	/// Directory kept in sync (scanned non-recursively)
	pub base_dir: PathBuf,

	/// Block size in bytes; must match every other client of the store
	pub block_size: usize,

	/// Name of the checkpoint log inside `base_dir`
	pub index_file: String,

	/// Store directory used by the command line client
	pub store_dir: Option<PathBuf>,

	/// Default log filter when RUST_LOG is not set
	pub log_level: String,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			base_dir: PathBuf::from("."),
			block_size: DEFAULT_BLOCK_SIZE,
			index_file: DEFAULT_INDEX_FILE.to_string(),
			store_dir: None,
			log_level: "info".to_string(),
		}
	}
}

impl Config {
	/// Load a config file on top of the defaults
	pub fn load(path: &Path) -> Result<Config, ConfigError> {
		let contents = std::fs::read_to_string(path)
			.map_err(|e| ConfigError::ReadFailed { path: path.to_path_buf(), source: e })?;
		let parse_failed =
			|message: String| ConfigError::ParseFailed { path: path.to_path_buf(), message };

		match path.extension().and_then(|e| e.to_str()) {
			Some("json") | Some("json5") => {
				json5::from_str(&contents).map_err(|e| parse_failed(e.to_string()))
			}
			_ => toml::from_str(&contents).map_err(|e| parse_failed(e.to_string())),
		}
	}

	/// Apply BLOCKSYNC_* overrides from the process environment
	pub fn apply_env(&mut self) -> Result<(), ConfigError> {
		self.apply_env_from(|key| std::env::var(key).ok())
	}

	/// Apply overrides from an arbitrary variable lookup
	pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

		if let Some(dir) = var("BASE_DIR") {
			self.base_dir = PathBuf::from(dir);
		}
		if let Some(size) = var("BLOCK_SIZE") {
			self.block_size = size.trim().parse().map_err(|_| ConfigError::Invalid {
				message: format!("{}BLOCK_SIZE is not a number: {:?}", ENV_PREFIX, size),
			})?;
		}
		if let Some(name) = var("INDEX_FILE") {
			self.index_file = name;
		}
		if let Some(dir) = var("STORE_DIR") {
			self.store_dir = Some(PathBuf::from(dir));
		}
		if let Some(level) = var("LOG_LEVEL") {
			self.log_level = level;
		}
		Ok(())
	}

	/// Validate the configuration
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.chunk_config().validate()?;
		if !util::is_syncable_name(&self.index_file)
			|| self.index_file.contains('/')
			|| self.index_file.contains('\\')
		{
			return Err(ConfigError::Invalid {
				message: format!("index file name {:?} is not a plain filename", self.index_file),
			});
		}
		Ok(())
	}

	pub fn chunk_config(&self) -> ChunkConfig {
		ChunkConfig::new(self.block_size)
	}

	/// Full path of the checkpoint log
	pub fn index_path(&self) -> PathBuf {
		self.base_dir.join(&self.index_file)
	}
}


// vim: ts=4
