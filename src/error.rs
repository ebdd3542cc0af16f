//! Error types for blocksync operations

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Main error type for sync operations
#[derive(Debug)]
pub enum SyncError {
	/// I/O error on the local filesystem
	Io(io::Error),

	/// Remote store call failed
	Store(StoreError),

	/// Checkpoint log could not be read or written
	Checkpoint(CheckpointError),

	/// Chunking failed
	Chunk(ChunkError),

	/// Invalid configuration
	Config(ConfigError),

	/// A fetched block does not match the hash it was requested by
	HashMismatch { expected: String, actual: String },
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
			SyncError::Store(e) => write!(f, "Store error: {}", e),
			SyncError::Checkpoint(e) => write!(f, "Checkpoint error: {}", e),
			SyncError::Chunk(e) => write!(f, "Chunk error: {}", e),
			SyncError::Config(e) => write!(f, "Configuration error: {}", e),
			SyncError::HashMismatch { expected, actual } => {
				write!(f, "Hash mismatch: expected {}, got {}", expected, actual)
			}
		}
	}
}

impl Error for SyncError {}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

impl From<StoreError> for SyncError {
	fn from(e: StoreError) -> Self {
		SyncError::Store(e)
	}
}

impl From<CheckpointError> for SyncError {
	fn from(e: CheckpointError) -> Self {
		SyncError::Checkpoint(e)
	}
}

impl From<ChunkError> for SyncError {
	fn from(e: ChunkError) -> Self {
		SyncError::Chunk(e)
	}
}

impl From<ConfigError> for SyncError {
	fn from(e: ConfigError) -> Self {
		SyncError::Config(e)
	}
}

/// Errors returned by the block and metadata stores
#[derive(Debug)]
pub enum StoreError {
	/// The store could not be reached or the call failed in transport
	RemoteUnavailable { message: String },

	/// Metadata update carried a stale version
	VersionConflict { filename: String, attempted: u64, current: u64 },

	/// Requested block or file does not exist
	NotFound { key: String },

	/// Store contents could not be decoded
	Corrupted { message: String },
}

impl StoreError {
	pub fn unavailable(message: impl Into<String>) -> Self {
		StoreError::RemoteUnavailable { message: message.into() }
	}

	pub fn is_version_conflict(&self) -> bool {
		matches!(self, StoreError::VersionConflict { .. })
	}
}

impl fmt::Display for StoreError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StoreError::RemoteUnavailable { message } => {
				write!(f, "Remote unavailable: {}", message)
			}
			StoreError::VersionConflict { filename, attempted, current } => write!(
				f,
				"Version conflict on {}: attempted version {}, store is at {}",
				filename, attempted, current
			),
			StoreError::NotFound { key } => write!(f, "Not found: {}", key),
			StoreError::Corrupted { message } => write!(f, "Store corrupted: {}", message),
		}
	}
}

impl Error for StoreError {}

impl From<io::Error> for StoreError {
	fn from(e: io::Error) -> Self {
		StoreError::RemoteUnavailable { message: e.to_string() }
	}
}

impl From<serde_json::Error> for StoreError {
	fn from(e: serde_json::Error) -> Self {
		StoreError::Corrupted { message: e.to_string() }
	}
}

/// Chunking-specific errors
#[derive(Debug)]
pub enum ChunkError {
	/// Failed to read block data
	ReadFailed { source: io::Error },

	/// Invalid chunk configuration
	InvalidConfig { message: String },
}

impl fmt::Display for ChunkError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ChunkError::ReadFailed { source } => write!(f, "Failed to read block: {}", source),
			ChunkError::InvalidConfig { message } => write!(f, "Invalid chunk config: {}", message),
		}
	}
}

impl Error for ChunkError {}

impl From<io::Error> for ChunkError {
	fn from(e: io::Error) -> Self {
		ChunkError::ReadFailed { source: e }
	}
}

/// Checkpoint log errors
#[derive(Debug)]
pub enum CheckpointError {
	/// Failed to read the log file
	LoadFailed { source: io::Error },

	/// Failed to persist the log file
	SaveFailed { source: io::Error },

	/// A line of the log could not be parsed
	Malformed { line: String, message: String },
}

impl fmt::Display for CheckpointError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CheckpointError::LoadFailed { source } => {
				write!(f, "Failed to load checkpoint log: {}", source)
			}
			CheckpointError::SaveFailed { source } => {
				write!(f, "Failed to save checkpoint log: {}", source)
			}
			CheckpointError::Malformed { line, message } => {
				write!(f, "Malformed checkpoint line {:?}: {}", line, message)
			}
		}
	}
}

impl Error for CheckpointError {}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
	/// Config file could not be read
	ReadFailed { path: PathBuf, source: io::Error },

	/// Config file could not be parsed
	ParseFailed { path: PathBuf, message: String },

	/// Config values are inconsistent
	Invalid { message: String },
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::ReadFailed { path, source } => {
				write!(f, "Cannot read {}: {}", path.display(), source)
			}
			ConfigError::ParseFailed { path, message } => {
				write!(f, "Cannot parse {}: {}", path.display(), message)
			}
			ConfigError::Invalid { message } => write!(f, "Invalid configuration: {}", message),
		}
	}
}

impl Error for ConfigError {}

impl From<ChunkError> for ConfigError {
	fn from(e: ChunkError) -> Self {
		ConfigError::Invalid { message: e.to_string() }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_version_conflict_display() {
		let err = StoreError::VersionConflict {
			filename: "a.txt".to_string(),
			attempted: 3,
			current: 3,
		};
		assert!(err.is_version_conflict());
		assert_eq!(err.to_string(), "Version conflict on a.txt: attempted version 3, store is at 3");
	}

	#[test]
	fn test_store_error_wraps_into_sync_error() {
		let err: SyncError = StoreError::NotFound { key: "abc".to_string() }.into();
		assert!(matches!(err, SyncError::Store(StoreError::NotFound { .. })));
		assert_eq!(err.to_string(), "Store error: Not found: abc");
	}
}

// vim: ts=4
