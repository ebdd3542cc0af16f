//! Core data model shared by the scanner, the checkpoint log and the stores

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Textual sentinel written in place of a hash list for deleted files
pub const TOMBSTONE_MARKER: &str = "0";

/// Ordered block hashes of a file, or the deletion tombstone
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockList {
	Alive(Vec<String>),
	Deleted,
}

impl BlockList {
	pub fn is_deleted(&self) -> bool {
		matches!(self, BlockList::Deleted)
	}

	/// Hashes in reconstruction order; empty for a tombstone
	pub fn hashes(&self) -> &[String] {
		match self {
			BlockList::Alive(hashes) => hashes,
			BlockList::Deleted => &[],
		}
	}
}

/// Versioned metadata of a single file in the flat namespace
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
	pub filename: String,
	pub version: u64,
	pub blocks: BlockList,
}

impl FileMetadata {
	pub fn new(filename: impl Into<String>, version: u64, hashes: Vec<String>) -> Self {
		FileMetadata { filename: filename.into(), version, blocks: BlockList::Alive(hashes) }
	}

	pub fn tombstone(filename: impl Into<String>, version: u64) -> Self {
		FileMetadata { filename: filename.into(), version, blocks: BlockList::Deleted }
	}

	pub fn is_tombstone(&self) -> bool {
		self.blocks.is_deleted()
	}
}

/// Classification of a local file against its checkpoint record
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FileStatus {
	Unchanged,
	Modified,
	New,
	Deleted,
}

/// Observed state of one file together with its classification
#[derive(Clone, PartialEq, Debug)]
pub struct LocalEntry {
	pub metadata: FileMetadata,
	pub status: FileStatus,
}

/// Result of change detection for one sync pass
#[derive(Debug, Default)]
pub struct ChangeSet {
	/// Files present in the directory plus tracked files that disappeared
	pub entries: BTreeMap<String, LocalEntry>,

	/// Files that exist but could not be scanned this pass
	pub skipped: BTreeSet<String>,
}

impl ChangeSet {
	pub fn get(&self, filename: &str) -> Option<&LocalEntry> {
		self.entries.get(filename)
	}

	pub fn count(&self, status: FileStatus) -> usize {
		self.entries.values().filter(|e| e.status == status).count()
	}
}

/// Authoritative filename -> metadata map held by the metadata store
pub type RemoteSnapshot = BTreeMap<String, FileMetadata>;

/// Outcome of one sync pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncResult {
	/// Files (and tombstones) accepted by the metadata store
	pub files_pushed: usize,

	/// Files written locally from the store
	pub files_pulled: usize,

	/// Local files removed because of a remote tombstone
	pub files_deleted: usize,

	/// Pushes rejected as stale and turned into pulls
	pub conflicts: usize,

	/// Files abandoned for this pass after an error
	pub files_failed: usize,

	/// Files that could not be scanned
	pub files_skipped: usize,

	/// Files that needed no transfer
	pub unchanged: usize,

	/// Blocks uploaded to the block store
	pub blocks_uploaded: usize,

	/// Blocks downloaded from the block store
	pub blocks_downloaded: usize,

	/// Wall time of the pass
	pub duration: Duration,
}

impl SyncResult {
	/// No file was abandoned or skipped
	pub fn is_clean(&self) -> bool {
		self.files_failed == 0 && self.files_skipped == 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_tombstone_has_no_hashes() {
		let meta = FileMetadata::tombstone("gone.txt", 4);
		assert!(meta.is_tombstone());
		assert!(meta.blocks.hashes().is_empty());
	}

	#[test]
	fn test_empty_file_is_not_a_tombstone() {
		let meta = FileMetadata::new("empty.txt", 1, vec![]);
		assert!(!meta.is_tombstone());
		assert_ne!(meta.blocks, BlockList::Deleted);
	}

	#[test]
	fn test_metadata_json_shape() {
		let meta = FileMetadata::new("a.txt", 2, vec!["h1".to_string()]);
		let json = serde_json::to_string(&meta).expect("serialize");
		assert_eq!(json, r#"{"filename":"a.txt","version":2,"blocks":{"alive":["h1"]}}"#);

		let deleted: FileMetadata =
			serde_json::from_str(r#"{"filename":"b","version":3,"blocks":"deleted"}"#)
				.expect("deserialize");
		assert!(deleted.is_tombstone());
	}
}

// vim: ts=4
