//! Checkpoint log: the last-synced state of every tracked file
//!
//! The log is a plain text file in the base directory, one record per line:
//!
//! ```text
//! <filename>,<version>,<hash1> <hash2> ... <hashN>
//! <filename>,<version>,0
//! ```
//!
//! The second form is a tombstone. An empty file is written with an empty
//! hash field. The whole log is rewritten at the end of every sync pass.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::CheckpointError;
use crate::logging::*;
use crate::types::{BlockList, FileMetadata, TOMBSTONE_MARKER};

/// Default name of the checkpoint log inside the base directory
pub const DEFAULT_INDEX_FILE: &str = "index.txt";

/// Suffix of temporary files written before an atomic rename
pub const TEMP_SUFFIX: &str = ".blocksync-tmp";

/// Temporary sibling used while replacing `path`
pub fn temp_path(path: &Path) -> PathBuf {
	let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
	name.push(TEMP_SUFFIX);
	path.with_file_name(name)
}

/// Checkpoint records keyed by filename, backed by the log file
#[derive(Debug, Clone)]
pub struct CheckpointLog {
	path: PathBuf,
	records: BTreeMap<String, FileMetadata>,
}

impl CheckpointLog {
	/// Create an empty log that will be persisted at `path`
	pub fn empty(path: PathBuf) -> Self {
		CheckpointLog { path, records: BTreeMap::new() }
	}

	/// Load the log, treating a missing file as an empty log
	pub async fn load(path: &Path) -> Result<Self, CheckpointError> {
		match tokio::fs::read_to_string(path).await {
			Ok(contents) => Ok(Self::parse(path.to_path_buf(), &contents)),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::empty(path.to_path_buf())),
			Err(e) => Err(CheckpointError::LoadFailed { source: e }),
		}
	}

	/// Build a log from file contents; malformed lines are logged and dropped
	pub fn parse(path: PathBuf, contents: &str) -> Self {
		let mut log = Self::empty(path);
		for line in contents.lines() {
			if line.trim().is_empty() {
				continue;
			}
			match parse_line(line) {
				Ok(meta) => {
					if log.records.contains_key(&meta.filename) {
						warn!("Duplicate checkpoint record for {}, keeping the last one", meta.filename);
					}
					log.records.insert(meta.filename.clone(), meta);
				}
				Err(e) => warn!("Skipping checkpoint line: {}", e),
			}
		}
		log
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn get(&self, filename: &str) -> Option<&FileMetadata> {
		self.records.get(filename)
	}

	/// Insert or replace the record for `meta.filename`
	pub fn upsert(&mut self, meta: FileMetadata) {
		self.records.insert(meta.filename.clone(), meta);
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &FileMetadata> {
		self.records.values()
	}

	/// Serialized log contents, sorted by filename
	pub fn render(&self) -> String {
		let mut out = String::new();
		for meta in self.records.values() {
			out.push_str(&format_line(meta));
			out.push('\n');
		}
		out
	}

	/// Rewrite the log file in full (temporary file, then rename)
	pub async fn save(&self) -> Result<(), CheckpointError> {
		let tmp = temp_path(&self.path);
		tokio::fs::write(&tmp, self.render())
			.await
			.map_err(|e| CheckpointError::SaveFailed { source: e })?;
		tokio::fs::rename(&tmp, &self.path)
			.await
			.map_err(|e| CheckpointError::SaveFailed { source: e })?;
		debug!("Wrote {} checkpoint records to {}", self.records.len(), self.path.display());
		Ok(())
	}
}

/// Parse one `filename,version,hashes` line
pub fn parse_line(line: &str) -> Result<FileMetadata, CheckpointError> {
	let malformed = |message: &str| CheckpointError::Malformed {
		line: line.to_string(),
		message: message.to_string(),
	};

	let mut fields = line.splitn(3, ',');
	let filename = fields.next().filter(|f| !f.is_empty()).ok_or_else(|| malformed("empty filename"))?;
	let version = fields
		.next()
		.ok_or_else(|| malformed("missing version"))?
		.trim()
		.parse::<u64>()
		.map_err(|_| malformed("version is not a number"))?;
	let hashes = fields.next().ok_or_else(|| malformed("missing hash list"))?.trim();

	if version == 0 {
		return Err(malformed("version must be >= 1"));
	}

	let blocks = if hashes == TOMBSTONE_MARKER {
		BlockList::Deleted
	} else {
		BlockList::Alive(hashes.split_whitespace().map(str::to_string).collect())
	};

	Ok(FileMetadata { filename: filename.to_string(), version, blocks })
}

/// Format one record as a log line (without the newline)
pub fn format_line(meta: &FileMetadata) -> String {
	let hashes = match &meta.blocks {
		BlockList::Deleted => TOMBSTONE_MARKER.to_string(),
		BlockList::Alive(hashes) => hashes.join(" "),
	};
	format!("{},{},{}", meta.filename, meta.version, hashes)
}


// vim: ts=4
