//! Change detection: classify the base directory against the checkpoint log

use std::io;
use std::path::Path;

use crate::checkpoint::{CheckpointLog, TEMP_SUFFIX};
use crate::chunking::{self, ChunkConfig};
use crate::logging::*;
use crate::types::{BlockList, ChangeSet, FileMetadata, FileStatus, LocalEntry};
use crate::util;

/// Names this client keeps for itself: its checkpoint log and temporary files
pub fn is_reserved_name(name: &str, index_file: &str) -> bool {
	name == index_file || name.ends_with(TEMP_SUFFIX)
}

/// Names of regular files in `base_dir` that take part in sync
///
/// The checkpoint log, temporary files and names that cannot be stored in
/// the log are left out. Subdirectories are not descended into.
pub async fn list_files(base_dir: &Path, index_file: &str) -> io::Result<Vec<String>> {
	let mut names = Vec::new();
	let mut entries = tokio::fs::read_dir(base_dir).await?;

	while let Some(entry) = entries.next_entry().await? {
		let name = match entry.file_name().into_string() {
			Ok(name) => name,
			Err(raw) => {
				warn!("Skipping non UTF-8 filename {:?}", raw);
				continue;
			}
		};
		if is_reserved_name(&name, index_file) {
			continue;
		}
		match tokio::fs::metadata(entry.path()).await {
			Ok(meta) if meta.is_file() => {}
			Ok(_) => continue,
			Err(e) => {
				warn!("Cannot stat {}: {}", name, e);
				continue;
			}
		}
		if !util::is_syncable_name(&name) {
			warn!("Skipping {:?}: filename contains a reserved character", name);
			continue;
		}
		names.push(name);
	}

	names.sort();
	Ok(names)
}

/// Compare the directory with the checkpoint log
///
/// Fails only when the directory itself cannot be listed. Files that cannot
/// be read are recorded in `ChangeSet::skipped`.
pub async fn detect_changes(
	base_dir: &Path,
	index_file: &str,
	log: &CheckpointLog,
	config: ChunkConfig,
) -> io::Result<ChangeSet> {
	let mut changes = ChangeSet::default();

	for name in list_files(base_dir, index_file).await? {
		let hashes = match chunking::hash_file(&base_dir.join(&name), config).await {
			Ok(hashes) => hashes,
			Err(e) => {
				warn!("Cannot hash {}: {}", name, e);
				changes.skipped.insert(name);
				continue;
			}
		};

		let entry = match log.get(&name) {
			Some(record) => {
				let status = if record.blocks == BlockList::Alive(hashes.clone()) {
					FileStatus::Unchanged
				} else {
					FileStatus::Modified
				};
				LocalEntry { metadata: FileMetadata::new(&name, record.version, hashes), status }
			}
			None => LocalEntry { metadata: FileMetadata::new(&name, 1, hashes), status: FileStatus::New },
		};
		debug!("{}: {:?} at version {}", name, entry.status, entry.metadata.version);
		changes.entries.insert(name, entry);
	}

	for record in log.iter() {
		if changes.entries.contains_key(&record.filename) || changes.skipped.contains(&record.filename) {
			continue;
		}
		if is_reserved_name(&record.filename, index_file) || !util::is_syncable_name(&record.filename) {
			warn!("Ignoring checkpoint record for reserved name {:?}", record.filename);
			continue;
		}
		let version = if record.is_tombstone() { record.version } else { record.version + 1 };
		debug!("{}: Deleted at version {}", record.filename, version);
		changes.entries.insert(
			record.filename.clone(),
			LocalEntry {
				metadata: FileMetadata::tombstone(&record.filename, version),
				status: FileStatus::Deleted,
			},
		);
	}

	Ok(changes)
}

/// Remove temporary files left behind by an interrupted pass
pub async fn cleanup_temp_files(base_dir: &Path) -> io::Result<usize> {
	let mut count = 0;
	let mut entries = tokio::fs::read_dir(base_dir).await?;

	while let Some(entry) = entries.next_entry().await? {
		if !entry.file_name().to_string_lossy().ends_with(TEMP_SUFFIX) {
			continue;
		}
		match tokio::fs::remove_file(entry.path()).await {
			Ok(()) => count += 1,
			Err(e) => warn!("Cannot remove temporary file {}: {}", entry.path().display(), e),
		}
	}

	if count > 0 {
		info!("Removed {} orphaned temporary files", count);
	}
	Ok(count)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::checkpoint::DEFAULT_INDEX_FILE;
	use std::fs;
	use tempfile::TempDir;

	const BS: ChunkConfig = ChunkConfig { block_size: 4 };

	fn log_for(dir: &TempDir, contents: &str) -> CheckpointLog {
		CheckpointLog::parse(dir.path().join(DEFAULT_INDEX_FILE), contents)
	}

	#[tokio::test]
	async fn test_new_file() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join("a.txt"), b"0123456789").unwrap();

		let changes = detect_changes(dir.path(), DEFAULT_INDEX_FILE, &log_for(&dir, ""), BS)
			.await
			.unwrap();
		let entry = changes.get("a.txt").unwrap();
		assert_eq!(entry.status, FileStatus::New);
		assert_eq!(entry.metadata.version, 1);
		assert_eq!(entry.metadata.blocks.hashes().len(), 3);
	}

	#[tokio::test]
	async fn test_unchanged_and_modified() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join("same"), b"abcdefg").unwrap();
		fs::write(dir.path().join("changed"), b"abcdefg").unwrap();
		fs::write(dir.path().join("longer"), b"abcdefgh1").unwrap();

		let hashes = chunking::hash_blocks(b"abcdefg", BS).join(" ");
		let log = log_for(&dir, &format!("same,3,{h}\nchanged,2,{h}\nlonger,1,{h}\n", h = hashes));
		fs::write(dir.path().join("changed"), b"abcdefX").unwrap();

		let changes = detect_changes(dir.path(), DEFAULT_INDEX_FILE, &log, BS).await.unwrap();
		assert_eq!(changes.get("same").unwrap().status, FileStatus::Unchanged);
		assert_eq!(changes.get("same").unwrap().metadata.version, 3);
		assert_eq!(changes.get("changed").unwrap().status, FileStatus::Modified);
		assert_eq!(changes.get("changed").unwrap().metadata.version, 2);
		assert_eq!(changes.get("longer").unwrap().status, FileStatus::Modified);
	}

	#[tokio::test]
	async fn test_deleted_bumps_version_once() {
		let dir = TempDir::new().unwrap();
		let log = log_for(&dir, "gone,4,h1\nold,7,0\n");

		let changes = detect_changes(dir.path(), DEFAULT_INDEX_FILE, &log, BS).await.unwrap();
		let gone = changes.get("gone").unwrap();
		assert_eq!(gone.status, FileStatus::Deleted);
		assert_eq!(gone.metadata, FileMetadata::tombstone("gone", 5));

		let old = changes.get("old").unwrap();
		assert_eq!(old.status, FileStatus::Deleted);
		assert_eq!(old.metadata.version, 7);
	}

	#[tokio::test]
	async fn test_revived_tombstone_is_modified() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join("back"), b"again").unwrap();
		let log = log_for(&dir, "back,2,0\n");

		let changes = detect_changes(dir.path(), DEFAULT_INDEX_FILE, &log, BS).await.unwrap();
		let entry = changes.get("back").unwrap();
		assert_eq!(entry.status, FileStatus::Modified);
		assert_eq!(entry.metadata.version, 2);
	}

	#[tokio::test]
	async fn test_reserved_entries_are_ignored() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join(DEFAULT_INDEX_FILE), b"").unwrap();
		fs::write(dir.path().join("x.blocksync-tmp"), b"partial").unwrap();
		fs::write(dir.path().join("a,b"), b"comma").unwrap();
		fs::create_dir(dir.path().join("sub")).unwrap();
		fs::write(dir.path().join("keep"), b"k").unwrap();

		let names = list_files(dir.path(), DEFAULT_INDEX_FILE).await.unwrap();
		assert_eq!(names, vec!["keep".to_string()]);
	}

	#[tokio::test]
	async fn test_reserved_records_never_become_deletions() {
		let dir = TempDir::new().unwrap();
		let log = log_for(&dir, "index.txt,1,h1\nx.blocksync-tmp,2,h2\n..,1,h3\n");

		let changes = detect_changes(dir.path(), DEFAULT_INDEX_FILE, &log, BS).await.unwrap();
		assert!(changes.entries.is_empty());
	}

	#[test]
	fn test_reserved_names() {
		assert!(is_reserved_name("index.txt", "index.txt"));
		assert!(is_reserved_name("a.blocksync-tmp", "ledger.txt"));
		assert!(!is_reserved_name("index.txt", "ledger.txt"));
	}

	#[tokio::test]
	async fn test_cleanup_temp_files() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join("a.blocksync-tmp"), b"x").unwrap();
		fs::write(dir.path().join("a"), b"x").unwrap();

		assert_eq!(cleanup_temp_files(dir.path()).await.unwrap(), 1);
		assert!(dir.path().join("a").exists());
		assert!(!dir.path().join("a.blocksync-tmp").exists());
	}
}

// vim: ts=4
