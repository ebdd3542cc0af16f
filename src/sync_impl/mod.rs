//! Sync pass: scan, decide, transfer, persist
//!
//! One pass makes exactly one decision per filename. A file whose transfer
//! fails is abandoned for the pass and keeps its previous checkpoint record;
//! every other file still proceeds.

pub mod decision;

use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::time::Instant;

use self::decision::Action;
use crate::checkpoint::{self, CheckpointLog};
use crate::chunking::{self, ChunkConfig};
use crate::config::Config;
use crate::error::SyncError;
use crate::logging::*;
use crate::scan;
use crate::store::Remote;
use crate::types::{BlockList, FileMetadata, SyncResult};

/// Applies decisions for one pass and tracks the resulting checkpoint state
struct Reconciler<'a> {
	base_dir: &'a Path,
	chunk: ChunkConfig,
	remote: &'a Remote,
	log: CheckpointLog,
	result: SyncResult,
}

impl<'a> Reconciler<'a> {
	async fn apply(&mut self, name: &str, action: Action) {
		debug!("{}: {:?}", name, action);
		let outcome = match action {
			Action::Noop => {
				self.result.unchanged += 1;
				return;
			}
			Action::Skip => {
				self.result.files_skipped += 1;
				return;
			}
			Action::Adopt(meta) => {
				info!("{} already matches version {}", name, meta.version);
				self.log.upsert(meta);
				self.result.unchanged += 1;
				return;
			}
			Action::Push(target) => self.push(target).await,
			Action::Pull(target) => self.pull(target).await,
		};

		if let Err(e) = outcome {
			error!("Abandoning {} for this pass: {}", name, e);
			self.result.files_failed += 1;
		}
	}

	/// Upload blocks, then submit the metadata; a stale version turns into a pull
	async fn push(&mut self, target: FileMetadata) -> Result<(), SyncError> {
		let pushed = match target.blocks {
			BlockList::Deleted => target,
			BlockList::Alive(_) => {
				let hashes = self.upload(&target.filename).await?;
				FileMetadata::new(target.filename, target.version, hashes)
			}
		};

		match self.remote.meta().update_file(&pushed).await {
			Ok(version) => {
				if pushed.is_tombstone() {
					info!("Pushed deletion of {} (version {})", pushed.filename, version);
				} else {
					info!(
						"Pushed {} version {} ({} blocks)",
						pushed.filename,
						version,
						pushed.blocks.hashes().len()
					);
				}
				self.result.files_pushed += 1;
				self.log.upsert(pushed);
				Ok(())
			}
			Err(e) if e.is_version_conflict() => {
				warn!("{}; taking the store's version", e);
				self.result.conflicts += 1;
				let winner = self.remote.file_info(&pushed.filename).await?;
				self.pull(winner).await
			}
			Err(e) => Err(e.into()),
		}
	}

	/// Re-chunk a local file and upload the blocks the store does not have
	async fn upload(&mut self, filename: &str) -> Result<Vec<String>, SyncError> {
		let store = self.remote.block_store().await?;
		let blocks = chunking::read_blocks(&self.base_dir.join(filename), self.chunk).await?;
		let hashes: Vec<String> = blocks.iter().map(|b| chunking::hash_block(b)).collect();

		let present: HashSet<String> = store.has_blocks(&hashes).await?.into_iter().collect();
		let mut uploaded: HashSet<&str> = HashSet::new();
		for (block, hash) in blocks.iter().zip(&hashes) {
			if present.contains(hash) || !uploaded.insert(hash) {
				continue;
			}
			let stored = store.put_block(block).await?;
			if &stored != hash {
				return Err(SyncError::HashMismatch { expected: hash.clone(), actual: stored });
			}
		}

		debug!(
			"{}: {} blocks, {} uploaded, {} already stored",
			filename,
			hashes.len(),
			uploaded.len(),
			hashes.len() - uploaded.len()
		);
		self.result.blocks_uploaded += uploaded.len();
		Ok(hashes)
	}

	/// Make the local file match `target`
	async fn pull(&mut self, target: FileMetadata) -> Result<(), SyncError> {
		let path = self.base_dir.join(&target.filename);

		match &target.blocks {
			BlockList::Deleted => match tokio::fs::remove_file(&path).await {
				Ok(()) => {
					info!("Deleted {} (version {})", target.filename, target.version);
					self.result.files_deleted += 1;
				}
				Err(e) if e.kind() == io::ErrorKind::NotFound => {
					debug!("{} already absent", target.filename);
				}
				Err(e) => return Err(e.into()),
			},
			BlockList::Alive(hashes) => {
				let content = self.download(hashes).await?;
				write_atomic(&path, &content).await?;
				info!(
					"Pulled {} version {} ({} bytes)",
					target.filename,
					target.version,
					content.len()
				);
				self.result.files_pulled += 1;
			}
		}

		self.log.upsert(target);
		Ok(())
	}

	/// Fetch and verify every block; any failure aborts the whole file
	async fn download(&mut self, hashes: &[String]) -> Result<Vec<u8>, SyncError> {
		let store = self.remote.block_store().await?;
		let mut content = Vec::new();

		for hash in hashes {
			let block = store.get_block(hash).await?;
			let actual = chunking::hash_block(&block);
			if &actual != hash {
				return Err(SyncError::HashMismatch { expected: hash.clone(), actual });
			}
			content.extend_from_slice(&block);
			self.result.blocks_downloaded += 1;
		}

		Ok(content)
	}
}

/// Replace `path` with `content` via a temporary sibling
async fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
	let tmp = checkpoint::temp_path(path);
	tokio::fs::write(&tmp, content).await?;
	if let Err(e) = tokio::fs::rename(&tmp, path).await {
		let _ = tokio::fs::remove_file(&tmp).await;
		return Err(e);
	}
	Ok(())
}

/// Run one complete sync pass for `config.base_dir` against `remote`
pub async fn sync(config: &Config, remote: &Remote) -> Result<SyncResult, SyncError> {
	config.validate()?;
	let start_time = Instant::now();
	let base_dir = config.base_dir.as_path();

	if let Err(e) = scan::cleanup_temp_files(base_dir).await {
		warn!("Cannot clean up temporary files in {}: {}", base_dir.display(), e);
	}

	// ─── PHASE 1: Local state ───
	info!("Loading checkpoint log...");
	let index_path = config.index_path();
	let log = match CheckpointLog::load(&index_path).await {
		Ok(log) => log,
		Err(e) => {
			warn!("{}; continuing with an empty log", e);
			CheckpointLog::empty(index_path)
		}
	};

	info!("Scanning {}...", base_dir.display());
	let changes =
		scan::detect_changes(base_dir, &config.index_file, &log, config.chunk_config()).await?;
	info!(
		"{} tracked records, {} files scanned, {} skipped",
		log.len(),
		changes.entries.len(),
		changes.skipped.len()
	);

	// ─── PHASE 2: Remote snapshot and decisions ───
	let snapshot = remote.meta().get_file_info_map().await?;
	let plan = decision::plan(&changes, &snapshot, &config.index_file);

	// ─── PHASE 3: Transfers ───
	let mut reconciler =
		Reconciler { base_dir, chunk: config.chunk_config(), remote, log, result: SyncResult::default() };
	for (name, action) in plan {
		reconciler.apply(&name, action).await;
	}

	// ─── PHASE 4: Persist ───
	reconciler.log.save().await?;

	let mut result = reconciler.result;
	result.duration = start_time.elapsed();
	info!(
		"Sync complete: {} pushed, {} pulled, {} deleted, {} conflicts, {} failed, {} unchanged in {:?}",
		result.files_pushed,
		result.files_pulled,
		result.files_deleted,
		result.conflicts,
		result.files_failed,
		result.unchanged,
		result.duration
	);
	Ok(result)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_write_atomic_replaces_content() {
		let dir = tempfile::TempDir::new().unwrap();
		let path = dir.path().join("f");
		std::fs::write(&path, b"old content that is longer").unwrap();

		write_atomic(&path, b"new").await.unwrap();
		assert_eq!(std::fs::read(&path).unwrap(), b"new");
		assert!(!checkpoint::temp_path(&path).exists());
	}
}

// vim: ts=4
