//! Per-file push/pull decision rule
//!
//! A filename missing from the remote snapshot is compared as version 0, so
//! anything tracked locally but unknown to the store is pushed.

use std::collections::BTreeSet;

use crate::logging::*;
use crate::scan;
use crate::types::{ChangeSet, FileMetadata, FileStatus, LocalEntry, RemoteSnapshot};
use crate::util;

/// What to do with one file in this pass
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
	/// Local and remote agree
	Noop,
	/// Local content matches the remote already; only the record is updated
	Adopt(FileMetadata),
	/// Upload to the store with the given target metadata
	Push(FileMetadata),
	/// Make the local file match the remote metadata
	Pull(FileMetadata),
	/// File could not be scanned, or the name cannot be stored locally;
	/// leave everything as it is
	Skip,
}

/// Metadata a push should submit for a local entry
pub fn push_target(entry: &LocalEntry) -> FileMetadata {
	let mut target = entry.metadata.clone();
	if entry.status == FileStatus::Modified {
		target.version += 1;
	}
	target
}

/// Decide the action for a single file
pub fn decide(local: Option<&LocalEntry>, remote: Option<&FileMetadata>) -> Action {
	let Some(local) = local else {
		return match remote {
			Some(remote) => Action::Pull(remote.clone()),
			None => Action::Noop,
		};
	};

	let local_version = local.metadata.version;
	let remote_version = remote.map(|r| r.version).unwrap_or(0);

	if local.status == FileStatus::Deleted {
		// Remote wins ties: a tombstone is only pushed when strictly newer
		return match remote {
			Some(remote) if remote.is_tombstone() && local_version == remote_version => Action::Noop,
			Some(remote) if local_version <= remote_version => Action::Pull(remote.clone()),
			_ => Action::Push(local.metadata.clone()),
		};
	}

	if local_version == remote_version {
		match local.status {
			FileStatus::Unchanged => return Action::Noop,
			FileStatus::Modified => return Action::Push(push_target(local)),
			_ => {}
		}
	}
	if local_version > remote_version {
		return Action::Push(push_target(local));
	}

	match remote {
		Some(remote) if remote.blocks == local.metadata.blocks => Action::Adopt(remote.clone()),
		Some(remote) => Action::Pull(remote.clone()),
		None => Action::Noop,
	}
}

/// Decisions for every filename known locally or remotely, sorted by name
///
/// Remote names that are not a single plain path component, or that this
/// client reserves for its log and temporary files, are skipped.
pub fn plan(changes: &ChangeSet, snapshot: &RemoteSnapshot, index_file: &str) -> Vec<(String, Action)> {
	let names: BTreeSet<&String> =
		changes.entries.keys().chain(changes.skipped.iter()).chain(snapshot.keys()).collect();

	names
		.into_iter()
		.map(|name| {
			let action = if changes.skipped.contains(name) {
				Action::Skip
			} else if !util::is_syncable_name(name) || scan::is_reserved_name(name, index_file) {
				warn!("Skipping remote file {:?}: name cannot be synced into this directory", name);
				Action::Skip
			} else {
				decide(changes.entries.get(name), snapshot.get(name))
			};
			(name.clone(), action)
		})
		.collect()
}


// vim: ts=4
