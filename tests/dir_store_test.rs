//! Sync through a store directory shared by independent clients

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use blocksync::config::Config;
use blocksync::error::SyncError;
use blocksync::store::{MetaStore, Remote};
use blocksync::sync::{self, SyncBuilder};
use blocksync::types::{FileStatus, SyncResult};

async fn run_sync(dir: &Path, store_dir: &Path) -> SyncResult {
	// Each pass opens its own handle, as a separate process would
	let remote = Remote::open_dir(store_dir).unwrap();
	SyncBuilder::new().base_dir(dir).block_size(8).sync(&remote).await.expect("Sync should succeed")
}

#[tokio::test]
async fn test_two_clients_share_store_dir() {
	let store = TempDir::new().unwrap();
	let alice = TempDir::new().unwrap();
	let bob = TempDir::new().unwrap();

	fs::write(alice.path().join("notes.md"), b"# Notes\n\nsome text that spans blocks\n").unwrap();
	fs::write(alice.path().join("empty"), b"").unwrap();
	run_sync(alice.path(), store.path()).await;

	assert!(store.path().join("meta.json").exists());
	assert!(fs::read_dir(store.path().join("blocks")).unwrap().count() > 0);

	run_sync(bob.path(), store.path()).await;
	assert_eq!(
		fs::read(bob.path().join("notes.md")).unwrap(),
		fs::read(alice.path().join("notes.md")).unwrap()
	);
	assert_eq!(fs::read(bob.path().join("empty")).unwrap(), b"");

	fs::write(bob.path().join("notes.md"), b"# Notes\n\nedited by bob\n").unwrap();
	run_sync(bob.path(), store.path()).await;
	run_sync(alice.path(), store.path()).await;
	assert_eq!(fs::read(alice.path().join("notes.md")).unwrap(), b"# Notes\n\nedited by bob\n");

	let remote = Remote::open_dir(store.path()).unwrap();
	let snapshot = remote.meta().get_file_info_map().await.unwrap();
	assert_eq!(snapshot["notes.md"].version, 2);
	assert_eq!(snapshot["empty"].version, 1);
}

#[tokio::test]
async fn test_corrupted_block_is_rejected() {
	let store = TempDir::new().unwrap();
	let alice = TempDir::new().unwrap();
	let bob = TempDir::new().unwrap();
	fs::write(alice.path().join("f"), b"12345678").unwrap();
	run_sync(alice.path(), store.path()).await;

	let block = store.path().join("blocks").join(blocksync::util::hash(b"12345678"));
	fs::write(&block, b"tampered").unwrap();

	let result = run_sync(bob.path(), store.path()).await;
	assert_eq!(result.files_failed, 1);
	assert!(!bob.path().join("f").exists());
}

#[tokio::test]
async fn test_status_reports_local_changes() {
	let store = TempDir::new().unwrap();
	let dir = TempDir::new().unwrap();
	fs::write(dir.path().join("kept"), b"kept").unwrap();
	fs::write(dir.path().join("edited"), b"before").unwrap();
	fs::write(dir.path().join("removed"), b"removed").unwrap();
	run_sync(dir.path(), store.path()).await;

	fs::write(dir.path().join("edited"), b"after").unwrap();
	fs::remove_file(dir.path().join("removed")).unwrap();
	fs::write(dir.path().join("added"), b"added").unwrap();

	let config = SyncBuilder::new().base_dir(dir.path()).block_size(8).build();
	let changes = sync::status(&config).await.unwrap();
	assert_eq!(changes.get("kept").unwrap().status, FileStatus::Unchanged);
	assert_eq!(changes.get("edited").unwrap().status, FileStatus::Modified);
	assert_eq!(changes.get("removed").unwrap().status, FileStatus::Deleted);
	assert_eq!(changes.get("added").unwrap().status, FileStatus::New);
}

#[tokio::test]
async fn test_missing_base_dir_fails() {
	let store = TempDir::new().unwrap();
	let remote = Remote::open_dir(store.path()).unwrap();
	let config = Config { base_dir: store.path().join("does-not-exist"), ..Config::default() };

	let result = sync::sync(&config, &remote).await;
	assert!(matches!(result, Err(SyncError::Io(_))));
}

// vim: ts=4
