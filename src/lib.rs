//! # blocksync - Block-Level Directory Synchronizer
//!
//! blocksync keeps a flat local directory in sync with a remote made of two
//! services: a content-addressed block store and a versioned metadata store.
//! Files are split into fixed-size blocks identified by their BLAKE3 hash;
//! every file carries a version number, and the metadata store accepts an
//! update only when it is exactly one version ahead (compare-and-swap).
//! Deletions are recorded as tombstones.
//!
//! The last-synced state of the directory lives in a plain text checkpoint
//! log (`index.txt`) inside the directory itself.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use blocksync::store::MemoryStore;
//! use blocksync::sync::SyncBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::new();
//!     let result = SyncBuilder::new().base_dir("./dir").sync(&store.remote()).await?;
//!     println!("Pushed {} files", result.files_pushed);
//!     Ok(())
//! }
//! ```

pub mod checkpoint;
pub mod chunking;
pub mod config;
pub mod error;
pub mod logging;
pub mod scan;
pub mod store;
pub mod sync;
pub mod types;
pub mod util;

mod sync_impl;

pub use sync_impl::decision;

// Re-export commonly used types and functions
pub use config::Config;
pub use error::{CheckpointError, ChunkError, ConfigError, StoreError, SyncError};
pub use store::Remote;
pub use types::{BlockList, FileMetadata, FileStatus, SyncResult};

// vim: ts=4
