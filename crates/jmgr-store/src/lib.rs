//! Storage layer for jmgr jails.
//!
//! `VolumeStore` wraps the ZFS operations on jail datasets (create, snapshot,
//! rollback, destroy, listing), `pipeline` copies one jail's filesystem into
//! another over a two-process pipe, and `tree` handles jails that live in
//! plain directories.

pub mod pipeline;
pub mod tree;
pub mod volumes;

pub use pipeline::{settle_received, Transfer, TransferMode};
pub use tree::{create_root, remove_root};
pub use volumes::{snapshot_name_at, VolumeStore};

use jmgr_runtime::RuntimeError;
use jmgr_schema::SchemaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("no snapshots found for {0}")]
    NoSnapshots(String),
    #[error("unexpected listing for {target}: {detail}")]
    UnexpectedListing { target: String, detail: String },
    #[error("problem with the received snapshot of {0}, can't continue")]
    ReceivedSnapshots(String),
}
