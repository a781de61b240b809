//! Jail lifecycle engine for jmgr.
//!
//! This crate ties the declaration parser, the ZFS and directory storage layer
//! and the host process gateway together into the `Engine`: the API for
//! creating, cloning, starting, stopping, snapshotting, updating and
//! destroying FreeBSD jails. The `Registry` is the reconciled view of every
//! jail the host knows about.

pub mod concurrency;
pub mod engine;
pub mod lifecycle;
pub mod operator;
pub mod provision;
pub mod registry;

pub use concurrency::{install_signal_handler, shutdown_requested};
pub use engine::{
    CloneOptions, CreateOptions, DestroyOptions, Destroyed, Engine, TransitionOutcome, UpdateKind,
};
pub use lifecycle::{ensure_top_level, plan_transition, Transition};
pub use operator::{AssumeYes, Operator};
pub use provision::NewJailRequest;
pub use registry::Registry;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("need root capabilities to {0}")]
    PermissionDenied(String),
    #[error("jail {0} does not exist")]
    JailNotFound(String),
    #[error("jail {name} is a child of {parent} and must be managed via parent")]
    ManagedByParent { name: String, parent: String },
    #[error("{0}")]
    Validation(String),
    #[error("bad configuration, can't {0} (see 'jmgr config')")]
    BadConfig(String),
    #[error("aborted by operator")]
    Declined,
    #[error("schema error: {0}")]
    Schema(#[from] jmgr_schema::SchemaError),
    #[error("store error: {0}")]
    Store(#[from] jmgr_store::StoreError),
    #[error("runtime error: {0}")]
    Runtime(#[from] jmgr_runtime::RuntimeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
