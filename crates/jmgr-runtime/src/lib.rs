//! Host execution layer for jmgr.
//!
//! Everything jmgr does to the system runs through the `ProcessGateway` trait:
//! captured, attached and piped invocations of the FreeBSD base tools, plus the
//! two host questions (name lookup, privilege). `SystemGateway` is the real
//! implementation and `MockGateway` the scripted one used in tests. On top of
//! it sit host probes, prerequisite checking and the `base.txz` media cache.

pub mod gateway;
pub mod host;
pub mod image;
pub mod mock;
pub mod prereq;
pub mod tools;

pub use gateway::{Invocation, ProcessGateway, SystemGateway};
pub use image::OsImageCache;
pub use mock::{Call, MockGateway};
pub use prereq::{check_jail_prereqs, format_missing, MissingPrereq};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("command '{command}' failed: {detail}")]
    CommandFailed { command: String, detail: String },
    #[error("receiver reported: {0}")]
    PipelineReport(String),
    #[error("host probe failed: {0}")]
    Probe(String),
    #[error("runtime execution failed: {0}")]
    ExecFailed(String),
}
