//! Copying a jail's filesystem into a new jail.
//!
//! Dataset-backed jails are copied with `zfs send | zfs receive`, plain
//! directories with a `tar` stream. Both run as two processes connected by a
//! pipe; see [`ProcessGateway::pipe`].

use crate::volumes::VolumeStore;
use crate::StoreError;
use jmgr_runtime::{tools, Invocation, ProcessGateway};
use jmgr_schema::{SnapshotName, VolumeName};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// `source` is a snapshot, `destination` a dataset to create.
    Volume,
    /// `source` and `destination` are directories.
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub mode: TransferMode,
    pub source: String,
    pub destination: String,
}

impl Transfer {
    pub fn new(mode: TransferMode, source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            mode,
            source: source.into(),
            destination: destination.into(),
        }
    }

    pub fn sender(&self) -> Invocation {
        match self.mode {
            TransferMode::Volume => Invocation::new(tools::ZFS).args(["send", self.source.as_str()]),
            TransferMode::Plain => {
                Invocation::new(tools::TAR).args(["-cf", "-", "-C", self.source.as_str(), "."])
            }
        }
    }

    pub fn receiver(&self) -> Invocation {
        match self.mode {
            TransferMode::Volume => {
                Invocation::new(tools::ZFS).args(["receive", self.destination.as_str()])
            }
            TransferMode::Plain => {
                Invocation::new(tools::TAR).args(["-xpf", "-", "-C", self.destination.as_str()])
            }
        }
    }

    pub fn run(&self, gw: &dyn ProcessGateway) -> Result<(), StoreError> {
        gw.pipe(&self.sender(), &self.receiver())?;
        info!("copied {} to {}", self.source, self.destination);
        Ok(())
    }
}

/// After `zfs receive`, the new dataset carries the sent snapshot. Roll back
/// to it and destroy it, leaving a clean dataset.
///
/// The listing must show at least one snapshot row plus the trailing blank;
/// anything less means the receive did not land as expected.
pub fn settle_received(volumes: &VolumeStore<'_>, dataset: &VolumeName) -> Result<(), StoreError> {
    let lines = volumes.snapshot_lines(dataset)?;
    if lines.len() < 2 {
        return Err(StoreError::ReceivedSnapshots(dataset.to_string()));
    }
    let received = SnapshotName::new(lines[0].as_str());
    volumes.rollback(&received)?;
    volumes.destroy_snapshot(&received)?;
    Ok(())
}
