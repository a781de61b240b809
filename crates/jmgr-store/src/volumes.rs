use crate::StoreError;
use chrono::{DateTime, Local};
use jmgr_runtime::{tools, Invocation, ProcessGateway};
use jmgr_schema::{SnapshotName, VolumeName};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SNAPSHOT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// `<volume>@<YYYY-MM-DDTHH:MM:SS>` for the given local time.
pub fn snapshot_name_at(volume: &VolumeName, at: &DateTime<Local>) -> SnapshotName {
    SnapshotName::new(format!("{volume}@{}", at.format(SNAPSHOT_FORMAT)))
}

/// ZFS datasets backing jails.
pub struct VolumeStore<'g> {
    gw: &'g dyn ProcessGateway,
}

impl<'g> VolumeStore<'g> {
    pub fn new(gw: &'g dyn ProcessGateway) -> Self {
        Self { gw }
    }

    fn zfs(&self, args: &[&str]) -> Result<String, StoreError> {
        let out = self
            .gw
            .output(&Invocation::new(tools::ZFS).args(args.iter().copied()))?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// True when `zfs list <target>` succeeds. Works for datasets and
    /// snapshots alike.
    pub fn exists(&self, target: &str) -> bool {
        self.zfs(&["list", target]).is_ok()
    }

    /// Raw `zfs list <target>` output.
    pub fn describe(&self, target: &str) -> Result<String, StoreError> {
        self.zfs(&["list", target])
    }

    /// Dataset mounted at `path`, accepted only when its last component is
    /// `name`.
    pub fn dataset_for_path(&self, path: &Path, name: &str) -> Option<VolumeName> {
        let listing = match self.zfs(&["list", "-H", &path.display().to_string()]) {
            Ok(listing) => listing,
            Err(e) => {
                debug!("no dataset for {}: {e}", path.display());
                return None;
            }
        };
        let dataset = VolumeName::new(listing.split_whitespace().next()?);
        (dataset.leaf() == name).then_some(dataset)
    }

    /// Mountpoint column (fifth) of `zfs list -H <dataset>`.
    pub fn base_mountpoint(&self, dataset: &str) -> Result<PathBuf, StoreError> {
        let listing = self.zfs(&["list", "-H", dataset])?;
        listing
            .split_whitespace()
            .nth(4)
            .map(PathBuf::from)
            .ok_or_else(|| StoreError::UnexpectedListing {
                target: dataset.to_owned(),
                detail: format!("can't find a mountpoint in '{}'", listing.trim()),
            })
    }

    pub fn mountpoint(&self, volume: &VolumeName) -> Result<PathBuf, StoreError> {
        let listing = self.zfs(&["list", "-H", "-o", "mountpoint", volume.as_str()])?;
        match listing.lines().next().map(str::trim) {
            Some(line) if !line.is_empty() => Ok(PathBuf::from(line)),
            _ => Err(StoreError::UnexpectedListing {
                target: volume.to_string(),
                detail: "empty mountpoint".to_owned(),
            }),
        }
    }

    pub fn create(&self, volume: &VolumeName) -> Result<(), StoreError> {
        self.zfs(&["create", volume.as_str()])?;
        info!("created dataset {volume}");
        Ok(())
    }

    /// Snapshot `volume` with the current local time as tag.
    pub fn snapshot(&self, volume: &VolumeName) -> Result<SnapshotName, StoreError> {
        let name = snapshot_name_at(volume, &Local::now());
        self.zfs(&["snapshot", name.as_str()])?;
        info!("created snapshot {name}");
        Ok(name)
    }

    /// `zfs list -H -t snapshot -o name <volume>` split on newlines, blank
    /// trailing row included.
    pub fn snapshot_lines(&self, volume: &VolumeName) -> Result<Vec<String>, StoreError> {
        let listing = self.zfs(&["list", "-H", "-t", "snapshot", "-o", "name", volume.as_str()])?;
        Ok(listing.split('\n').map(str::to_owned).collect())
    }

    /// Snapshots of `volume`, oldest first.
    pub fn snapshots_of(&self, volume: &VolumeName) -> Result<Vec<SnapshotName>, StoreError> {
        Ok(self
            .snapshot_lines(volume)?
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .filter(|line| line.split_whitespace().nth(1) != Some("-"))
            .map(SnapshotName::new)
            .collect())
    }

    pub fn latest_snapshot(&self, volume: &VolumeName) -> Result<SnapshotName, StoreError> {
        latest_of(&self.snapshot_lines(volume)?)
            .map(SnapshotName::new)
            .ok_or_else(|| StoreError::NoSnapshots(volume.to_string()))
    }

    pub fn rollback(&self, snapshot: &SnapshotName) -> Result<(), StoreError> {
        self.zfs(&["rollback", snapshot.as_str()])?;
        info!("rolled back to {snapshot}");
        Ok(())
    }

    pub fn destroy_snapshot(&self, snapshot: &SnapshotName) -> Result<(), StoreError> {
        self.zfs(&["destroy", snapshot.as_str()])?;
        info!("destroyed snapshot {snapshot}");
        Ok(())
    }

    pub fn destroy(&self, volume: &VolumeName) -> Result<(), StoreError> {
        self.gw
            .attached(&Invocation::new(tools::ZFS).args(["destroy", volume.as_str()]))?;
        info!("destroyed dataset {volume}");
        Ok(())
    }

    /// Destroy `volume` with all its snapshots and descendants.
    pub fn destroy_recursive(&self, volume: &VolumeName) -> Result<(), StoreError> {
        self.gw.attached(
            &Invocation::new(tools::ZFS).args(["destroy", "-r", "-f", volume.as_str()]),
        )?;
        info!("destroyed dataset {volume} recursively");
        Ok(())
    }
}

/// Second-to-last line: the listing ends with a newline, so the last element
/// is always blank.
fn latest_of(lines: &[String]) -> Option<&str> {
    if lines.len() < 2 {
        return None;
    }
    lines.get(lines.len() - 2).map(String::as_str)
}
