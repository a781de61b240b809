use crate::types::{SnapshotName, VolumeName};
use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// Whether a jail is listed in `jail_list` and started at boot.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum BootPolicy {
    Yes,
    #[default]
    No,
}

impl fmt::Display for BootPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootPolicy::Yes => write!(f, "Yes"),
            BootPolicy::No => write!(f, "No"),
        }
    }
}

/// Parent of a hierarchical jail named `<parent>.<child>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Parent {
    /// Confirmed by the parent's live child counter, or assumed from the
    /// naming convention when the caller cannot probe.
    Named(String),
    /// The child counter probe failed.
    Undetermined(String),
}

impl Parent {
    pub fn name(&self) -> &str {
        match self {
            Parent::Named(name) | Parent::Undetermined(name) => name,
        }
    }
}

impl fmt::Display for Parent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parent::Named(name) => f.write_str(name),
            Parent::Undetermined(name) => write!(f, "{name} (can't determine parent)"),
        }
    }
}

/// Canonical record of one jail, reconciled from `jls(8)`, declaration files,
/// `rc.conf` and ZFS.
///
/// The runtime fields use the `jls --libxo json` key names so that status
/// reports decode straight into this type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Jail {
    #[serde(rename = "jid")]
    pub runtime_id: u32,
    pub hostname: String,
    pub name: String,
    pub state: String,
    #[serde(rename = "cpusetid")]
    pub cpuset_id: u32,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_volume: Option<VolumeName>,
    pub config_path: String,
    pub os_version: String,
    pub start_on_boot: BootPolicy,
    pub interface: String,
    pub ipv4: String,
    pub ipv4_inherit: String,
    pub ipv4_addrs: Vec<String>,
    pub ipv6_addrs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Parent>,
    pub is_parent: bool,
    pub snapshots: Vec<SnapshotName>,
}

impl Jail {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.runtime_id > 0
    }

    #[inline]
    pub fn is_child(&self) -> bool {
        self.parent.is_some()
    }

    #[inline]
    pub fn is_volume_backed(&self) -> bool {
        self.storage_volume.is_some()
    }

    /// `(parent, child)` split of a dotted name, on the first `.`.
    pub fn family(&self) -> Option<(&str, &str)> {
        self.name
            .split_once('.')
            .filter(|(parent, child)| !parent.is_empty() && !child.is_empty())
    }
}

/// `jls -v --libxo json` document.
#[derive(Debug, Default, Deserialize)]
pub struct StatusReport {
    #[serde(rename = "__version", default)]
    pub version: String,
    #[serde(rename = "jail-information", default)]
    pub information: JailInformation,
}

#[derive(Debug, Default, Deserialize)]
pub struct JailInformation {
    #[serde(default)]
    pub jail: Vec<Jail>,
}

pub fn parse_status_report(input: &[u8]) -> Result<Vec<Jail>, SchemaError> {
    let report: StatusReport = serde_json::from_slice(input)?;
    Ok(report.information.jail)
}

/// Provisioning descriptor for a jail being created or cloned. Lives until its
/// declaration file has been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJail {
    pub name: String,
    pub ip: Option<Ipv4Addr>,
    pub interface: String,
    pub inherit_ip: bool,
    pub storage_volume: Option<VolumeName>,
    pub filesystem_path: PathBuf,
    pub config_path: PathBuf,
}

impl NewJail {
    /// IP section substituted for `<IPConf>` in the declaration template.
    pub fn ip_conf(&self) -> String {
        match self.ip {
            Some(ip) if !self.inherit_ip => {
                format!("ip4.addr = {ip};\n\tinterface = {};", self.interface)
            }
            _ => "ip4 = inherit;".to_owned(),
        }
    }
}
