//! The in-memory jail registry, reconciled from every place jails are
//! recorded on a FreeBSD host.
//!
//! Sources, in order: the live `jls(8)` report, per-jail declaration files,
//! the singleton `jail.conf`, `jail_list` in rc.conf, ZFS, and the jails
//! themselves (guest version, child counter). Only the settings are allowed to
//! make the registry unusable; every other source is best-effort.

use jmgr_runtime::{host, tools, Invocation, ProcessGateway};
use jmgr_schema::{
    merge_declaration_file, parse_settings_file, parse_status_report, settings_path, BootPolicy,
    Jail, Parent, Settings, SnapshotName,
};
use jmgr_store::VolumeStore;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct Registry {
    pub settings_path: PathBuf,
    pub settings: Settings,
    pub use_volumes: bool,
    /// Configuration problems. Any entry blocks create and clone.
    pub problems: Vec<String>,
    pub jails: Vec<Jail>,
}

impl Registry {
    /// Read the settings file (`$JMGR_CONFIG` or the default location) and
    /// build the registry.
    pub fn load(gw: &dyn ProcessGateway) -> Self {
        Self::load_from(&settings_path(), gw)
    }

    pub fn load_from(path: &Path, gw: &dyn ProcessGateway) -> Self {
        let (settings, problem) = match parse_settings_file(path) {
            Ok(settings) => (settings, None),
            Err(e) => (Settings::default(), Some(format!("settings: {e}"))),
        };
        let mut registry = Self::empty(path, settings);
        registry.problems.extend(problem);
        registry.populate(gw);
        registry
    }

    /// Build from already parsed settings.
    pub fn from_settings(settings: Settings, gw: &dyn ProcessGateway) -> Self {
        let mut registry = Self::empty(&settings_path(), settings);
        registry.populate(gw);
        registry
    }

    fn empty(path: &Path, settings: Settings) -> Self {
        Self {
            settings_path: path.to_path_buf(),
            use_volumes: settings.volume_dataset.is_some(),
            settings,
            problems: Vec::new(),
            jails: Vec::new(),
        }
    }

    fn populate(&mut self, gw: &dyn ProcessGateway) {
        self.resolve_settings(gw);
        self.add_running(gw);
        self.add_declarations();
        self.add_boot_policy(gw);
        self.add_storage(gw);
        self.add_os_versions(gw);
        self.settle_addresses();
        self.link_families(gw);
        info!(
            "registry: {} jails, {} problems",
            self.jails.len(),
            self.problems.len()
        );
    }

    fn resolve_settings(&mut self, gw: &dyn ProcessGateway) {
        if let Some(dataset) = self.settings.volume_dataset.clone() {
            match VolumeStore::new(gw).base_mountpoint(&dataset) {
                Ok(mountpoint) => self.settings.jails_home = mountpoint,
                Err(e) => self
                    .problems
                    .push(format!("dataset {dataset} does not exist: {e}")),
            }
        } else if !self.settings.jails_home.exists() {
            self.problems.push(format!(
                "jails home {} does not exist",
                self.settings.jails_home.display()
            ));
        }
    }

    fn add_running(&mut self, gw: &dyn ProcessGateway) {
        let report = gw.output(&Invocation::new(tools::JLS).args(["-v", "--libxo", "json"]));
        match report.map_err(|e| e.to_string()).and_then(|out| {
            parse_status_report(&out).map_err(|e| e.to_string())
        }) {
            Ok(running) => self.jails.extend(running),
            Err(e) => warn!("can't list running jails: {e}"),
        }
    }

    fn add_declarations(&mut self) {
        match std::fs::read_dir(&self.settings.jails_conf_d) {
            Ok(entries) => {
                let mut files: Vec<PathBuf> = entries
                    .flatten()
                    .filter(|e| e.file_name().to_string_lossy().contains(".conf"))
                    .map(|e| e.path())
                    .collect();
                files.sort();
                for file in files {
                    merge_declaration_file(&mut self.jails, &file);
                }
            }
            Err(e) => debug!(
                "can't read {}: {e}",
                self.settings.jails_conf_d.display()
            ),
        }
        let legacy = self.settings.legacy_conf.clone();
        merge_declaration_file(&mut self.jails, &legacy);
    }

    fn add_boot_policy(&mut self, gw: &dyn ProcessGateway) {
        let list = host::boot_list(gw).unwrap_or_else(|e| {
            warn!("can't read jail_list: {e}");
            String::new()
        });
        for jail in &mut self.jails {
            jail.start_on_boot = if host::in_boot_list(&list, &jail.name) {
                BootPolicy::Yes
            } else {
                BootPolicy::No
            };
        }
    }

    fn add_storage(&mut self, gw: &dyn ProcessGateway) {
        let volumes = VolumeStore::new(gw);
        for jail in &mut self.jails {
            let path = Path::new(&jail.path);
            if jail.path.is_empty() || !path.is_dir() {
                continue;
            }
            let Some(volume) = volumes.dataset_for_path(path, &jail.name) else {
                continue;
            };
            match volumes.snapshots_of(&volume) {
                Ok(snapshots) => jail.snapshots = snapshots,
                Err(e) => warn!("can't list snapshots of {volume}: {e}"),
            }
            jail.storage_volume = Some(volume);
        }
    }

    fn add_os_versions(&mut self, gw: &dyn ProcessGateway) {
        for jail in &mut self.jails {
            let root = Path::new(&jail.path);
            if jail.path.is_empty() || !root.is_dir() {
                continue;
            }
            match host::guest_release(gw, root) {
                Ok(version) => jail.os_version = version,
                Err(e) => debug!("no os version for {}: {e}", jail.name),
            }
        }
    }

    fn settle_addresses(&mut self) {
        for jail in &mut self.jails {
            if jail.ipv4.is_empty() && !jail.ipv4_addrs.is_empty() {
                jail.ipv4.clone_from(&jail.ipv4_addrs[0]);
            } else if !jail.ipv4_inherit.is_empty() {
                jail.ipv4.clone_from(&jail.ipv4_inherit);
            }
        }
    }

    fn link_families(&mut self, gw: &dyn ProcessGateway) {
        let privileged = gw.privileged();
        for i in 0..self.jails.len() {
            let Some((parent, _)) = self.jails[i].family() else {
                continue;
            };
            let parent = parent.to_owned();
            let Some(p) = self.index_of(&parent) else {
                continue;
            };
            self.jails[p].is_parent = true;

            // Only root can look inside a jail; everyone else gets the naming
            // convention.
            self.jails[i].parent = if privileged {
                match host::child_count(gw, &parent) {
                    Ok(0) => None,
                    Ok(_) => Some(Parent::Named(parent)),
                    Err(e) => {
                        warn!("can't determine parent of {}: {e}", self.jails[i].name);
                        Some(Parent::Undetermined(parent))
                    }
                }
            } else {
                debug!(
                    "assuming {} is a child of {parent} by name",
                    self.jails[i].name
                );
                Some(Parent::Named(parent))
            };
        }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.jails.iter().position(|j| j.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Jail> {
        self.jails.iter().find(|j| j.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Jail> {
        self.jails.iter_mut().find(|j| j.name == name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn jails(&self) -> &[Jail] {
        &self.jails
    }

    pub fn running(&self) -> impl Iterator<Item = &Jail> {
        self.jails.iter().filter(|j| j.is_running())
    }

    pub fn bad_config(&self) -> bool {
        !self.problems.is_empty()
    }

    pub(crate) fn insert(&mut self, jail: Jail) {
        match self.get_mut(&jail.name) {
            Some(existing) => *existing = jail,
            None => self.jails.push(jail),
        }
    }

    pub(crate) fn remove(&mut self, name: &str) {
        self.jails.retain(|j| j.name != name);
    }

    pub(crate) fn set_runtime_id(&mut self, name: &str, runtime_id: u32) {
        if let Some(jail) = self.get_mut(name) {
            jail.runtime_id = runtime_id;
            if runtime_id == 0 {
                jail.state.clear();
            }
        }
    }

    pub(crate) fn set_boot_policy(&mut self, name: &str, policy: BootPolicy) {
        if let Some(jail) = self.get_mut(name) {
            jail.start_on_boot = policy;
        }
    }

    pub(crate) fn add_snapshot(&mut self, name: &str, snapshot: SnapshotName) {
        if let Some(jail) = self.get_mut(name) {
            jail.snapshots.push(snapshot);
        }
    }

    pub(crate) fn forget_snapshot(&mut self, snapshot: &SnapshotName) {
        for jail in &mut self.jails {
            jail.snapshots.retain(|s| s != snapshot);
        }
    }
}
