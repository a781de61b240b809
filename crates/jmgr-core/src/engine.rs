use crate::concurrency::shutdown_requested;
use crate::lifecycle::{ensure_top_level, plan_transition, Transition};
use crate::operator::Operator;
use crate::provision::{self, NewJailRequest};
use crate::registry::Registry;
use crate::CoreError;
use jmgr_runtime::{host, tools, Invocation, OsImageCache, ProcessGateway};
use jmgr_schema::{write_declaration, BootPolicy, Jail, NewJail, SnapshotName, VolumeName};
use jmgr_store::{create_root, remove_root, settle_received, Transfer, TransferMode, VolumeStore};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pause between stopping a jail and removing its storage.
const DESTROY_SETTLE: Duration = Duration::from_millis(500);
/// Pause between the stop and start around a release upgrade.
const RESTART_SETTLE: Duration = Duration::from_millis(200);

/// Runs jail operations against the host.
///
/// Every external effect goes through the `ProcessGateway`; every question
/// to the operator goes through the `Operator`. The registry is kept in step
/// with what was done, so a single engine can run several operations.
pub struct Engine<'a> {
    gw: &'a dyn ProcessGateway,
    operator: &'a dyn Operator,
    registry: Registry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    /// The jail was already in the requested state.
    Unchanged,
}

#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub request: NewJailRequest,
    /// Release to install, e.g. `14.1-RELEASE`. Defaults to the host release.
    pub release: Option<String>,
    pub force: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CloneOptions {
    pub source: String,
    pub request: NewJailRequest,
    pub force: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DestroyOptions {
    pub force: bool,
    /// Destroy the dataset together with its snapshots.
    pub recursive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destroyed {
    Jail(String),
    Snapshot(SnapshotName),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateKind {
    /// Apply patches for the installed release.
    Patch,
    /// Upgrade to another release; `None` means the host release.
    Release(Option<String>),
    /// Update packages inside the jail.
    Packages,
}

impl<'a> Engine<'a> {
    pub fn new(registry: Registry, gw: &'a dyn ProcessGateway, operator: &'a dyn Operator) -> Self {
        Self {
            gw,
            operator,
            registry,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn volumes(&self) -> VolumeStore<'a> {
        VolumeStore::new(self.gw)
    }

    fn require_privilege(&self, action: &str) -> Result<(), CoreError> {
        if self.gw.privileged() {
            Ok(())
        } else {
            Err(CoreError::PermissionDenied(action.to_owned()))
        }
    }

    fn lookup(&self, name: &str) -> Result<&Jail, CoreError> {
        self.registry
            .get(name)
            .ok_or_else(|| CoreError::JailNotFound(name.to_owned()))
    }

    /// A privileged caller, an existing jail, and not a child.
    fn top_level(&self, name: &str, action: &str) -> Result<Jail, CoreError> {
        self.require_privilege(action)?;
        let jail = self.lookup(name)?;
        ensure_top_level(jail)?;
        Ok(jail.clone())
    }

    fn confirm_unless(&self, force: bool, question: &str) -> Result<(), CoreError> {
        if force || self.operator.confirm(question) {
            Ok(())
        } else {
            Err(CoreError::Declined)
        }
    }

    fn require_volume(jail: &Jail, action: &str) -> Result<VolumeName, CoreError> {
        jail.storage_volume.clone().ok_or_else(|| {
            CoreError::Validation(format!(
                "{} is not backed by a ZFS dataset, can't {action}",
                jail.name
            ))
        })
    }

    fn apply(&mut self, jail: &Jail, transition: Transition) -> Result<TransitionOutcome, CoreError> {
        let Some(invocation) = plan_transition(jail, transition, &self.registry.settings) else {
            debug!("{} already in requested state for {transition}", jail.name);
            return Ok(TransitionOutcome::Unchanged);
        };
        self.operator
            .progress(&format!("{transition} {}", jail.name));
        self.gw.output(&invocation)?;
        match transition {
            Transition::Stop => self.registry.set_runtime_id(&jail.name, 0),
            Transition::Start | Transition::Restart => self.refresh_runtime_id(&jail.name),
        }
        self.operator.done(&format!("{transition} {}", jail.name));
        info!("{transition} {}", jail.name);
        Ok(TransitionOutcome::Applied)
    }

    fn refresh_runtime_id(&mut self, name: &str) {
        match host::jail_id(self.gw, name) {
            Ok(jid) => self.registry.set_runtime_id(name, jid),
            Err(e) => warn!("can't read jail id of {name}: {e}"),
        }
    }

    fn stop_if_running(&mut self, name: &str) -> Result<(), CoreError> {
        let jail = self.lookup(name)?.clone();
        if jail.is_running() {
            self.apply(&jail, Transition::Stop)?;
        }
        Ok(())
    }

    pub fn start(&mut self, name: &str) -> Result<TransitionOutcome, CoreError> {
        let jail = self.top_level(name, "start jails")?;
        self.apply(&jail, Transition::Start)
    }

    pub fn stop(&mut self, name: &str) -> Result<TransitionOutcome, CoreError> {
        let jail = self.top_level(name, "stop jails")?;
        self.apply(&jail, Transition::Stop)
    }

    pub fn restart(&mut self, name: &str) -> Result<TransitionOutcome, CoreError> {
        let jail = self.top_level(name, "restart jails")?;
        self.apply(&jail, Transition::Restart)
    }

    /// Apply `transition` to every top-level jail, in registry order. Stops
    /// between jails once an interrupt was received.
    pub fn transition_all(
        &mut self,
        transition: Transition,
    ) -> Result<Vec<(String, TransitionOutcome)>, CoreError> {
        self.require_privilege(&format!("{transition} jails"))?;
        let targets: Vec<Jail> = self
            .registry
            .jails()
            .iter()
            .filter(|j| !j.is_child())
            .cloned()
            .collect();
        let mut outcomes = Vec::with_capacity(targets.len());
        for jail in targets {
            if shutdown_requested() {
                warn!("interrupted, skipping remaining jails");
                break;
            }
            let outcome = self.apply(&jail, transition)?;
            outcomes.push((jail.name, outcome));
        }
        Ok(outcomes)
    }

    /// Install a new jail from a FreeBSD release archive.
    pub fn create(&mut self, options: CreateOptions) -> Result<NewJail, CoreError> {
        self.require_privilege("create jails")?;
        if self.registry.bad_config() {
            return Err(CoreError::BadConfig("create jails".to_owned()));
        }
        let mut new_jail = provision::plan_new_jail(
            &self.registry,
            self.gw,
            self.operator,
            &options.request,
            options.force,
        )?;
        let release = match options.release {
            Some(release) => release,
            None => host::host_release(self.gw)?,
        };

        for line in provision::describe(&new_jail) {
            self.operator.notice(&line);
        }
        self.operator.notice(&format!("Jail OS: {release}"));
        self.confirm_unless(options.force, &format!("Create jail {}?", new_jail.name))?;

        let settings = self.registry.settings.clone();
        let operator = self.operator;
        let progress = |message: &str| operator.progress(message);
        let cache = OsImageCache::new(&settings.os_media_dir, &settings.os_url_prefix);
        let archive = cache.ensure_release(self.gw, &release, &progress)?;

        if let Some(volume) = &new_jail.storage_volume {
            let volumes = self.volumes();
            volumes.create(volume)?;
            new_jail.filesystem_path = volumes.mountpoint(volume)?;
        } else {
            create_root(&new_jail.filesystem_path)?;
        }
        cache.unpack(self.gw, &archive, &new_jail.filesystem_path, &progress)?;
        operator.done(&format!("installed {release}"));

        write_declaration(&settings.template, &new_jail)?;
        self.registry.insert(registered(&new_jail, release));
        if let Some(script) = &settings.post_install {
            provision::run_post_install(self.gw, script, &new_jail)?;
        }
        info!("created jail {}", new_jail.name);
        Ok(new_jail)
    }

    /// Copy an existing jail into a new one.
    pub fn clone_jail(&mut self, options: CloneOptions) -> Result<NewJail, CoreError> {
        self.require_privilege("clone jails")?;
        if self.registry.bad_config() {
            return Err(CoreError::BadConfig("clone jails".to_owned()));
        }
        let source = self.top_level(&options.source, "clone jails")?;
        let mut new_jail = provision::plan_new_jail(
            &self.registry,
            self.gw,
            self.operator,
            &options.request,
            options.force,
        )?;

        self.operator.notice(&format!("Source Jail: {}", source.name));
        for line in provision::describe(&new_jail) {
            self.operator.notice(&line);
        }
        self.confirm_unless(
            options.force,
            &format!("Clone {} to {}?", source.name, new_jail.name),
        )?;

        match &source.storage_volume {
            Some(volume) => self.clone_volume(&source.name, volume, &new_jail)?,
            None => {
                new_jail.storage_volume = None;
                new_jail.filesystem_path = self.registry.settings.jails_home.join(&new_jail.name);
                self.clone_tree(&source, &new_jail, options.force)?;
            }
        }

        write_declaration(&self.registry.settings.template, &new_jail)?;
        self.registry
            .insert(registered(&new_jail, source.os_version.clone()));
        info!("cloned {} to {}", source.name, new_jail.name);
        Ok(new_jail)
    }

    fn clone_volume(
        &mut self,
        source: &str,
        volume: &VolumeName,
        new_jail: &NewJail,
    ) -> Result<(), CoreError> {
        let destination = new_jail.storage_volume.clone().ok_or_else(|| {
            CoreError::Validation(format!(
                "{source} lives on a ZFS dataset but no volume_dataset is configured"
            ))
        })?;
        let volumes = self.volumes();
        let snapshot = volumes.snapshot(volume)?;
        self.registry.add_snapshot(source, snapshot.clone());

        self.operator
            .progress(&format!("sending {snapshot} to {destination}"));
        Transfer::new(TransferMode::Volume, snapshot.as_str(), destination.as_str())
            .run(self.gw)?;
        settle_received(&volumes, &destination)?;
        self.operator.done(&format!("received {destination}"));
        Ok(())
    }

    fn clone_tree(&mut self, source: &Jail, new_jail: &NewJail, force: bool) -> Result<(), CoreError> {
        if new_jail.filesystem_path.exists() {
            return Err(CoreError::Validation(format!(
                "{} already exists",
                new_jail.filesystem_path.display()
            )));
        }
        if source.is_running() {
            self.confirm_unless(
                force,
                &format!("{} is running and must be stopped to clone it. Stop it?", source.name),
            )?;
            self.apply(source, Transition::Stop)?;
        }
        create_root(&new_jail.filesystem_path)?;
        self.operator.progress(&format!(
            "copying {} to {}",
            source.path,
            new_jail.filesystem_path.display()
        ));
        Transfer::new(
            TransferMode::Plain,
            source.path.as_str(),
            new_jail.filesystem_path.display().to_string(),
        )
        .run(self.gw)?;
        self.operator.done("copy finished");
        Ok(())
    }

    /// Snapshot a dataset-backed jail with the current local time as tag.
    pub fn snapshot(&mut self, name: &str) -> Result<SnapshotName, CoreError> {
        let jail = self.top_level(name, "take snapshots")?;
        let volume = Self::require_volume(&jail, "snapshot it")?;
        let snapshot = self.volumes().snapshot(&volume)?;
        self.registry.add_snapshot(name, snapshot.clone());
        Ok(snapshot)
    }

    /// Roll a jail back to its latest snapshot. `snapshot` is either a full
    /// `<volume>@<tag>` identifier or just the tag.
    pub fn rollback(&mut self, name: &str, snapshot: &str, force: bool) -> Result<(), CoreError> {
        let jail = self.top_level(name, "roll back jails")?;
        let volume = Self::require_volume(&jail, "roll it back")?;
        let target = if snapshot.contains('@') {
            SnapshotName::parse(snapshot)?
        } else {
            SnapshotName::parse(&format!("{volume}@{snapshot}"))?
        };
        if target.volume() != volume.as_str() {
            return Err(CoreError::Validation(format!(
                "{target} is not a snapshot of {name}"
            )));
        }

        let volumes = self.volumes();
        let latest = volumes.latest_snapshot(&volume)?;
        if latest != target {
            return Err(CoreError::Validation(format!(
                "{target} is not the latest snapshot of {name} (latest is {latest}); \
                 destroy the newer snapshots first"
            )));
        }

        self.confirm_unless(force, &format!("Roll {name} back to {target}?"))?;
        self.stop_if_running(name)?;
        volumes.rollback(&target)?;
        Ok(())
    }

    /// Destroy a jail by name, or a snapshot by its `<volume>@<tag>`
    /// identifier.
    pub fn destroy(&mut self, target: &str, options: DestroyOptions) -> Result<Destroyed, CoreError> {
        self.require_privilege("destroy jails")?;
        if self.registry.exists(target) {
            self.destroy_jail(target, options)
                .map(|()| Destroyed::Jail(target.to_owned()))
        } else if SnapshotName::looks_like(target) {
            let snapshot = SnapshotName::parse(target)?;
            self.destroy_snapshot(&snapshot, options.force)?;
            Ok(Destroyed::Snapshot(snapshot))
        } else {
            Err(CoreError::Validation(format!(
                "{target} is not a jail or snapshot"
            )))
        }
    }

    fn destroy_jail(&mut self, name: &str, options: DestroyOptions) -> Result<(), CoreError> {
        let jail = self.top_level(name, "destroy jails")?;
        if self.registry.settings.is_legacy_declaration(&jail.config_path) {
            return Err(CoreError::Validation(format!(
                "{name} is declared in {}, remove it manually",
                jail.config_path
            )));
        }

        self.operator.notice(&format!("Jail Name: {name}"));
        self.operator.notice(&format!("Jail Path: {}", jail.path));
        if let Some(volume) = &jail.storage_volume {
            self.operator.notice(&format!("Jail Dataset: {volume}"));
        }
        if jail.is_parent {
            self.operator
                .notice(&format!("WARNING: {name} is a parent jail, its children go with it"));
        }
        self.confirm_unless(options.force, &format!("Destroy jail {name}?"))?;

        if jail.is_running() {
            self.apply(&jail, Transition::Stop)?;
            self.gw.settle(DESTROY_SETTLE);
        }

        match &jail.storage_volume {
            Some(volume) => {
                let volumes = self.volumes();
                if options.recursive {
                    volumes.destroy_recursive(volume)?;
                } else {
                    if volumes.snapshot_lines(volume)?.len() > 1 {
                        return Err(CoreError::Validation(format!(
                            "{name} has snapshots; destroy them first or use -r"
                        )));
                    }
                    volumes.destroy(volume)?;
                }
            }
            None => {
                let path = Path::new(&jail.path);
                if jail.path.is_empty() || path == Path::new("/") {
                    return Err(CoreError::Validation(format!(
                        "refusing to remove '{}' for {name}",
                        jail.path
                    )));
                }
                remove_root(self.gw, path)?;
            }
        }

        if jail.start_on_boot == BootPolicy::Yes {
            self.remove_from_boot_list(name)?;
        }
        if !jail.config_path.is_empty() {
            self.gw
                .output(&Invocation::new(tools::RM).args(["-f", jail.config_path.as_str()]))?;
        }
        self.registry.remove(name);
        info!("destroyed jail {name}");
        Ok(())
    }

    fn destroy_snapshot(&mut self, snapshot: &SnapshotName, force: bool) -> Result<(), CoreError> {
        let volumes = self.volumes();
        if !volumes.exists(snapshot.as_str()) {
            return Err(CoreError::Validation(format!(
                "snapshot {snapshot} does not exist"
            )));
        }
        self.confirm_unless(force, &format!("Destroy snapshot {snapshot}?"))?;
        volumes.destroy_snapshot(snapshot)?;
        self.registry.forget_snapshot(snapshot);
        Ok(())
    }

    fn offer_snapshot(&mut self, jail: &Jail, force: bool) -> Result<(), CoreError> {
        if !jail.is_volume_backed() {
            return Ok(());
        }
        if force
            || self
                .operator
                .confirm(&format!("Take a snapshot of {} first?", jail.name))
        {
            let snapshot = self.snapshot(&jail.name)?;
            self.operator.notice(&format!("created {snapshot}"));
        }
        Ok(())
    }

    fn freebsd_update(jail: &Jail, version: &str) -> Invocation {
        Invocation::new(tools::ENV)
            .arg(format!("UNAME_r={version}"))
            .arg(tools::FREEBSD_UPDATE)
            .args(["-b", jail.path.as_str(), "--currently-running", version])
            .arg("--not-running-from-cron")
    }

    pub fn update(&mut self, name: &str, kind: &UpdateKind, force: bool) -> Result<(), CoreError> {
        let jail = self.top_level(name, "update jails")?;
        match kind {
            UpdateKind::Patch => self.update_patch(&jail, force),
            UpdateKind::Release(release) => self.update_release(&jail, release.as_deref(), force),
            UpdateKind::Packages => self.update_packages(&jail, force),
        }
    }

    fn installed_version(jail: &Jail) -> Result<&str, CoreError> {
        if jail.os_version.is_empty() {
            Err(CoreError::Validation(format!(
                "can't determine the OS version of {}",
                jail.name
            )))
        } else {
            Ok(&jail.os_version)
        }
    }

    fn update_patch(&mut self, jail: &Jail, force: bool) -> Result<(), CoreError> {
        let version = Self::installed_version(jail)?;
        self.confirm_unless(force, &format!("Apply {version} patches to {}?", jail.name))?;
        self.offer_snapshot(jail, force)?;
        self.gw
            .attached(&Self::freebsd_update(jail, version).args(["fetch", "install"]))?;
        info!("patched {}", jail.name);
        Ok(())
    }

    fn update_release(
        &mut self,
        jail: &Jail,
        release: Option<&str>,
        force: bool,
    ) -> Result<(), CoreError> {
        let version = Self::installed_version(jail)?;
        let target = match release {
            Some(release) => release.to_owned(),
            None => host::host_release(self.gw)?,
        };
        if version.contains(&target) {
            return Err(CoreError::Validation(format!(
                "{} is already running {version}",
                jail.name
            )));
        }
        self.confirm_unless(
            force,
            &format!("Upgrade {} from {version} to {target}?", jail.name),
        )?;
        self.offer_snapshot(jail, force)?;

        let update = Self::freebsd_update(jail, version);
        self.gw
            .attached(&update.clone().args(["-r", target.as_str(), "upgrade"]))?;
        self.gw.attached(&update.clone().arg("install"))?;
        self.stop_if_running(&jail.name)?;
        self.gw.settle(RESTART_SETTLE);
        let stopped = self.lookup(&jail.name)?.clone();
        self.apply(&stopped, Transition::Start)?;
        self.gw.attached(&update.arg("install"))?;
        if let Some(j) = self.registry.get_mut(&jail.name) {
            j.os_version = target.clone();
        }
        info!("upgraded {} to {target}", jail.name);
        Ok(())
    }

    fn update_packages(&mut self, jail: &Jail, force: bool) -> Result<(), CoreError> {
        self.confirm_unless(force, &format!("Update packages in {}?", jail.name))?;
        if !jail.is_running() {
            self.confirm_unless(
                force,
                &format!("{} must be running to update packages. Start it?", jail.name),
            )?;
            self.apply(jail, Transition::Start)?;
        }
        self.offer_snapshot(jail, force)?;
        for step in ["update", "upgrade"] {
            self.gw.attached(
                &Invocation::new(tools::PKG).args(["-j", jail.name.as_str(), step]),
            )?;
        }
        info!("updated packages in {}", jail.name);
        Ok(())
    }

    fn sysrc(&self, args: &[&str]) -> Result<String, CoreError> {
        let out = self
            .gw
            .output(&Invocation::new(tools::SYSRC).args(args.iter().copied()))?;
        Ok(String::from_utf8_lossy(&out).trim().to_owned())
    }

    fn remove_from_boot_list(&mut self, name: &str) -> Result<(), CoreError> {
        let entry = format!("jail_list-={name}");
        self.sysrc(&[entry.as_str()])?;
        self.registry.set_boot_policy(name, BootPolicy::No);
        Ok(())
    }

    /// Start `name` at boot. Returns `false` when it already was.
    pub fn enable(&mut self, name: &str) -> Result<bool, CoreError> {
        let jail = self.top_level(name, "change boot settings")?;
        if jail.start_on_boot == BootPolicy::Yes {
            return Ok(false);
        }
        if self.sysrc(&["-n", "jail_enable"])? != "YES" {
            self.sysrc(&["jail_enable=YES"])?;
        }
        let entry = format!("jail_list+={name}");
        self.sysrc(&[entry.as_str()])?;
        self.registry.set_boot_policy(name, BootPolicy::Yes);
        info!("enabled {name} at boot");
        Ok(true)
    }

    /// Stop starting `name` at boot. Returns `false` when it already was off.
    pub fn disable(&mut self, name: &str) -> Result<bool, CoreError> {
        let jail = self.top_level(name, "change boot settings")?;
        if jail.start_on_boot == BootPolicy::No {
            return Ok(false);
        }
        self.remove_from_boot_list(name)?;
        info!("disabled {name} at boot");
        Ok(true)
    }

    /// Log in to a running jail, as `user` or the configured default.
    pub fn enter(&self, name: &str, user: Option<&str>) -> Result<(), CoreError> {
        self.require_privilege("enter jails")?;
        let jail = self.lookup(name)?;
        if !jail.is_running() {
            return Err(CoreError::Validation(format!("{name} is not running")));
        }
        let user = user.unwrap_or(self.registry.settings.jail_user.as_str());
        self.gw.attached(
            &Invocation::new(tools::JEXEC).args([name, "login", "-f", user]),
        )?;
        Ok(())
    }
}

/// Registry entry for a freshly installed jail.
fn registered(new_jail: &NewJail, os_version: String) -> Jail {
    let mut jail = Jail::named(new_jail.name.as_str());
    jail.hostname.clone_from(&new_jail.name);
    jail.path = new_jail.filesystem_path.display().to_string();
    jail.config_path = new_jail.config_path.display().to_string();
    jail.storage_volume.clone_from(&new_jail.storage_volume);
    jail.os_version = os_version;
    match new_jail.ip {
        Some(ip) if !new_jail.inherit_ip => {
            jail.ipv4 = ip.to_string();
            jail.interface.clone_from(&new_jail.interface);
        }
        _ => {
            jail.ipv4_inherit = "inherit".to_owned();
            jail.ipv4 = "inherit".to_owned();
        }
    }
    jail
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::request_shutdown_for_test;
    use crate::operator::AssumeYes;
    use jmgr_runtime::MockGateway;
    use jmgr_schema::Settings;

    fn registry_with(gw: &MockGateway, jails: &[(&str, u32)]) -> Registry {
        let dir = tempfile::tempdir().unwrap();
        let conf_d = dir.path().join("jail.conf.d");
        std::fs::create_dir_all(&conf_d).unwrap();
        for (name, _) in jails {
            std::fs::write(
                conf_d.join(format!("{name}.conf")),
                format!("{name} {{\n path = \"/nonexistent/{name}\";\n}}\n"),
            )
            .unwrap();
        }
        let settings = Settings {
            jails_home: dir.path().to_path_buf(),
            jails_conf_d: conf_d,
            legacy_conf: dir.path().join("jail.conf"),
            ..Settings::default()
        };
        let mut registry = Registry::from_settings(settings, gw);
        for (name, jid) in jails {
            registry.set_runtime_id(name, *jid);
        }
        registry
    }

    #[test]
    fn unprivileged_callers_are_refused() {
        let gw = MockGateway::new();
        let registry = registry_with(&gw, &[("www", 0)]);
        gw.set_privileged(false);
        gw.clear_calls();
        let mut engine = Engine::new(registry, &gw, &AssumeYes);
        let err = engine.start("www").unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied(_)));
        assert!(gw.calls().is_empty());
    }

    #[test]
    fn stop_marks_jail_stopped() {
        let gw = MockGateway::new();
        let registry = registry_with(&gw, &[("www", 7)]);
        let mut engine = Engine::new(registry, &gw, &AssumeYes);
        assert_eq!(engine.stop("www").unwrap(), TransitionOutcome::Applied);
        assert!(!engine.registry().get("www").unwrap().is_running());
        assert_eq!(engine.stop("www").unwrap(), TransitionOutcome::Unchanged);
    }

    #[test]
    fn start_refreshes_jail_id() {
        let gw = MockGateway::new();
        let registry = registry_with(&gw, &[("www", 0)]);
        gw.respond("jls", &["-j", "www", "jid"], "12\n");
        let mut engine = Engine::new(registry, &gw, &AssumeYes);
        engine.start("www").unwrap();
        assert_eq!(engine.registry().get("www").unwrap().runtime_id, 12);
    }

    #[test]
    fn unknown_jail_is_reported() {
        let gw = MockGateway::new();
        let registry = registry_with(&gw, &[]);
        let mut engine = Engine::new(registry, &gw, &AssumeYes);
        assert!(matches!(
            engine.restart("ghost"),
            Err(CoreError::JailNotFound(_))
        ));
    }

    #[test]
    fn transition_all_stops_after_interrupt() {
        let gw = MockGateway::new();
        let registry = registry_with(&gw, &[("a", 1), ("b", 2)]);
        let mut engine = Engine::new(registry, &gw, &AssumeYes);
        request_shutdown_for_test(true);
        let outcomes = engine.transition_all(Transition::Stop);
        request_shutdown_for_test(false);
        assert!(outcomes.unwrap().is_empty());

        let outcomes = engine.transition_all(Transition::Stop).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes
            .iter()
            .all(|(_, o)| *o == TransitionOutcome::Applied));
    }

    #[test]
    fn enter_requires_running_jail() {
        let gw = MockGateway::new();
        let registry = registry_with(&gw, &[("www", 0), ("db", 3)]);
        let engine = Engine::new(registry, &gw, &AssumeYes);
        assert!(engine.enter("www", None).is_err());
        gw.clear_calls();
        engine.enter("db", Some("admin")).unwrap();
        assert_eq!(gw.commands(), vec!["/usr/sbin/jexec db login -f admin"]);
    }

    #[test]
    fn disable_removes_from_boot_list() {
        let gw = MockGateway::new();
        gw.respond("sysrc", &["-n", "jail_list"], "www\n");
        let registry = registry_with(&gw, &[("www", 0)]);
        gw.clear_calls();
        let mut engine = Engine::new(registry, &gw, &AssumeYes);
        assert!(engine.disable("www").unwrap());
        assert_eq!(gw.commands(), vec!["/usr/sbin/sysrc jail_list-=www"]);
        assert!(!engine.disable("www").unwrap());
    }

    #[test]
    fn registered_entry_for_inherited_address() {
        let new_jail = NewJail {
            name: "web".into(),
            ip: None,
            interface: "em0".into(),
            inherit_ip: true,
            storage_volume: None,
            filesystem_path: "/jails/web".into(),
            config_path: "/etc/jail.conf.d/web.conf".into(),
        };
        let jail = registered(&new_jail, "14.1-RELEASE".into());
        assert_eq!(jail.ipv4, "inherit");
        assert!(jail.interface.is_empty());
        assert_eq!(jail.path, "/jails/web");
        assert!(!jail.is_running());
    }
}
