use jmgr_core::{
    CloneOptions, CoreError, CreateOptions, DestroyOptions, Destroyed, Engine, NewJailRequest,
    Operator, Registry, UpdateKind,
};
use jmgr_runtime::MockGateway;
use jmgr_schema::{BootPolicy, Settings, VolumeName};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const TEMPLATE: &str = "<JailName> {\n\tpath = \"<JailPath>\";\n\t<IPConf>\n}\n";

/// Operator that gives a fixed answer and remembers every question.
struct Scripted {
    answer: bool,
    questions: RefCell<Vec<String>>,
}

impl Scripted {
    fn answering(answer: bool) -> Self {
        Self {
            answer,
            questions: RefCell::new(Vec::new()),
        }
    }

    fn asked(&self) -> usize {
        self.questions.borrow().len()
    }
}

impl Operator for Scripted {
    fn confirm(&self, question: &str) -> bool {
        self.questions.borrow_mut().push(question.to_owned());
        self.answer
    }
    fn notice(&self, _: &str) {}
    fn progress(&self, _: &str) {}
    fn done(&self, _: &str) {}
}

/// A scratch host: settings rooted in a temp dir and a scripted gateway.
struct Host {
    dir: TempDir,
    gw: MockGateway,
}

impl Host {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["jails", "jail.conf.d", "media"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        fs::write(dir.path().join("jail.conf.template"), TEMPLATE).unwrap();
        Self {
            dir,
            gw: MockGateway::new(),
        }
    }

    fn home(&self) -> PathBuf {
        self.dir.path().join("jails")
    }

    fn settings(&self) -> Settings {
        Settings {
            jails_home: self.home(),
            os_media_dir: self.dir.path().join("media"),
            jails_conf_d: self.dir.path().join("jail.conf.d"),
            legacy_conf: self.dir.path().join("jail.conf"),
            template: self.dir.path().join("jail.conf.template"),
            ..Settings::default()
        }
    }

    fn config_of(&self, name: &str) -> PathBuf {
        self.dir.path().join("jail.conf.d").join(format!("{name}.conf"))
    }

    fn declare(&self, name: &str) {
        fs::write(
            self.config_of(name),
            format!(
                "{name} {{\n\tpath = \"{}\";\n\tip4 = inherit;\n}}\n",
                self.home().join(name).display()
            ),
        )
        .unwrap();
    }

    fn registry(&self) -> Registry {
        Registry::from_settings(self.settings(), &self.gw)
    }

    fn commands(&self) -> Vec<String> {
        self.gw.commands()
    }

    fn ran(&self, needle: &str) -> bool {
        self.commands().iter().any(|c| c.contains(needle))
    }

    fn position(&self, needle: &str) -> usize {
        self.commands()
            .iter()
            .position(|c| c.contains(needle))
            .unwrap_or_else(|| panic!("{needle} not run: {:#?}", self.commands()))
    }
}

fn set_volume(registry: &mut Registry, name: &str, volume: &str) {
    let jail = registry.jails.iter_mut().find(|j| j.name == name).unwrap();
    jail.storage_volume = Some(VolumeName::new(volume));
}

fn set_running(registry: &mut Registry, name: &str, jid: u32) {
    let jail = registry.jails.iter_mut().find(|j| j.name == name).unwrap();
    jail.runtime_id = jid;
}

fn use_volumes(host: &Host, registry: &mut Registry) {
    registry.use_volumes = true;
    registry.settings.volume_dataset = Some("zroot/jails".into());
    host.gw.respond(
        "zfs",
        &["list", "zroot/jails"],
        &format!(
            "NAME\tUSED\tAVAIL\tREFER\tMOUNTPOINT\nzroot/jails\t2G\t40G\t96K\t{}\n",
            host.home().display()
        ),
    );
}

fn request(name: &str) -> NewJailRequest {
    NewJailRequest {
        name: name.into(),
        ip: None,
        interface: None,
    }
}

const FORCE: DestroyOptions = DestroyOptions {
    force: true,
    recursive: false,
};

#[test]
fn children_are_managed_via_parent() {
    let host = Host::new();
    host.declare("host");
    host.declare("host.web");
    host.gw.respond("jexec", &["host"], "1\n");
    let mut registry = host.registry();
    set_volume(&mut registry, "host.web", "zroot/jails/host.web");
    host.gw.clear_calls();

    let operator = Scripted::answering(true);
    let mut engine = Engine::new(registry, &host.gw, &operator);
    let results = [
        engine.start("host.web").map(|_| ()),
        engine.stop("host.web").map(|_| ()),
        engine.restart("host.web").map(|_| ()),
        engine.destroy("host.web", FORCE).map(|_| ()),
        engine.snapshot("host.web").map(|_| ()),
        engine.rollback("host.web", "x", true),
        engine.update("host.web", &UpdateKind::Patch, true),
        engine.enable("host.web").map(|_| ()),
    ];
    for result in results {
        let err = result.unwrap_err();
        assert!(matches!(err, CoreError::ManagedByParent { .. }));
        assert!(err.to_string().contains("managed via parent"));
    }
    assert!(host.gw.calls().is_empty());
    assert_eq!(operator.asked(), 0);
}

#[test]
fn rollback_only_to_latest_snapshot() {
    let host = Host::new();
    host.declare("www");
    let mut registry = host.registry();
    set_volume(&mut registry, "www", "zroot/jails/www");
    host.gw.respond(
        "zfs",
        &["list", "-H", "-t", "snapshot"],
        "zroot/jails/www@a\nzroot/jails/www@b\n",
    );

    let operator = Scripted::answering(true);
    let mut engine = Engine::new(registry, &host.gw, &operator);
    let err = engine.rollback("www", "zroot/jails/www@a", true).unwrap_err();
    assert!(err.to_string().contains("destroy the newer snapshots"));
    assert!(!host.ran("zfs rollback"));

    engine.rollback("www", "b", false).unwrap();
    assert_eq!(operator.asked(), 1);
    assert!(host.ran("/sbin/zfs rollback zroot/jails/www@b"));
}

#[test]
fn rollback_stops_running_jail_first() {
    let host = Host::new();
    host.declare("www");
    let mut registry = host.registry();
    set_volume(&mut registry, "www", "zroot/jails/www");
    set_running(&mut registry, "www", 4);
    host.gw
        .respond("zfs", &["list", "-H", "-t", "snapshot"], "zroot/jails/www@a\n");

    let operator = Scripted::answering(true);
    let mut engine = Engine::new(registry, &host.gw, &operator);
    engine.rollback("www", "zroot/jails/www@a", true).unwrap();
    assert!(host.position("/usr/sbin/jail -r -f") < host.position("zfs rollback"));
    assert!(!engine.registry().get("www").unwrap().is_running());
}

#[test]
fn rollback_without_snapshots_fails() {
    let host = Host::new();
    host.declare("www");
    let mut registry = host.registry();
    set_volume(&mut registry, "www", "zroot/jails/www");
    let operator = Scripted::answering(true);
    let mut engine = Engine::new(registry, &host.gw, &operator);
    let err = engine.rollback("www", "a", true).unwrap_err();
    assert!(err.to_string().contains("no snapshots"));
    assert!(!host.ran("zfs rollback"));
}

#[test]
fn destroy_refuses_volume_with_snapshots() {
    let host = Host::new();
    host.declare("www");
    let mut registry = host.registry();
    set_volume(&mut registry, "www", "zroot/jails/www");
    host.gw
        .respond("zfs", &["list", "-H", "-t", "snapshot"], "zroot/jails/www@a\n");

    let operator = Scripted::answering(true);
    let mut engine = Engine::new(registry, &host.gw, &operator);
    let err = engine.destroy("www", FORCE).unwrap_err();
    assert!(err.to_string().contains("use -r"));
    assert!(!host
        .commands()
        .iter()
        .any(|c| c == "/sbin/zfs destroy zroot/jails/www"));
    assert!(engine.registry().exists("www"));

    let destroyed = engine
        .destroy(
            "www",
            DestroyOptions {
                force: true,
                recursive: true,
            },
        )
        .unwrap();
    assert_eq!(destroyed, Destroyed::Jail("www".into()));
    assert!(host.ran("/sbin/zfs destroy -r -f zroot/jails/www"));
    assert!(host.ran(&format!("/bin/rm -f {}", host.config_of("www").display())));
    assert!(!engine.registry().exists("www"));
}

#[test]
fn destroy_plain_jail_clears_flags_and_boot_entry() {
    let host = Host::new();
    host.declare("db");
    host.gw.respond("sysrc", &["-n", "jail_list"], "www db\n");
    let mut registry = host.registry();
    set_running(&mut registry, "db", 9);
    assert_eq!(registry.get("db").unwrap().start_on_boot, BootPolicy::Yes);
    host.gw.clear_calls();

    let operator = Scripted::answering(true);
    let mut engine = Engine::new(registry, &host.gw, &operator);
    engine.destroy("db", DestroyOptions::default()).unwrap();
    let path = host.home().join("db").display().to_string();
    assert_eq!(
        host.commands(),
        vec![
            format!("/usr/sbin/jail -r -f {} db", host.config_of("db").display()),
            format!("/bin/chflags -R 0 {path}"),
            format!("/bin/rm -rf {path}"),
            "/usr/sbin/sysrc jail_list-=db".to_owned(),
            format!("/bin/rm -f {}", host.config_of("db").display()),
        ]
    );
    assert_eq!(operator.asked(), 1);
}

#[test]
fn destroy_declined_changes_nothing() {
    let host = Host::new();
    host.declare("www");
    let registry = host.registry();
    host.gw.clear_calls();
    let operator = Scripted::answering(false);
    let mut engine = Engine::new(registry, &host.gw, &operator);
    assert!(matches!(
        engine.destroy("www", DestroyOptions::default()),
        Err(CoreError::Declined)
    ));
    assert!(host.gw.calls().is_empty());
}

#[test]
fn destroy_snapshot_by_identifier() {
    let host = Host::new();
    let registry = host.registry();
    let operator = Scripted::answering(true);
    let mut engine = Engine::new(registry, &host.gw, &operator);

    let destroyed = engine.destroy("zroot/jails/www@a", FORCE).unwrap();
    assert!(matches!(destroyed, Destroyed::Snapshot(ref s) if s.tag() == "a"));
    assert!(host.ran("/sbin/zfs destroy zroot/jails/www@a"));

    let err = engine.destroy("nothing", FORCE).unwrap_err();
    assert!(err.to_string().contains("is not a jail or snapshot"));

    host.gw
        .fail("zfs", &["list", "zroot/jails/www@gone"], "dataset does not exist");
    assert!(engine.destroy("zroot/jails/www@gone", FORCE).is_err());
    assert!(!host.ran("zfs destroy zroot/jails/www@gone"));
}

#[test]
fn destroy_refuses_singleton_declarations() {
    let host = Host::new();
    fs::write(
        host.dir.path().join("jail.conf"),
        "old {\n\tpath = \"/nonexistent/old\";\n}\n",
    )
    .unwrap();
    let registry = host.registry();
    host.gw.clear_calls();
    let operator = Scripted::answering(true);
    let mut engine = Engine::new(registry, &host.gw, &operator);
    let err = engine.destroy("old", FORCE).unwrap_err();
    assert!(err.to_string().contains("remove it manually"));
    assert!(host.gw.calls().is_empty());
}

#[test]
fn clone_volume_steps_run_in_order() {
    let host = Host::new();
    host.declare("www");
    let mut registry = host.registry();
    set_volume(&mut registry, "www", "zroot/jails/www");
    use_volumes(&host, &mut registry);
    host.gw
        .fail("zfs", &["list", "zroot/jails/www2"], "dataset does not exist");
    host.gw.respond(
        "zfs",
        &["list", "-H", "-t", "snapshot", "-o", "name", "zroot/jails/www2"],
        "zroot/jails/www2@2025-06-15T07:05:01\n",
    );

    let operator = Scripted::answering(true);
    let mut engine = Engine::new(registry, &host.gw, &operator);
    let cloned = engine
        .clone_jail(CloneOptions {
            source: "www".into(),
            request: request("www2"),
            force: true,
        })
        .unwrap();
    assert_eq!(operator.asked(), 0);
    assert_eq!(
        cloned.storage_volume,
        Some(VolumeName::new("zroot/jails/www2"))
    );

    let snapshot = host.position("/sbin/zfs snapshot zroot/jails/www@");
    let transfer = host.position("/sbin/zfs send zroot/jails/www@");
    let rollback = host.position("/sbin/zfs rollback zroot/jails/www2@2025-06-15T07:05:01");
    let cleanup = host.position("/sbin/zfs destroy zroot/jails/www2@2025-06-15T07:05:01");
    assert!(snapshot < transfer && transfer < rollback && rollback < cleanup);
    assert!(host.commands()[transfer].ends_with("| /sbin/zfs receive zroot/jails/www2"));

    let declaration = fs::read_to_string(host.config_of("www2")).unwrap();
    assert!(declaration.contains("ip4 = inherit;"));
    assert!(engine.registry().exists("www2"));
    assert_eq!(engine.registry().get("www").unwrap().snapshots.len(), 1);
}

#[test]
fn clone_fails_when_received_snapshot_is_missing() {
    let host = Host::new();
    host.declare("www");
    let mut registry = host.registry();
    set_volume(&mut registry, "www", "zroot/jails/www");
    use_volumes(&host, &mut registry);
    host.gw
        .fail("zfs", &["list", "zroot/jails/www2"], "dataset does not exist");
    host.gw.respond(
        "zfs",
        &["list", "-H", "-t", "snapshot", "-o", "name", "zroot/jails/www2"],
        "",
    );

    let operator = Scripted::answering(true);
    let mut engine = Engine::new(registry, &host.gw, &operator);
    let err = engine
        .clone_jail(CloneOptions {
            source: "www".into(),
            request: request("www2"),
            force: true,
        })
        .unwrap_err();
    assert!(err.to_string().contains("received snapshot"));
    assert!(!host.ran("zfs rollback"));
    assert!(!host.config_of("www2").exists());
    assert!(!engine.registry().exists("www2"));
}

#[test]
fn clone_plain_jail_stops_source_first() {
    let host = Host::new();
    host.declare("www");
    fs::create_dir_all(host.home().join("www")).unwrap();
    let mut registry = host.registry();
    set_running(&mut registry, "www", 3);

    let operator = Scripted::answering(true);
    let mut engine = Engine::new(registry, &host.gw, &operator);
    let cloned = engine
        .clone_jail(CloneOptions {
            source: "www".into(),
            request: request("www2"),
            force: false,
        })
        .unwrap();
    // inherit address, clone, stop source
    assert_eq!(operator.asked(), 3);
    assert!(cloned.filesystem_path.is_dir());

    let stop = host.position("/usr/sbin/jail -r -f");
    let copy = host.position("/usr/bin/tar -cf - -C");
    assert!(stop < copy);
    assert!(host.commands()[copy].ends_with(&format!(
        "| /usr/bin/tar -xpf - -C {}",
        host.home().join("www2").display()
    )));
}

#[test]
#[allow(non_snake_case)]
fn create_testJ99_forced_inherits_host_address() {
    let host = Host::new();
    fs::write(host.dir.path().join("media/14.1-RELEASE.txz"), b"archive").unwrap();
    host.gw
        .respond("freebsd-version", &[], "14.1-RELEASE-p5\n");
    let registry = host.registry();

    let operator = Scripted::answering(false);
    let mut engine = Engine::new(registry, &host.gw, &operator);
    let created = engine
        .create(CreateOptions {
            request: request("testJ99"),
            release: None,
            force: true,
        })
        .unwrap();

    assert_eq!(operator.asked(), 0);
    assert!(created.inherit_ip);
    assert!(host.home().join("testJ99").is_dir());
    let declaration = fs::read_to_string(host.config_of("testJ99")).unwrap();
    assert!(declaration.starts_with("testJ99 {"));
    assert!(declaration.contains("ip4 = inherit;"));
    assert!(declaration.contains(&host.home().join("testJ99").display().to_string()));
    assert!(!host.ran("/usr/bin/fetch"));
    assert!(host.ran(&format!(
        "/usr/bin/tar -xf {}",
        host.dir.path().join("media/14.1-RELEASE.txz").display()
    )));
    let jail = engine.registry().get("testJ99").unwrap();
    assert_eq!(jail.os_version, "14.1-RELEASE");
    assert_eq!(jail.ipv4, "inherit");
}

#[test]
fn create_downloads_missing_release() {
    let host = Host::new();
    host.gw.respond("uname", &["-m"], "amd64\n");
    let registry = host.registry();
    let operator = Scripted::answering(true);
    let mut engine = Engine::new(registry, &host.gw, &operator);
    engine
        .create(CreateOptions {
            request: request("web"),
            release: Some("13.4-RELEASE".into()),
            force: false,
        })
        .unwrap();
    // inherit prompt and the final confirmation
    assert_eq!(operator.asked(), 2);
    assert!(host.ran(
        "/usr/bin/fetch -q -o {media}/13.4-RELEASE.txz https://download.freebsd.org/releases/amd64/13.4-RELEASE/base.txz"
            .replace("{media}", &host.dir.path().join("media").display().to_string())
            .as_str()
    ));
}

#[test]
fn create_is_blocked_by_bad_config() {
    let host = Host::new();
    let mut registry = host.registry();
    registry.problems.push("settings: unreadable".into());
    let operator = Scripted::answering(true);
    let mut engine = Engine::new(registry, &host.gw, &operator);
    let err = engine
        .create(CreateOptions {
            request: request("web"),
            release: None,
            force: true,
        })
        .unwrap_err();
    assert!(matches!(err, CoreError::BadConfig(_)));
}

#[test]
fn enable_is_idempotent() {
    let host = Host::new();
    host.declare("www");
    host.declare("db");
    host.gw.respond("sysrc", &["-n", "jail_list"], "www\n");
    host.gw.respond("sysrc", &["-n", "jail_enable"], "NO\n");
    let registry = host.registry();
    host.gw.clear_calls();

    let operator = Scripted::answering(true);
    let mut engine = Engine::new(registry, &host.gw, &operator);
    assert!(!engine.enable("www").unwrap());
    assert!(host.gw.calls().is_empty());

    assert!(engine.enable("db").unwrap());
    assert_eq!(
        host.commands(),
        vec![
            "/usr/sbin/sysrc -n jail_enable",
            "/usr/sbin/sysrc jail_enable=YES",
            "/usr/sbin/sysrc jail_list+=db",
        ]
    );
    assert_eq!(
        engine.registry().get("db").unwrap().start_on_boot,
        BootPolicy::Yes
    );
}

#[test]
fn update_patch_runs_freebsd_update() {
    let host = Host::new();
    host.declare("www");
    let mut registry = host.registry();
    registry.jails[0].os_version = "14.1-RELEASE-p2".into();
    host.gw.clear_calls();

    let operator = Scripted::answering(true);
    let mut engine = Engine::new(registry, &host.gw, &operator);
    engine.update("www", &UpdateKind::Patch, true).unwrap();
    assert_eq!(
        host.commands(),
        vec![format!(
            "/usr/bin/env UNAME_r=14.1-RELEASE-p2 /usr/sbin/freebsd-update -b {} \
             --currently-running 14.1-RELEASE-p2 --not-running-from-cron fetch install",
            host.home().join("www").display()
        )]
    );
}

#[test]
fn update_release_rejects_current_release() {
    let host = Host::new();
    host.declare("www");
    let mut registry = host.registry();
    registry.jails[0].os_version = "14.1-RELEASE-p2".into();
    host.gw.clear_calls();

    let operator = Scripted::answering(true);
    let mut engine = Engine::new(registry, &host.gw, &operator);
    let err = engine
        .update("www", &UpdateKind::Release(Some("14.1-RELEASE".into())), true)
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    assert!(host.gw.calls().is_empty());

    engine
        .update("www", &UpdateKind::Release(Some("14.2-RELEASE".into())), true)
        .unwrap();
    let upgrade = host.position("-r 14.2-RELEASE upgrade");
    let start = host.position("/usr/sbin/jail -c -f");
    assert!(upgrade < start);
    assert!(host.commands().last().unwrap().ends_with("install"));
}

#[test]
fn update_packages_starts_stopped_jail() {
    let host = Host::new();
    host.declare("www");
    let registry = host.registry();
    host.gw.clear_calls();

    let operator = Scripted::answering(true);
    let mut engine = Engine::new(registry, &host.gw, &operator);
    engine.update("www", &UpdateKind::Packages, false).unwrap();
    assert_eq!(operator.asked(), 2);
    let start = host.position("/usr/sbin/jail -c -f");
    let update = host.position("/usr/sbin/pkg -j www update");
    let upgrade = host.position("/usr/sbin/pkg -j www upgrade");
    assert!(start < update && update < upgrade);
}

#[test]
fn snapshot_requires_volume() {
    let host = Host::new();
    host.declare("www");
    host.declare("db");
    let mut registry = host.registry();
    set_volume(&mut registry, "db", "zroot/jails/db");
    let operator = Scripted::answering(true);
    let mut engine = Engine::new(registry, &host.gw, &operator);

    assert!(engine.snapshot("www").is_err());
    let snapshot = engine.snapshot("db").unwrap();
    assert_eq!(snapshot.volume(), "zroot/jails/db");
    assert!(host.ran(&format!("/sbin/zfs snapshot {snapshot}")));
    assert_eq!(engine.registry().get("db").unwrap().snapshots, vec![snapshot]);
}
