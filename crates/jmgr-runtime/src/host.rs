//! Questions asked of the host: releases, hardware platform, interfaces,
//! boot configuration and jail hierarchy.

use crate::gateway::{Invocation, ProcessGateway};
use crate::tools;
use crate::RuntimeError;
use regex::Regex;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::LazyLock;

static RELEASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.*RELEASE)").unwrap_or_else(|e| panic!("{e}")));

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end().to_owned()
}

/// Release of the running host, e.g. `14.1-RELEASE` for `14.1-RELEASE-p5`.
pub fn host_release(gw: &dyn ProcessGateway) -> Result<String, RuntimeError> {
    let out = text(&gw.output(&Invocation::new(tools::FREEBSD_VERSION))?);
    release_prefix(&out)
        .map(str::to_owned)
        .ok_or_else(|| RuntimeError::Probe(format!("can't find a RELEASE in '{out}'")))
}

fn release_prefix(version: &str) -> Option<&str> {
    RELEASE
        .captures(version)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Userland version installed under a jail root.
pub fn guest_release(gw: &dyn ProcessGateway, root: &Path) -> Result<String, RuntimeError> {
    let root = root.display().to_string();
    let inv = Invocation::new(tools::ENV)
        .arg(format!("ROOT={root}"))
        .arg(format!("{root}/bin/freebsd-version"));
    Ok(text(&gw.output(&inv)?))
}

/// Hardware platform, as used in release download URLs.
pub fn machine(gw: &dyn ProcessGateway) -> Result<String, RuntimeError> {
    Ok(text(&gw.output(&Invocation::new(tools::UNAME).arg("-m"))?))
}

pub fn interface_exists(gw: &dyn ProcessGateway, iface: &str) -> Result<bool, RuntimeError> {
    let out = text(&gw.output(&Invocation::new(tools::IFCONFIG).arg("-l"))?);
    Ok(out.split_whitespace().any(|name| name == iface))
}

/// True when something already answers on `ip`.
pub fn address_in_use(gw: &dyn ProcessGateway, ip: Ipv4Addr) -> bool {
    gw.output(&Invocation::new(tools::PING).args(["-c", "2", "-t", "2"]).arg(ip.to_string()))
        .is_ok()
}

/// Raw `jail_list` value from rc.conf.
pub fn boot_list(gw: &dyn ProcessGateway) -> Result<String, RuntimeError> {
    Ok(text(
        &gw.output(&Invocation::new(tools::SYSRC).args(["-n", "jail_list"]))?,
    ))
}

pub fn in_boot_list(list: &str, name: &str) -> bool {
    list.split_whitespace().any(|entry| entry == name)
}

/// Number of child jails currently running inside `parent`.
pub fn child_count(gw: &dyn ProcessGateway, parent: &str) -> Result<u32, RuntimeError> {
    let inv = Invocation::new(tools::JEXEC).arg(parent).args([
        tools::SYSCTL,
        "-n",
        "security.jail.children.cur",
    ]);
    let out = text(&gw.output(&inv)?);
    out.trim()
        .parse()
        .map_err(|_| RuntimeError::Probe(format!("unexpected child counter '{out}' in {parent}")))
}

/// Jail id of a running jail.
pub fn jail_id(gw: &dyn ProcessGateway, name: &str) -> Result<u32, RuntimeError> {
    let out = text(&gw.output(&Invocation::new(tools::JLS).args(["-j", name, "jid"]))?);
    out.trim()
        .parse()
        .map_err(|_| RuntimeError::Probe(format!("unexpected jid '{out}' for {name}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockGateway;

    #[test]
    fn host_release_strips_patch_level() {
        let gw = MockGateway::new();
        gw.respond("freebsd-version", &[], "14.1-RELEASE-p5\n");
        assert_eq!(host_release(&gw).unwrap(), "14.1-RELEASE");
    }

    #[test]
    fn host_release_rejects_non_release() {
        let gw = MockGateway::new();
        gw.respond("freebsd-version", &[], "15.0-CURRENT\n");
        assert!(matches!(host_release(&gw), Err(RuntimeError::Probe(_))));
    }

    #[test]
    fn guest_release_runs_with_root() {
        let gw = MockGateway::new();
        gw.respond("env", &["ROOT=/jails/www"], "13.4-RELEASE-p2\n");
        assert_eq!(
            guest_release(&gw, Path::new("/jails/www")).unwrap(),
            "13.4-RELEASE-p2"
        );
        assert_eq!(
            gw.commands(),
            vec!["/usr/bin/env ROOT=/jails/www /jails/www/bin/freebsd-version".to_owned()]
        );
    }

    #[test]
    fn interface_must_be_whole_token() {
        let gw = MockGateway::new();
        gw.respond("ifconfig", &["-l"], "em0 em10 lo0\n");
        assert!(interface_exists(&gw, "em0").unwrap());
        assert!(interface_exists(&gw, "em10").unwrap());
        assert!(!interface_exists(&gw, "em1").unwrap());
    }

    #[test]
    fn ping_answer_means_in_use() {
        let gw = MockGateway::new();
        assert!(address_in_use(&gw, Ipv4Addr::new(10, 0, 0, 1)));
        gw.fail("ping", &[], "100.0% packet loss");
        assert!(!address_in_use(&gw, Ipv4Addr::new(10, 0, 0, 1)));
        assert!(gw
            .commands()
            .iter()
            .all(|c| c == "/sbin/ping -c 2 -t 2 10.0.0.1"));
    }

    #[test]
    fn boot_list_matches_whole_names() {
        assert!(in_boot_list("www db", "db"));
        assert!(!in_boot_list("www.child db", "www"));
        assert!(!in_boot_list("", "www"));
    }

    #[test]
    fn child_counter_is_parsed() {
        let gw = MockGateway::new();
        gw.respond("jexec", &["host"], "2\n");
        assert_eq!(child_count(&gw, "host").unwrap(), 2);
        gw.respond("jexec", &["host"], "garbage\n");
        assert!(child_count(&gw, "host").is_err());
    }

    #[test]
    fn jail_id_is_parsed() {
        let gw = MockGateway::new();
        gw.respond("jls", &["-j", "www", "jid"], "12\n");
        assert_eq!(jail_id(&gw, "www").unwrap(), 12);
    }
}
