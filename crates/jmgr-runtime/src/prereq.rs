use crate::tools;
use std::fmt;
use std::path::Path;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: &'static str,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

struct Requirement {
    path: &'static str,
    prereq: MissingPrereq,
}

const JAIL_TOOLS: &[(&str, &str, &str)] = &[
    (tools::JAIL, "creating and removing jails", "part of the FreeBSD base system"),
    (tools::JLS, "listing running jails", "part of the FreeBSD base system"),
    (tools::JEXEC, "running commands inside jails", "part of the FreeBSD base system"),
    (tools::SYSRC, "editing jail_list in rc.conf", "part of the FreeBSD base system"),
    (tools::TAR, "unpacking and copying jail filesystems", "part of the FreeBSD base system"),
];

fn requirements(use_volumes: bool) -> Vec<Requirement> {
    let mut reqs: Vec<Requirement> = JAIL_TOOLS
        .iter()
        .map(|&(path, purpose, install_hint)| Requirement {
            path,
            prereq: MissingPrereq {
                name: path.rsplit('/').next().unwrap_or(path),
                purpose,
                install_hint,
            },
        })
        .collect();
    if use_volumes {
        reqs.push(Requirement {
            path: tools::ZFS,
            prereq: MissingPrereq {
                name: "zfs",
                purpose: "dataset-backed jails and snapshots",
                install_hint: "load zfs.ko and set zfs_enable=YES, or unset volume_dataset",
            },
        });
    }
    reqs
}

fn check_with(use_volumes: bool, present: impl Fn(&Path) -> bool) -> Vec<MissingPrereq> {
    requirements(use_volumes)
        .into_iter()
        .filter(|r| !present(Path::new(r.path)))
        .map(|r| r.prereq)
        .collect()
}

/// Check the base system tools jmgr needs. `use_volumes` adds `zfs`.
/// Returns a list of missing items. Empty list means all prerequisites are met.
pub fn check_jail_prereqs(use_volumes: bool) -> Vec<MissingPrereq> {
    check_with(use_volumes, Path::is_file)
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\njmgr manages FreeBSD jails and needs these base system tools.");
    msg
}
