use super::finish;
use clap::ValueEnum;
use jmgr_core::{Engine, UpdateKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UpdateTarget {
    /// Security and errata patches for the installed release.
    Patch,
    /// Upgrade to another release (`-v`, or the host release).
    Rel,
    /// Packages installed in the jail.
    Pkgs,
}

pub fn run(
    engine: &mut Engine<'_>,
    target: UpdateTarget,
    name: &str,
    release: Option<&str>,
    force: bool,
) -> Result<u8, String> {
    let kind = match target {
        UpdateTarget::Patch => UpdateKind::Patch,
        UpdateTarget::Rel => UpdateKind::Release(release.map(str::to_owned)),
        UpdateTarget::Pkgs => UpdateKind::Packages,
    };
    finish(
        engine
            .update(name, &kind, force)
            .map(|()| println!("{name} updated")),
    )
}
