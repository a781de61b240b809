use super::finish;
use jmgr_core::{CloneOptions, CreateOptions, Engine, NewJailRequest};
use jmgr_schema::NewJail;

pub struct JailArgs<'a> {
    pub name: &'a str,
    pub ip: Option<&'a str>,
    pub interface: Option<&'a str>,
    pub force: bool,
}

impl JailArgs<'_> {
    fn request(&self) -> NewJailRequest {
        NewJailRequest {
            name: self.name.to_owned(),
            ip: self.ip.map(str::to_owned),
            interface: self.interface.map(str::to_owned),
        }
    }
}

fn summary(verb: &str, jail: &NewJail) {
    println!("{verb} jail {} at {}", jail.name, jail.filesystem_path.display());
    println!("declaration written to {}", jail.config_path.display());
    if let Some(volume) = &jail.storage_volume {
        println!("dataset: {volume}");
    }
}

pub fn create(
    engine: &mut Engine<'_>,
    args: &JailArgs<'_>,
    release: Option<&str>,
) -> Result<u8, String> {
    let options = CreateOptions {
        request: args.request(),
        release: release.map(str::to_owned),
        force: args.force,
    };
    finish(engine.create(options).map(|jail| summary("created", &jail)))
}

pub fn clone(engine: &mut Engine<'_>, source: &str, args: &JailArgs<'_>) -> Result<u8, String> {
    let options = CloneOptions {
        source: source.to_owned(),
        request: args.request(),
        force: args.force,
    };
    finish(engine.clone_jail(options).map(|jail| summary("cloned", &jail)))
}
