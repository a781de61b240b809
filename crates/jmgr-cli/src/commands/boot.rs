use super::finish;
use jmgr_core::Engine;

pub fn enable(engine: &mut Engine<'_>, name: &str) -> Result<u8, String> {
    finish(engine.enable(name).map(|changed| {
        if changed {
            println!("{name} will start at boot");
        } else {
            println!("{name} already starts at boot");
        }
    }))
}

pub fn disable(engine: &mut Engine<'_>, name: &str) -> Result<u8, String> {
    finish(engine.disable(name).map(|changed| {
        if changed {
            println!("{name} will no longer start at boot");
        } else {
            println!("{name} does not start at boot");
        }
    }))
}
