use super::finish;
use jmgr_core::Engine;

pub fn run(engine: &Engine<'_>, name: &str, user: Option<&str>) -> Result<u8, String> {
    finish(engine.enter(name, user))
}
