use super::finish;
use jmgr_core::Engine;

pub fn take(engine: &mut Engine<'_>, name: &str) -> Result<u8, String> {
    finish(
        engine
            .snapshot(name)
            .map(|snapshot| println!("created snapshot {snapshot}")),
    )
}

pub fn rollback(
    engine: &mut Engine<'_>,
    name: &str,
    snapshot: &str,
    force: bool,
) -> Result<u8, String> {
    finish(
        engine
            .rollback(name, snapshot, force)
            .map(|()| println!("{name} rolled back to {snapshot}")),
    )
}
