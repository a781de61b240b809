use super::{finish, EXIT_SUCCESS};
use jmgr_core::{CoreError, DestroyOptions, Destroyed, Engine};

/// Destroy each target in turn. The first failure stops the rest, and so
/// does a declined confirmation.
pub fn run(
    engine: &mut Engine<'_>,
    targets: &[String],
    options: DestroyOptions,
) -> Result<u8, String> {
    for target in targets {
        match engine.destroy(target, options) {
            Ok(Destroyed::Jail(name)) => println!("destroyed jail {name}"),
            Ok(Destroyed::Snapshot(snapshot)) => println!("destroyed snapshot {snapshot}"),
            Err(e @ CoreError::Declined) => return finish(Err(e)),
            Err(e) => return Err(e.to_string()),
        }
    }
    Ok(EXIT_SUCCESS)
}
