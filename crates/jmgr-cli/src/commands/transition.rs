use super::{finish, EXIT_FAILURE, EXIT_SUCCESS};
use jmgr_core::{CoreError, Engine, Transition, TransitionOutcome};

fn report(name: &str, transition: Transition, outcome: TransitionOutcome) {
    match (transition, outcome) {
        (_, TransitionOutcome::Applied) => println!("{name}: {transition} done"),
        (Transition::Start, TransitionOutcome::Unchanged) => println!("{name} is already running"),
        (_, TransitionOutcome::Unchanged) => println!("{name} is not running"),
    }
}

/// Start, stop or restart the named jails, or every top-level jail with
/// `all`. Children are skipped and unknown names reported; both make the
/// exit code non-zero without stopping the batch.
pub fn run(
    engine: &mut Engine<'_>,
    transition: Transition,
    names: &[String],
    all: bool,
) -> Result<u8, String> {
    if all {
        return match engine.transition_all(transition) {
            Ok(outcomes) => {
                for (name, outcome) in outcomes {
                    report(&name, transition, outcome);
                }
                Ok(EXIT_SUCCESS)
            }
            Err(e) => finish(Err(e)),
        };
    }
    if names.is_empty() {
        return Err(format!("name the jails to {transition}, or pass --all"));
    }

    let mut code = EXIT_SUCCESS;
    for name in names {
        let result = match transition {
            Transition::Start => engine.start(name),
            Transition::Stop => engine.stop(name),
            Transition::Restart => engine.restart(name),
        };
        match result {
            Ok(outcome) => report(name, transition, outcome),
            Err(e @ CoreError::ManagedByParent { .. }) => {
                println!("skipping {name}: {e}");
                code = EXIT_FAILURE;
            }
            Err(e @ CoreError::JailNotFound(_)) => {
                eprintln!("error: {e}");
                code = EXIT_FAILURE;
            }
            Err(e) => return Err(e.to_string()),
        }
    }
    Ok(code)
}
