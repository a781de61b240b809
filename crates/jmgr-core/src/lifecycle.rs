use crate::CoreError;
use jmgr_runtime::{tools, Invocation};
use jmgr_schema::{Jail, Settings};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    Stop,
    Restart,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Start => write!(f, "start"),
            Transition::Stop => write!(f, "stop"),
            Transition::Restart => write!(f, "restart"),
        }
    }
}

/// Children are started, stopped and destroyed through their parent.
pub fn ensure_top_level(jail: &Jail) -> Result<(), CoreError> {
    match &jail.parent {
        Some(parent) => Err(CoreError::ManagedByParent {
            name: jail.name.clone(),
            parent: parent.name().to_owned(),
        }),
        None => Ok(()),
    }
}

/// The `jail(8)` call for `transition`, or `None` when the jail is already in
/// the requested state.
///
/// Jails declared in their own file under `jails_conf_d` are addressed by that
/// file; jails from the singleton `jail.conf` by name.
pub fn plan_transition(
    jail: &Jail,
    transition: Transition,
    settings: &Settings,
) -> Option<Invocation> {
    let own_file = !jail.config_path.is_empty()
        && Path::new(&jail.config_path).starts_with(&settings.jails_conf_d);
    let config = jail.config_path.as_str();
    let name = jail.name.as_str();
    let jail_cmd = Invocation::new(tools::JAIL);

    match transition {
        Transition::Start if jail.is_running() => None,
        Transition::Stop if !jail.is_running() => None,
        Transition::Start if own_file => Some(jail_cmd.args(["-c", "-f", config])),
        Transition::Start => Some(jail_cmd.args(["-c", name])),
        Transition::Stop if config.is_empty() => Some(jail_cmd.args(["-r", name])),
        Transition::Stop => Some(jail_cmd.args(["-r", "-f", config, name])),
        Transition::Restart if own_file => Some(jail_cmd.args(["-rc", "-f", config])),
        Transition::Restart => Some(jail_cmd.args(["-rc", name])),
    }
}
