pub mod boot;
pub mod completions;
pub mod config;
pub mod create;
pub mod destroy;
pub mod doctor;
pub mod enter;
pub mod list;
pub mod man_pages;
pub mod show;
pub mod snapshot;
pub mod transition;
pub mod update;

use indicatif::{ProgressBar, ProgressStyle};
use jmgr_core::CoreError;
use jmgr_schema::Jail;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_PERMISSION_DENIED: u8 = 4;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner())
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        style("{spinner:.cyan} {msg}")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(style("{msg}"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(style("{msg}"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn state_label(jail: &Jail) -> &'static str {
    if jail.is_running() {
        "running"
    } else {
        "stopped"
    }
}

pub fn colorize_state(state: &str) -> String {
    use console::Style;
    match state {
        "running" => Style::new().green().bold().apply_to(state).to_string(),
        "stopped" => Style::new().dim().apply_to(state).to_string(),
        other => other.to_owned(),
    }
}

/// Map an engine result to an exit code. A declined confirmation is not a
/// failure.
pub fn finish(result: Result<(), CoreError>) -> Result<u8, String> {
    match result {
        Ok(()) => Ok(EXIT_SUCCESS),
        Err(CoreError::Declined) => {
            println!("nothing done");
            Ok(EXIT_SUCCESS)
        }
        Err(e) => Err(e.to_string()),
    }
}

/// Exit code for an error message that reached `main`.
pub fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("need root capabilities") {
        EXIT_PERMISSION_DENIED
    } else if msg.starts_with("bad configuration") || msg.starts_with("settings") {
        EXIT_CONFIG_ERROR
    } else {
        EXIT_FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_pretty_serializes_jail() {
        let jail = Jail::named("www");
        let result = json_pretty(&jail).unwrap();
        assert!(result.contains("\"name\": \"www\""));
        assert!(result.contains("\"jid\": 0"));
    }

    #[test]
    fn colorize_state_keeps_label() {
        assert!(colorize_state("running").contains("running"));
        assert!(colorize_state("stopped").contains("stopped"));
        assert_eq!(colorize_state("dying"), "dying");
    }

    #[test]
    fn state_follows_jail_id() {
        let mut jail = Jail::named("www");
        assert_eq!(state_label(&jail), "stopped");
        jail.runtime_id = 3;
        assert_eq!(state_label(&jail), "running");
    }

    #[test]
    fn declined_is_success() {
        assert_eq!(finish(Err(CoreError::Declined)), Ok(EXIT_SUCCESS));
        assert!(finish(Err(CoreError::JailNotFound("x".into()))).is_err());
    }

    #[test]
    fn exit_codes_by_message() {
        let denied = CoreError::PermissionDenied("start jails".into()).to_string();
        assert_eq!(exit_code_for(&denied), EXIT_PERMISSION_DENIED);
        let bad = CoreError::BadConfig("create jails".into()).to_string();
        assert_eq!(exit_code_for(&bad), EXIT_CONFIG_ERROR);
        assert_eq!(exit_code_for("jail www does not exist"), EXIT_FAILURE);
    }

    #[test]
    fn exit_codes_are_distinct() {
        assert_ne!(EXIT_SUCCESS, EXIT_FAILURE);
        assert_ne!(EXIT_FAILURE, EXIT_CONFIG_ERROR);
        assert_ne!(EXIT_CONFIG_ERROR, EXIT_PERMISSION_DENIED);
    }

    #[test]
    fn spinner_finishes() {
        let pb = spinner("testing...");
        spin_ok(&pb, "done");
        let pb = spinner("testing...");
        spin_fail(&pb, "failed");
    }
}
