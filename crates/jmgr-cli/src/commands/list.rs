use super::{colorize_state, json_pretty, state_label, EXIT_SUCCESS};
use console::{pad_str, Alignment, Term};
use jmgr_core::Registry;
use jmgr_schema::Jail;

/// Terminals wider than this also get the config column.
const WIDE: usize = 80;

pub fn run(registry: &Registry, running_only: bool, json: bool) -> Result<u8, String> {
    let jails: Vec<&Jail> = registry
        .jails()
        .iter()
        .filter(|j| !running_only || j.is_running())
        .collect();
    if json {
        println!("{}", json_pretty(&jails)?);
        return Ok(EXIT_SUCCESS);
    }
    if jails.is_empty() {
        println!(
            "{}",
            if running_only {
                "no running jails"
            } else {
                "no jails found"
            }
        );
        return Ok(EXIT_SUCCESS);
    }
    let (_, width) = Term::stdout().size();
    for line in render(&jails, usize::from(width) > WIDE) {
        println!("{line}");
    }
    Ok(EXIT_SUCCESS)
}

fn marker(jail: &Jail) -> &'static str {
    if jail.is_parent {
        "+"
    } else if jail.is_child() {
        "-"
    } else {
        ""
    }
}

fn render(jails: &[&Jail], wide: bool) -> Vec<String> {
    let name_width = jails
        .iter()
        .map(|j| j.name.len() + marker(j).len())
        .max()
        .unwrap_or(0)
        .max(4);
    let mut lines = Vec::with_capacity(jails.len() + 1);
    let mut header = format!(
        "{:<name_width$}  {:<5}  {:<8}  {:<15}  {:<18}  {:<4}",
        "NAME", "JID", "STATE", "IPV4", "RELEASE", "BOOT"
    );
    if wide {
        header.push_str("  CONFIG");
    }
    lines.push(header);

    for jail in jails {
        let name = format!("{}{}", jail.name, marker(jail));
        let state = colorize_state(state_label(jail));
        let mut line = format!(
            "{name:<name_width$}  {:<5}  {}  {:<15}  {:<18}  {:<4}",
            jail.runtime_id,
            pad_str(&state, 8, Alignment::Left, None),
            jail.ipv4,
            jail.os_version,
            jail.start_on_boot.to_string(),
        );
        if wide {
            line.push_str("  ");
            line.push_str(&jail.config_path);
        }
        lines.push(line.trim_end().to_owned());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use jmgr_schema::{BootPolicy, Parent};

    fn sample() -> Vec<Jail> {
        let mut www = Jail::named("www");
        www.runtime_id = 4;
        www.ipv4 = "10.0.0.4".into();
        www.os_version = "14.1-RELEASE-p3".into();
        www.start_on_boot = BootPolicy::Yes;
        www.config_path = "/etc/jail.conf.d/www.conf".into();
        www.is_parent = true;
        let mut child = Jail::named("www.app");
        child.parent = Some(Parent::Named("www".into()));
        vec![www, child]
    }

    #[test]
    fn narrow_listing_has_no_config_column() {
        let jails = sample();
        let refs: Vec<&Jail> = jails.iter().collect();
        let lines = render(&refs, false);
        assert_eq!(lines.len(), 3);
        assert!(!lines[0].contains("CONFIG"));
        assert!(lines[1].starts_with("www+"));
        assert!(lines[1].contains("10.0.0.4"));
        assert!(lines[1].contains("Yes"));
        assert!(lines[2].starts_with("www.app-"));
    }

    #[test]
    fn wide_listing_shows_config() {
        let jails = sample();
        let refs: Vec<&Jail> = jails.iter().collect();
        let lines = render(&refs, true);
        assert!(lines[0].ends_with("CONFIG"));
        assert!(lines[1].ends_with("/etc/jail.conf.d/www.conf"));
    }
}
