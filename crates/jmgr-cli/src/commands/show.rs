use super::{colorize_state, json_pretty, state_label, EXIT_SUCCESS};
use jmgr_core::Registry;
use jmgr_schema::Jail;

pub fn run(registry: &Registry, name: &str, json: bool) -> Result<u8, String> {
    let jail = registry
        .get(name)
        .ok_or_else(|| format!("jail {name} does not exist"))?;
    if json {
        println!("{}", json_pretty(jail)?);
        return Ok(EXIT_SUCCESS);
    }
    for (label, value) in describe(jail) {
        println!("{label:<15} {value}");
    }
    Ok(EXIT_SUCCESS)
}

fn or_none(value: &str) -> String {
    if value.is_empty() {
        "N/A".to_owned()
    } else {
        value.to_owned()
    }
}

fn describe(jail: &Jail) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("Name:", jail.name.clone()),
        (
            "JID:",
            format!(
                "{} ({})",
                jail.runtime_id,
                colorize_state(state_label(jail))
            ),
        ),
        ("Hostname:", or_none(&jail.hostname)),
        ("IPv4:", or_none(&jail.ipv4)),
    ];
    if !jail.ipv6_addrs.is_empty() {
        rows.push(("IPv6:", jail.ipv6_addrs.join(", ")));
    }
    rows.push(("Interface:", or_none(&jail.interface)));
    if let Some(parent) = &jail.parent {
        rows.push(("Parent:", parent.to_string()));
    }
    if jail.is_parent {
        rows.push(("Children:", "yes".to_owned()));
    }
    rows.push(("Config:", or_none(&jail.config_path)));
    rows.push(("OS:", or_none(&jail.os_version)));
    rows.push(("Start on boot:", jail.start_on_boot.to_string()));
    rows.push(("Path:", or_none(&jail.path)));
    rows.push((
        "Dataset:",
        jail.storage_volume
            .as_ref()
            .map_or_else(|| "N/A".to_owned(), ToString::to_string),
    ));
    if jail.is_volume_backed() {
        let snapshots = if jail.snapshots.is_empty() {
            "none".to_owned()
        } else {
            jail.snapshots
                .iter()
                .map(|s| s.tag())
                .collect::<Vec<_>>()
                .join(", ")
        };
        rows.push(("Snapshots:", snapshots));
    }
    rows
}
