use super::{json_pretty, EXIT_CONFIG_ERROR, EXIT_SUCCESS};
use jmgr_core::Registry;
use std::path::Path;

/// Print the resolved settings and any configuration problems. With `--json`
/// the whole registry is dumped.
pub fn run(registry: &Registry, json: bool) -> Result<u8, String> {
    if json {
        println!("{}", json_pretty(registry)?);
    } else {
        for (key, value) in rows(registry) {
            println!("{key:<16} {value}");
        }
        if registry.problems.is_empty() {
            println!("\nconfiguration OK");
        } else {
            println!("\nproblems:");
            for problem in &registry.problems {
                println!("  - {problem}");
            }
        }
    }
    Ok(if registry.bad_config() {
        EXIT_CONFIG_ERROR
    } else {
        EXIT_SUCCESS
    })
}

fn path(p: &Path) -> String {
    p.display().to_string()
}

fn rows(registry: &Registry) -> Vec<(&'static str, String)> {
    let s = &registry.settings;
    vec![
        ("settings file", path(&registry.settings_path)),
        ("jails_home", path(&s.jails_home)),
        ("os_media_dir", path(&s.os_media_dir)),
        (
            "volume_dataset",
            s.volume_dataset.clone().unwrap_or_else(|| "none".to_owned()),
        ),
        ("jails_conf_d", path(&s.jails_conf_d)),
        ("legacy_conf", path(&s.legacy_conf)),
        ("template", path(&s.template)),
        (
            "post_install",
            s.post_install
                .as_deref()
                .map_or_else(|| "none".to_owned(), path),
        ),
        ("os_url_prefix", s.os_url_prefix.clone()),
        ("jail_user", s.jail_user.clone()),
        ("jail_iface", s.jail_iface.clone()),
        ("use volumes", registry.use_volumes.to_string()),
        ("jails", registry.jails().len().to_string()),
    ]
}
