use super::{EXIT_FAILURE, EXIT_SUCCESS};
use jmgr_core::Registry;
use jmgr_runtime::ProcessGateway;
use std::path::Path;

pub fn run(registry: &Registry, gw: &dyn ProcessGateway, json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    check_prereqs(registry.use_volumes, &mut checks, &mut all_pass);
    check_privilege(gw, &mut checks);
    check_settings(registry, &mut checks, &mut all_pass);
    check_layout(registry, &mut checks, &mut all_pass);
    check_disk_space(&registry.settings.jails_home, &mut checks);

    let running = registry.running().count();
    checks.push(Check::info(
        "jails",
        &format!("{} jails ({running} running)", registry.jails().len()),
    ));

    print_results(&checks, all_pass, json_output)
}

fn check_prereqs(use_volumes: bool, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let missing = jmgr_runtime::check_jail_prereqs(use_volumes);
    if missing.is_empty() {
        checks.push(Check::pass("jail_tools", "Jail tools present"));
    } else {
        *all_pass = false;
        checks.push(Check::fail(
            "jail_tools",
            &jmgr_runtime::format_missing(&missing),
        ));
    }
}

fn check_privilege(gw: &dyn ProcessGateway, checks: &mut Vec<Check>) {
    if gw.privileged() {
        checks.push(Check::pass("privilege", "Running as root"));
    } else {
        checks.push(Check::warn(
            "privilege",
            "Not running as root: only listing commands will work",
        ));
    }
}

fn check_settings(registry: &Registry, checks: &mut Vec<Check>, all_pass: &mut bool) {
    if registry.problems.is_empty() {
        checks.push(Check::pass(
            "settings",
            &format!("Settings OK ({})", registry.settings_path.display()),
        ));
        return;
    }
    *all_pass = false;
    for problem in &registry.problems {
        checks.push(Check::fail("settings", problem));
    }
}

fn check_layout(registry: &Registry, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let settings = &registry.settings;
    if settings.jails_conf_d.is_dir() {
        checks.push(Check::pass(
            "jails_conf_d",
            &format!("Declaration directory {} exists", settings.jails_conf_d.display()),
        ));
    } else {
        *all_pass = false;
        checks.push(Check::fail(
            "jails_conf_d",
            &format!(
                "Declaration directory {} is missing (create and clone need it)",
                settings.jails_conf_d.display()
            ),
        ));
    }

    if settings.template.is_file() {
        checks.push(Check::pass(
            "template",
            &format!("Declaration template {} exists", settings.template.display()),
        ));
    } else {
        *all_pass = false;
        checks.push(Check::fail(
            "template",
            &format!(
                "Declaration template {} is missing (create and clone need it)",
                settings.template.display()
            ),
        ));
    }

    if settings.os_media_dir.is_dir() {
        checks.push(Check::pass(
            "os_media",
            &format!("Release cache {} exists", settings.os_media_dir.display()),
        ));
    } else {
        checks.push(Check::info(
            "os_media",
            "Release cache not created yet (will be created on first create)",
        ));
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("jmgr doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}

fn check_disk_space(jails_home: &Path, checks: &mut Vec<Check>) {
    let Ok(c_path) = std::ffi::CString::new(jails_home.to_string_lossy().as_bytes()) else {
        return;
    };

    // SAFETY: zeroed statvfs is a valid initial state for the struct.
    #[allow(unsafe_code, clippy::undocumented_unsafe_blocks)]
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    // SAFETY: c_path is NUL-terminated and stat is a valid, writable struct
    // that is only read after a successful call.
    #[allow(unsafe_code, clippy::undocumented_unsafe_blocks)]
    let ret = unsafe { libc::statvfs(c_path.as_ptr(), &raw mut stat) };
    if ret != 0 {
        return;
    }

    #[allow(clippy::unnecessary_cast)]
    let avail_mb = (stat.f_bavail as u64 * stat.f_frsize as u64) / (1024 * 1024);

    // A fresh base system needs roughly 1 GB.
    if avail_mb < 1024 {
        checks.push(Check::warn(
            "disk_space",
            &format!(
                "Only {avail_mb} MB free under {}, not enough for a new jail",
                jails_home.display()
            ),
        ));
    } else {
        checks.push(Check::pass(
            "disk_space",
            &format!(
                "Disk space: {} GB free under {}",
                avail_mb / 1024,
                jails_home.display()
            ),
        ));
    }
}
