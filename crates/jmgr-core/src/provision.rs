//! Checks and helpers shared by `create` and `clone`.

use crate::operator::Operator;
use crate::registry::Registry;
use crate::CoreError;
use jmgr_runtime::{host, Invocation, ProcessGateway};
use jmgr_schema::{NewJail, VolumeName};
use jmgr_store::VolumeStore;
use std::net::Ipv4Addr;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tracing::{debug, info};

/// Name and network arguments for a new jail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewJailRequest {
    pub name: String,
    pub ip: Option<String>,
    pub interface: Option<String>,
}

fn invalid(msg: impl Into<String>) -> CoreError {
    CoreError::Validation(msg.into())
}

/// Validate a new jail against the registry and the host, and resolve its
/// address. Nothing on the host is changed.
pub fn plan_new_jail(
    registry: &Registry,
    gw: &dyn ProcessGateway,
    operator: &dyn Operator,
    request: &NewJailRequest,
    force: bool,
) -> Result<NewJail, CoreError> {
    let name = request.name.as_str();
    let settings = &registry.settings;

    if name.is_empty() || name.contains('/') || name.chars().any(char::is_whitespace) {
        return Err(invalid(format!("'{name}' is not a usable jail name")));
    }
    if registry.exists(name) {
        return Err(invalid(format!("{name} already exists")));
    }

    let storage_volume = match settings.volume_dataset.as_deref() {
        Some(dataset) if registry.use_volumes => {
            let volumes = VolumeStore::new(gw);
            let listing = volumes
                .describe(dataset)
                .map_err(|e| invalid(format!("{dataset} does not exist: {e}")))?;
            let home = settings.jails_home.display().to_string();
            if !listing.contains(&home) {
                return Err(invalid(format!(
                    "jails_home {home} does not match where {dataset} is mounted"
                )));
            }
            let volume = VolumeName::new(dataset).child(name);
            if volumes.exists(volume.as_str()) {
                return Err(invalid(format!("ZFS dataset {volume} already exists")));
            }
            Some(volume)
        }
        _ => None,
    };

    let filesystem_path = settings.jails_home.join(name);
    if storage_volume.is_none() && filesystem_path.exists() {
        return Err(invalid(format!(
            "{} already exists",
            filesystem_path.display()
        )));
    }

    let conf_d = &settings.jails_conf_d;
    match std::fs::metadata(conf_d) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(invalid(format!(
                "{} is not a directory, can't create new jail",
                conf_d.display()
            )))
        }
        Err(_) => {
            return Err(invalid(format!(
                "directory {} does not exist, please create it and try again",
                conf_d.display()
            )))
        }
    }
    let config_path = settings.declaration_path(name);
    if config_path.exists() {
        return Err(invalid(format!(
            "file {} already exists",
            config_path.display()
        )));
    }

    let ip = match gw.lookup_ipv4(name) {
        Some(ip) => {
            debug!("{name} resolves to {ip}");
            Some(ip)
        }
        None => request
            .ip
            .as_deref()
            .map(|arg| {
                arg.parse::<Ipv4Addr>()
                    .map_err(|_| invalid(format!("not a valid IP address: {arg}")))
            })
            .transpose()?,
    };

    let interface = request
        .interface
        .clone()
        .unwrap_or_else(|| settings.jail_iface.clone());

    let inherit_ip = match ip {
        None => {
            if !force && !operator.confirm("No IP address found. Use host IP?") {
                return Err(CoreError::Declined);
            }
            true
        }
        Some(ip) => {
            if host::address_in_use(gw, ip) {
                return Err(invalid(format!(
                    "ip address already in use, {ip} responds to ping, can't continue"
                )));
            }
            if !host::interface_exists(gw, &interface)? {
                return Err(invalid(format!(
                    "can't find interface {interface} on this system"
                )));
            }
            false
        }
    };

    Ok(NewJail {
        name: name.to_owned(),
        ip,
        interface,
        inherit_ip,
        storage_volume,
        filesystem_path,
        config_path,
    })
}

/// Summary lines shown before asking to create or clone.
pub fn describe(jail: &NewJail) -> Vec<String> {
    let mut lines = vec![format!("Jail Name: {}", jail.name)];
    match jail.ip {
        Some(ip) if !jail.inherit_ip => {
            lines.push(format!("Jail IP: {ip}"));
            lines.push(format!("Jail Iface: {}", jail.interface));
        }
        _ => lines.push("Jail IP: Inherit host IP address".to_owned()),
    }
    lines
}

/// Run the site post-install hook as `<script> <name> <path> <config>`.
pub fn run_post_install(
    gw: &dyn ProcessGateway,
    script: &Path,
    jail: &NewJail,
) -> Result<(), CoreError> {
    let meta = std::fs::metadata(script)
        .map_err(|e| invalid(format!("post-install script {}: {e}", script.display())))?;
    if !meta.is_file() || meta.permissions().mode() & 0o111 == 0 {
        return Err(invalid(format!(
            "post-install script {} is not a file and/or not executable",
            script.display()
        )));
    }
    info!("running post-install script {}", script.display());
    gw.attached(
        &Invocation::new(script.display().to_string())
            .arg(jail.name.as_str())
            .arg(jail.filesystem_path.display().to_string())
            .arg(jail.config_path.display().to_string()),
    )?;
    Ok(())
}
