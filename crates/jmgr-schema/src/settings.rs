use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SETTINGS_ENV: &str = "JMGR_CONFIG";
pub const DEFAULT_SETTINGS_PATH: &str = "/usr/local/etc/jmgr/jmgr.toml";

/// Site settings read from `jmgr.toml`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Directory new jails are created under. Replaced by the mountpoint of
    /// `volume_dataset` when one is configured.
    #[serde(default = "default_jails_home")]
    pub jails_home: PathBuf,
    #[serde(default = "default_os_media_dir")]
    pub os_media_dir: PathBuf,
    #[serde(default)]
    pub volume_dataset: Option<String>,
    #[serde(default = "default_jails_conf_d")]
    pub jails_conf_d: PathBuf,
    #[serde(default = "default_legacy_conf")]
    pub legacy_conf: PathBuf,
    #[serde(default = "default_template")]
    pub template: PathBuf,
    #[serde(default)]
    pub post_install: Option<PathBuf>,
    #[serde(default = "default_os_url_prefix")]
    pub os_url_prefix: String,
    #[serde(default = "default_jail_user")]
    pub jail_user: String,
    #[serde(default = "default_jail_iface")]
    pub jail_iface: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            jails_home: default_jails_home(),
            os_media_dir: default_os_media_dir(),
            volume_dataset: None,
            jails_conf_d: default_jails_conf_d(),
            legacy_conf: default_legacy_conf(),
            template: default_template(),
            post_install: None,
            os_url_prefix: default_os_url_prefix(),
            jail_user: default_jail_user(),
            jail_iface: default_jail_iface(),
        }
    }
}

impl Settings {
    /// `<jails_conf_d>/<name>.conf`
    pub fn declaration_path(&self, name: &str) -> PathBuf {
        self.jails_conf_d.join(format!("{name}.conf"))
    }

    /// True when `config_path` is the singleton `jail.conf` rather than a
    /// per-jail file.
    pub fn is_legacy_declaration(&self, config_path: &str) -> bool {
        !config_path.is_empty() && Path::new(config_path) == self.legacy_conf
    }
}

fn default_jails_home() -> PathBuf {
    PathBuf::from("/usr/local/jails")
}

fn default_os_media_dir() -> PathBuf {
    PathBuf::from("/usr/local/jails/media")
}

fn default_jails_conf_d() -> PathBuf {
    PathBuf::from("/etc/jail.conf.d")
}

fn default_legacy_conf() -> PathBuf {
    PathBuf::from("/etc/jail.conf")
}

fn default_template() -> PathBuf {
    PathBuf::from("/usr/local/etc/jmgr/jail.conf.template")
}

fn default_os_url_prefix() -> String {
    "https://download.freebsd.org/releases".to_owned()
}

fn default_jail_user() -> String {
    "root".to_owned()
}

fn default_jail_iface() -> String {
    "em0".to_owned()
}

/// `$JMGR_CONFIG`, or the default location when unset or empty.
pub fn settings_path() -> PathBuf {
    std::env::var_os(SETTINGS_ENV)
        .filter(|v| !v.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH), PathBuf::from)
}

pub fn parse_settings_str(input: &str) -> Result<Settings, SchemaError> {
    Ok(toml::from_str(input)?)
}

pub fn parse_settings_file(path: impl AsRef<Path>) -> Result<Settings, SchemaError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| SchemaError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_settings_str(&content)
}
