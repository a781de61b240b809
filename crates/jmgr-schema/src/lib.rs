//! Jail data model, declaration parsing, templating, and settings for jmgr.
//!
//! This crate defines the schema layer: the canonical `Jail` record and the
//! `jls(8)` status report it is decoded from, the line-oriented `jail.conf(5)`
//! declaration parser (`parse_declarations_str`, `merge_declaration_file`),
//! declaration templating for new jails (`render_declaration`), and the TOML
//! settings file (`Settings`).

pub mod declaration;
pub mod jail;
pub mod settings;
pub mod template;
pub mod types;

pub use declaration::{
    merge_declaration_file, merge_declarations, parse_declaration_file, parse_declarations_str,
    Declaration,
};
pub use jail::{parse_status_report, BootPolicy, Jail, NewJail, Parent, StatusReport};
pub use settings::{parse_settings_file, parse_settings_str, settings_path, Settings};
pub use template::{render_declaration, write_declaration};
pub use types::{SnapshotName, VolumeName};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse settings: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("failed to parse jail status report: {0}")]
    StatusReport(#[from] serde_json::Error),
    #[error("can't open jail config template file {path}: {source}")]
    Template {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    WriteDeclaration {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid snapshot name '{0}', expected '<volume>@<snapshot>'")]
    InvalidSnapshotName(String),
}
