//! Declaration files for new jails, rendered from a site template.
//!
//! The template is a `jail.conf(5)` fragment with three placeholders:
//! `<JailName>`, `<JailPath>` and `<IPConf>`.

use crate::jail::NewJail;
use crate::SchemaError;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tracing::debug;

pub fn render_declaration(template: &str, jail: &NewJail) -> String {
    template
        .replace("<JailName>", &jail.name)
        .replace("<JailPath>", &jail.filesystem_path.display().to_string())
        .replace("<IPConf>", &jail.ip_conf())
}

/// Render `template_path` for `jail` and write it to `jail.config_path`.
///
/// The file is written to a temporary sibling first and renamed into place,
/// so a half-written declaration never appears in the config directory.
pub fn write_declaration(template_path: &Path, jail: &NewJail) -> Result<(), SchemaError> {
    let template = std::fs::read_to_string(template_path).map_err(|e| SchemaError::Template {
        path: template_path.display().to_string(),
        source: e,
    })?;
    let rendered = render_declaration(&template, jail);

    let dest = &jail.config_path;
    let write_err = |e: std::io::Error| SchemaError::WriteDeclaration {
        path: dest.display().to_string(),
        source: e,
    };
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(rendered.as_bytes()).map_err(write_err)?;
    tmp.as_file()
        .set_permissions(std::fs::Permissions::from_mode(0o644))
        .map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(dest).map_err(|e| write_err(e.error))?;

    debug!("wrote declaration {}", dest.display());
    Ok(())
}
