//! Line-oriented reader for `jail.conf(5)` declarations.
//!
//! Only the handful of parameters jmgr reports on are extracted; everything
//! else inside a jail block is ignored. The format is not parsed as a grammar:
//! a block starts on a `<name> {` line and ends on the next line holding `}`.

use crate::jail::Jail;
use crate::SchemaError;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

static RECORD_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([^\s#={}][^={}]*?)\s*\{\s*$").unwrap_or_else(|e| panic!("{e}"))
});

static RECORD_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\}").unwrap_or_else(|e| panic!("{e}")));

/// One captured field: the pattern holds a single capture group whose trimmed
/// value is handed to `assign`.
struct FieldRule {
    field: &'static str,
    pattern: Regex,
    assign: fn(&mut Declaration, String),
}

fn rule(field: &'static str, pattern: &str, assign: fn(&mut Declaration, String)) -> FieldRule {
    FieldRule {
        field,
        pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("bad pattern for {field}: {e}")),
        assign,
    }
}

/// Rules are tried in this order on every line of a block.
static FIELD_RULES: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    vec![
        rule(
            "hostname",
            r#"^\s*(?:host\.)?hostname\s*=\s*"?([^";]*)"?\s*;"#,
            |d, v| d.hostname = Some(v),
        ),
        rule(
            "path",
            r#"^\s*path\s*=\s*"?([^";]*)"?\s*;"#,
            |d, v| d.path = Some(v),
        ),
        rule(
            "ipv4",
            r#"ip4\.addr\s*\+?=\s*"?(?:\w+\|)?(\d+\.\d+\.\d+\.\d+)"#,
            |d, v| d.ipv4 = Some(v),
        ),
        rule(
            "ipv4_inherit",
            r#"^\s*ip4\s*=\s*"?(\w+)"?\s*;"#,
            |d, v| d.ipv4_inherit = Some(v),
        ),
        rule(
            "interface",
            r#"^\s*interface\s*=\s*"?([^";]*)"?\s*;"#,
            |d, v| d.interface = Some(v),
        ),
    ]
});

/// Fields captured from one jail block. `None` means the block did not set it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub config_path: String,
    pub hostname: Option<String>,
    pub path: Option<String>,
    pub ipv4: Option<String>,
    pub ipv4_inherit: Option<String>,
    pub interface: Option<String>,
}

impl Declaration {
    fn new(name: &str, config_path: &str) -> Self {
        Self {
            name: name.to_owned(),
            config_path: config_path.to_owned(),
            ..Self::default()
        }
    }

    fn captured(&self, field: &str) -> bool {
        match field {
            "hostname" => self.hostname.is_some(),
            "path" => self.path.is_some(),
            "ipv4" => self.ipv4.is_some(),
            "ipv4_inherit" => self.ipv4_inherit.is_some(),
            "interface" => self.interface.is_some(),
            _ => false,
        }
    }

    /// Overwrite the fields this block captured. Runtime fields are untouched.
    pub fn merge_into(&self, jail: &mut Jail) {
        if let Some(v) = &self.hostname {
            jail.hostname.clone_from(v);
        }
        if let Some(v) = &self.path {
            jail.path.clone_from(v);
        }
        if let Some(v) = &self.ipv4 {
            jail.ipv4.clone_from(v);
        }
        if let Some(v) = &self.ipv4_inherit {
            jail.ipv4_inherit.clone_from(v);
        }
        if let Some(v) = &self.interface {
            jail.interface.clone_from(v);
        }
        jail.config_path.clone_from(&self.config_path);
    }

    pub fn into_jail(self) -> Jail {
        let mut jail = Jail::named(self.name.clone());
        self.merge_into(&mut jail);
        jail
    }
}

/// Parse every jail block in `input`. `config_path` is recorded on each
/// declaration as its origin.
pub fn parse_declarations_str(input: &str, config_path: &str) -> Vec<Declaration> {
    let mut found = Vec::new();
    let mut current: Option<Declaration> = None;

    for line in input.lines() {
        match current.as_mut() {
            None => {
                if let Some(caps) = RECORD_START.captures(line) {
                    current = Some(Declaration::new(caps[1].trim(), config_path));
                }
            }
            Some(decl) => {
                if RECORD_END.is_match(line) {
                    found.extend(current.take());
                    continue;
                }
                for rule in FIELD_RULES.iter() {
                    if decl.captured(rule.field) {
                        continue;
                    }
                    if let Some(caps) = rule.pattern.captures(line) {
                        (rule.assign)(decl, caps[1].trim().to_owned());
                    }
                }
            }
        }
    }

    if let Some(decl) = current {
        debug!(
            "unterminated jail block '{}' in {config_path}, ignoring",
            decl.name
        );
    }
    found
}

pub fn parse_declaration_file(path: &Path) -> Result<Vec<Declaration>, SchemaError> {
    let content = std::fs::read_to_string(path).map_err(|e| SchemaError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(parse_declarations_str(
        &content,
        &path.display().to_string(),
    ))
}

/// Merge declarations into `jails`: update a jail of the same name in place
/// or append a new one.
pub fn merge_declarations(jails: &mut Vec<Jail>, declarations: Vec<Declaration>) {
    for decl in declarations {
        match jails.iter_mut().find(|j| j.name == decl.name) {
            Some(existing) => decl.merge_into(existing),
            None => jails.push(decl.into_jail()),
        }
    }
}

/// Parse `path` and merge it into `jails`. Unreadable files are skipped.
pub fn merge_declaration_file(jails: &mut Vec<Jail>, path: &Path) {
    match parse_declaration_file(path) {
        Ok(declarations) => merge_declarations(jails, declarations),
        Err(e) => debug!("skipping declaration file: {e}"),
    }
}
