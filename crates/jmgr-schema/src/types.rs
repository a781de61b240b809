//! Newtype wrappers for storage identifiers.
//!
//! Both serialize as plain strings so that JSON output stays readable.

use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// A ZFS dataset backing a jail, e.g. `zroot/jails/www`.
    VolumeName
);

string_newtype!(
    /// A ZFS snapshot identifier, `<dataset>@<tag>`.
    SnapshotName
);

impl VolumeName {
    /// Last path component of the dataset, which names the jail it backs.
    pub fn leaf(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Child dataset `<self>/<name>`.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        Self(format!("{}/{name}", self.0.trim_end_matches('/')))
    }
}

impl SnapshotName {
    /// Parse a bare snapshot identifier. Both sides of the `@` must be
    /// non-empty and the identifier must not contain whitespace.
    pub fn parse(input: &str) -> Result<Self, SchemaError> {
        let valid = matches!(input.split_once('@'), Some((volume, tag))
            if !volume.is_empty() && !tag.is_empty() && !tag.contains('@'))
            && !input.chars().any(char::is_whitespace);
        if valid {
            Ok(Self(input.to_owned()))
        } else {
            Err(SchemaError::InvalidSnapshotName(input.to_owned()))
        }
    }

    /// Whether `input` has the shape of a snapshot identifier.
    pub fn looks_like(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    pub fn volume(&self) -> &str {
        self.0.split_once('@').map_or(self.0.as_str(), |(v, _)| v)
    }

    pub fn tag(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, t)| t)
    }
}
