//! Identities that flow through a workflow run.
//!
//! Template names and scan targets are both strings on the wire but are
//! never interchangeable: one tags log lines, the other keys the failure
//! cache.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Declares a transparent string identity with the conversions a workflow
/// tree needs: construction from any string, borrowing as `&str` for map
/// lookups, and plain display for log tags.
macro_rules! string_identity {
    ($(#[$doc:meta])* $vis:vis struct $name:ident;) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        $vis struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            pub fn into_inner(self) -> String {
                self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl<'a> From<&'a str> for $name {
            fn from(value: &'a str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_identity! {
    /// Identity of a template node inside a workflow tree
    /// (e.g., "http/technologies/tech-detect.yaml").
    ///
    /// Used to tag every recovered error logged by the scheduler.
    pub struct TemplateName;
}

string_identity! {
    /// The scan target a workflow runs against (host, host:port or URL).
    pub struct TargetId;
}

impl TargetId {
    /// Lowercased `host[:port]` of the target, with any scheme, path,
    /// query or fragment removed.
    ///
    /// Failure counts are kept per host, so every URL on one host shares a
    /// single counter.
    pub fn host(&self) -> String {
        let target = self.as_str();
        let rest = target.split_once("://").map_or(target, |(_, rest)| rest);
        let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        rest[..end].to_ascii_lowercase()
    }
}
