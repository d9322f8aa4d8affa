use serde::{Deserialize, Serialize};

/// Verified identity of a caller. Opaque beyond equality and display;
/// established once at login and immutable for the session's lifetime.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Principal(id.into())
    }

    /// Derive the principal from a canonical identity ARN: the trailing
    /// path segment names the user (or the role session, for assumed roles).
    pub fn from_identity_arn(arn: &str) -> Option<Principal> {
        let tail = arn.trim().rsplit('/').next().unwrap_or_default();
        if tail.is_empty() { None } else { Some(Principal(tail.to_string())) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
