//! Secret-wrapped strings
//!
//! A [`Secret`] renders as [`REDACTED`] through `Display`, `Debug` and
//! `Serialize`. The real value is only reachable through
//! [`Secret::expose`].

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Placeholder emitted wherever a secret would be printed or serialized
pub const REDACTED: &str = "xxxxx";

/// String value that never reveals itself implicitly
#[derive(Clone)]
pub struct Secret(SecretString);

impl Secret {
    /// Wrap a plain value
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// The underlying value
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Whether the underlying value is empty
    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({REDACTED})")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}
