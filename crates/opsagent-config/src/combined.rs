use serde::{Deserialize, Serialize};

use crate::declared::{Declaration, Declared, admit_typed};

/// `combined` section: receivers shared across signal types
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CombinedConfig {
    /// Receivers keyed by identifier
    #[serde(default)]
    pub receivers: Declared<CombinedReceiver>,
}

/// Combined receiver declaration, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CombinedReceiver {
    /// OTLP over gRPC
    Otlp(OtlpReceiver),
}

impl CombinedReceiver {
    /// Discriminators accepted under `type`
    pub const TYPES: &'static [&'static str] = &["otlp"];

    /// Discriminator of this declaration
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Otlp(_) => "otlp",
        }
    }
}

impl Declaration for CombinedReceiver {
    const KIND: &'static str = "combined receiver";

    fn admit(id: &str, raw: serde_yaml::Value) -> Result<Self, String> {
        admit_typed(Self::KIND, Self::TYPES, id, raw)
    }
}

fn default_grpc_endpoint() -> String {
    "0.0.0.0:4317".to_owned()
}

/// `otlp` receiver
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OtlpReceiver {
    /// `host:port` the gRPC server binds
    #[serde(default = "default_grpc_endpoint")]
    pub grpc_endpoint: String,
}

impl Default for OtlpReceiver {
    fn default() -> Self {
        Self {
            grpc_endpoint: default_grpc_endpoint(),
        }
    }
}

impl OtlpReceiver {
    /// Port part of the endpoint, if it parses
    pub fn port(&self) -> Option<u32> {
        let (_, port) = self.grpc_endpoint.rsplit_once(':')?;
        port.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_defaults_to_standard_port() {
        let receiver = CombinedReceiver::admit("otlp", serde_yaml::from_str("type: otlp").unwrap()).unwrap();
        let CombinedReceiver::Otlp(otlp) = receiver;
        assert_eq!(otlp.grpc_endpoint, "0.0.0.0:4317");
        assert_eq!(otlp.port(), Some(4317));
    }

    #[test]
    fn port_is_none_without_colon() {
        let otlp = OtlpReceiver {
            grpc_endpoint: "localhost".to_owned(),
        };
        assert_eq!(otlp.port(), None);
    }
}
