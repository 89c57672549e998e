//! The ambient configuration layer (§10.3): TOML-backed defaults for the
//! explicit per-call options `Client`/`Server` already accept. Nothing in
//! the core dispatcher, analyzer, or builder reads this module — a
//! `ClientConfig`/`ServerConfig` only ever seeds the options a caller hands
//! to [`crate::client::DynamicClient::new`] or a server's bind setup.

use serde::Deserialize;

use crate::envelope::SoapVersion;

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_bind_path() -> String {
    "/".to_string()
}

/// Deserializes `"1.1"`/`"1.2"` into [`SoapVersion`] for config files.
fn deserialize_soap_version<'de, D>(deserializer: D) -> Result<Option<SoapVersion>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None => Ok(None),
        Some("1.1") => Ok(Some(SoapVersion::V1_1)),
        Some("1.2") => Ok(Some(SoapVersion::V1_2)),
        Some(other) => Err(serde::de::Error::custom(format!(
            "unrecognized soap_version `{other}`, expected \"1.1\" or \"1.2\""
        ))),
    }
}

/// Default values folded into [`crate::client::ClientOptions`] before a
/// `DynamicClient` is constructed (§10.3).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    #[serde(rename = "timeout_ms")]
    pub default_timeout_ms: u64,
    #[serde(rename = "soap_version", deserialize_with = "deserialize_soap_version")]
    pub default_soap_version: Option<SoapVersion>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            default_timeout_ms: default_timeout_ms(),
            default_soap_version: None,
            username: None,
            password: None,
        }
    }
}

impl ClientConfig {
    /// Parses a TOML document into a `ClientConfig`.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Default values for a declarative server host (§10.3).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    #[serde(rename = "bind")]
    pub bind_address: String,
    #[serde(rename = "path")]
    pub bind_path: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: default_bind_address(),
            bind_path: default_bind_path(),
            username: None,
            password: None,
        }
    }
}

impl ServerConfig {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_config_defaults_when_absent() {
        let config = ClientConfig::from_toml("").unwrap();
        assert_eq!(config.default_timeout_ms, 30_000);
        assert_eq!(config.default_soap_version, None);
    }

    #[test]
    fn client_config_parses_soap_version() {
        let config = ClientConfig::from_toml("soap_version = \"1.2\"\ntimeout_ms = 5000").unwrap();
        assert_eq!(config.default_timeout_ms, 5000);
        assert_eq!(config.default_soap_version, Some(SoapVersion::V1_2));
    }

    #[test]
    fn server_config_defaults_when_absent() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.bind_path, "/");
    }

    #[test]
    fn rejects_unrecognized_soap_version() {
        let err = ClientConfig::from_toml("soap_version = \"2.0\"");
        assert!(err.is_err());
    }
}
