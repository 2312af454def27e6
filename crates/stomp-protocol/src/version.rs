use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing protocol enumerations out of caller input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unsupported STOMP version: {0}")]
    Version(String),

    #[error("Unsupported scheme: {0}")]
    Scheme(String),

    #[error("Unsupported ack mode: {0}")]
    AckMode(String),
}

/// STOMP protocol versions the binding can negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StompVersion {
    #[serde(rename = "1.0")]
    V1_0,
    #[serde(rename = "1.1")]
    V1_1,
    #[serde(rename = "1.2")]
    V1_2,
}

impl StompVersion {
    pub const ALL: [StompVersion; 3] = [Self::V1_0, Self::V1_1, Self::V1_2];

    /// Highest supported version; used when the caller asks for none.
    pub const LATEST: StompVersion = Self::V1_2;

    pub fn as_str(self) -> &'static str {
        match self {
            Self::V1_0 => "1.0",
            Self::V1_1 => "1.1",
            Self::V1_2 => "1.2",
        }
    }

    /// NACK frames were introduced in 1.1.
    pub fn supports_nack(self) -> bool {
        self >= Self::V1_1
    }

    /// Value of the `accept-version` header advertising every version up to `self`.
    pub fn accept_version_header(self) -> String {
        Self::ALL
            .iter()
            .filter(|v| **v <= self)
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for StompVersion {
    fn default() -> Self {
        Self::LATEST
    }
}

impl std::fmt::Display for StompVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StompVersion {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.0" => Ok(Self::V1_0),
            "1.1" => Ok(Self::V1_1),
            "1.2" => Ok(Self::V1_2),
            other => Err(ParseError::Version(other.to_string())),
        }
    }
}

/// Network scheme for the broker address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Tcp,
    Ssl,
}

impl Scheme {
    /// Conventional STOMP port for the scheme.
    pub fn default_port(self) -> u16 {
        match self {
            Self::Tcp => 61613,
            Self::Ssl => 61614,
        }
    }

    pub fn is_tls(self) -> bool {
        matches!(self, Self::Ssl)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Ssl => "ssl",
        }
    }
}

impl FromStr for Scheme {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "ssl" => Ok(Self::Ssl),
            _ => Err(ParseError::Scheme(s.to_string())),
        }
    }
}

/// Acknowledgment discipline of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AckMode {
    #[default]
    Auto,
    Client,
    ClientIndividual,
}

impl AckMode {
    /// Value of the SUBSCRIBE `ack` header.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Client => "client",
            Self::ClientIndividual => "client-individual",
        }
    }
}

impl FromStr for AckMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auto" => Ok(Self::Auto),
            "client" => Ok(Self::Client),
            "client-individual" => Ok(Self::ClientIndividual),
            other => Err(ParseError::AckMode(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_supported_versions() {
        assert_eq!("1.0".parse::<StompVersion>().unwrap(), StompVersion::V1_0);
        assert_eq!("1.2".parse::<StompVersion>().unwrap(), StompVersion::V1_2);
    }

    #[test]
    fn unsupported_version_message() {
        let err = "2.0".parse::<StompVersion>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported STOMP version: 2.0");
    }

    #[test]
    fn version_serialization() {
        assert_eq!(
            serde_json::to_string(&StompVersion::V1_1).unwrap(),
            r#""1.1""#
        );
    }

    #[test]
    fn accept_version_lists_lower_versions() {
        assert_eq!(StompVersion::V1_2.accept_version_header(), "1.0,1.1,1.2");
        assert_eq!(StompVersion::V1_0.accept_version_header(), "1.0");
    }

    #[test]
    fn nack_support() {
        assert!(!StompVersion::V1_0.supports_nack());
        assert!(StompVersion::V1_1.supports_nack());
    }

    #[test]
    fn scheme_default_ports() {
        assert_eq!(Scheme::Tcp.default_port(), 61613);
        assert_eq!(Scheme::Ssl.default_port(), 61614);
        assert_eq!("SSL".parse::<Scheme>().unwrap(), Scheme::Ssl);
        assert!("ws".parse::<Scheme>().is_err());
    }

    #[test]
    fn ack_mode_kebab_case() {
        assert_eq!(
            serde_json::to_string(&AckMode::ClientIndividual).unwrap(),
            r#""client-individual""#
        );
        let mode: AckMode = serde_json::from_str(r#""client""#).unwrap();
        assert_eq!(mode, AckMode::Client);
        assert_eq!(AckMode::default(), AckMode::Auto);
    }
}
