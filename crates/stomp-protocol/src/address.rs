//! Broker endpoint description: address, credentials and heart-beating.

use serde::{Deserialize, Serialize};

use crate::version::Scheme;

/// Where a connection points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerAddress {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

impl BrokerAddress {
    /// Resolve the port from the scheme when none is given.
    pub fn new(scheme: Scheme, host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            scheme,
            host: host.into(),
            port: port.unwrap_or_else(|| scheme.default_port()),
        }
    }

    /// `host:port`, as reported back to callers.
    pub fn server(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `tcp://host:port` / `ssl://host:port`.
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme.as_str(), self.host, self.port)
    }
}

impl std::fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url())
    }
}

/// Optional login/passcode pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub passcode: String,
}

// Keep passcodes out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("passcode", &"***")
            .finish()
    }
}

/// Heart-beat intervals in milliseconds (`heart-beat: cx,cy`). Zero disables a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Heartbeat {
    #[serde(default)]
    pub outgoing: u64,
    #[serde(default)]
    pub incoming: u64,
}

impl Heartbeat {
    pub fn is_enabled(&self) -> bool {
        self.outgoing > 0 || self.incoming > 0
    }

    pub fn header_value(&self) -> String {
        format!("{},{}", self.outgoing, self.incoming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_port_from_scheme() {
        let tcp = BrokerAddress::new(Scheme::Tcp, "broker.local", None);
        assert_eq!(tcp.port, 61613);
        let ssl = BrokerAddress::new(Scheme::Ssl, "broker.local", None);
        assert_eq!(ssl.server(), "broker.local:61614");
        assert_eq!(ssl.url(), "ssl://broker.local:61614");
    }

    #[test]
    fn explicit_port_wins() {
        let addr = BrokerAddress::new(Scheme::Tcp, "10.0.0.5", Some(7000));
        assert_eq!(addr.server(), "10.0.0.5:7000");
    }

    #[test]
    fn credentials_debug_hides_passcode() {
        let creds = Credentials {
            login: "admin".into(),
            passcode: "hunter2".into(),
        };
        let dbg = format!("{creds:?}");
        assert!(dbg.contains("admin"));
        assert!(!dbg.contains("hunter2"));
    }

    #[test]
    fn heartbeat_header() {
        let hb = Heartbeat {
            outgoing: 10000,
            incoming: 5000,
        };
        assert!(hb.is_enabled());
        assert_eq!(hb.header_value(), "10000,5000");
        assert!(!Heartbeat::default().is_enabled());
    }
}
