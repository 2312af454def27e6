//! Binding configuration, loadable from TOML, and per-call connect options.

use serde::Deserialize;
use stomp_protocol::{BrokerAddress, Credentials, Heartbeat, Scheme, StompVersion};
use stomp_transport::OpenRequest;

use crate::error::{BindingError, BindingResult};

/// Service-wide settings for a `StompBinding`.
#[derive(Debug, Clone, Deserialize)]
pub struct BindingConfig {
    /// Default deadline for a single `read_frame`, in milliseconds.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Pending frames older than this are dropped by `evict_stale`. None keeps them forever.
    ///
    /// Every MESSAGE is parked, including deliveries on `auto` subscriptions
    /// that are never acked, so a long-lived binding with auto subscriptions
    /// should set this and run the sweeper.
    #[serde(default)]
    pub pending_frame_ttl_secs: Option<u64>,
    /// How often the background sweeper runs `evict_stale`.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Root of the exposed parameter namespace.
    #[serde(default = "default_parameter_root")]
    pub parameter_root: String,
    /// Version requested when a connect call names none.
    #[serde(default)]
    pub default_protocol_version: StompVersion,
}

fn default_read_timeout_ms() -> u64 {
    30_000
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_parameter_root() -> String {
    "Device.STOMP.".to_string()
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: default_read_timeout_ms(),
            pending_frame_ttl_secs: None,
            sweep_interval_secs: default_sweep_interval_secs(),
            parameter_root: default_parameter_root(),
            default_protocol_version: StompVersion::default(),
        }
    }
}

impl BindingConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}

/// Options accepted by `connect`, as sent by orchestration callers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOptions {
    /// `tcp` (default) or `ssl`.
    #[serde(default)]
    pub scheme: Option<String>,
    pub host: String,
    /// Defaults to 61613 for tcp and 61614 for ssl.
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub passcode: Option<String>,
    #[serde(default)]
    pub virtual_host: Option<String>,
    /// One of "1.0", "1.1", "1.2".
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub heartbeat: Option<Heartbeat>,
}

impl ConnectOptions {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Validate and resolve defaults. Runs before any network action.
    pub fn into_open_request(self, default_version: StompVersion) -> BindingResult<OpenRequest> {
        let version = match self.protocol_version.as_deref() {
            Some(v) => v.parse::<StompVersion>()?,
            None => default_version,
        };
        let scheme = match self.scheme.as_deref() {
            Some(s) => s.parse::<Scheme>()?,
            None => Scheme::default(),
        };

        let host = self.host.trim();
        if host.is_empty() {
            return Err(BindingError::Validation("host must not be empty".into()));
        }
        if self.port == Some(0) {
            return Err(BindingError::Validation("port must be non-zero".into()));
        }

        let credentials = self.login.map(|login| Credentials {
            login,
            passcode: self.passcode.unwrap_or_default(),
        });

        Ok(OpenRequest {
            address: BrokerAddress::new(scheme, host, self.port),
            credentials,
            version,
            virtual_host: self.virtual_host.filter(|v| !v.is_empty()),
            heartbeat: self.heartbeat,
        })
    }
}
