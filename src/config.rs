//! Bridge configuration loaded from environment variables and host settings.
//!
//! Environment variables (or a `.env` file via `dotenvy`) provide the
//! defaults. The host's own settings store takes precedence for the keys a
//! user can edit in the host UI: `serverAddress` and `autoConnect`.

use std::time::Duration;

use serde_json::Value;

use crate::error::BridgeError;
use crate::host::{Host, HostDescriptor};
use crate::ws::reconnect::{DEFAULT_MAX_RECONNECT_DELAY, DEFAULT_RECONNECT_DELAY, ReconnectPolicy};

/// Host setting holding the controller address.
pub const SETTING_SERVER_ADDRESS: &str = "serverAddress";

/// Host setting controlling whether the bridge connects at startup.
pub const SETTING_AUTO_CONNECT: &str = "autoConnect";

/// Controller address used when nothing else is configured.
pub const DEFAULT_SERVER_ADDRESS: &str = "ws://localhost:8765";

/// Delay between initialization and the automatic first connect.
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_secs(2);

/// Top-level bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Controller WebSocket address.
    pub server_address: String,

    /// Connect automatically after initialization.
    pub auto_connect: bool,

    /// Wait before the automatic first connect.
    pub startup_delay: Duration,

    /// Delay policy between reconnect attempts.
    pub reconnect: ReconnectPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            auto_connect: true,
            startup_delay: DEFAULT_STARTUP_DELAY,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl BridgeConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to the defaults when a variable is missing or invalid.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let server_address = std::env::var("BRIDGE_SERVER_ADDRESS")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.to_string());
        let auto_connect = parse_env_bool("BRIDGE_AUTO_CONNECT", true);
        let startup_delay = Duration::from_millis(parse_env(
            "BRIDGE_STARTUP_DELAY_MS",
            millis(DEFAULT_STARTUP_DELAY),
        ));

        let delay = Duration::from_millis(parse_env(
            "BRIDGE_RECONNECT_DELAY_MS",
            millis(DEFAULT_RECONNECT_DELAY),
        ));
        let max = Duration::from_millis(parse_env(
            "BRIDGE_RECONNECT_MAX_DELAY_MS",
            millis(DEFAULT_MAX_RECONNECT_DELAY),
        ));
        let strategy = std::env::var("BRIDGE_RECONNECT_STRATEGY").ok();
        let reconnect = reconnect_policy(strategy.as_deref(), delay, max);

        Self {
            server_address,
            auto_connect,
            startup_delay,
            reconnect,
        }
    }

    /// Overrides `server_address` and `auto_connect` with the host's
    /// settings.
    ///
    /// A setting the host does not have yet is registered with the current
    /// value. A setting of the wrong type is logged and ignored.
    pub async fn resolve_settings<H: Host>(mut self, host: &H) -> Self {
        match host.get_config(SETTING_SERVER_ADDRESS).await {
            Some(Value::String(address)) if !address.trim().is_empty() => {
                self.server_address = address;
            }
            Some(other) => warn_invalid(SETTING_SERVER_ADDRESS, &other, "expected a non-empty string"),
            None => register(host, SETTING_SERVER_ADDRESS, Value::from(self.server_address.as_str())).await,
        }

        match host.get_config(SETTING_AUTO_CONNECT).await {
            Some(Value::Bool(enabled)) => self.auto_connect = enabled,
            Some(other) => warn_invalid(SETTING_AUTO_CONNECT, &other, "expected a boolean"),
            None => register(host, SETTING_AUTO_CONNECT, Value::Bool(self.auto_connect)).await,
        }

        self
    }
}

/// Builds the handshake descriptor from `BRIDGE_WORLD`, `BRIDGE_SYSTEM`
/// and `BRIDGE_HOST_VERSION`.
#[must_use]
pub fn host_descriptor_from_env() -> HostDescriptor {
    let var = |key: &str, default: &str| {
        std::env::var(key)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    };
    HostDescriptor {
        world: var("BRIDGE_WORLD", "local-world"),
        system: var("BRIDGE_SYSTEM", "dnd5e"),
        version: var("BRIDGE_HOST_VERSION", env!("CARGO_PKG_VERSION")),
    }
}

fn reconnect_policy(strategy: Option<&str>, delay: Duration, max: Duration) -> ReconnectPolicy {
    match strategy.map(str::to_ascii_lowercase).as_deref() {
        None | Some("fixed") => ReconnectPolicy::Fixed(delay),
        Some("exponential") => ReconnectPolicy::Exponential {
            initial: delay,
            max: max.max(delay),
        },
        Some(other) => {
            tracing::warn!(strategy = other, "unknown reconnect strategy, using fixed");
            ReconnectPolicy::Fixed(delay)
        }
    }
}

async fn register<H: Host>(host: &H, key: &str, value: Value) {
    if let Err(e) = host.set_config(key, value).await {
        tracing::warn!(key, error = %e, "failed to register setting");
    }
}

fn warn_invalid(key: &str, value: &Value, reason: &str) {
    let error = BridgeError::Config {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    tracing::warn!(%value, error = %error, "ignoring host setting");
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}
