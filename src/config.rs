//! Configuration options for the CloudPOS client

use log::warn;
use std::time::Duration;

/// API used when `CLOUDPOS_API_BASE` is not set
pub const DEFAULT_API_BASE: &str = "http://18.233.18.214:8000";

/// Environment variable overriding the API base URL
pub const ENV_API_BASE: &str = "CLOUDPOS_API_BASE";

/// Environment variable enabling debug logging (`1`)
pub const ENV_DEBUG: &str = "CLOUDPOS_DEBUG";

/// Environment variable overriding the request timeout, in seconds
pub const ENV_TIMEOUT_SECS: &str = "CLOUDPOS_TIMEOUT_SECS";

/// Environment variable granting every area regardless of role (`1`)
pub const ENV_SHOW_ALL: &str = "CLOUDPOS_SHOW_ALL";

/// Smallest interval accepted by the API monitor
pub const MIN_MONITOR_INTERVAL: Duration = Duration::from_secs(3);

/// Configuration options for the CloudPOS client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL of the API, without trailing slash
    pub base_url: String,

    /// Timeout applied to every request
    pub request_timeout: Duration,

    /// Whether debug logging was requested
    pub debug: bool,

    /// Grant every area regardless of the logged-in role
    pub show_all: bool,

    /// Interval between connectivity pings
    pub monitor_interval: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(10),
            debug: false,
            show_all: false,
            monitor_interval: Duration::from_secs(15),
        }
    }
}

impl ClientOptions {
    /// Build options from the `CLOUDPOS_*` environment variables, falling back
    /// to the defaults for anything unset.
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Ok(base) = std::env::var(ENV_API_BASE) {
            if !base.trim().is_empty() {
                options = options.with_base_url(&base);
            }
        }

        options.debug = flag_enabled(ENV_DEBUG);
        options.show_all = flag_enabled(ENV_SHOW_ALL);

        if let Ok(raw) = std::env::var(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => options.request_timeout = Duration::from_secs(secs),
                _ => warn!("ignoring invalid {}={:?}", ENV_TIMEOUT_SECS, raw),
            }
        }

        options
    }

    /// Set the API base URL. Trailing slashes are removed.
    pub fn with_base_url(mut self, value: &str) -> Self {
        self.base_url = value.trim().trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Duration) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set whether debug logging was requested
    pub fn with_debug(mut self, value: bool) -> Self {
        self.debug = value;
        self
    }

    /// Set whether every area is shown regardless of role
    pub fn with_show_all(mut self, value: bool) -> Self {
        self.show_all = value;
        self
    }

    /// Set the monitor interval, clamped to [`MIN_MONITOR_INTERVAL`]
    pub fn with_monitor_interval(mut self, value: Duration) -> Self {
        self.monitor_interval = value.max(MIN_MONITOR_INTERVAL);
        self
    }
}

fn flag_enabled(name: &str) -> bool {
    std::env::var(name).map(|v| v.trim() == "1").unwrap_or(false)
}
