use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Aura Hospital";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hospital API base URL used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";

/// Default TCP connect timeout. No overall request timeout is applied by default.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const ENV_API_URL: &str = "AURA_API_URL";
const ENV_API_TOKEN: &str = "AURA_API_TOKEN";
const ENV_CONNECT_TIMEOUT: &str = "AURA_CONNECT_TIMEOUT_SECS";
const ENV_REQUEST_TIMEOUT: &str = "AURA_REQUEST_TIMEOUT_SECS";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "aura_appointments=info,warn"
}

/// Connection settings for the remote appointment service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root, e.g. `http://127.0.0.1:8000/api`. Trailing slashes are trimmed.
    pub base_url: String,
    /// Bearer token sent with every request when present.
    pub auth_token: Option<String>,
    pub connect_timeout_secs: u64,
    /// `None` leaves request duration to the network stack.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            auth_token: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: None,
        }
    }
}

impl ClientConfig {
    /// Config pointing at `base_url` with every other field defaulted.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            ..Self::default()
        }
    }

    /// Read configuration from `AURA_*` environment variables.
    ///
    /// Unset variables keep their defaults. Malformed numbers are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config.base_url = normalize_base_url(&url);
        }
        config.auth_token = lookup(ENV_API_TOKEN).filter(|v| !v.trim().is_empty());

        if let Some(secs) = parse_secs(&lookup, ENV_CONNECT_TIMEOUT) {
            config.connect_timeout_secs = secs;
        }
        config.request_timeout_secs = parse_secs(&lookup, ENV_REQUEST_TIMEOUT);

        config
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_string());
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_secs<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(secs),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring malformed timeout setting");
            None
        }
    }
}
