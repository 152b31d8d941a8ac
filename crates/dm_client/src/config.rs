use serde::{Deserialize, Serialize};

pub const DEFAULT_RELAY_URL: &str = "http://localhost:8925";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the relay, without the `/comms` prefix.
    pub relay_url: String,
    /// Sent as `current_user_id` on every request when set. The relay
    /// otherwise resolves the user from the recovered wallet address.
    #[serde(default)]
    pub current_user_id: Option<String>,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    format!("dm_client/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.into(),
            current_user_id: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: default_user_agent(),
        }
    }
}

impl ClientConfig {
    /// Read `DM_RELAY_URL`, `DM_CURRENT_USER_ID` and `DM_REQUEST_TIMEOUT_SECS`,
    /// falling back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            relay_url: lookup("DM_RELAY_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.relay_url),
            current_user_id: lookup("DM_CURRENT_USER_ID").filter(|v| !v.trim().is_empty()),
            request_timeout_secs: lookup("DM_REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
            user_agent: defaults.user_agent,
        }
    }

    pub fn with_current_user(mut self, user_id: impl Into<String>) -> Self {
        self.current_user_id = Some(user_id.into());
        self
    }

    /// `relay_url` with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        self.relay_url.trim_end_matches('/')
    }
}
