use serde::{Deserialize, Serialize};

/// `modules.api_ingress` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiIngressConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub enable_docs: bool,
    #[serde(default)]
    pub cors_enabled: bool,
    /// Per-request handler timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ApiIngressConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            enable_docs: false,
            cors_enabled: false,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:8087".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}
