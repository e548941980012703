use serde::{Deserialize, Serialize};

use crate::domain::subscription::SERVICE_NAME_COLUMN_LEN;

/// Configuration for the subscriptions module (`modules.subscriptions`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscriptionsConfig {
    /// Capped at the `service_name` column width.
    #[serde(default = "default_max_service_name_length")]
    pub max_service_name_length: usize,
}

impl Default for SubscriptionsConfig {
    fn default() -> Self {
        Self {
            max_service_name_length: default_max_service_name_length(),
        }
    }
}

fn default_max_service_name_length() -> usize {
    SERVICE_NAME_COLUMN_LEN
}
