use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use crate::domain::period::Period;

/// Pure subscription model for inter-module communication (no serde).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: Uuid,
    pub service_name: String,
    /// Smallest currency unit, always >= 1.
    pub price: i32,
    pub user_id: Uuid,
    pub start_date: Period,
    /// `None` means open-ended.
    pub end_date: Option<Period>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for creating a subscription; dates are `MM-YYYY` text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub service_name: String,
    pub price: i32,
    pub user_id: Uuid,
    pub start_date: String,
    pub end_date: Option<String>,
}

/// Partial update; `None` leaves the stored value untouched. The owner is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubscriptionPatch {
    pub service_name: Option<String>,
    pub price: Option<i32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Narrowing for list and total-cost queries. Empty filter matches everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubscriptionFilter {
    pub user_id: Option<Uuid>,
    /// Case-insensitive substring of `service_name`.
    pub service_name: Option<String>,
}
