use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::{
    error::SubscriptionsError,
    model::{NewSubscription, Subscription, SubscriptionFilter, SubscriptionPatch},
};

/// Public API of the subscriptions module for in-process consumers.
#[async_trait]
pub trait SubscriptionsApi: Send + Sync {
    async fn create_subscription(
        &self,
        new_subscription: NewSubscription,
    ) -> Result<Subscription, SubscriptionsError>;

    /// `Ok(None)` when the id is unknown.
    async fn get_subscription(&self, id: Uuid) -> Result<Option<Subscription>, SubscriptionsError>;

    /// Newest first.
    async fn list_subscriptions(
        &self,
        filter: SubscriptionFilter,
    ) -> Result<Vec<Subscription>, SubscriptionsError>;

    /// `Ok(None)` when the id is unknown.
    async fn update_subscription(
        &self,
        id: Uuid,
        patch: SubscriptionPatch,
    ) -> Result<Option<Subscription>, SubscriptionsError>;

    /// `Ok(false)` when nothing was deleted.
    async fn delete_subscription(&self, id: Uuid) -> Result<bool, SubscriptionsError>;

    /// Sum of prices of subscriptions active in `[period_from, period_to]` (`MM-YYYY`).
    async fn total_cost(
        &self,
        filter: SubscriptionFilter,
        period_from: &str,
        period_to: &str,
    ) -> Result<i64, SubscriptionsError>;
}
