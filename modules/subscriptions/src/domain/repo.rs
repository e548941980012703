use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::model::{Subscription, SubscriptionFilter};
use crate::domain::query::CostWindow;
use crate::domain::subscription::{NewSubscriptionRecord, SubscriptionChanges};

/// Port for the domain layer: persistence operations the service needs.
#[async_trait]
pub trait SubscriptionsRepository: Send + Sync {
    /// Persist a validated record; storage assigns `created_at`/`updated_at`.
    async fn insert(&self, record: NewSubscriptionRecord) -> anyhow::Result<Subscription>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Subscription>>;
    /// Newest first.
    async fn find_many(&self, filter: &SubscriptionFilter) -> anyhow::Result<Vec<Subscription>>;
    /// Write the non-empty change set and refresh `updated_at`. `None` if the id is unknown.
    async fn update_fields(
        &self,
        id: Uuid,
        changes: &SubscriptionChanges,
    ) -> anyhow::Result<Option<Subscription>>;
    /// Returns true if a row was deleted.
    async fn delete_by_id(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn sum_price_where_active(
        &self,
        filter: &SubscriptionFilter,
        window: &CostWindow,
    ) -> anyhow::Result<i64>;
}
