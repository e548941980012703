use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::contract::{
    client::SubscriptionsApi,
    error::SubscriptionsError,
    model::{NewSubscription, Subscription, SubscriptionFilter, SubscriptionPatch},
};
use crate::domain::service::Service;

/// In-process `SubscriptionsApi` that delegates to the domain service.
pub struct SubscriptionsLocalClient {
    service: Arc<Service>,
}

impl SubscriptionsLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl SubscriptionsApi for SubscriptionsLocalClient {
    async fn create_subscription(
        &self,
        new_subscription: NewSubscription,
    ) -> Result<Subscription, SubscriptionsError> {
        self.service
            .create_subscription(new_subscription)
            .await
            .map_err(Into::into)
    }

    async fn get_subscription(&self, id: Uuid) -> Result<Option<Subscription>, SubscriptionsError> {
        self.service.get_subscription(id).await.map_err(Into::into)
    }

    async fn list_subscriptions(
        &self,
        filter: SubscriptionFilter,
    ) -> Result<Vec<Subscription>, SubscriptionsError> {
        self.service
            .list_subscriptions(filter)
            .await
            .map_err(Into::into)
    }

    async fn update_subscription(
        &self,
        id: Uuid,
        patch: SubscriptionPatch,
    ) -> Result<Option<Subscription>, SubscriptionsError> {
        self.service
            .update_subscription(id, patch)
            .await
            .map_err(Into::into)
    }

    async fn delete_subscription(&self, id: Uuid) -> Result<bool, SubscriptionsError> {
        self.service
            .delete_subscription(id)
            .await
            .map_err(Into::into)
    }

    async fn total_cost(
        &self,
        filter: SubscriptionFilter,
        period_from: &str,
        period_to: &str,
    ) -> Result<i64, SubscriptionsError> {
        self.service
            .total_cost(filter, period_from, period_to)
            .await
            .map_err(Into::into)
    }
}
