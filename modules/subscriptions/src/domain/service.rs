use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::contract::model::{NewSubscription, Subscription, SubscriptionFilter, SubscriptionPatch};
use crate::domain::error::DomainError;
use crate::domain::query::CostWindow;
use crate::domain::repo::SubscriptionsRepository;
use crate::domain::subscription::{EntityRules, SERVICE_NAME_COLUMN_LEN};

/// Domain service orchestrating subscription use cases.
/// Depends only on the repository port, not on infra types.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn SubscriptionsRepository>,
    rules: EntityRules,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub max_service_name_length: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_service_name_length: SERVICE_NAME_COLUMN_LEN,
        }
    }
}

fn db_err(e: anyhow::Error) -> DomainError {
    let message = format!("{e:#}");
    error!(error = %message, "Storage call failed");
    DomainError::database(message)
}

impl Service {
    pub fn new(repo: Arc<dyn SubscriptionsRepository>, config: ServiceConfig) -> Self {
        Self {
            repo,
            rules: EntityRules::new(config.max_service_name_length),
        }
    }

    #[instrument(
        name = "subscriptions.service.create",
        skip(self, new_subscription),
        fields(service_name = %new_subscription.service_name, user_id = %new_subscription.user_id)
    )]
    pub async fn create_subscription(
        &self,
        new_subscription: NewSubscription,
    ) -> Result<Subscription, DomainError> {
        let record = self.rules.build_new(new_subscription).inspect_err(|e| {
            warn!(error = %e, "Rejected new subscription");
        })?;

        let created = self.repo.insert(record).await.map_err(db_err)?;
        info!(subscription_id = %created.id, "Created subscription");
        Ok(created)
    }

    #[instrument(name = "subscriptions.service.get", skip(self), fields(subscription_id = %id))]
    pub async fn get_subscription(&self, id: Uuid) -> Result<Option<Subscription>, DomainError> {
        debug!("Getting subscription by id");
        self.repo.find_by_id(id).await.map_err(db_err)
    }

    #[instrument(name = "subscriptions.service.list", skip(self))]
    pub async fn list_subscriptions(
        &self,
        filter: SubscriptionFilter,
    ) -> Result<Vec<Subscription>, DomainError> {
        let subs = self.repo.find_many(&filter).await.map_err(db_err)?;
        debug!(count = subs.len(), "Listed subscriptions");
        Ok(subs)
    }

    /// An empty patch returns the stored record unchanged.
    #[instrument(name = "subscriptions.service.update", skip(self, patch), fields(subscription_id = %id))]
    pub async fn update_subscription(
        &self,
        id: Uuid,
        patch: SubscriptionPatch,
    ) -> Result<Option<Subscription>, DomainError> {
        let changes = self.rules.apply_patch(patch).inspect_err(|e| {
            warn!(error = %e, "Rejected subscription patch");
        })?;

        if changes.is_empty() {
            debug!("Empty patch; returning stored record");
            return self.repo.find_by_id(id).await.map_err(db_err);
        }

        let updated = self.repo.update_fields(id, &changes).await.map_err(db_err)?;
        match &updated {
            Some(_) => info!("Updated subscription"),
            None => debug!("Subscription not found for update"),
        }
        Ok(updated)
    }

    #[instrument(name = "subscriptions.service.delete", skip(self), fields(subscription_id = %id))]
    pub async fn delete_subscription(&self, id: Uuid) -> Result<bool, DomainError> {
        let deleted = self.repo.delete_by_id(id).await.map_err(db_err)?;
        if deleted {
            info!("Deleted subscription");
        }
        Ok(deleted)
    }

    #[instrument(name = "subscriptions.service.total_cost", skip(self))]
    pub async fn total_cost(
        &self,
        filter: SubscriptionFilter,
        period_from: &str,
        period_to: &str,
    ) -> Result<i64, DomainError> {
        let window = CostWindow::parse(period_from, period_to).inspect_err(|e| {
            warn!(error = %e, "Rejected total-cost window");
        })?;

        let total = self
            .repo
            .sum_price_where_active(&filter, &window)
            .await
            .map_err(db_err)?;
        info!(total, "Computed total cost");
        Ok(total)
    }
}
