//! Service-level behavior and tracing against an in-memory repository.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use tracing_test::traced_test;
use uuid::Uuid;

use subscriptions::contract::model::{
    NewSubscription, Subscription, SubscriptionFilter, SubscriptionPatch,
};
use subscriptions::domain::error::DomainError;
use subscriptions::domain::query::CostWindow;
use subscriptions::domain::repo::SubscriptionsRepository;
use subscriptions::domain::service::{Service, ServiceConfig};
use subscriptions::domain::subscription::{NewSubscriptionRecord, SubscriptionChanges};

#[derive(Default)]
struct MockSubscriptionsRepository {
    rows: Mutex<Vec<Subscription>>,
    fail: bool,
}

impl MockSubscriptionsRepository {
    fn failing() -> Self {
        Self {
            rows: Mutex::default(),
            fail: true,
        }
    }

    fn check(&self) -> Result<()> {
        if self.fail {
            anyhow::bail!("connection pool timed out");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SubscriptionsRepository for MockSubscriptionsRepository {
    async fn insert(&self, record: NewSubscriptionRecord) -> Result<Subscription> {
        self.check()?;
        let now = Utc::now();
        let sub = Subscription {
            id: record.id,
            service_name: record.service_name,
            price: record.price,
            user_id: record.user_id,
            start_date: record.start_date,
            end_date: record.end_date,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(sub.clone());
        Ok(sub)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Subscription>> {
        self.check()?;
        Ok(self.rows.lock().unwrap().iter().find(|s| s.id == id).cloned())
    }

    async fn find_many(&self, filter: &SubscriptionFilter) -> Result<Vec<Subscription>> {
        self.check()?;
        let mut found: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn update_fields(
        &self,
        id: Uuid,
        changes: &SubscriptionChanges,
    ) -> Result<Option<Subscription>> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let Some(sub) = rows.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.service_name {
            sub.service_name = name.clone();
        }
        if let Some(price) = changes.price {
            sub.price = price;
        }
        if let Some(start) = changes.start_date {
            sub.start_date = start;
        }
        if let Some(end) = changes.end_date {
            sub.end_date = Some(end);
        }
        sub.updated_at = Utc::now();
        Ok(Some(sub.clone()))
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|s| s.id != id);
        Ok(rows.len() < before)
    }

    async fn sum_price_where_active(
        &self,
        filter: &SubscriptionFilter,
        window: &CostWindow,
    ) -> Result<i64> {
        self.check()?;
        let rows = self.rows.lock().unwrap();
        Ok(window.total(rows.iter().filter(|s| filter.matches(s))))
    }
}

fn service() -> Service {
    Service::new(
        Arc::new(MockSubscriptionsRepository::default()),
        ServiceConfig::default(),
    )
}

fn new_sub(name: &str, price: i32, user_id: Uuid, start: &str, end: Option<&str>) -> NewSubscription {
    NewSubscription {
        service_name: name.to_string(),
        price,
        user_id,
        start_date: start.to_string(),
        end_date: end.map(str::to_string),
    }
}

#[traced_test]
#[tokio::test]
async fn create_emits_span_and_success_log() {
    let svc = service();

    let created = svc
        .create_subscription(new_sub("Yandex Plus", 400, Uuid::new_v4(), "07-2025", None))
        .await
        .unwrap();

    assert_eq!(created.start_date.to_string(), "07-2025");
    assert!(logs_contain("subscriptions.service.create"));
    assert!(logs_contain("Created subscription"));
}

#[traced_test]
#[tokio::test]
async fn rejected_input_is_logged_as_warning() {
    let svc = service();

    let err = svc
        .create_subscription(new_sub("Netflix", 0, Uuid::new_v4(), "07-2025", None))
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "price"));
    assert!(logs_contain("Rejected new subscription"));
}

#[traced_test]
#[tokio::test]
async fn storage_failures_surface_as_database_errors() {
    let svc = Service::new(
        Arc::new(MockSubscriptionsRepository::failing()),
        ServiceConfig::default(),
    );

    let err = svc.get_subscription(Uuid::new_v4()).await.unwrap_err();
    match err {
        DomainError::Database { message } => assert!(message.contains("timed out")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(logs_contain("Storage call failed"));
}

#[tokio::test]
async fn empty_patch_returns_record_without_bump() {
    let svc = service();
    let created = svc
        .create_subscription(new_sub("Okko", 299, Uuid::new_v4(), "01-2025", Some("12-2025")))
        .await
        .unwrap();

    let same = svc
        .update_subscription(created.id, SubscriptionPatch::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(same, created);

    let missing = svc
        .update_subscription(Uuid::new_v4(), SubscriptionPatch::default())
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn patch_changes_only_supplied_fields() {
    let svc = service();
    let created = svc
        .create_subscription(new_sub("Okko", 299, Uuid::new_v4(), "01-2025", None))
        .await
        .unwrap();

    let updated = svc
        .update_subscription(
            created.id,
            SubscriptionPatch {
                price: Some(349),
                end_date: Some("06-2025".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.price, 349);
    assert_eq!(updated.end_date.map(|p| p.to_string()).as_deref(), Some("06-2025"));
    assert_eq!(updated.service_name, "Okko");
    assert_eq!(updated.start_date, created.start_date);
    assert!(updated.updated_at >= created.updated_at);
}

#[tokio::test]
async fn delete_twice_reports_absence() {
    let svc = service();
    let created = svc
        .create_subscription(new_sub("Kinopoisk", 199, Uuid::new_v4(), "03-2025", None))
        .await
        .unwrap();

    assert!(svc.delete_subscription(created.id).await.unwrap());
    assert!(!svc.delete_subscription(created.id).await.unwrap());
    assert!(svc.get_subscription(created.id).await.unwrap().is_none());
}

#[tokio::test]
async fn total_cost_counts_overlapping_subscriptions() {
    let svc = service();
    let user = Uuid::new_v4();
    svc.create_subscription(new_sub("A", 100, user, "01-2025", Some("06-2025")))
        .await
        .unwrap();
    svc.create_subscription(new_sub("B", 50, user, "05-2025", None))
        .await
        .unwrap();

    let all = SubscriptionFilter::default();
    assert_eq!(svc.total_cost(all.clone(), "03-2025", "04-2025").await.unwrap(), 100);
    assert_eq!(svc.total_cost(all.clone(), "06-2025", "06-2025").await.unwrap(), 150);
    assert_eq!(svc.total_cost(all.clone(), "01-2024", "12-2024").await.unwrap(), 0);

    let err = svc.total_cost(all, "08-2025", "07-2025").await.unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));
}
