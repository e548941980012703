#![cfg(feature = "integration")]

mod common;

use std::sync::Arc;

use anyhow::Result;
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use subscriptions::contract::model::{NewSubscription, SubscriptionFilter, SubscriptionPatch};
use subscriptions::domain::service::{Service, ServiceConfig};
use subscriptions::infra::storage::{migrations::Migrator, sea_orm_repo::SeaOrmSubscriptionsRepository};

fn new_sub(name: &str, price: i32, user_id: Uuid, start: &str, end: Option<&str>) -> NewSubscription {
    NewSubscription {
        service_name: name.to_string(),
        price,
        user_id,
        start_date: start.to_string(),
        end_date: end.map(str::to_string),
    }
}

#[tokio::test]
async fn postgres_ledger_roundtrip() -> Result<()> {
    let dut = common::bring_up_postgres().await?;
    let db = Database::connect(&dut.url).await?;
    Migrator::up(&db, None).await?;

    let svc = Service::new(
        Arc::new(SeaOrmSubscriptionsRepository::new(db.clone())),
        ServiceConfig::default(),
    );
    let user = Uuid::new_v4();

    let a = svc
        .create_subscription(new_sub("Yandex Plus", 100, user, "01-2025", Some("06-2025")))
        .await?;
    svc.create_subscription(new_sub("Netflix", 50, user, "05-2025", None))
        .await?;

    let found = svc
        .list_subscriptions(SubscriptionFilter {
            user_id: None,
            service_name: Some("PLUS".into()),
        })
        .await?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, a.id);

    let mine = SubscriptionFilter {
        user_id: Some(user),
        service_name: None,
    };
    assert_eq!(svc.total_cost(mine.clone(), "03-2025", "04-2025").await?, 100);
    assert_eq!(svc.total_cost(mine.clone(), "06-2025", "06-2025").await?, 150);
    assert_eq!(svc.total_cost(mine, "01-2024", "12-2024").await?, 0);

    let updated = svc
        .update_subscription(
            a.id,
            SubscriptionPatch {
                price: Some(120),
                ..Default::default()
            },
        )
        .await?
        .expect("row exists");
    assert_eq!(updated.price, 120);
    assert_eq!(updated.start_date, a.start_date);

    assert!(svc.delete_subscription(a.id).await?);
    assert!(!svc.delete_subscription(a.id).await?);

    // migrations are idempotent
    Migrator::up(&db, None).await?;
    Ok(())
}
