//! SeaORM-backed implementation of the subscriptions repository port.
//!
//! Generic over `C: ConnectionTrait`, so it can run on a pooled
//! `DatabaseConnection` or inside a transaction.

use anyhow::Context;
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use uuid::Uuid;

use crate::contract::model::{Subscription, SubscriptionFilter};
use crate::domain::query::{CostWindow, LIKE_ESCAPE};
use crate::domain::repo::SubscriptionsRepository;
use crate::domain::subscription::{NewSubscriptionRecord, SubscriptionChanges};
use crate::infra::storage::entity::{ActiveModel as SubscriptionAM, Column, Entity};

pub struct SeaOrmSubscriptionsRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmSubscriptionsRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

/// Adds the owner and service-name conditions of `filter` to `query`.
fn apply_filter(mut query: Select<Entity>, filter: &SubscriptionFilter) -> Select<Entity> {
    if let Some(user_id) = filter.user_id {
        query = query.filter(Column::UserId.eq(user_id));
    }
    if let Some(pattern) = filter.like_pattern() {
        query = query.filter(
            Expr::expr(Func::lower(Expr::col(Column::ServiceName)))
                .like(LikeExpr::new(pattern).escape(LIKE_ESCAPE)),
        );
    }
    query
}

/// `start_date <= to AND (end_date IS NULL OR end_date >= from)`
fn active_in(window: &CostWindow) -> Condition {
    Condition::all()
        .add(Column::StartDate.lte(window.to.first_day()))
        .add(
            Condition::any()
                .add(Column::EndDate.is_null())
                .add(Column::EndDate.gte(window.from.first_day())),
        )
}

#[async_trait::async_trait]
impl<C> SubscriptionsRepository for SeaOrmSubscriptionsRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn insert(&self, record: NewSubscriptionRecord) -> anyhow::Result<Subscription> {
        let now = Utc::now();
        let m = SubscriptionAM {
            id: Set(record.id),
            service_name: Set(record.service_name),
            price: Set(record.price),
            user_id: Set(record.user_id),
            start_date: Set(record.start_date.first_day()),
            end_date: Set(record.end_date.map(|p| p.first_day())),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let stored = m.insert(&self.conn).await.context("insert failed")?;
        Ok(stored.into())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Subscription>> {
        let found = Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find_by_id failed")?;
        Ok(found.map(Into::into))
    }

    async fn find_many(&self, filter: &SubscriptionFilter) -> anyhow::Result<Vec<Subscription>> {
        let rows = apply_filter(Entity::find(), filter)
            .order_by_desc(Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("find_many failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_fields(
        &self,
        id: Uuid,
        changes: &SubscriptionChanges,
    ) -> anyhow::Result<Option<Subscription>> {
        let mut m = SubscriptionAM {
            id: ActiveValue::Unchanged(id),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        if let Some(name) = &changes.service_name {
            m.service_name = Set(name.clone());
        }
        if let Some(price) = changes.price {
            m.price = Set(price);
        }
        if let Some(start) = changes.start_date {
            m.start_date = Set(start.first_day());
        }
        if let Some(end) = changes.end_date {
            m.end_date = Set(Some(end.first_day()));
        }

        match m.update(&self.conn).await {
            Ok(updated) => Ok(Some(updated.into())),
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(e) => Err(e).context("update_fields failed"),
        }
    }

    async fn delete_by_id(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("delete_by_id failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn sum_price_where_active(
        &self,
        filter: &SubscriptionFilter,
        window: &CostWindow,
    ) -> anyhow::Result<i64> {
        let total: Option<Option<i64>> = apply_filter(Entity::find(), filter)
            .filter(active_in(window))
            .select_only()
            .column_as(Expr::col(Column::Price).sum(), "total")
            .into_tuple()
            .one(&self.conn)
            .await
            .context("sum_price_where_active failed")?;
        Ok(total.flatten().unwrap_or(0))
    }
}
