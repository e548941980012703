use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use modkit::{DbModule, Module, ModuleCtx, OpenApiRegistry, RestfulModule};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info, warn};

use crate::api::rest::routes;
use crate::config::SubscriptionsConfig;
use crate::contract::client::SubscriptionsApi;
use crate::domain::service::{Service, ServiceConfig};
use crate::domain::subscription::SERVICE_NAME_COLUMN_LEN;
use crate::gateways::local::SubscriptionsLocalClient;
use crate::infra::storage::migrations::Migrator;
use crate::infra::storage::sea_orm_repo::SeaOrmSubscriptionsRepository;

pub const MODULE_NAME: &str = "subscriptions";

/// Subscription ledger module: owns the `subscriptions` table and its REST routes.
#[derive(Default)]
pub struct Subscriptions {
    // Built in `init`, read by REST registration and the local client.
    service: ArcSwapOption<Service>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// In-process client; `None` before `init`.
    pub fn client(&self) -> Option<Arc<dyn SubscriptionsApi>> {
        self.service
            .load_full()
            .map(|svc| Arc::new(SubscriptionsLocalClient::new(svc)) as Arc<dyn SubscriptionsApi>)
    }

    fn service(&self) -> anyhow::Result<Arc<Service>> {
        self.service
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("subscriptions service not initialized"))
    }
}

#[async_trait]
impl Module for Subscriptions {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        info!("Initializing subscriptions module");

        let cfg: SubscriptionsConfig = ctx.module_config();
        debug!(
            max_service_name_length = cfg.max_service_name_length,
            "Loaded subscriptions config"
        );

        if cfg.max_service_name_length > SERVICE_NAME_COLUMN_LEN {
            warn!(
                configured = cfg.max_service_name_length,
                cap = SERVICE_NAME_COLUMN_LEN,
                "max_service_name_length exceeds the column width; capping"
            );
        }

        let db = ctx.db_required()?;
        let repo = SeaOrmSubscriptionsRepository::new(db);
        let service = Service::new(
            Arc::new(repo),
            ServiceConfig {
                max_service_name_length: cfg.max_service_name_length,
            },
        );
        self.service.store(Some(Arc::new(service)));
        Ok(())
    }
}

#[async_trait]
impl DbModule for Subscriptions {
    async fn migrate(&self, db: &DatabaseConnection) -> anyhow::Result<()> {
        info!("Running subscriptions database migrations");
        Migrator::up(db, None).await?;
        info!("Subscriptions migrations completed");
        Ok(())
    }
}

impl RestfulModule for Subscriptions {
    fn register_rest(
        &self,
        _ctx: &ModuleCtx,
        router: axum::Router,
        openapi: &dyn OpenApiRegistry,
    ) -> anyhow::Result<axum::Router> {
        info!("Registering subscriptions REST routes");
        routes::register_routes(router, openapi, self.service()?)
    }
}
