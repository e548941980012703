use async_trait::async_trait;
use axum::Router;
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;

use crate::context::ModuleCtx;

/// Collects the OpenAPI fragments published by REST modules.
pub trait OpenApiRegistry: Send + Sync {
    fn register_openapi(&self, doc: utoipa::openapi::OpenApi);
}

/// Core module: DI/wiring; do not rely on migrated schema here.
#[async_trait]
pub trait Module: Send + Sync + 'static {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()>;
}

#[async_trait]
pub trait DbModule: Send + Sync {
    /// Runs AFTER init, BEFORE REST/start.
    async fn migrate(&self, db: &DatabaseConnection) -> anyhow::Result<()>;
}

/// Pure wiring; must be sync. Runs AFTER DB migrations.
pub trait RestfulModule: Send + Sync {
    fn register_rest(
        &self,
        ctx: &ModuleCtx,
        router: Router,
        openapi: &dyn OpenApiRegistry,
    ) -> anyhow::Result<Router>;
}

/// REST host module: owns the listener.
///
/// `rest_prepare`/`rest_finalize` shape the router but must not start the server;
/// `serve` runs until the token is cancelled.
#[async_trait]
pub trait RestHostModule: Send + Sync + 'static {
    fn rest_prepare(&self, ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router>;

    fn rest_finalize(&self, ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router>;

    fn as_registry(&self) -> &dyn OpenApiRegistry;

    async fn serve(&self, router: Router, cancel: CancellationToken) -> anyhow::Result<()>;
}
