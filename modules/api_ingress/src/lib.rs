//! HTTP host for the ledger server: owns the axum router, the middleware stack,
//! the merged OpenAPI document and the TCP listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use axum::{
    http::header,
    middleware::from_fn,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use modkit::{ModuleCtx, OpenApiRegistry, RestHostModule};
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};
use utoipa::openapi::{InfoBuilder, OpenApi, OpenApiBuilder};

mod config;
pub mod request_id;
mod web;

pub use config::ApiIngressConfig;

pub const MODULE_NAME: &str = "api_ingress";

const BODY_LIMIT_BYTES: usize = 16 * 1024 * 1024;

pub struct ApiIngress {
    config: ArcSwap<ApiIngressConfig>,
    // Copy-on-write: fragments are merged as REST modules register.
    openapi: ArcSwap<OpenApi>,
}

impl Default for ApiIngress {
    fn default() -> Self {
        Self::new(ApiIngressConfig::default())
    }
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            openapi: ArcSwap::from_pointee(base_document()),
        }
    }

    pub fn get_config(&self) -> ApiIngressConfig {
        (**self.config.load()).clone()
    }

    /// Snapshot of the merged OpenAPI document.
    pub fn openapi_document(&self) -> Arc<OpenApi> {
        self.openapi.load_full()
    }

    /// Wraps every route registered so far.
    ///
    /// Outermost to innermost: SetRequestId -> PropagateRequestId -> Trace ->
    /// request id to extensions -> Timeout -> CORS -> BodyLimit.
    fn apply_middleware(&self, mut router: Router) -> Router {
        let config = self.get_config();
        let x_request_id = request_id::header();

        router = router.layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES));
        if config.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }
        router = router
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.request_timeout_secs,
            )))
            .layer(from_fn(request_id::push_req_id_to_extensions))
            .layer(request_id::create_trace_layer())
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId));
        router
    }
}

fn base_document() -> OpenApi {
    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title("Subscription Ledger API")
                .version(env!("CARGO_PKG_VERSION"))
                .description(Some("Per-user subscription records and cost aggregation"))
                .build(),
        )
        .build()
}

#[async_trait]
impl modkit::Module for ApiIngress {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        let cfg = ctx.module_config::<ApiIngressConfig>();
        tracing::debug!(
            module = MODULE_NAME,
            bind_addr = %cfg.bind_addr,
            enable_docs = cfg.enable_docs,
            cors_enabled = cfg.cors_enabled,
            "Loaded api_ingress config"
        );
        self.config.store(Arc::new(cfg));
        Ok(())
    }
}

impl OpenApiRegistry for ApiIngress {
    fn register_openapi(&self, doc: OpenApi) {
        let paths = doc.paths.paths.len();
        self.openapi.rcu(|current| {
            let mut merged = (**current).clone();
            merged.merge(doc.clone());
            merged
        });
        tracing::debug!(paths, "Merged OpenAPI fragment");
    }
}

#[async_trait]
impl RestHostModule for ApiIngress {
    fn rest_prepare(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
        tracing::debug!("REST host prepared base router with health check");
        Ok(router.route("/health", get(web::health_check)))
    }

    fn rest_finalize(&self, _ctx: &ModuleCtx, mut router: Router) -> anyhow::Result<Router> {
        if self.get_config().enable_docs {
            // Serialized once; the document is fixed after the REST phase.
            let doc = Arc::new(serde_json::to_value(&*self.openapi_document())?);
            tracing::info!(
                paths = self.openapi_document().paths.paths.len(),
                "Serving OpenAPI document at /openapi.json"
            );
            router = router
                .route(
                    "/openapi.json",
                    get(move || {
                        let doc = doc.clone();
                        async move {
                            ([(header::CACHE_CONTROL, "no-store")], Json((*doc).clone()))
                                .into_response()
                        }
                    }),
                )
                .route("/docs", get(web::serve_docs));
        }

        tracing::debug!("REST host finalized router");
        Ok(self.apply_middleware(router))
    }

    fn as_registry(&self) -> &dyn OpenApiRegistry {
        self
    }

    async fn serve(&self, router: Router, cancel: CancellationToken) -> anyhow::Result<()> {
        let cfg = self.get_config();
        let addr: SocketAddr = cfg
            .bind_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", cfg.bind_addr, e))?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("HTTP server bound on {}", addr);

        let shutdown = async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully (cancellation)");
        };

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }
}
