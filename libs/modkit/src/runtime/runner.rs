//! Phase runner for the ledger server.
//!
//! One stable [`ModuleCtx`] is built up front and re-scoped per module for every
//! phase: init → db → rest → start (serve) → wait. Shutdown is driven by OS
//! signals or an external `CancellationToken`.

use std::sync::Arc;

use anyhow::Context;
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;

use crate::context::{ConfigProvider, ModuleCtx};
use crate::contracts::{DbModule, Module, RestHostModule, RestfulModule};
use crate::runtime::shutdown;

/// A module together with the capabilities it provides.
pub struct ModuleEntry {
    pub name: &'static str,
    core: Arc<dyn Module>,
    db: Option<Arc<dyn DbModule>>,
    rest: Option<Arc<dyn RestfulModule>>,
}

impl ModuleEntry {
    pub fn new(name: &'static str, core: Arc<dyn Module>) -> Self {
        Self {
            name,
            core,
            db: None,
            rest: None,
        }
    }

    pub fn with_db(mut self, db: Arc<dyn DbModule>) -> Self {
        self.db = Some(db);
        self
    }

    pub fn with_rest(mut self, rest: Arc<dyn RestfulModule>) -> Self {
        self.rest = Some(rest);
        self
    }
}

/// How the runtime should decide when to stop.
pub enum ShutdownOptions {
    /// Listen for OS signals (Ctrl+C / SIGTERM).
    Signals,
    /// An external `CancellationToken` controls the lifecycle.
    Token(CancellationToken),
}

pub struct RunOptions {
    /// Provider of module config sections (raw JSON by module name).
    pub modules_cfg: Arc<dyn ConfigProvider>,
    /// Pooled connection handed to every module context; `None` runs without a database.
    pub db: Option<DatabaseConnection>,
    /// The module that owns the HTTP listener. It must also appear in `modules`
    /// if it needs the init phase.
    pub host: (&'static str, Arc<dyn RestHostModule>),
    pub modules: Vec<ModuleEntry>,
    pub shutdown: ShutdownOptions,
}

/// Full cycle: init → db → rest (sync) → serve until cancelled.
pub async fn run(opts: RunOptions) -> anyhow::Result<()> {
    let cancel = match &opts.shutdown {
        ShutdownOptions::Token(t) => t.clone(),
        _ => CancellationToken::new(),
    };

    match opts.shutdown {
        ShutdownOptions::Signals => {
            let c = cancel.clone();
            tokio::spawn(async move {
                match shutdown::wait_for_shutdown().await {
                    Ok(signal) => tracing::info!(signal, "shutdown: signal received"),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            "shutdown: primary waiter failed; falling back to ctrl_c()"
                        );
                        let _ = tokio::signal::ctrl_c().await;
                    }
                }
                c.cancel();
            });
        }
        ShutdownOptions::Token(_) => {
            tracing::info!("shutdown: external token will control lifecycle");
        }
    }

    let mut base_ctx = ModuleCtx::new(cancel.clone()).with_config_provider(opts.modules_cfg);
    if let Some(db) = opts.db.clone() {
        base_ctx = base_ctx.with_db(db);
    }

    tracing::info!("Phase: init");
    for m in &opts.modules {
        let ctx = base_ctx.clone().for_module(m.name);
        m.core
            .init(&ctx)
            .await
            .with_context(|| format!("init failed for module '{}'", m.name))?;
    }

    tracing::info!("Phase: db");
    for m in &opts.modules {
        let Some(db_module) = &m.db else { continue };
        match &opts.db {
            Some(conn) => db_module
                .migrate(conn)
                .await
                .with_context(|| format!("migrations failed for module '{}'", m.name))?,
            None => tracing::warn!(module = m.name, "No database configured; skipping migrations"),
        }
    }

    tracing::info!("Phase: rest (sync)");
    let (host_name, host) = opts.host;
    let host_ctx = base_ctx.clone().for_module(host_name);
    let mut router = host.rest_prepare(&host_ctx, axum::Router::new())?;
    for m in &opts.modules {
        let Some(rest) = &m.rest else { continue };
        let ctx = base_ctx.clone().for_module(m.name);
        router = rest
            .register_rest(&ctx, router, host.as_registry())
            .with_context(|| format!("REST registration failed for module '{}'", m.name))?;
    }
    let router = host.rest_finalize(&host_ctx, router)?;

    tracing::info!("Phase: start");
    let served = host.serve(router, cancel.clone()).await;
    cancel.cancel();

    tracing::info!("Phase: stop");
    served
}
