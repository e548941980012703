use sea_orm::DatabaseConnection;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Provider of module-specific configuration (raw JSON sections only).
pub trait ConfigProvider: Send + Sync {
    /// Returns raw JSON section for the module, if any.
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value>;
}

#[derive(Clone)]
pub struct ModuleCtx {
    db: Option<DatabaseConnection>,
    config_provider: Option<Arc<dyn ConfigProvider>>,
    cancellation_token: CancellationToken,
    module_name: Option<Arc<str>>,
}

impl ModuleCtx {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            db: None,
            config_provider: None,
            cancellation_token: token,
            module_name: None,
        }
    }

    pub fn with_db(mut self, db: DatabaseConnection) -> Self {
        self.db = Some(db);
        self
    }

    pub fn with_config_provider(mut self, p: Arc<dyn ConfigProvider>) -> Self {
        self.config_provider = Some(p);
        self
    }

    /// Scope context to a specific module name (used by the runner).
    pub fn for_module(mut self, name: &str) -> Self {
        self.module_name = Some(Arc::<str>::from(name));
        self
    }

    /// Cheap clone of the pooled connection, if the server was started with a database.
    pub fn db(&self) -> Option<DatabaseConnection> {
        self.db.clone()
    }

    pub fn db_required(&self) -> anyhow::Result<DatabaseConnection> {
        self.db().ok_or_else(|| {
            anyhow::anyhow!(
                "module '{}' requires a database",
                self.current_module().unwrap_or("<unscoped>")
            )
        })
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    pub fn current_module(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    /// Best-effort: deserialize the module's config into `T`, fallback to `T::default()`
    /// if section is missing or invalid.
    pub fn module_config<T: DeserializeOwned + Default>(&self) -> T {
        match (&self.module_name, &self.config_provider) {
            (Some(name), Some(p)) => p
                .get_module_config(name)
                .and_then(|v| serde_json::from_value::<T>(v.clone()).ok())
                .unwrap_or_default(),
            _ => T::default(),
        }
    }
}
