use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use modkit::{ModuleEntry, RestHostModule, RunOptions, ShutdownOptions};
use runtime::{AppConfig, AppConfigProvider, CliArgs, DatabaseConfig};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use url::Url;

use api_ingress::ApiIngress;
use subscriptions::Subscriptions;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const SQLITE_MEMORY: &str = "sqlite::memory:";

// Adapter to make AppConfigProvider implement modkit::ConfigProvider
struct ModkitConfigAdapter(AppConfigProvider);

impl modkit::ConfigProvider for ModkitConfigAdapter {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.0.module_section(module_name)
    }
}

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps "sqlite::memory:" as-is.
/// - Normalizes backslashes into forward slashes (important on Windows).
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if dsn.eq_ignore_ascii_case(SQLITE_MEMORY) || dsn.eq_ignore_ascii_case("sqlite://:memory:") {
        return Ok(SQLITE_MEMORY.to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    if create_dirs {
        if let Some(dir) = p.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Sqlite,
    Postgres,
}

/// Detect DB backend from URL scheme.
fn detect_backend(dsn: &str) -> Result<Backend> {
    let raw = dsn.trim();
    if raw.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }
    if raw.eq_ignore_ascii_case(SQLITE_MEMORY) {
        return Ok(Backend::Sqlite);
    }

    let url = Url::parse(raw).map_err(|e| anyhow!("Invalid database DSN: {}", e))?;
    match url.scheme() {
        "sqlite" | "sqlite3" => Ok(Backend::Sqlite),
        "postgres" | "postgresql" => Ok(Backend::Postgres),
        other => Err(anyhow!("Unsupported database type: {}", other)),
    }
}

/// DSN safe for logs and console output: the password is masked.
fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut url) if url.password().is_some() => {
            if url.set_password(Some("***")).is_err() {
                return "<redacted>".to_string();
            }
            url.to_string()
        }
        _ => dsn.to_string(),
    }
}

/// Config as YAML with the database password masked.
fn redacted_yaml(config: &AppConfig) -> Result<String> {
    let mut shown = config.clone();
    if let Some(db) = shown.database.as_mut() {
        db.url = redact_dsn(&db.url);
    }
    shown.to_yaml()
}

/// The DSN the server will connect to, or `None` to run without a database.
/// `--mock` always wins with an in-memory SQLite database.
fn effective_dsn(config: &AppConfig, mock: bool) -> Result<Option<String>> {
    if mock {
        return Ok(Some(SQLITE_MEMORY.to_string()));
    }
    let Some(db) = &config.database else {
        return Ok(None);
    };
    let dsn = db.url.trim();
    match detect_backend(dsn)? {
        Backend::Sqlite => {
            let base_dir = Path::new(&config.server.home_dir);
            absolutize_sqlite_dsn(dsn, base_dir, true).map(Some)
        }
        Backend::Postgres => Ok(Some(dsn.to_string())),
    }
}

async fn connect_db(dsn: &str, db_config: Option<&DatabaseConfig>) -> Result<DatabaseConnection> {
    let backend = detect_backend(dsn)?;
    let mut opts = ConnectOptions::new(dsn.to_owned());
    opts.acquire_timeout(Duration::from_secs(5))
        .sqlx_logging(false);

    if dsn == SQLITE_MEMORY {
        // Every pooled connection would otherwise get its own empty database.
        opts.max_connections(1).min_connections(1);
    } else if let Some(max) = db_config.and_then(|c| c.max_conns) {
        opts.max_connections(max);
    }

    if backend == Backend::Sqlite {
        let busy = db_config
            .and_then(|c| c.busy_timeout_ms)
            .map(|ms| Duration::from_millis(ms.into()));
        opts.map_sqlx_sqlite_opts(move |o| {
            let o = o.create_if_missing(true);
            match busy {
                Some(timeout) => o.busy_timeout(timeout),
                None => o,
            }
        });
    }

    let shown = redact_dsn(dsn);
    tracing::info!(backend = ?backend, "Connecting to database: {}", shown);
    Database::connect(opts)
        .await
        .with_context(|| format!("failed to connect to database '{shown}'"))
}

/// Subscription Ledger Server - per-user subscription records and cost totals
#[derive(Parser)]
#[command(name = "ledger-server")]
#[command(about = "Subscription Ledger Server - per-user subscription records and cost totals")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory SQLite database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);
    config.seed_module_defaults();

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("Subscription Ledger Server starting");

    if cli.print_config {
        println!("{}", redacted_yaml(&config)?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, args).await,
        Commands::Check => check_config(config, args),
    }
}

async fn run_server(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Initializing modules...");

    let db = match effective_dsn(&config, args.mock)? {
        Some(dsn) => Some(connect_db(&dsn, config.database.as_ref()).await?),
        None => {
            tracing::warn!("No database configuration found, running without database");
            None
        }
    };

    let ingress = Arc::new(ApiIngress::default());
    let subscriptions = Arc::new(Subscriptions::new());
    let host: Arc<dyn RestHostModule> = ingress.clone();

    let run_options = RunOptions {
        modules_cfg: Arc::new(ModkitConfigAdapter(AppConfigProvider::new(&config))),
        db,
        host: (api_ingress::MODULE_NAME, host),
        modules: vec![
            ModuleEntry::new(api_ingress::MODULE_NAME, ingress),
            ModuleEntry::new(subscriptions::module::MODULE_NAME, subscriptions.clone())
                .with_db(subscriptions.clone())
                .with_rest(subscriptions),
        ],
        shutdown: ShutdownOptions::Signals,
    };

    modkit::run(run_options).await
}

fn check_config(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Checking configuration...");

    match effective_dsn(&config, args.mock)? {
        Some(dsn) => println!("Database: {}", redact_dsn(&dsn)),
        None => println!("Database: none"),
    }
    let bind_addr = config
        .modules
        .get(api_ingress::MODULE_NAME)
        .and_then(|m| m.get("bind_addr"))
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    bind_addr
        .parse::<std::net::SocketAddr>()
        .map_err(|e| anyhow!("Invalid bind address '{}': {}", bind_addr, e))?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", redacted_yaml(&config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_relative_paths_land_under_home() {
        let base = Path::new("/srv/ledger");
        assert_eq!(
            absolutize_sqlite_dsn("sqlite://database/ledger.db?mode=rwc", base, false).unwrap(),
            "sqlite:///srv/ledger/database/ledger.db?mode=rwc"
        );
        assert_eq!(
            absolutize_sqlite_dsn("sqlite:///var/db/l.db", base, false).unwrap(),
            "sqlite:///var/db/l.db"
        );
        assert_eq!(
            absolutize_sqlite_dsn("sqlite://:memory:", base, false).unwrap(),
            SQLITE_MEMORY
        );
        assert!(absolutize_sqlite_dsn("sqlite://", base, false).is_err());
        assert!(absolutize_sqlite_dsn("postgres://x", base, false).is_err());
    }

    #[test]
    fn backend_is_detected_from_scheme() {
        assert_eq!(detect_backend("sqlite://a.db").unwrap(), Backend::Sqlite);
        assert_eq!(detect_backend(SQLITE_MEMORY).unwrap(), Backend::Sqlite);
        assert_eq!(
            detect_backend("postgres://u:p@localhost/ledger").unwrap(),
            Backend::Postgres
        );
        assert!(detect_backend("mysql://localhost/x").is_err());
        assert!(detect_backend("  ").is_err());
    }

    #[test]
    fn dsn_passwords_are_masked() {
        assert_eq!(
            redact_dsn("postgres://ledger:s3cret@db:5432/ledger"),
            "postgres://ledger:***@db:5432/ledger"
        );
        assert_eq!(redact_dsn("postgres://db/ledger"), "postgres://db/ledger");
        assert_eq!(redact_dsn(SQLITE_MEMORY), SQLITE_MEMORY);

        let config = AppConfig {
            database: Some(DatabaseConfig {
                url: "postgres://ledger:s3cret@db/ledger".into(),
                max_conns: None,
                busy_timeout_ms: None,
            }),
            ..AppConfig::default()
        };
        let yaml = redacted_yaml(&config).unwrap();
        assert!(!yaml.contains("s3cret"));
    }

    #[test]
    fn mock_overrides_configured_database() {
        let config = AppConfig::default();
        assert_eq!(
            effective_dsn(&config, true).unwrap().as_deref(),
            Some(SQLITE_MEMORY)
        );

        let no_db = AppConfig {
            database: None,
            ..AppConfig::default()
        };
        assert!(effective_dsn(&no_db, false).unwrap().is_none());
    }
}
