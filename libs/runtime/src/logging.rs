use crate::config::{LoggingConfig, Section};
use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{level_filters::LevelFilter, Level, Metadata};
use tracing_subscriber::{
    filter::FilterFn,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer, Registry,
};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};

const DEFAULT_SECTION: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;

/// `None` means the sink is switched off; unknown names fall back to INFO.
fn parse_level(s: &str) -> Option<Level> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

/// `target == name` or `target` starts with `name::`.
fn matches_crate_prefix(target: &str, name: &str) -> bool {
    target
        .strip_prefix(name)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

/// Per-target level decision for one sink (console or file).
#[derive(Clone, Debug, Default)]
struct LevelPlan {
    fallback: Option<Level>,
    by_prefix: Vec<(String, Option<Level>)>,
}

impl LevelPlan {
    fn build(cfg: &LoggingConfig, pick: impl Fn(&Section) -> Option<Level>) -> Self {
        let mut by_prefix: Vec<(String, Option<Level>)> = cfg
            .iter()
            .filter(|(name, _)| name.as_str() != DEFAULT_SECTION)
            .map(|(name, section)| (name.clone(), pick(section)))
            .collect();
        // longest prefix wins
        by_prefix.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self {
            fallback: cfg.get(DEFAULT_SECTION).and_then(&pick),
            by_prefix,
        }
    }

    fn level_for(&self, target: &str) -> Option<Level> {
        self.by_prefix
            .iter()
            .find(|(name, _)| matches_crate_prefix(target, name))
            .map_or(self.fallback, |(_, level)| *level)
    }

    fn allows(&self, meta: &Metadata<'_>) -> bool {
        self.level_for(meta.target())
            .is_some_and(|max| meta.level() <= &max)
    }

    fn is_silent(&self) -> bool {
        self.fallback.is_none() && self.by_prefix.iter().all(|(_, l)| l.is_none())
    }
}

type SharedRotate = Arc<Mutex<FileRotate<AppendTimestamp>>>;

/// `io::Write` over a shared rotating file; `None` discards output.
struct FileHandle(Option<SharedRotate>);

impl Write for FileHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &self.0 {
            Some(file) => file
                .lock()
                .map_err(|_| io::Error::other("log file lock poisoned"))?
                .write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &self.0 {
            Some(file) => file
                .lock()
                .map_err(|_| io::Error::other("log file lock poisoned"))?
                .flush(),
            None => Ok(()),
        }
    }
}

/// Chooses the log file for a record by its target.
#[derive(Clone, Default)]
struct FileRouter {
    fallback: Option<SharedRotate>,
    by_prefix: Vec<(String, SharedRotate)>,
}

impl FileRouter {
    fn build(cfg: &LoggingConfig, base_dir: &Path) -> Self {
        let mut router = FileRouter::default();
        for (name, section) in cfg {
            let Some(file) = open_section_file(name, section, base_dir) else {
                continue;
            };
            if name == DEFAULT_SECTION {
                router.fallback = Some(file);
            } else {
                router.by_prefix.push((name.clone(), file));
            }
        }
        router.by_prefix.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        router
    }

    fn file_for(&self, target: &str) -> Option<SharedRotate> {
        self.by_prefix
            .iter()
            .find(|(name, _)| matches_crate_prefix(target, name))
            .map(|(_, f)| f.clone())
            .or_else(|| self.fallback.clone())
    }

    fn is_empty(&self) -> bool {
        self.fallback.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> MakeWriter<'a> for FileRouter {
    type Writer = FileHandle;

    fn make_writer(&'a self) -> Self::Writer {
        FileHandle(self.fallback.clone())
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        FileHandle(self.file_for(meta.target()))
    }
}

/// Relative log paths live under the server home directory.
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn open_rotating(path: &Path, section: &Section) -> io::Result<SharedRotate> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let keep = match section.max_backups {
        Some(n) => FileLimit::MaxFiles(n),
        None => FileLimit::Age(chrono::Duration::days(
            i64::from(section.max_age_days.unwrap_or(7)),
        )),
    };
    let rotate = FileRotate::new(
        path,
        AppendTimestamp::default(keep),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    Ok(Arc::new(Mutex::new(rotate)))
}

fn open_section_file(name: &str, section: &Section, base_dir: &Path) -> Option<SharedRotate> {
    if section.file.trim().is_empty() {
        return None;
    }
    let path = resolve_log_path(&section.file, base_dir);
    match open_rotating(&path, section) {
        Ok(file) => Some(file),
        Err(e) => {
            // the subscriber is not installed yet
            eprintln!(
                "failed to open log file '{}' for '{name}': {e}",
                path.display()
            );
            None
        }
    }
}

fn plan_filter(plan: LevelPlan) -> FilterFn<impl Fn(&Metadata<'_>) -> bool> {
    FilterFn::new(move |meta: &Metadata<'_>| plan.allows(meta))
}

/// Install the global subscriber from the `logging` section.
///
/// Console output is human readable (ANSI only on a terminal); file output is
/// JSON lines, routed per subsystem with size-based rotation. `base_dir` is
/// usually `server.home_dir`. Repeated calls are no-ops.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        init_default_logging();
        return;
    }

    let console_plan = LevelPlan::build(cfg, |s| parse_level(&s.console_level));
    let file_plan = LevelPlan::build(cfg, |s| {
        if s.file.trim().is_empty() {
            None
        } else {
            parse_level(&s.file_level)
        }
    });
    let router = FileRouter::build(cfg, base_dir);

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if !console_plan.is_silent() {
        layers.push(
            fmt::layer()
                .with_ansi(atty::is(atty::Stream::Stdout))
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_filter(plan_filter(console_plan))
                .boxed(),
        );
    }

    if !router.is_empty() && !file_plan.is_silent() {
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_writer(router)
                .with_filter(plan_filter(file_plan))
                .boxed(),
        );
    }

    let _ = Registry::default().with(layers).try_init();
}

fn init_default_logging() {
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_max_level(LevelFilter::INFO)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .try_init();
}
