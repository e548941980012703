use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

/// Resolve the server home directory into an absolute path.
///
/// - `None` (or blank) → `<user home>/<default_subdir>`
/// - `~` / `~/x` → expanded against the user home
/// - relative paths → joined with the current working directory
///
/// With `create` set, the directory is created if missing.
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf> {
    let user_home = || dirs::home_dir().ok_or_else(|| anyhow!("cannot determine user home"));

    let resolved = match configured.as_deref().map(str::trim) {
        None | Some("") => user_home()?.join(default_subdir),
        Some("~") => user_home()?,
        Some(raw) => match raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
            Some(rest) => user_home()?.join(rest),
            None => absolutize(Path::new(raw))?,
        },
    };

    if create {
        std::fs::create_dir_all(&resolved)
            .with_context(|| format!("failed to create home dir {}", resolved.display()))?;
    }
    Ok(resolved)
}

fn absolutize(p: &Path) -> Result<PathBuf> {
    if p.is_absolute() {
        return Ok(p.to_path_buf());
    }
    Ok(std::env::current_dir()
        .context("cannot read current directory")?
        .join(p))
}
