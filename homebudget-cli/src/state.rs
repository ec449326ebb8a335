use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Overrides the data directory (default `~/.homebudget`).
pub const HOME_ENV: &str = "HOMEBUDGET_HOME";

pub fn homebudget_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".homebudget"))
}

pub fn ensure_homebudget_home() -> Result<PathBuf> {
    let dir = homebudget_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// Resolve a configured path; relative paths live under the data directory.
pub fn resolve(home: &Path, configured: Option<&Path>, default_name: &str) -> PathBuf {
    match configured {
        Some(p) if p.is_absolute() => p.to_path_buf(),
        Some(p) => home.join(p),
        None => home.join(default_name),
    }
}
