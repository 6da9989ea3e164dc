use anyhow::{Context, Result};
use chamber_runtime_config::{CONFIG_FILE_NAME, ChamberConfig, load_from_path, load_or_default};
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.config/chamber/)
pub fn config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home).join(".config").join("chamber"))
}

/// Canonical config file path.
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Resolve the effective config. An explicit path must load cleanly; the
/// default location falls back to built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<(ChamberConfig, PathBuf)> {
    match explicit {
        Some(path) => {
            let config = load_from_path(path)
                .with_context(|| format!("Failed to load config at {}", path.display()))?;
            Ok((config, path.to_path_buf()))
        }
        None => {
            let path = config_path()?;
            Ok((load_or_default(&path), path))
        }
    }
}

pub fn show_config(explicit: Option<&Path>) -> Result<()> {
    let (config, path) = load_config(explicit)?;
    let source = if path.exists() { "" } else { " (not found, defaults)" };
    println!("# {}{source}", path.display());
    print!(
        "{}",
        toml::to_string_pretty(&config).context("Failed to serialize config")?
    );
    Ok(())
}
