//! `probe config` handlers.

use anyhow::{Context, Result};
use probe_core::config::{Config, paths};

/// Prints the config path, noting when defaults are in effect.
pub fn path() {
    let config_path = paths::config_path();
    if config_path.exists() {
        println!("{}", config_path.display());
    } else {
        println!("{} (not created, using defaults)", config_path.display());
    }
}

pub fn init() -> Result<()> {
    let config_path = paths::config_path();
    Config::init(&config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    println!("Edit backend_url there or pass --backend-url to target another backend.");
    Ok(())
}

/// Prints the default config, regenerated from `Config::default()`.
pub fn generate() -> Result<()> {
    print!("{}", Config::generate()?);
    Ok(())
}
