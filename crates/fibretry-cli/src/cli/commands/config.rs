//! `fibretry config` – show where the config lives and what it resolves to.

use anyhow::Result;
use fibretry_core::config::{self, FibretryConfig};

pub fn run_config(cfg: &FibretryConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}
