//! `vdm config` – print the resolved engine configuration.

use anyhow::Result;
use vdm_core::config::{self, EngineConfig};

pub fn run_config(cfg: &EngineConfig) -> Result<()> {
    println!("config file: {}", config::config_path()?.display());
    println!("max_concurrent_downloads: {}", cfg.max_concurrent_downloads);
    println!("progress_interval_ms: {}", cfg.progress_interval_ms);
    println!("save_dir: {}", cfg.save_dir.display());
    Ok(())
}
