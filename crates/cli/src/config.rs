//! CLI configuration utilities

use anyhow::Result;
use navaja_core::ClientConfig;
use std::path::Path;

/// Save client configuration to a JSON file
pub fn save_client_config<P: AsRef<Path>>(config: &ClientConfig, path: P) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Generate a default configuration file
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    let config = ClientConfig::default();
    save_client_config(&config, path)
}
