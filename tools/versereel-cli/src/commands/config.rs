//! Print the effective configuration.

use versereel_common::config::config_file_path;
use versereel_common::AppConfig;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("# {}", config_file_path().display());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
