pub mod config;

use std::path::Path;

use anyhow::Context;

pub use self::config::ParleyConfig;

pub static CONFIG_LOCATION: &str = "./config.toml";

impl ParleyConfig {
    /// Reads the configuration at `path`.
    ///
    /// A missing file is not an error: every section has defaults, so the engine can run from an
    /// empty directory.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<ParleyConfig> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!("No config found at {}, using defaults", path.display());
            return Ok(ParleyConfig::default());
        }

        let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str::<ParleyConfig>(&raw).with_context(|| format!("Failed to parse {}", path.display()))
    }
}
