//! Layered configuration
//!
//! Later layers win: the defaults baked into the binary, then
//! `config/default`, `config/<ROSTER_ENV>` and `config/local` from the working
//! directory, then `ROSTER_*` environment variables.

use super::config::AppConfig;
use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};

/// `config/default.toml`, compiled in so a bare binary still starts
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

const DEFAULT_PROFILE: &str = "development";

/// Resolve the configuration for the profile named by `ROSTER_ENV`
pub fn load_config() -> Result<AppConfig> {
    let profile = std::env::var("ROSTER_ENV").unwrap_or_else(|_| DEFAULT_PROFILE.to_string());

    layers(&profile)
        .build()
        .context("Failed to build configuration")?
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

fn layers(profile: &str) -> ConfigBuilder<DefaultState> {
    Config::builder()
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{}", profile)).required(false))
        .add_source(File::with_name("config/local").required(false))
        // ROSTER_AUTH__JWT_SECRET sets auth.jwt_secret
        .add_source(
            Environment::with_prefix("ROSTER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
}
