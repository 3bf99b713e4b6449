use std::env;
use std::net::IpAddr;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// Prefix for environment overrides, e.g. `PASTEBIN_STORE__URL`.
const ENV_PREFIX: &str = "PASTEBIN";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// Public origin used when building paste links. Derived from request
    /// headers when unset.
    pub base_url: Option<String>,
    /// Allows the `x-test-now-ms` header to override the request clock.
    #[serde(default)]
    pub test_mode: bool,
    pub view_counting: ViewCounting,
    pub store: Store,
    pub limits: Limits,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Store {
    pub kind: StoreKind,
    pub url: String,
    pub max_connections: u32,
    pub migrate_on_start: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Sql,
    Memory,
}

/// How a view is written back to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewCounting {
    /// Read, then write the incremented counter. Concurrent views of the same
    /// paste may overshoot `max_views`.
    #[default]
    Relaxed,
    /// Conditional increment guarded by the store, never overshoots.
    Strict,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Limits {
    pub max_upload_size: usize,
}

impl Config {
    /// Layer built-in defaults, an optional config file and the environment.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        let mut config: Config = config::Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8080)?
            .set_default("view_counting", "relaxed")?
            .set_default("store.kind", "sql")?
            .set_default("store.url", "sqlite://pastes.db?mode=rwc")?
            .set_default("store.max_connections", 5)?
            .set_default("store.migrate_on_start", true)?
            .set_default("limits.max_upload_size", 1024 * 1024)?
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read config from {}", path.display()))?
            .try_deserialize()
            .context("failed to deserialize config")?;

        // `TEST_MODE=1` is honoured without the prefix too
        if env::var("TEST_MODE").as_deref() == Ok("1") {
            config.test_mode = true;
        }

        Ok(config)
    }
}
