use axum::extract::FromRef;
use tracing::warn;

pub mod clock;
pub mod commands;
pub mod config;
pub mod controllers;
pub mod error;
pub mod ids;
pub mod lifecycle;
pub mod models;
pub mod pages;
pub mod storage;
pub mod types;

pub use error::{ApiError, ApiResult};

use clock::Clock;
use config::Config;
use storage::AnyStore;

/// Shared state handed to every request.
#[derive(Clone, FromRef)]
pub struct App {
    pub config: Config,
    pub store: AnyStore,
    pub clock: Clock,
}

impl App {
    pub fn new(config: Config, store: AnyStore) -> Self {
        let clock = Clock::new(config.test_mode);
        if config.test_mode {
            warn!("test mode enabled, requests may override the clock");
        }

        App {
            config,
            store,
            clock,
        }
    }

    /// Open the configured store and build the state around it.
    pub async fn connect(config: Config) -> anyhow::Result<Self> {
        let store = AnyStore::open(&config.store).await?;
        Ok(App::new(config, store))
    }
}
