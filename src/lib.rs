//! XO Blocker: sends visits to blocklisted sites to a tic-tac-toe overlay for
//! a cooldown period, then redirects away.
//!
//! The background side ([`background`]) watches completed page loads and asks
//! the page to block; the page side ([`overlay`]) owns the countdown and the
//! game. Both talk to the same [`store::Preferences`].

pub mod background;
pub mod classifier;
pub mod config;
mod db;
pub mod game;
pub mod host;
pub mod messaging;
pub mod options;
pub mod overlay;
pub mod popup;
pub mod store;
mod utils;

use anyhow::Context;

use config::BlockerConfig;
use store::{Preferences, SqliteStore};

pub fn run() -> anyhow::Result<()> {
    let config = BlockerConfig::from_env();

    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(if config.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    log::info!("XO Blocker starting up...");

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async move {
        let store = SqliteStore::open(config.database_path())?;
        host::serve(Preferences::new(store), config).await
    })
}
