//! Atelier node - the main application entry point.
//!
//! Architecture:
//! - Single daemon process
//! - HTTP API for clients (iteration polling, votes, image fetches)
//! - Background cycle task producing and publishing each iteration's set

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use atelier_core::{IterationCounter, Result, VoteLedger};

use crate::api::{self, AppState};
use crate::cycle::{spawn_trigger, AdvanceMode, CycleDriver, PreRenderedSet};
use crate::store::IterationStore;

/// Configuration for an Atelier node.
#[derive(Debug, Clone)]
pub struct AtelierConfig {
    /// HTTP listen address
    pub bind_addr: SocketAddr,

    /// Data directory holding the iteration marker
    pub data_dir: PathBuf,

    /// Root directory the published image sets live under
    pub images_dir: PathBuf,

    /// Set directory aliased by the shipped generator, relative to the
    /// images root
    pub set_source: PathBuf,

    /// Images produced per generation pass
    pub images_per_iteration: u32,

    /// What drives the cycle from one iteration to the next
    pub advance: AdvanceMode,

    /// Clear the vote ledger as part of each advance
    pub reset_votes_on_advance: bool,
}

impl Default for AtelierConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl AtelierConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("ATELIER_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .expect("Invalid ATELIER_BIND");

        let data_dir = PathBuf::from(
            std::env::var("ATELIER_DATA_DIR").unwrap_or_else(|_| "./atelier-data".to_string()),
        );

        let images_dir = PathBuf::from(
            std::env::var("ATELIER_IMAGES_DIR").unwrap_or_else(|_| "./images".to_string()),
        );

        let set_source = PathBuf::from(
            std::env::var("ATELIER_SET_SOURCE").unwrap_or_else(|_| "test_images".to_string()),
        );

        let images_per_iteration = std::env::var("ATELIER_IMAGES_PER_ITERATION")
            .map(|v| v.parse().expect("Invalid ATELIER_IMAGES_PER_ITERATION"))
            .unwrap_or(10);

        let advance = std::env::var("ATELIER_ADVANCE")
            .map(|v| parse_advance(&v).expect("Invalid ATELIER_ADVANCE"))
            .unwrap_or(AdvanceMode::Manual);

        let reset_votes_on_advance = std::env::var("ATELIER_RESET_VOTES")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            bind_addr,
            data_dir,
            images_dir,
            set_source,
            images_per_iteration,
            advance,
            reset_votes_on_advance,
        }
    }
}

/// Parse an advance mode: `manual`, or `every:<seconds>`.
fn parse_advance(value: &str) -> Option<AdvanceMode> {
    if value.eq_ignore_ascii_case("manual") {
        return Some(AdvanceMode::Manual);
    }
    let seconds: u64 = value.strip_prefix("every:")?.parse().ok()?;
    if seconds == 0 {
        return None;
    }
    Some(AdvanceMode::Every(Duration::from_secs(seconds)))
}

/// An Atelier node instance.
#[derive(Debug)]
pub struct AtelierNode {
    state: Arc<AppState>,
    store: IterationStore,
    config: AtelierConfig,
}

impl AtelierNode {
    /// Create a node, loading the persisted iteration.
    ///
    /// Fails with a config error if the iteration marker exists but cannot
    /// be parsed - the process must not start with corrupt state.
    pub fn new(config: AtelierConfig) -> Result<Self> {
        let store = IterationStore::open(&config.data_dir)?;
        let initial = store.load()?;

        let state = Arc::new(AppState {
            counter: Arc::new(IterationCounter::new(initial)),
            ledger: Arc::new(VoteLedger::new()),
        });

        Ok(Self {
            state,
            store,
            config,
        })
    }

    /// Get the shared state (for API handlers).
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Run the node (starts the cycle task and the HTTP server).
    pub async fn run(self) -> Result<()> {
        tracing::info!("Atelier node starting");
        tracing::info!("  Current iteration: {}", self.state.counter.get());
        tracing::info!("  API: http://{}", self.config.bind_addr);
        tracing::info!(
            "  Serving images at http://{}/images/<iteration>/<image>",
            self.config.bind_addr
        );
        tracing::info!("  Data: {:?}", self.config.data_dir);

        let generator = PreRenderedSet::new(
            self.config.set_source.clone(),
            self.config.images_per_iteration,
        );
        let driver = CycleDriver::new(
            Arc::clone(&self.state.counter),
            Arc::clone(&self.state.ledger),
            self.store.clone(),
            Box::new(generator),
            self.config.images_dir.clone(),
            self.config.reset_votes_on_advance,
        );

        let trigger = spawn_trigger(self.config.advance);
        tokio::spawn(driver.run(trigger));

        let app = api::build_router(self.state.clone(), &self.config.images_dir);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!("HTTP server listening on {}", self.config.bind_addr);

        axum::serve(listener, app).await?;

        Ok(())
    }
}
