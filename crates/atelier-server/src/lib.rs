//! Atelier Server
//!
//! A node for a recurring art-generation cycle with public voting.
//!
//! # Architecture
//!
//! - **Cycle**: A background task produces each iteration's image set,
//!   advances the shared counter, persists the marker, and publishes the
//!   set under the iteration-numbered path
//! - **API**: Clients poll `/iteration`, fetch `/images/<iteration>/<file>`,
//!   and submit votes to `/vote`
//! - **Store**: The iteration survives restarts as a one-line marker file
//!
//! # Usage
//!
//! ```ignore
//! let config = AtelierConfig::from_env();
//! let node = AtelierNode::new(config)?;
//! node.run().await?;
//! ```

mod api;
mod cycle;
mod node;
mod store;

pub use api::{build_router, AppState};
pub use cycle::{spawn_trigger, AdvanceMode, ArtGenerator, CycleDriver, PreRenderedSet};
pub use node::{AtelierConfig, AtelierNode};
pub use store::IterationStore;

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::ImageId;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn cycle_and_votes_compose() {
        let dir = tempdir().unwrap();

        let counter = Arc::new(atelier_core::IterationCounter::new(0));
        let ledger = Arc::new(atelier_core::VoteLedger::new());
        let store = IterationStore::open(dir.path().join("data")).unwrap();
        let driver = CycleDriver::new(
            Arc::clone(&counter),
            Arc::clone(&ledger),
            store.clone(),
            Box::new(PreRenderedSet::new("test_images", 2)),
            dir.path().join("images"),
            false,
        );

        // First cycle pass publishes iteration 1.
        assert_eq!(driver.run_once(), 1);

        // A user votes while the operator sits between iterations.
        ledger.record_votes("u1", &[ImageId(3)]).unwrap();

        // Restarting picks the iteration back up from the marker.
        assert_eq!(store.load().unwrap(), 1);
        let resumed = atelier_core::IterationCounter::new(store.load().unwrap());
        assert_eq!(resumed.get(), 1);
    }
}
