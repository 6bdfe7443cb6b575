//! Background cycle advancing the iteration.
//!
//! One pass of the cycle produces the next image set, advances the counter,
//! persists the marker, and publishes the set under the iteration-numbered
//! path. Between passes the driver blocks on a trigger channel, so the loop
//! can be driven by an operator, a timer, or a test - and stopped by
//! dropping the sender.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use atelier_core::{Error, IterationCounter, Result, VoteLedger};
use tokio::sync::mpsc;

use crate::store::IterationStore;

/// Produces the image set for an upcoming iteration.
///
/// Returns the directory holding the set; the driver aliases it under the
/// iteration-numbered path. Generation failures are logged by the driver
/// and do not stop the cycle.
pub trait ArtGenerator: Send + Sync {
    /// Produce the set for `iteration` and return its directory.
    fn generate(&self, iteration: u64) -> Result<PathBuf>;
}

/// Generator that aliases a pre-rendered set instead of producing new
/// images, logging one line per image the way a real generation pass would.
pub struct PreRenderedSet {
    source: PathBuf,
    images_per_iteration: u32,
}

impl PreRenderedSet {
    /// Alias `source` as every iteration's set. A relative `source` is
    /// resolved relative to the images directory the link is published in.
    pub fn new(source: impl Into<PathBuf>, images_per_iteration: u32) -> Self {
        Self {
            source: source.into(),
            images_per_iteration,
        }
    }
}

impl ArtGenerator for PreRenderedSet {
    fn generate(&self, iteration: u64) -> Result<PathBuf> {
        for image in 1..=u64::from(self.images_per_iteration) {
            tracing::info!(iteration, image, "generating image");
        }
        Ok(self.source.clone())
    }
}

/// How the cycle is told to proceed to the next pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceMode {
    /// Wait for the operator to press enter between iterations.
    Manual,
    /// Advance automatically on a fixed period.
    Every(Duration),
}

/// Spawn the configured trigger source and return the channel the cycle
/// driver waits on.
pub fn spawn_trigger(mode: AdvanceMode) -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(1);
    match mode {
        AdvanceMode::Manual => {
            // Reading stdin blocks a whole thread, never the runtime.
            tokio::task::spawn_blocking(move || {
                let mut line = String::new();
                loop {
                    line.clear();
                    match std::io::stdin().read_line(&mut line) {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {
                            if tx.blocking_send(()).is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
        AdvanceMode::Every(period) => {
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                // interval fires immediately; the cycle already ran its
                // first pass on startup, so swallow that tick.
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    if tx.send(()).await.is_err() {
                        break;
                    }
                }
            });
        }
    }
    rx
}

/// Drives the generation cycle: generate, advance, persist, publish, wait.
pub struct CycleDriver {
    counter: Arc<IterationCounter>,
    ledger: Arc<VoteLedger>,
    store: IterationStore,
    generator: Box<dyn ArtGenerator>,
    images_dir: PathBuf,
    reset_votes_on_advance: bool,
}

impl CycleDriver {
    /// Create a driver over the shared counter and ledger.
    pub fn new(
        counter: Arc<IterationCounter>,
        ledger: Arc<VoteLedger>,
        store: IterationStore,
        generator: Box<dyn ArtGenerator>,
        images_dir: impl Into<PathBuf>,
        reset_votes_on_advance: bool,
    ) -> Self {
        Self {
            counter,
            ledger,
            store,
            generator,
            images_dir: images_dir.into(),
            reset_votes_on_advance,
        }
    }

    /// Run until the trigger channel closes.
    ///
    /// The first pass runs immediately on startup; every later pass waits
    /// for a trigger first.
    pub async fn run(self, mut trigger: mpsc::Receiver<()>) {
        loop {
            let iteration = self.run_once();
            tracing::info!(iteration, "cycle complete, waiting for trigger");
            if trigger.recv().await.is_none() {
                tracing::info!("trigger source closed, stopping cycle");
                return;
            }
        }
    }

    /// One pass of the state machine. Returns the iteration it advanced to.
    ///
    /// Persistence and publication failures are logged and the pass still
    /// counts; only the in-memory advance is authoritative.
    pub fn run_once(&self) -> u64 {
        // Only this driver advances the counter, so current + 1 is the
        // number the generated set will be published under.
        let next = self.counter.get() + 1;
        let set = self.generator.generate(next);

        let iteration = self.counter.advance();

        if self.reset_votes_on_advance {
            self.ledger.reset();
            tracing::info!(iteration, "vote ledger reset for new iteration");
        }

        if let Err(e) = self.store.persist(iteration) {
            tracing::error!(iteration, error = %e, "could not persist iteration");
        }

        match set {
            Ok(source) => {
                if let Err(e) = self.publish(iteration, &source) {
                    tracing::error!(iteration, error = %e, "could not publish image set");
                }
            }
            Err(e) => {
                tracing::error!(iteration, error = %e, "image generation failed");
            }
        }

        iteration
    }

    /// Make the set reachable under `<images_dir>/<iteration>` by aliasing
    /// rather than copying.
    fn publish(&self, iteration: u64, source: &Path) -> Result<()> {
        std::fs::create_dir_all(&self.images_dir).map_err(Error::FileSystem)?;
        let link = self.images_dir.join(iteration.to_string());
        std::os::unix::fs::symlink(source, link).map_err(Error::FileSystem)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn driver_in(dir: &Path, reset_votes: bool) -> CycleDriver {
        let counter = Arc::new(IterationCounter::new(0));
        let ledger = Arc::new(VoteLedger::new());
        let store = IterationStore::open(dir.join("data")).unwrap();
        CycleDriver::new(
            counter,
            ledger,
            store,
            Box::new(PreRenderedSet::new("test_images", 3)),
            dir.join("images"),
            reset_votes,
        )
    }

    #[test]
    fn one_pass_advances_persists_and_publishes() {
        let dir = tempdir().unwrap();
        let driver = driver_in(dir.path(), false);

        assert_eq!(driver.run_once(), 1);

        assert_eq!(driver.counter.get(), 1);
        assert_eq!(driver.store.load().unwrap(), 1);
        let link = dir.path().join("images").join("1");
        assert_eq!(
            std::fs::read_link(link).unwrap(),
            PathBuf::from("test_images")
        );
    }

    #[test]
    fn passes_number_consecutively() {
        let dir = tempdir().unwrap();
        let driver = driver_in(dir.path(), false);

        assert_eq!(driver.run_once(), 1);
        assert_eq!(driver.run_once(), 2);
        assert_eq!(driver.run_once(), 3);
        assert_eq!(driver.store.load().unwrap(), 3);
        // Each pass published its own numbered alias.
        for n in ["1", "2", "3"] {
            assert!(std::fs::read_link(dir.path().join("images").join(n)).is_ok());
        }
    }

    #[test]
    fn votes_survive_advance_by_default() {
        use atelier_core::ImageId;

        let dir = tempdir().unwrap();
        let driver = driver_in(dir.path(), false);
        driver.ledger.record_votes("u1", &[ImageId(3)]).unwrap();

        driver.run_once();

        // Without the reset flag the ledger is never cleared, so u1 stays
        // locked out in the new iteration.
        assert!(driver.ledger.has_voted("u1"));
    }

    #[test]
    fn reset_flag_clears_ledger_on_advance() {
        use atelier_core::ImageId;

        let dir = tempdir().unwrap();
        let driver = driver_in(dir.path(), true);
        driver.ledger.record_votes("u1", &[ImageId(3)]).unwrap();

        driver.run_once();

        assert!(!driver.ledger.has_voted("u1"));
        driver.ledger.record_votes("u1", &[ImageId(3)]).unwrap();
    }

    #[test]
    fn persist_failure_does_not_stop_the_pass() {
        let dir = tempdir().unwrap();
        let counter = Arc::new(IterationCounter::new(0));
        let ledger = Arc::new(VoteLedger::new());
        let store = IterationStore::open(dir.path().join("data")).unwrap();
        // Make the marker unwritable by turning its path into a directory.
        std::fs::create_dir_all(dir.path().join("data").join("iteration")).unwrap();

        let driver = CycleDriver::new(
            Arc::clone(&counter),
            ledger,
            store,
            Box::new(PreRenderedSet::new("test_images", 1)),
            dir.path().join("images"),
            false,
        );

        // The advance sticks even though persisting it failed.
        assert_eq!(driver.run_once(), 1);
        assert_eq!(counter.get(), 1);
    }

    #[tokio::test]
    async fn trigger_drives_passes_and_close_stops_the_loop() {
        let dir = tempdir().unwrap();
        let driver = driver_in(dir.path(), false);
        let counter = Arc::clone(&driver.counter);

        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(driver.run(rx));

        // First pass runs without a trigger.
        wait_for(&counter, 1).await;

        tx.send(()).await.unwrap();
        wait_for(&counter, 2).await;

        // Closing the channel stops the loop cleanly.
        drop(tx);
        handle.await.unwrap();
        assert_eq!(counter.get(), 2);
    }

    async fn wait_for(counter: &IterationCounter, value: u64) {
        for _ in 0..200 {
            if counter.get() == value {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("counter never reached {value}");
    }
}
