//! Persistent storage for the iteration marker.

use std::fs;
use std::path::{Path, PathBuf};

use atelier_core::{Error, Result};

/// Name of the marker file inside the data directory.
const ITERATION_FILE: &str = "iteration";

/// File-backed store for the last advanced iteration.
///
/// The layout is a single text file holding the decimal iteration number,
/// overwritten on every successful advance.
#[derive(Debug, Clone)]
pub struct IterationStore {
    path: PathBuf,
}

impl IterationStore {
    /// Open the store inside the given data directory, creating the
    /// directory if needed.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        fs::create_dir_all(&data_dir)?;
        Ok(Self {
            path: data_dir.as_ref().join(ITERATION_FILE),
        })
    }

    /// Load the persisted iteration.
    ///
    /// A missing or unreadable file loads as 0 (fresh install). A file that
    /// is present but does not hold a decimal integer is a fatal config
    /// error - the process must not start with corrupt state.
    pub fn load(&self) -> Result<u64> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(path = ?self.path, error = %e, "no persisted iteration, starting at 0");
                return Ok(0);
            }
        };
        content.trim().parse().map_err(|_| {
            Error::Config(format!(
                "expecting integer defined in iteration file, instead got {content:?}"
            ))
        })
    }

    /// Best-effort write of the iteration. The caller logs failures and
    /// carries on; the in-memory value is never rolled back.
    pub fn persist(&self, iteration: u64) -> Result<()> {
        fs::write(&self.path, iteration.to_string()).map_err(Error::Persistence)
    }
}
