//! Vote ledger for the current iteration.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier of an image within an iteration's set.
///
/// Signed because the wire format carries plain JSON integers and the ledger
/// accepts whatever the client names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(pub i64);

#[derive(Debug, Default)]
struct LedgerInner {
    /// image id -> addresses that voted for it
    votes: HashMap<ImageId, HashSet<String>>,
    /// every address present in some voter set, for O(1) duplicate detection
    voters: HashSet<String>,
}

/// Tracks which users voted for which images.
///
/// One vote per user, globally: once an address appears in any image's voter
/// set, further submissions from it are rejected. The check and the
/// recording happen in one critical section. The ledger never exposes
/// tallies, only presence.
#[derive(Debug)]
pub struct VoteLedger {
    inner: Mutex<LedgerInner>,
}

impl VoteLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LedgerInner::default()),
        }
    }

    /// Whether this address has already cast a vote.
    pub fn has_voted(&self, user: &str) -> bool {
        self.inner
            .lock()
            .expect("ledger lock poisoned")
            .voters
            .contains(user)
    }

    /// Whether this address voted for this specific image.
    pub fn has_voted_for(&self, user: &str, image: ImageId) -> bool {
        self.inner
            .lock()
            .expect("ledger lock poisoned")
            .votes
            .get(&image)
            .is_some_and(|voters| voters.contains(user))
    }

    /// Record one user's vote for each of the named images.
    ///
    /// Fails with [`Error::DuplicateVote`] if the user already voted. A vote
    /// naming no images leaves no trace, so the user may submit again - the
    /// reverse index only tracks addresses that made it into a voter set.
    pub fn record_votes(&self, user: &str, images: &[ImageId]) -> Result<()> {
        let mut inner = self.inner.lock().expect("ledger lock poisoned");
        if inner.voters.contains(user) {
            return Err(Error::DuplicateVote {
                user: user.to_string(),
            });
        }
        if images.is_empty() {
            return Ok(());
        }
        for &image in images {
            inner
                .votes
                .entry(image)
                .or_default()
                .insert(user.to_string());
        }
        inner.voters.insert(user.to_string());
        Ok(())
    }

    /// Drop every vote, starting the ledger over for a new iteration.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("ledger lock poisoned");
        inner.votes.clear();
        inner.voters.clear();
    }

    /// Whether no votes have been recorded.
    pub fn is_empty(&self) -> bool {
        self.inner
            .lock()
            .expect("ledger lock poisoned")
            .voters
            .is_empty()
    }
}

impl Default for VoteLedger {
    fn default() -> Self {
        Self::new()
    }
}
