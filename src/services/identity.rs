//! Outbound identity rotation.
//!
//! Maintains a pool of identity strings (User-Agent values) and hands one out
//! per request. Every Nth request advances a round-robin cursor; all other
//! requests pick uniformly at random. Rotating the identity reduces
//! fingerprinting by the remote service.

use std::path::Path;
use std::sync::Mutex;

use rand::seq::SliceRandom;

use crate::error::{AppError, Result};

/// Identity used when the pool file is missing or empty.
const DEFAULT_IDENTITY: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36";

/// Mutable rotation state, guarded by a single mutex.
///
/// The counter increment and the mode decision must happen atomically so two
/// concurrent callers never both land on the same rotation boundary.
struct RotationState {
    request_count: u64,
    cursor: usize,
}

/// Pool of outbound identity strings with sequential/random rotation.
pub struct IdentityPool {
    identities: Vec<String>,
    change_interval: u64,
    state: Mutex<RotationState>,
}

impl IdentityPool {
    /// Load a pool from a newline-separated file.
    ///
    /// A missing or empty file is logged and replaced by one built-in
    /// default identity rather than aborting startup.
    pub fn from_file(path: impl AsRef<Path>, change_interval: u64) -> Self {
        let identities = match Self::read_identities(path.as_ref()) {
            Ok(list) => list,
            Err(e) => {
                log::warn!(
                    "Failed to load identity file {:?}: {}. Using built-in default.",
                    path.as_ref(),
                    e
                );
                vec![DEFAULT_IDENTITY.to_string()]
            }
        };
        Self::new(identities, change_interval)
    }

    /// Create a pool from an explicit identity list.
    pub fn new(identities: Vec<String>, change_interval: u64) -> Self {
        debug_assert!(!identities.is_empty());
        Self {
            identities,
            change_interval: change_interval.max(1),
            state: Mutex::new(RotationState {
                request_count: 0,
                cursor: 0,
            }),
        }
    }

    fn read_identities(path: &Path) -> Result<Vec<String>> {
        let content = std::fs::read_to_string(path)?;
        let list: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();
        if list.is_empty() {
            return Err(AppError::config(format!("identity file {path:?} is empty")));
        }
        Ok(list)
    }

    /// Number of identities in the pool.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Pick the identity for the next outbound request.
    ///
    /// Every `change_interval`-th request takes the next sequential entry,
    /// wrapping modulo the pool length; all other requests pick at random.
    pub fn rotate(&self) -> String {
        let mut state = self.state.lock().expect("identity state poisoned");
        state.request_count += 1;

        if state.request_count % self.change_interval == 0 {
            let identity = self.identities[state.cursor].clone();
            state.cursor = (state.cursor + 1) % self.identities.len();
            identity
        } else {
            self.identities
                .choose(&mut rand::thread_rng())
                .expect("identity pool is never empty")
                .clone()
        }
    }
}
