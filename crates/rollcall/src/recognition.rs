//! Face recognition seam.
//!
//! [`Recognizer`] is what the attendance store calls to match a snapshot
//! against enrolled users. The only implementation here is
//! [`RandomRecognizer`], a stand-in that ignores the image entirely: after an
//! artificial delay it picks a uniformly random candidate with a fixed
//! probability. A real matcher plugs in behind the same trait.
//!
//! Recognition is the one operation that suspends, so a caller may start a
//! second one before the first finishes. [`RequestTracker`] hands out
//! increasing [`RequestToken`]s so stale results can be recognized and dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::config::RecognitionConfig;
use crate::model::{FaceSnapshot, RegisteredUser};

/// Matches a snapshot against the registered users.
#[async_trait::async_trait]
pub trait Recognizer: Send + Sync {
    /// Name of this recognizer (for logging/debugging).
    fn name(&self) -> &'static str;

    /// Find the candidate the snapshot belongs to, if any.
    ///
    /// Returning `None` is a normal outcome, not an error. An empty
    /// `candidates` slice must yield `None`.
    async fn identify(
        &self,
        snapshot: &FaceSnapshot,
        candidates: &[RegisteredUser],
    ) -> Option<RegisteredUser>;
}

/// Simulated recognizer that answers at random.
#[derive(Debug)]
pub struct RandomRecognizer {
    match_probability: f64,
    delay: Duration,
    rng: Mutex<StdRng>,
}

impl RandomRecognizer {
    /// Create a recognizer seeded from entropy.
    ///
    /// `match_probability` is clamped to `0.0..=1.0`; NaN never matches.
    #[must_use]
    pub fn new(match_probability: f64, delay: Duration) -> Self {
        Self::with_rng(match_probability, delay, StdRng::from_entropy())
    }

    /// Create a recognizer with a fixed seed, for reproducible runs.
    #[must_use]
    pub fn seeded(match_probability: f64, delay: Duration, seed: u64) -> Self {
        Self::with_rng(match_probability, delay, StdRng::seed_from_u64(seed))
    }

    /// Build from the `[recognition]` config section.
    #[must_use]
    pub fn from_config(config: &RecognitionConfig) -> Self {
        let delay = config.delay();
        match config.seed {
            Some(seed) => Self::seeded(config.match_probability, delay, seed),
            None => Self::new(config.match_probability, delay),
        }
    }

    fn with_rng(match_probability: f64, delay: Duration, rng: StdRng) -> Self {
        let match_probability = if match_probability.is_nan() {
            0.0
        } else {
            match_probability.clamp(0.0, 1.0)
        };
        Self {
            match_probability,
            delay,
            rng: Mutex::new(rng),
        }
    }

    /// Configured match probability.
    #[must_use]
    pub fn match_probability(&self) -> f64 {
        self.match_probability
    }

    /// Configured artificial delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RandomRecognizer {
    fn default() -> Self {
        Self::from_config(&RecognitionConfig::default())
    }
}

#[async_trait::async_trait]
impl Recognizer for RandomRecognizer {
    fn name(&self) -> &'static str {
        "random"
    }

    async fn identify(
        &self,
        snapshot: &FaceSnapshot,
        candidates: &[RegisteredUser],
    ) -> Option<RegisteredUser> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if candidates.is_empty() {
            return None;
        }

        // The guard must not live across an await point
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        if !rng.gen_bool(self.match_probability) {
            trace!("Snapshot {} drew no match", snapshot.fingerprint());
            return None;
        }
        candidates.choose(&mut *rng).cloned()
    }
}

/// Identity of one recognition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    /// Sequence number of the request.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Issues request tokens and remembers the most recent one.
///
/// Cloning shares the counter.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    latest: Arc<AtomicU64>,
}

impl RequestTracker {
    /// Create a tracker with no requests issued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding every earlier token.
    pub fn begin(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Check whether no request was started after `token`.
    #[must_use]
    pub fn is_latest(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }
}
