//! Shuffle helpers

use crate::models::Track;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Random source for queue shuffles. Seeded shufflers are reproducible.
#[derive(Debug)]
pub struct Shuffler {
    rng: Mutex<StdRng>,
}

impl Shuffler {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Tracks after the first `active_id` in `queue`, uniformly shuffled.
    ///
    /// Tracks before the active one are history and are left out. `None` if
    /// the active track is not in `queue`.
    pub fn shuffle_upcoming(&self, queue: &[Track], active_id: &str) -> Option<Vec<Track>> {
        let mut upcoming = upcoming_tail(queue, active_id)?;
        upcoming.shuffle(&mut *self.rng.lock());
        Some(upcoming)
    }
}

impl Default for Shuffler {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Tracks strictly after the first occurrence of `active_id` in `original`.
///
/// `None` if the track is not in `original`.
pub fn upcoming_tail(original: &[Track], active_id: &str) -> Option<Vec<Track>> {
    let index = original.iter().position(|track| track.id == active_id)?;
    Some(original[index + 1..].to_vec())
}
