use std::sync::{Arc, RwLock};

use tracing::info;

use crate::error::ModelError;
use crate::predict::{self, PredictionResult};
use crate::ratings::{self, MatchRecord, RatingsSnapshot};

/// Holder for the current ratings. Readers clone the `Arc` and keep a
/// consistent snapshot for as long as they need it; rebuilds swap the pointer.
#[derive(Debug)]
pub struct SharedRatings {
    current: RwLock<Arc<RatingsSnapshot>>,
}

impl SharedRatings {
    pub fn new(snapshot: RatingsSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn from_matches(matches: &[MatchRecord]) -> Result<Self, ModelError> {
        Ok(Self::new(ratings::build_ratings(matches)?))
    }

    pub fn load(&self) -> Arc<RatingsSnapshot> {
        self.current
            .read()
            .expect("ratings lock poisoned")
            .clone()
    }

    /// Installs `next` and hands back the snapshot it replaced.
    pub fn replace(&self, next: RatingsSnapshot) -> Arc<RatingsSnapshot> {
        let next = Arc::new(next);
        let mut guard = self.current.write().expect("ratings lock poisoned");
        std::mem::replace(&mut *guard, next)
    }

    /// Builds from `matches` outside the lock; on error the current snapshot stays.
    pub fn rebuild(&self, matches: &[MatchRecord]) -> Result<(), ModelError> {
        let next = ratings::build_ratings(matches)?;
        info!(
            teams = next.teams.len(),
            matches = next.baselines.sample_matches,
            "swapping in rebuilt ratings"
        );
        self.replace(next);
        Ok(())
    }

    pub fn predict(&self, home: &str, away: &str) -> Result<PredictionResult, ModelError> {
        let snapshot = self.load();
        predict::predict(home, away, &snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(home_goals: u32) -> Vec<MatchRecord> {
        vec![
            MatchRecord::new(None, "A", "B", home_goals, 1),
            MatchRecord::new(None, "B", "A", 1, 1),
        ]
    }

    #[test]
    fn failed_rebuild_keeps_previous_snapshot() {
        let shared = SharedRatings::from_matches(&corpus(2)).unwrap();
        let before = shared.load();
        assert_eq!(shared.rebuild(&[]), Err(ModelError::EmptyCorpus));
        assert!(Arc::ptr_eq(&before, &shared.load()));
    }

    #[test]
    fn old_readers_keep_their_snapshot_after_swap() {
        let shared = SharedRatings::from_matches(&corpus(2)).unwrap();
        let held = shared.load();
        shared.rebuild(&corpus(4)).unwrap();
        assert_eq!(held.home_rates("A").unwrap().attack, 2.0);
        assert_eq!(shared.load().home_rates("A").unwrap().attack, 4.0);
    }

    #[test]
    fn concurrent_readers_see_whole_snapshots() {
        let shared = SharedRatings::from_matches(&corpus(2)).unwrap();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..200 {
                        let snap = shared.load();
                        let attack = snap.home_rates("A").unwrap().attack;
                        let avg_home = snap.baselines.avg_home_goals;
                        // avg_home = (attack + 1) / 2 in both corpora.
                        assert!((avg_home - (attack + 1.0) / 2.0).abs() < 1e-12);
                    }
                });
            }
            s.spawn(|| {
                for i in 0..50 {
                    let goals = if i % 2 == 0 { 4 } else { 2 };
                    shared.rebuild(&corpus(goals)).unwrap();
                }
            });
        });
    }
}
