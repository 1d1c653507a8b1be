use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRule {
    pub hit_points: u32,
    pub miss_penalty: u32,
}

impl Default for ScoringRule {
    fn default() -> Self {
        Self {
            hit_points: 10,
            miss_penalty: 5,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreTracker {
    pub score: u32,
    pub round_score: u32,
    pub hits: u32,
    pub misses: u32,
    pub streak: u32,
    pub best_streak: u32,
    pub rounds_completed: u32,
}

impl ScoreTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_round(&mut self) {
        self.round_score = 0;
    }

    pub fn record_hit(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
        self.round_score = self.round_score.saturating_add(points);
        self.hits += 1;
        self.streak += 1;
        self.best_streak = self.best_streak.max(self.streak);
    }

    /// Score never drops below zero.
    pub fn record_miss(&mut self, penalty: u32) {
        self.score = self.score.saturating_sub(penalty);
        self.round_score = self.round_score.saturating_sub(penalty);
        self.misses += 1;
        self.streak = 0;
    }

    pub fn complete_round(&mut self) {
        self.rounds_completed += 1;
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 100.0;
        }
        self.hits as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_clamps_at_zero() {
        let mut tracker = ScoreTracker::new();
        tracker.record_miss(5);
        assert_eq!(tracker.score, 0);
        tracker.record_hit(3);
        tracker.record_miss(5);
        assert_eq!(tracker.score, 0);
        assert_eq!(tracker.misses, 2);
    }

    #[test]
    fn test_streak_resets_on_miss() {
        let mut tracker = ScoreTracker::new();
        tracker.record_hit(10);
        tracker.record_hit(10);
        tracker.record_hit(10);
        tracker.record_miss(5);
        tracker.record_hit(10);
        assert_eq!(tracker.streak, 1);
        assert_eq!(tracker.best_streak, 3);
        assert_eq!(tracker.score, 35);
    }

    #[test]
    fn test_round_score_resets_per_round() {
        let mut tracker = ScoreTracker::new();
        tracker.record_hit(10);
        tracker.complete_round();
        tracker.begin_round();
        assert_eq!(tracker.round_score, 0);
        assert_eq!(tracker.score, 10);
        assert_eq!(tracker.rounds_completed, 1);
    }

    #[test]
    fn test_accuracy_starts_at_100() {
        let tracker = ScoreTracker::new();
        assert_eq!(tracker.accuracy(), 100.0);
    }
}
