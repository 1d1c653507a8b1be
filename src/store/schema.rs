use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::host::ProgressKind;

pub const SCHEMA_VERSION: u32 = 1;
pub const MAX_SESSIONS: usize = 500;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressCounters {
    #[serde(default)]
    pub shape: u32,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub letter: u32,
    #[serde(default, rename = "mathProblem")]
    pub math_problem: u32,
}

impl ProgressCounters {
    pub fn get(&self, kind: ProgressKind) -> u32 {
        match kind {
            ProgressKind::Shape => self.shape,
            ProgressKind::Color => self.color,
            ProgressKind::Letter => self.letter,
            ProgressKind::MathProblem => self.math_problem,
        }
    }

    pub fn increment(&mut self, kind: ProgressKind) {
        let slot = match kind {
            ProgressKind::Shape => &mut self.shape,
            ProgressKind::Color => &mut self.color,
            ProgressKind::Letter => &mut self.letter,
            ProgressKind::MathProblem => &mut self.math_problem,
        };
        *slot = slot.saturating_add(1);
    }

    pub fn total(&self) -> u32 {
        self.shape + self.color + self.letter + self.math_problem
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub game: String,
    pub score: u32,
    pub rounds: u32,
    pub accuracy: f64,
    pub best_streak: u32,
    pub finished_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressData {
    pub schema_version: u32,
    #[serde(default)]
    pub counters: ProgressCounters,
    #[serde(default)]
    pub total_rounds: u32,
    #[serde(default)]
    pub last_played: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
}

impl Default for ProgressData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            counters: ProgressCounters::default(),
            total_rounds: 0,
            last_played: None,
            sessions: Vec::new(),
        }
    }
}

impl ProgressData {
    pub fn needs_reset(&self) -> bool {
        self.schema_version != SCHEMA_VERSION
    }

    pub fn push_session(&mut self, record: SessionRecord) {
        self.last_played = Some(record.finished_at);
        self.total_rounds = self.total_rounds.saturating_add(record.rounds);
        self.sessions.push(record);
        if self.sessions.len() > MAX_SESSIONS {
            self.sessions.remove(0);
        }
    }

    pub fn best_score(&self, game: &str) -> Option<u32> {
        self.sessions
            .iter()
            .filter(|s| s.game == game)
            .map(|s| s.score)
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_increment_per_kind() {
        let mut counters = ProgressCounters::default();
        counters.increment(ProgressKind::Color);
        counters.increment(ProgressKind::Color);
        counters.increment(ProgressKind::MathProblem);
        assert_eq!(counters.get(ProgressKind::Color), 2);
        assert_eq!(counters.get(ProgressKind::MathProblem), 1);
        assert_eq!(counters.get(ProgressKind::Shape), 0);
        assert_eq!(counters.total(), 3);
    }

    #[test]
    fn test_counters_use_camel_case_math_key() {
        let json = serde_json::to_string(&ProgressCounters::default()).unwrap();
        assert!(json.contains("mathProblem"));
    }

    #[test]
    fn test_session_history_is_capped() {
        let mut data = ProgressData::default();
        for i in 0..(MAX_SESSIONS + 5) {
            data.push_session(SessionRecord {
                game: "colors".to_string(),
                score: i as u32,
                rounds: 1,
                accuracy: 100.0,
                best_streak: 1,
                finished_at: Utc::now(),
            });
        }
        assert_eq!(data.sessions.len(), MAX_SESSIONS);
        assert_eq!(data.sessions[0].score, 5);
        assert_eq!(data.total_rounds, (MAX_SESSIONS + 5) as u32);
        assert_eq!(data.best_score("colors"), Some((MAX_SESSIONS + 4) as u32));
        assert_eq!(data.best_score("math"), None);
        assert!(data.last_played.is_some());
    }
}
