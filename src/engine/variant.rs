use serde::{Deserialize, Serialize};

use crate::engine::population::FallingField;
use crate::engine::score::ScoringRule;
use crate::engine::target::{Catalog, Difficulty, TargetPolicy};
use crate::host::ProgressKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameKind {
    FreeTap,
    Colors,
    TimedColors,
    Letters,
    Numbers,
    Math,
    Speed,
    FallingShapes,
}

pub const ALL_GAMES: &[GameKind] = &[
    GameKind::FreeTap,
    GameKind::Colors,
    GameKind::TimedColors,
    GameKind::Letters,
    GameKind::Numbers,
    GameKind::Math,
    GameKind::Speed,
    GameKind::FallingShapes,
];

impl GameKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GameKind::FreeTap => "free-tap",
            GameKind::Colors => "colors",
            GameKind::TimedColors => "timed-colors",
            GameKind::Letters => "letters",
            GameKind::Numbers => "numbers",
            GameKind::Math => "math",
            GameKind::Speed => "speed",
            GameKind::FallingShapes => "falling-shapes",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ALL_GAMES.iter().copied().find(|g| g.as_str() == name)
    }
}

/// Square grid sizes offered by the color game, with their target counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridSize {
    Three,
    Four,
    Five,
}

impl GridSize {
    pub fn slots(self) -> usize {
        match self {
            GridSize::Three => 9,
            GridSize::Four => 16,
            GridSize::Five => 25,
        }
    }

    pub fn target_count(self) -> usize {
        match self {
            GridSize::Three => 5,
            GridSize::Four => 6,
            GridSize::Five => 8,
        }
    }

    pub fn from_side(side: usize) -> Option<Self> {
        match side {
            3 => Some(GridSize::Three),
            4 => Some(GridSize::Four),
            5 => Some(GridSize::Five),
            _ => None,
        }
    }
}

/// Length of a timed color session; each round inside it still has its own countdown.
pub const TIMED_COLORS_SESSION_SECS: u32 = 90;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrongPopPolicy {
    StayPopped,
    /// Un-pop after a short delay so the same problem can be retried.
    RevertAfter { ms: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CelebrationPolicy {
    FixedDelay { ms: u64 },
    /// Wait for the celebration utterance; `fallback_ms` covers muted or failed speech.
    AfterNarration { fallback_ms: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerProfile {
    pub round_secs: Option<u32>,
    pub countdown_cues: Vec<u32>,
    pub inactivity_ms: Option<u64>,
    pub hint_delay_ms: Option<u64>,
}

impl TimerProfile {
    fn watchdog(ms: u64) -> Self {
        Self {
            round_secs: None,
            countdown_cues: Vec::new(),
            inactivity_ms: Some(ms),
            hint_delay_ms: None,
        }
    }

    fn with_hint(mut self, ms: u64) -> Self {
        self.hint_delay_ms = Some(ms);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub game: GameKind,
    pub catalog: Catalog,
    pub policy: TargetPolicy,
    pub difficulty: Difficulty,
    pub total_slots: usize,
    pub target_count: usize,
    pub scoring: ScoringRule,
    pub wrong_pop: WrongPopPolicy,
    pub timers: TimerProfile,
    pub celebration: CelebrationPolicy,
    pub session_secs: Option<u32>,
    /// Counter bumped once for every completed round.
    pub progress: ProgressKind,
    pub falling: Option<FallingField>,
}

impl Variant {
    pub fn preset(game: GameKind, difficulty: Difficulty, grid: GridSize) -> Self {
        let base = Variant {
            game,
            catalog: Catalog::Colors,
            policy: TargetPolicy::Random,
            difficulty,
            total_slots: grid.slots(),
            target_count: grid.target_count(),
            scoring: ScoringRule::default(),
            wrong_pop: WrongPopPolicy::StayPopped,
            timers: TimerProfile::watchdog(15_000).with_hint(8_000),
            celebration: CelebrationPolicy::AfterNarration { fallback_ms: 2_000 },
            session_secs: None,
            progress: ProgressKind::Color,
            falling: None,
        };

        match game {
            GameKind::FreeTap => Variant {
                total_slots: 9,
                target_count: 9,
                scoring: ScoringRule {
                    hit_points: 1,
                    miss_penalty: 0,
                },
                timers: TimerProfile::watchdog(15_000),
                celebration: CelebrationPolicy::FixedDelay { ms: 1_500 },
                ..base
            },
            GameKind::Colors => base,
            GameKind::TimedColors => Variant {
                total_slots: 25,
                target_count: 8,
                timers: TimerProfile {
                    round_secs: Some(30),
                    countdown_cues: vec![10, 5],
                    inactivity_ms: None,
                    hint_delay_ms: None,
                },
                celebration: CelebrationPolicy::FixedDelay { ms: 2_000 },
                session_secs: Some(TIMED_COLORS_SESSION_SECS),
                ..base
            },
            GameKind::Letters => Variant {
                catalog: Catalog::Letters,
                policy: TargetPolicy::Sequential,
                total_slots: 16,
                target_count: 6,
                timers: TimerProfile::watchdog(12_000).with_hint(8_000),
                progress: ProgressKind::Letter,
                ..base
            },
            GameKind::Numbers => Variant {
                catalog: Catalog::Digits,
                policy: TargetPolicy::Sequential,
                total_slots: 16,
                target_count: 6,
                timers: TimerProfile::watchdog(12_000).with_hint(8_000),
                progress: ProgressKind::Letter,
                ..base
            },
            GameKind::Math => Variant {
                catalog: Catalog::Arithmetic,
                total_slots: 4,
                target_count: 1,
                wrong_pop: WrongPopPolicy::RevertAfter { ms: 1_000 },
                timers: TimerProfile::watchdog(20_000),
                celebration: CelebrationPolicy::AfterNarration { fallback_ms: 2_500 },
                progress: ProgressKind::MathProblem,
                ..base
            },
            GameKind::Speed => Variant {
                total_slots: 9,
                target_count: 5,
                scoring: ScoringRule {
                    hit_points: 10,
                    miss_penalty: 10,
                },
                timers: TimerProfile::watchdog(10_000),
                celebration: CelebrationPolicy::FixedDelay { ms: 1_500 },
                session_secs: Some(60),
                ..base
            },
            GameKind::FallingShapes => Variant {
                catalog: Catalog::Shapes,
                total_slots: 8,
                target_count: 3,
                timers: TimerProfile::watchdog(15_000),
                progress: ProgressKind::Shape,
                falling: Some(FallingField::default()),
                ..base
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_names_round_trip() {
        for &game in ALL_GAMES {
            assert_eq!(GameKind::from_name(game.as_str()), Some(game));
        }
        assert_eq!(GameKind::from_name("chess"), None);
    }

    #[test]
    fn test_color_grid_sizes() {
        let v = Variant::preset(GameKind::Colors, Difficulty::Easy, GridSize::Five);
        assert_eq!((v.total_slots, v.target_count), (25, 8));
        let v = Variant::preset(GameKind::Colors, Difficulty::Easy, GridSize::Three);
        assert_eq!((v.total_slots, v.target_count), (9, 5));
    }

    #[test]
    fn test_presets_within_slot_bounds() {
        for &game in ALL_GAMES {
            let v = Variant::preset(game, Difficulty::Hard, GridSize::Four);
            assert!(v.target_count >= 1 && v.target_count <= v.total_slots, "{game:?}");
        }
    }

    #[test]
    fn test_math_reverts_wrong_answers() {
        let v = Variant::preset(GameKind::Math, Difficulty::Easy, GridSize::Four);
        assert_eq!(v.wrong_pop, WrongPopPolicy::RevertAfter { ms: 1_000 });
        assert_eq!(v.target_count, 1);
        assert_eq!(v.progress, ProgressKind::MathProblem);
    }

    #[test]
    fn test_timed_colors_has_countdown() {
        let v = Variant::preset(GameKind::TimedColors, Difficulty::Easy, GridSize::Four);
        assert_eq!(v.timers.round_secs, Some(30));
        assert_eq!(v.timers.countdown_cues, vec![10, 5]);
        assert_eq!(v.session_secs, Some(TIMED_COLORS_SESSION_SECS));
    }

    #[test]
    fn test_fixed_duration_games() {
        for &game in ALL_GAMES {
            let v = Variant::preset(game, Difficulty::Easy, GridSize::Four);
            let fixed = matches!(game, GameKind::Speed | GameKind::TimedColors);
            assert_eq!(v.session_secs.is_some(), fixed, "{game:?}");
        }
    }

    #[test]
    fn test_letter_and_number_games_share_counter() {
        let letters = Variant::preset(GameKind::Letters, Difficulty::Easy, GridSize::Four);
        let numbers = Variant::preset(GameKind::Numbers, Difficulty::Easy, GridSize::Four);
        assert_eq!(letters.progress, ProgressKind::Letter);
        assert_eq!(numbers.progress, ProgressKind::Letter);
    }
}
