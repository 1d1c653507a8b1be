pub mod narration;
pub mod phrases;
pub mod population;
pub mod round;
pub mod score;
pub mod target;
pub mod timers;
pub mod variant;

pub use round::{FinishReason, PopOutcome, RoundEngine, RoundSnapshot, RoundState};
pub use variant::{GameKind, GridSize, Variant};
