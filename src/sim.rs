//! Headless run of one mini-game against a virtual clock, with an automated
//! player standing in for the child.

use std::collections::HashMap;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;

use crate::engine::narration::{NarrationOutcome, VoiceOptions};
use crate::engine::population::ItemId;
use crate::engine::round::{FinishReason, RoundEngine, RoundState};
use crate::engine::variant::{GameKind, Variant};
use crate::host::console::ConsoleHost;
use crate::host::{AudioSettings, ProgressReporter};

pub const STEP_MS: u64 = 100;
/// Falling items are gone once their top edge passes this line.
const FIELD_HEIGHT: f32 = 640.0;

#[derive(Clone, Debug)]
pub struct SimOptions {
    pub rounds: u32,
    pub seed: u64,
    pub accuracy: f64,
    pub tap_interval_ms: u64,
    pub max_ms: u64,
    pub echo: bool,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            rounds: 5,
            seed: 0,
            accuracy: 0.85,
            tap_interval_ms: 1_200,
            max_ms: 10 * 60 * 1000,
            echo: false,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SimReport {
    pub game: GameKind,
    pub seed: u64,
    pub rounds_completed: u32,
    pub score: u32,
    pub hits: u32,
    pub misses: u32,
    pub best_streak: u32,
    pub accuracy: f64,
    pub finish: Option<FinishReason>,
    pub elapsed_ms: u64,
    pub taps: u32,
    pub utterances: u32,
    pub replaced: u32,
}

pub struct Simulation {
    engine: RoundEngine,
    host: ConsoleHost,
    rng: SmallRng,
    options: SimOptions,
    next_tap_ms: u64,
    spawned_at: HashMap<ItemId, u64>,
    taps: u32,
    replaced: u32,
}

impl Simulation {
    pub fn new(
        variant: Variant,
        voice: VoiceOptions,
        progress: Box<dyn ProgressReporter>,
        settings: Box<dyn AudioSettings>,
        options: SimOptions,
    ) -> Self {
        let host = ConsoleHost::new(options.echo);
        let collaborators = host.collaborators(progress, settings);
        let engine = RoundEngine::with_seed(variant, collaborators, voice, options.seed);
        // Separate stream so the player's choices don't perturb board generation.
        let rng = SmallRng::seed_from_u64(options.seed ^ 0x5eed_7a95);
        Self {
            engine,
            host,
            rng,
            next_tap_ms: options.tap_interval_ms,
            options,
            spawned_at: HashMap::new(),
            taps: 0,
            replaced: 0,
        }
    }

    pub fn run(&mut self) -> SimReport {
        let mut now = 0;
        self.host.clock.set(now);
        self.engine.start(now);
        while !self.is_done(now) {
            now += STEP_MS;
            self.step(now);
        }
        self.engine.cancel_all();
        self.report(now)
    }

    fn is_done(&self, now_ms: u64) -> bool {
        matches!(self.engine.state(), RoundState::Finished(_))
            || self.engine.score().rounds_completed >= self.options.rounds
            || now_ms >= self.options.max_ms
    }

    pub fn step(&mut self, now_ms: u64) {
        self.host.clock.set(now_ms);
        self.engine.advance_to(now_ms);
        self.deliver_narration(now_ms);
        if self.engine.variant().falling.is_some() {
            self.drift(now_ms);
        }
        if now_ms >= self.next_tap_ms {
            self.next_tap_ms = now_ms + self.options.tap_interval_ms.max(STEP_MS);
            self.tap();
        }
    }

    fn deliver_narration(&mut self, now_ms: u64) {
        for id in self.host.channel.take_interrupted() {
            self.engine.on_narration_finished(id, NarrationOutcome::Stopped);
        }
        while let Some(id) = self.host.channel.take_finished(now_ms) {
            self.engine.on_narration_finished(id, NarrationOutcome::Done);
        }
    }

    fn tap(&mut self) {
        if self.engine.state() != RoundState::Active {
            return;
        }
        let Some(round) = self.engine.round() else {
            return;
        };
        let mut targets = Vec::new();
        let mut unpopped = Vec::new();
        for item in round.items.iter().filter(|it| !it.popped) {
            if round.target.matches(&item.payload) {
                targets.push(item.id);
            }
            unpopped.push(item.id);
        }

        let aim = self.rng.gen_bool(self.options.accuracy.clamp(0.0, 1.0));
        let pool = if aim && !targets.is_empty() {
            &targets
        } else {
            &unpopped
        };
        let Some(&id) = pool.choose(&mut self.rng) else {
            return;
        };
        self.taps += 1;
        let outcome = self.engine.on_pop(id);
        debug!(id, aim, ?outcome, "autoplayer tap");
    }

    fn drift(&mut self, now_ms: u64) {
        let Some(round) = self.engine.round() else {
            return;
        };
        let mut gone = Vec::new();
        for item in round.items.iter().filter(|it| !it.popped) {
            let Some(motion) = item.motion else {
                continue;
            };
            let born = *self.spawned_at.entry(item.id).or_insert(now_ms);
            let y = motion.y + motion.velocity * (now_ms - born) as f32 / 1000.0;
            if y > FIELD_HEIGHT {
                gone.push(item.id);
            }
        }
        for id in gone {
            if let Some(fresh) = self.engine.on_off_screen(id) {
                self.spawned_at.remove(&id);
                self.spawned_at.insert(fresh, now_ms);
                self.replaced += 1;
            }
        }
    }

    fn report(&self, now_ms: u64) -> SimReport {
        let score = self.engine.score();
        SimReport {
            game: self.engine.variant().game,
            seed: self.options.seed,
            rounds_completed: score.rounds_completed,
            score: score.score,
            hits: score.hits,
            misses: score.misses,
            best_streak: score.best_streak,
            accuracy: score.accuracy(),
            finish: match self.engine.state() {
                RoundState::Finished(reason) => Some(reason),
                _ => None,
            },
            elapsed_ms: now_ms,
            taps: self.taps,
            utterances: self.host.channel.spoken(),
            replaced: self.replaced,
        }
    }
}
