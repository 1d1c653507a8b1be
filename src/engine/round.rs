use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::narration::{
    NarrationGate, NarrationOutcome, Purpose, Ticket, UtteranceId, VoiceOptions,
};
use crate::engine::phrases;
use crate::engine::population::{Item, ItemId, PopulationGenerator, count_matching};
use crate::engine::score::ScoreTracker;
use crate::engine::target::{Target, TargetSelector};
use crate::engine::timers::{Fired, TimerCoordinator, TimerKind};
use crate::engine::variant::{CelebrationPolicy, Variant, WrongPopPolicy};
use crate::host::{AudioSettings, Collaborators, Cue, CuePlayer, ProgressReporter};

const COUNTDOWN_PERIOD_MS: u64 = 1_000;
/// Upper bound on waiting for a celebration utterance the host never reports.
const NARRATION_SAFETY_MS: u64 = 8_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    RoundTimedOut,
    SessionElapsed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundState {
    Idle,
    Selecting,
    Active,
    Resolving,
    Celebrating,
    Suspended,
    Finished(FinishReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopOutcome {
    Ignored,
    AlreadyPopped,
    Miss,
    Hit { remaining: usize },
    Completed,
}

#[derive(Clone, Debug)]
pub struct Round {
    pub index: u32,
    pub epoch: u64,
    pub target: Target,
    pub items: Vec<Item>,
    pub remaining: usize,
    pub found: usize,
    pub seconds_left: Option<u32>,
    pub completed: bool,
    pub timed_out: bool,
    pub watchdog_hints: u32,
    pub delayed_hint: bool,
    target_count: usize,
    progress_reported: bool,
    reverts: Vec<(ItemId, u64)>,
}

impl Round {
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|it| it.id == id)
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }

    fn next_revert(&self) -> Option<u64> {
        self.reverts.iter().map(|&(_, due)| due).min()
    }
}

/// Read-only projection handed to the renderer.
#[derive(Clone, Debug, Serialize)]
pub struct RoundSnapshot {
    pub state: RoundState,
    pub round_index: u32,
    pub target: Option<Target>,
    pub items: Vec<Item>,
    pub remaining: usize,
    pub score: u32,
    pub seconds_left: Option<u32>,
    pub session_seconds_left: Option<u32>,
}

#[derive(Clone, Copy, Debug)]
struct Suspension {
    at_ms: u64,
    session_left_ms: Option<u64>,
    was_resolved: bool,
}

/// Drives one mini-game: selects targets, builds populations, owns the timers
/// and the narration slot, and resolves pops. Every entry point takes
/// `&mut self`, so host callbacks are serialized by construction.
pub struct RoundEngine {
    variant: Variant,
    rng: SmallRng,
    selector: TargetSelector,
    generator: PopulationGenerator,
    timers: TimerCoordinator,
    narration: NarrationGate,
    cues: Box<dyn CuePlayer>,
    progress: Box<dyn ProgressReporter>,
    settings: Box<dyn AudioSettings>,
    score: ScoreTracker,
    state: RoundState,
    round: Option<Round>,
    round_index: u32,
    epoch: u64,
    session_epoch: u64,
    now_ms: u64,
    suspension: Option<Suspension>,
}

impl RoundEngine {
    pub fn new(variant: Variant, collaborators: Collaborators, voice: VoiceOptions) -> Self {
        Self::with_rng(variant, collaborators, voice, SmallRng::from_entropy())
    }

    pub fn with_seed(
        variant: Variant,
        collaborators: Collaborators,
        voice: VoiceOptions,
        seed: u64,
    ) -> Self {
        Self::with_rng(variant, collaborators, voice, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(
        variant: Variant,
        collaborators: Collaborators,
        voice: VoiceOptions,
        rng: SmallRng,
    ) -> Self {
        let selector = TargetSelector::new(variant.catalog, variant.policy, variant.difficulty);
        Self {
            variant,
            rng,
            selector,
            generator: PopulationGenerator::new(),
            timers: TimerCoordinator::new(),
            narration: NarrationGate::new(collaborators.speech, voice),
            cues: collaborators.cues,
            progress: collaborators.progress,
            settings: collaborators.settings,
            score: ScoreTracker::new(),
            state: RoundState::Idle,
            round: None,
            round_index: 0,
            epoch: 0,
            session_epoch: 0,
            now_ms: 0,
            suspension: None,
        }
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    pub fn score(&self) -> &ScoreTracker {
        &self.score
    }

    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    pub fn round_index(&self) -> u32 {
        self.round_index
    }

    pub fn is_narrating(&self) -> bool {
        self.narration.is_active()
    }

    pub fn live_timers(&self) -> usize {
        self.timers.live_count()
    }

    pub fn is_timer_armed(&self, kind: TimerKind) -> bool {
        self.timers.is_armed(kind)
    }

    /// Earliest moment anything is scheduled, for hosts that sleep between events.
    pub fn next_deadline(&self) -> Option<u64> {
        let revert = self.round.as_ref().and_then(|r| r.next_revert());
        match (self.timers.next_due(), revert) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        let session_left_ms = match self.suspension {
            Some(s) => s.session_left_ms,
            None => self
                .timers
                .due_ms(TimerKind::Session)
                .map(|due| due.saturating_sub(self.now_ms)),
        };
        RoundSnapshot {
            state: self.state,
            round_index: self.round_index,
            target: self.round.as_ref().map(|r| r.target),
            items: self
                .round
                .as_ref()
                .map(|r| r.items.clone())
                .unwrap_or_default(),
            remaining: self.round.as_ref().map(|r| r.remaining).unwrap_or(0),
            score: self.score.score,
            seconds_left: self.round.as_ref().and_then(|r| r.seconds_left),
            session_seconds_left: session_left_ms.map(|ms| ms.div_ceil(1000) as u32),
        }
    }

    pub fn start(&mut self, now_ms: u64) {
        if self.state != RoundState::Idle {
            debug!(state = ?self.state, "start ignored, engine already running");
            return;
        }
        self.now_ms = now_ms;
        self.session_epoch += 1;
        if let Some(secs) = self.variant.session_secs {
            self.timers.arm_once(
                TimerKind::Session,
                now_ms,
                u64::from(secs) * 1000,
                self.session_epoch,
            );
        }
        debug!(game = self.variant.game.as_str(), "session started");
        self.begin_round();
    }

    /// Drops the current round and starts over, optionally with a new
    /// variant (mode or difficulty switch).
    pub fn restart(&mut self, now_ms: u64, variant: Option<Variant>) {
        self.teardown();
        if let Some(variant) = variant {
            self.selector =
                TargetSelector::new(variant.catalog, variant.policy, variant.difficulty);
            self.variant = variant;
        }
        self.score = ScoreTracker::new();
        self.round_index = 0;
        self.start(now_ms);
    }

    /// Synchronously cancels every timer and silences speech. Anything that
    /// fires afterwards is a no-op.
    pub fn teardown(&mut self) {
        self.cancel_all();
        self.round = None;
        self.suspension = None;
        self.state = RoundState::Idle;
        debug!("engine torn down");
    }

    pub fn cancel_all(&mut self) {
        self.timers.cancel_all();
        self.narration.stop();
        self.epoch += 1;
        self.session_epoch += 1;
    }

    /// App went to background: behaves like teardown but keeps score and
    /// remembers how much session time was left.
    pub fn suspend(&mut self, now_ms: u64) {
        match self.state {
            RoundState::Idle | RoundState::Suspended | RoundState::Finished(_) => return,
            _ => {}
        }
        self.advance_to(now_ms);
        if matches!(self.state, RoundState::Finished(_)) {
            return;
        }
        let session_left_ms = self
            .timers
            .due_ms(TimerKind::Session)
            .map(|due| due.saturating_sub(self.now_ms));
        let was_resolved = matches!(self.state, RoundState::Resolving | RoundState::Celebrating);
        self.cancel_all();
        self.suspension = Some(Suspension {
            at_ms: self.now_ms,
            session_left_ms,
            was_resolved,
        });
        self.state = RoundState::Suspended;
        debug!(?session_left_ms, "engine suspended");
    }

    /// Back in the foreground: starts a fresh round. The session clock resumes
    /// from where it was, so the time spent away is not counted. Returns the
    /// length of the suspension.
    pub fn resume(&mut self, now_ms: u64) -> u64 {
        let Some(suspension) = self.suspension.take() else {
            return 0;
        };
        if self.state != RoundState::Suspended {
            return 0;
        }
        self.now_ms = now_ms.max(suspension.at_ms);
        let away_ms = self.now_ms - suspension.at_ms;
        if let Some(left) = suspension.session_left_ms {
            self.timers
                .arm_once(TimerKind::Session, self.now_ms, left, self.session_epoch);
        }
        if suspension.was_resolved {
            self.round_index += 1;
        }
        debug!(away_ms, "engine resumed");
        self.begin_round();
        away_ms
    }

    /// Processes everything scheduled up to `now_ms`, one callback at a time
    /// in deadline order.
    pub fn advance_to(&mut self, now_ms: u64) {
        loop {
            let timer_due = self.timers.next_due().filter(|&d| d <= now_ms);
            let revert_due = self
                .round
                .as_ref()
                .and_then(|r| r.next_revert())
                .filter(|&d| d <= now_ms);

            match (timer_due, revert_due) {
                (None, None) => break,
                (Some(t), Some(r)) if r < t => self.apply_reverts(r),
                (None, Some(r)) => self.apply_reverts(r),
                (Some(t), _) => {
                    let Some(fired) = self.timers.pop_due(t) else {
                        break;
                    };
                    self.now_ms = self.now_ms.max(fired.due_ms);
                    self.on_timer(fired);
                }
            }
        }
        self.now_ms = self.now_ms.max(now_ms);
    }

    pub fn on_pop(&mut self, id: ItemId) -> PopOutcome {
        if self.state != RoundState::Active {
            return PopOutcome::Ignored;
        }
        let now = self.now_ms;
        let wrong_pop = self.variant.wrong_pop;
        let Some(round) = self.round.as_mut() else {
            return PopOutcome::Ignored;
        };
        let Some(item) = round.items.iter_mut().find(|it| it.id == id) else {
            debug!(id, "pop for unknown item");
            return PopOutcome::Ignored;
        };
        if item.popped {
            return PopOutcome::AlreadyPopped;
        }
        item.popped = true;
        let payload = item.payload;
        let target = round.target;

        if target.matches(&payload) {
            round.remaining = round.remaining.saturating_sub(1);
            round.found += 1;
            let remaining = round.remaining;
            self.score.record_hit(self.variant.scoring.hit_points);
            self.play(Cue::Pop);
            if remaining == 0 {
                self.resolve();
                return PopOutcome::Completed;
            }
            if let Some(window) = self.variant.timers.inactivity_ms {
                self.timers
                    .arm_repeating(TimerKind::InactivityWatchdog, now, window, self.epoch);
            }
            PopOutcome::Hit { remaining }
        } else {
            if let WrongPopPolicy::RevertAfter { ms } = wrong_pop {
                round.reverts.push((id, now + ms));
            }
            self.score.record_miss(self.variant.scoring.miss_penalty);
            self.play(Cue::Wrong);
            self.say(&phrases::wrong_pop(&target, &payload), Purpose::Feedback);
            PopOutcome::Miss
        }
    }

    /// An unpopped falling item left the screen; swap in a fresh one.
    pub fn on_off_screen(&mut self, id: ItemId) -> Option<ItemId> {
        if self.state != RoundState::Active {
            return None;
        }
        let field = self.variant.falling?;
        let difficulty = self.variant.difficulty;
        let round = self.round.as_mut()?;
        let index = round.items.iter().position(|it| it.id == id)?;
        if round.items[index].popped {
            return None;
        }
        let fresh = self.generator.replacement_for(
            &round.items[index],
            &round.items,
            &field,
            difficulty,
            &mut self.rng,
        );
        let fresh_id = fresh.id;
        round.items[index] = fresh;
        debug!(old = id, new = fresh_id, "replaced off-screen item");
        Some(fresh_id)
    }

    /// Host callback for the end of an utterance this engine started.
    pub fn on_narration_finished(&mut self, id: UtteranceId, outcome: NarrationOutcome) {
        let Some(ticket) = self.narration.finished(id, outcome) else {
            return;
        };
        if ticket.epoch != self.epoch {
            return;
        }
        if ticket.purpose == Purpose::Celebration
            && self.state == RoundState::Celebrating
            && matches!(
                self.variant.celebration,
                CelebrationPolicy::AfterNarration { .. }
            )
        {
            self.timers.cancel(TimerKind::Advance);
            self.next_round();
        }
    }

    fn begin_round(&mut self) {
        self.epoch += 1;
        self.state = RoundState::Selecting;

        let target = self.selector.select(&mut self.rng);
        let v = &self.variant;
        let items = match v.falling {
            Some(field) => self.generator.generate_falling(
                &target,
                v.total_slots,
                v.target_count,
                v.catalog,
                &field,
                v.difficulty,
                &mut self.rng,
            ),
            None => self.generator.generate(
                &target,
                v.total_slots,
                v.target_count,
                v.catalog,
                &mut self.rng,
            ),
        };
        let target_count = count_matching(&items, &target);

        self.round = Some(Round {
            index: self.round_index,
            epoch: self.epoch,
            target,
            items,
            remaining: target_count,
            found: 0,
            seconds_left: self.variant.timers.round_secs,
            completed: false,
            timed_out: false,
            watchdog_hints: 0,
            delayed_hint: false,
            target_count,
            progress_reported: false,
            reverts: Vec::new(),
        });
        self.score.begin_round();

        let now = self.now_ms;
        let profile = &self.variant.timers;
        if profile.round_secs.is_some() {
            self.timers
                .arm_repeating(TimerKind::RoundCountdown, now, COUNTDOWN_PERIOD_MS, self.epoch);
        }
        if let Some(window) = profile.inactivity_ms {
            self.timers
                .arm_repeating(TimerKind::InactivityWatchdog, now, window, self.epoch);
        }
        if let Some(delay) = profile.hint_delay_ms {
            self.timers
                .arm_once(TimerKind::HintDelay, now, delay, self.epoch);
        }

        debug!(
            round = self.round_index,
            %target,
            targets = target_count,
            "round selected"
        );
        self.play(Cue::RoundStart);
        let intro = phrases::round_intro(self.variant.game, &target, self.round_index);
        self.say(&intro, Purpose::RoundIntro);
        self.state = RoundState::Active;
    }

    fn next_round(&mut self) {
        self.round_index += 1;
        self.begin_round();
    }

    fn resolve(&mut self) {
        self.state = RoundState::Resolving;
        self.timers.cancel_round_timers();

        let report = match self.round.as_mut() {
            Some(round) if !round.progress_reported => {
                round.completed = true;
                round.progress_reported = true;
                round.reverts.clear();
                true
            }
            _ => false,
        };
        if report {
            let kind = self.variant.progress;
            if let Err(err) = self.progress.report_progress(kind) {
                warn!(kind = kind.as_str(), error = %err, "progress report failed");
            }
            self.score.complete_round();
        }
        debug!(round = self.round_index, score = self.score.score, "round resolved");
        self.celebrate();
    }

    fn celebrate(&mut self) {
        self.state = RoundState::Celebrating;
        self.play(Cue::Celebrate);
        let Some(target) = self.round.as_ref().map(|r| r.target) else {
            return;
        };
        let text = phrases::celebration(&target, self.round_index);
        let spoken = self.say(&text, Purpose::Celebration);

        let delay = match self.variant.celebration {
            CelebrationPolicy::FixedDelay { ms } => ms,
            CelebrationPolicy::AfterNarration { fallback_ms } if spoken.is_some() => {
                NARRATION_SAFETY_MS.max(fallback_ms)
            }
            CelebrationPolicy::AfterNarration { fallback_ms } => fallback_ms,
        };
        self.timers
            .arm_once(TimerKind::Advance, self.now_ms, delay, self.epoch);
    }

    fn on_timer(&mut self, fired: Fired) {
        let kind = fired.handle.kind();
        let live_epoch = match kind {
            TimerKind::Session => self.session_epoch,
            _ => self.epoch,
        };
        if fired.epoch != live_epoch {
            debug!(?kind, "dropping stale timer");
            return;
        }

        match kind {
            TimerKind::RoundCountdown => self.on_countdown_tick(),
            TimerKind::InactivityWatchdog => {
                if self.state == RoundState::Active {
                    if let Some(round) = self.round.as_mut() {
                        round.watchdog_hints += 1;
                    }
                    self.speak_hint();
                }
            }
            TimerKind::HintDelay => {
                let slow = self
                    .round
                    .as_ref()
                    .is_some_and(|r| r.found * 2 < r.target_count);
                if self.state == RoundState::Active && slow {
                    if let Some(round) = self.round.as_mut() {
                        round.delayed_hint = true;
                    }
                    self.speak_hint();
                }
            }
            TimerKind::Advance => {
                if self.state == RoundState::Celebrating {
                    self.next_round();
                }
            }
            TimerKind::Session => self.finish_session(),
        }
    }

    fn on_countdown_tick(&mut self) {
        if self.state != RoundState::Active {
            return;
        }
        let Some(round) = self.round.as_mut() else {
            return;
        };
        let Some(left) = round.seconds_left.as_mut() else {
            return;
        };
        *left = left.saturating_sub(1);
        let left = *left;

        if left == 0 {
            self.time_out();
        } else if self.variant.timers.countdown_cues.contains(&left) {
            self.play(Cue::CountdownTick);
            self.say(&phrases::countdown(left), Purpose::Countdown);
        }
    }

    fn time_out(&mut self) {
        if let Some(round) = self.round.as_mut() {
            round.timed_out = true;
            round.reverts.clear();
        }
        self.timers.cancel_all();
        self.narration.stop();
        self.play(Cue::TimeUp);
        self.state = RoundState::Finished(FinishReason::RoundTimedOut);
        debug!(round = self.round_index, "round timed out");
    }

    fn finish_session(&mut self) {
        self.timers.cancel_all();
        self.narration.stop();
        if let Some(round) = self.round.as_mut() {
            round.reverts.clear();
        }
        self.state = RoundState::Finished(FinishReason::SessionElapsed);
        self.play(Cue::TimeUp);
        let text = phrases::results(self.score.score, self.score.rounds_completed);
        self.say(&text, Purpose::Results);
        debug!(score = self.score.score, "session finished");
    }

    fn speak_hint(&mut self) {
        let Some((target, remaining)) = self.round.as_ref().map(|r| (r.target, r.remaining))
        else {
            return;
        };
        self.say(&phrases::hint(&target, remaining), Purpose::Hint);
    }

    fn apply_reverts(&mut self, up_to_ms: u64) {
        self.now_ms = self.now_ms.max(up_to_ms);
        let active = self.state == RoundState::Active;
        let Some(round) = self.round.as_mut() else {
            return;
        };
        let (due, pending): (Vec<_>, Vec<_>) =
            round.reverts.drain(..).partition(|&(_, at)| at <= up_to_ms);
        round.reverts = pending;
        if !active {
            return;
        }
        let target = round.target;
        for (id, _) in due {
            if let Some(item) = round.items.iter_mut().find(|it| it.id == id) {
                if !target.matches(&item.payload) {
                    item.popped = false;
                }
            }
        }
    }

    fn say(&mut self, text: &str, purpose: Purpose) -> Option<UtteranceId> {
        let setting = self.settings.audio_setting();
        let ticket = Ticket {
            purpose,
            epoch: self.epoch,
        };
        self.narration.speak(setting, text, ticket)
    }

    fn play(&mut self, cue: Cue) {
        if !self.settings.audio_setting().cues_enabled() {
            return;
        }
        if let Err(err) = self.cues.play_cue(cue) {
            warn!(%cue, error = %err, "cue playback failed");
        }
    }
}
