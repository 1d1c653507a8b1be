//! Deadline-based timers driven by the host's millisecond clock.
//!
//! Each kind has at most one live handle. Arming a kind replaces whatever was
//! there; cancelled handles are simply forgotten, so a stale fire can never be
//! produced for them. Every armed timer also carries the epoch of the round
//! that armed it, and the engine drops any fire whose epoch is no longer live.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    RoundCountdown,
    InactivityWatchdog,
    HintDelay,
    /// Celebration delay before the next round starts.
    Advance,
    /// Outer clock for fixed-duration sessions.
    Session,
}

const ALL_KINDS: [TimerKind; 5] = [
    TimerKind::RoundCountdown,
    TimerKind::InactivityWatchdog,
    TimerKind::HintDelay,
    TimerKind::Advance,
    TimerKind::Session,
];

const ROUND_KINDS: [TimerKind; 3] = [
    TimerKind::RoundCountdown,
    TimerKind::InactivityWatchdog,
    TimerKind::HintDelay,
];

impl TimerKind {
    fn slot(self) -> usize {
        match self {
            TimerKind::RoundCountdown => 0,
            TimerKind::InactivityWatchdog => 1,
            TimerKind::HintDelay => 2,
            TimerKind::Advance => 3,
            TimerKind::Session => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    kind: TimerKind,
    serial: u64,
}

impl TimerHandle {
    pub fn kind(&self) -> TimerKind {
        self.kind
    }
}

#[derive(Clone, Copy, Debug)]
struct Armed {
    handle: TimerHandle,
    due_ms: u64,
    period_ms: Option<u64>,
    epoch: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fired {
    pub handle: TimerHandle,
    pub due_ms: u64,
    pub epoch: u64,
}

#[derive(Debug, Default)]
pub struct TimerCoordinator {
    slots: [Option<Armed>; 5],
    next_serial: u64,
}

impl TimerCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm_once(&mut self, kind: TimerKind, now_ms: u64, delay_ms: u64, epoch: u64) -> TimerHandle {
        self.arm(kind, now_ms + delay_ms, None, epoch)
    }

    pub fn arm_repeating(
        &mut self,
        kind: TimerKind,
        now_ms: u64,
        period_ms: u64,
        epoch: u64,
    ) -> TimerHandle {
        let period_ms = period_ms.max(1);
        self.arm(kind, now_ms + period_ms, Some(period_ms), epoch)
    }

    fn arm(&mut self, kind: TimerKind, due_ms: u64, period_ms: Option<u64>, epoch: u64) -> TimerHandle {
        self.next_serial += 1;
        let handle = TimerHandle {
            kind,
            serial: self.next_serial,
        };
        // Overwriting the slot is the cancel of any previous handle of this kind.
        self.slots[kind.slot()] = Some(Armed {
            handle,
            due_ms,
            period_ms,
            epoch,
        });
        handle
    }

    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.slots[kind.slot()].take().is_some()
    }

    pub fn cancel_round_timers(&mut self) {
        for kind in ROUND_KINDS {
            self.cancel(kind);
        }
    }

    pub fn cancel_all(&mut self) {
        for kind in ALL_KINDS {
            self.cancel(kind);
        }
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.slots[kind.slot()].is_some()
    }

    pub fn is_live(&self, handle: TimerHandle) -> bool {
        self.slots[handle.kind.slot()].is_some_and(|a| a.handle == handle)
    }

    pub fn due_ms(&self, kind: TimerKind) -> Option<u64> {
        self.slots[kind.slot()].map(|a| a.due_ms)
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn next_due(&self) -> Option<u64> {
        self.slots.iter().flatten().map(|a| a.due_ms).min()
    }

    /// Removes and returns the earliest timer due at or before `now_ms`.
    /// Repeating timers are rescheduled one period after their due time.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<Fired> {
        let slot = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|a| (i, a)))
            .filter(|(_, a)| a.due_ms <= now_ms)
            .min_by_key(|(i, a)| (a.due_ms, *i))
            .map(|(i, _)| i)?;

        let armed = self.slots[slot].take()?;
        if let Some(period) = armed.period_ms {
            self.slots[slot] = Some(Armed {
                due_ms: armed.due_ms + period,
                ..armed
            });
        }
        Some(Fired {
            handle: armed.handle,
            due_ms: armed.due_ms,
            epoch: armed.epoch,
        })
    }
}
