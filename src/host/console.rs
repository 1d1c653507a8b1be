//! Terminal host for the headless simulation. Cues and utterances are printed
//! against a shared virtual clock; the narrator "finishes" speaking after a
//! duration estimated from the text length.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::engine::narration::{NarrationRequest, UtteranceId};
use crate::error::CollaboratorError;
use crate::host::{AudioSettings, Collaborators, Cue, CuePlayer, ProgressReporter, SpeechEngine};

const MIN_UTTERANCE_MS: u64 = 600;
const MS_PER_CHAR: u64 = 55;

pub fn utterance_ms(text: &str) -> u64 {
    (text.chars().count() as u64 * MS_PER_CHAR).max(MIN_UTTERANCE_MS)
}

#[derive(Clone, Debug, Default)]
pub struct VirtualClock(Rc<Cell<u64>>);

impl VirtualClock {
    pub fn now(&self) -> u64 {
        self.0.get()
    }

    pub fn set(&self, now_ms: u64) {
        self.0.set(now_ms);
    }
}

#[derive(Debug, Default)]
struct Channel {
    speaking: Option<(UtteranceId, u64)>,
    interrupted: Vec<UtteranceId>,
    spoken: u32,
}

/// Utterance bookkeeping shared between the narrator and the loop that
/// reports completions back to the engine.
#[derive(Clone, Debug, Default)]
pub struct SpeechChannel(Rc<RefCell<Channel>>);

impl SpeechChannel {
    pub fn take_interrupted(&self) -> Vec<UtteranceId> {
        std::mem::take(&mut self.0.borrow_mut().interrupted)
    }

    /// The current utterance, if it has run its course by `now_ms`.
    pub fn take_finished(&self, now_ms: u64) -> Option<UtteranceId> {
        let mut channel = self.0.borrow_mut();
        match channel.speaking {
            Some((id, done_at)) if done_at <= now_ms => {
                channel.speaking = None;
                Some(id)
            }
            _ => None,
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.0.borrow().speaking.is_some()
    }

    pub fn spoken(&self) -> u32 {
        self.0.borrow().spoken
    }

    pub fn interruptions(&self) -> usize {
        self.0.borrow().interrupted.len()
    }
}

fn stamp(now_ms: u64) -> String {
    format!("[{:>4}.{}s]", now_ms / 1000, (now_ms % 1000) / 100)
}

pub struct ConsoleSpeech {
    clock: VirtualClock,
    channel: SpeechChannel,
    echo: bool,
}

impl SpeechEngine for ConsoleSpeech {
    fn speak(
        &mut self,
        id: UtteranceId,
        request: &NarrationRequest,
    ) -> Result<(), CollaboratorError> {
        let now = self.clock.now();
        let mut channel = self.channel.0.borrow_mut();
        if let Some((previous, _)) = channel.speaking.take() {
            channel.interrupted.push(previous);
        }
        channel.speaking = Some((id, now + utterance_ms(&request.text)));
        channel.spoken += 1;
        if self.echo {
            println!("{} says: \"{}\"", stamp(now), request.text);
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CollaboratorError> {
        let mut channel = self.channel.0.borrow_mut();
        if let Some((id, _)) = channel.speaking.take() {
            channel.interrupted.push(id);
        }
        Ok(())
    }
}

pub struct ConsoleCues {
    clock: VirtualClock,
    echo: bool,
}

impl CuePlayer for ConsoleCues {
    fn play_cue(&mut self, cue: Cue) -> Result<(), CollaboratorError> {
        if self.echo {
            println!("{} ({cue})", stamp(self.clock.now()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConsoleHost {
    pub clock: VirtualClock,
    pub channel: SpeechChannel,
    pub echo: bool,
}

impl ConsoleHost {
    pub fn new(echo: bool) -> Self {
        Self {
            echo,
            ..Self::default()
        }
    }

    pub fn collaborators(
        &self,
        progress: Box<dyn ProgressReporter>,
        settings: Box<dyn AudioSettings>,
    ) -> Collaborators {
        Collaborators {
            cues: Box::new(ConsoleCues {
                clock: self.clock.clone(),
                echo: self.echo,
            }),
            speech: Box::new(ConsoleSpeech {
                clock: self.clock.clone(),
                channel: self.channel.clone(),
                echo: self.echo,
            }),
            progress,
            settings,
        }
    }
}
