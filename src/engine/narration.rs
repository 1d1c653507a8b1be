//! Single-slot speech arbitration.
//!
//! Only one utterance is ever active. A new request stops the current one
//! first; there is no queue. Completion is reported back by id, and only the
//! id occupying the slot is honoured, so late callbacks from interrupted or
//! torn-down utterances fall through as no-ops.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::host::{AudioSetting, SpeechEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "utt-{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoiceOptions {
    pub rate: f32,
    pub pitch: f32,
    pub language: Option<String>,
}

impl Default for VoiceOptions {
    fn default() -> Self {
        Self {
            rate: 0.9,
            pitch: 1.1,
            language: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NarrationRequest {
    pub text: String,
    pub voice: VoiceOptions,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NarrationOutcome {
    Done,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Purpose {
    RoundIntro,
    Hint,
    Countdown,
    Feedback,
    Celebration,
    Results,
}

/// What the engine gets back when an utterance it started completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket {
    pub purpose: Purpose,
    pub epoch: u64,
}

#[derive(Clone, Copy, Debug)]
struct Active {
    id: UtteranceId,
    ticket: Ticket,
}

pub struct NarrationGate {
    speech: Box<dyn SpeechEngine>,
    voice: VoiceOptions,
    active: Option<Active>,
    next_id: u64,
    interruptions: u32,
}

impl NarrationGate {
    pub fn new(speech: Box<dyn SpeechEngine>, voice: VoiceOptions) -> Self {
        Self {
            speech,
            voice,
            active: None,
            next_id: 0,
            interruptions: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_id(&self) -> Option<UtteranceId> {
        self.active.map(|a| a.id)
    }

    pub fn interruptions(&self) -> u32 {
        self.interruptions
    }

    /// Starts speaking `text`, replacing anything in flight. Returns `None`
    /// when speech is disabled or the engine refused the request.
    pub fn speak(&mut self, setting: AudioSetting, text: &str, ticket: Ticket) -> Option<UtteranceId> {
        if !setting.speech_enabled() {
            debug!(?setting, text, "narration dropped by audio setting");
            return None;
        }
        if self.active.is_some() {
            self.interruptions += 1;
            self.stop();
        }

        self.next_id += 1;
        let id = UtteranceId(self.next_id);
        let request = NarrationRequest {
            text: text.to_string(),
            voice: self.voice.clone(),
        };
        match self.speech.speak(id, &request) {
            Ok(()) => {
                self.active = Some(Active { id, ticket });
                Some(id)
            }
            Err(err) => {
                warn!(%id, error = %err, "speech failed, continuing without narration");
                None
            }
        }
    }

    pub fn stop(&mut self) {
        if self.active.take().is_some() {
            if let Err(err) = self.speech.stop() {
                warn!(error = %err, "speech stop failed");
            }
        }
    }

    /// Clears the slot if `id` is the active utterance and hands back its
    /// ticket. Anything else is stale.
    pub fn finished(&mut self, id: UtteranceId, outcome: NarrationOutcome) -> Option<Ticket> {
        match self.active {
            Some(active) if active.id == id => {
                self.active = None;
                debug!(%id, ?outcome, "narration finished");
                Some(active.ticket)
            }
            _ => {
                debug!(%id, ?outcome, "ignoring stale narration completion");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::recording::{Recorder, SpeechCall};

    fn ticket(purpose: Purpose) -> Ticket {
        Ticket { purpose, epoch: 1 }
    }

    #[test]
    fn test_new_speak_stops_in_flight_utterance() {
        let recorder = Recorder::new();
        let mut gate = NarrationGate::new(Box::new(recorder.speech()), VoiceOptions::default());
        let first = gate
            .speak(AudioSetting::Full, "first", ticket(Purpose::RoundIntro))
            .unwrap();
        let second = gate
            .speak(AudioSetting::Full, "second", ticket(Purpose::Hint))
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(gate.active_id(), Some(second));
        assert_eq!(gate.interruptions(), 1);
        assert_eq!(
            recorder.speech_calls(),
            vec![
                SpeechCall::Speak(first, "first".to_string()),
                SpeechCall::Stop,
                SpeechCall::Speak(second, "second".to_string()),
            ]
        );
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let recorder = Recorder::new();
        let mut gate = NarrationGate::new(Box::new(recorder.speech()), VoiceOptions::default());
        let first = gate
            .speak(AudioSetting::Full, "first", ticket(Purpose::RoundIntro))
            .unwrap();
        let second = gate
            .speak(AudioSetting::Full, "second", ticket(Purpose::Celebration))
            .unwrap();
        assert!(gate.finished(first, NarrationOutcome::Stopped).is_none());
        assert!(gate.is_active());
        let done = gate.finished(second, NarrationOutcome::Done).unwrap();
        assert_eq!(done.purpose, Purpose::Celebration);
        assert!(!gate.is_active());
        assert!(gate.finished(second, NarrationOutcome::Done).is_none());
    }

    #[test]
    fn test_disabled_speech_is_dropped_silently() {
        let recorder = Recorder::new();
        let mut gate = NarrationGate::new(Box::new(recorder.speech()), VoiceOptions::default());
        for setting in [AudioSetting::NoSpeech, AudioSetting::Mute] {
            assert!(gate.speak(setting, "hello", ticket(Purpose::Hint)).is_none());
        }
        assert!(recorder.speech_calls().is_empty());
        assert!(!gate.is_active());
    }

    #[test]
    fn test_failing_engine_leaves_slot_empty() {
        let recorder = Recorder::new();
        recorder.fail_speech(true);
        let mut gate = NarrationGate::new(Box::new(recorder.speech()), VoiceOptions::default());
        assert!(
            gate.speak(AudioSetting::Full, "hello", ticket(Purpose::Hint))
                .is_none()
        );
        assert!(!gate.is_active());
    }

    #[test]
    fn test_stop_after_completion_does_not_call_engine() {
        let recorder = Recorder::new();
        let mut gate = NarrationGate::new(Box::new(recorder.speech()), VoiceOptions::default());
        let id = gate
            .speak(AudioSetting::Full, "hi", ticket(Purpose::Feedback))
            .unwrap();
        gate.finished(id, NarrationOutcome::Done);
        gate.stop();
        assert_eq!(recorder.speech_calls().len(), 1);
    }
}
