//! Interfaces the round engine consumes from its host: cue playback, speech,
//! progress reporting and the audio-settings switch.

pub mod console;
pub mod recording;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::engine::narration::{NarrationRequest, UtteranceId};
use crate::error::CollaboratorError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AudioSetting {
    #[default]
    Full,
    NoSpeech,
    NoSound,
    Mute,
}

impl AudioSetting {
    pub fn speech_enabled(self) -> bool {
        matches!(self, AudioSetting::Full | AudioSetting::NoSound)
    }

    pub fn cues_enabled(self) -> bool {
        matches!(self, AudioSetting::Full | AudioSetting::NoSpeech)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "full" => Some(AudioSetting::Full),
            "noSpeech" | "no-speech" => Some(AudioSetting::NoSpeech),
            "noSound" | "no-sound" => Some(AudioSetting::NoSound),
            "mute" => Some(AudioSetting::Mute),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressKind {
    Shape,
    Color,
    Letter,
    MathProblem,
}

impl ProgressKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressKind::Shape => "shape",
            ProgressKind::Color => "color",
            ProgressKind::Letter => "letter",
            ProgressKind::MathProblem => "mathProblem",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    RoundStart,
    Pop,
    Wrong,
    Celebrate,
    CountdownTick,
    TimeUp,
}

impl Cue {
    pub fn name(self) -> &'static str {
        match self {
            Cue::RoundStart => "round-start",
            Cue::Pop => "pop",
            Cue::Wrong => "wrong",
            Cue::Celebrate => "celebrate",
            Cue::CountdownTick => "countdown-tick",
            Cue::TimeUp => "time-up",
        }
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub trait CuePlayer {
    fn play_cue(&mut self, cue: Cue) -> Result<(), CollaboratorError>;
}

/// Text-to-speech backend. The host reports completion or interruption back
/// through `RoundEngine::on_narration_finished` using the same id.
pub trait SpeechEngine {
    fn speak(&mut self, id: UtteranceId, request: &NarrationRequest)
    -> Result<(), CollaboratorError>;
    fn stop(&mut self) -> Result<(), CollaboratorError>;
}

pub trait ProgressReporter {
    fn report_progress(&mut self, kind: ProgressKind) -> Result<(), CollaboratorError>;
}

/// Lets the host keep a handle on a reporter it also hands to the engine.
impl<P: ProgressReporter> ProgressReporter for Rc<RefCell<P>> {
    fn report_progress(&mut self, kind: ProgressKind) -> Result<(), CollaboratorError> {
        self.borrow_mut().report_progress(kind)
    }
}

pub trait AudioSettings {
    fn audio_setting(&self) -> AudioSetting;
}

impl AudioSettings for AudioSetting {
    fn audio_setting(&self) -> AudioSetting {
        *self
    }
}

/// Audio setting the host can flip while the engine holds a clone.
#[derive(Clone, Debug, Default)]
pub struct SharedAudioSetting(Rc<Cell<AudioSetting>>);

impl SharedAudioSetting {
    pub fn new(setting: AudioSetting) -> Self {
        Self(Rc::new(Cell::new(setting)))
    }

    pub fn set(&self, setting: AudioSetting) {
        self.0.set(setting);
    }
}

impl AudioSettings for SharedAudioSetting {
    fn audio_setting(&self) -> AudioSetting {
        self.0.get()
    }
}

pub struct Collaborators {
    pub cues: Box<dyn CuePlayer>,
    pub speech: Box<dyn SpeechEngine>,
    pub progress: Box<dyn ProgressReporter>,
    pub settings: Box<dyn AudioSettings>,
}
