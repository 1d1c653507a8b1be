//! In-memory collaborators that record every call, with switches to make
//! each one fail. Used by unit and integration tests to observe what the
//! engine asked for.

use std::cell::RefCell;
use std::rc::Rc;

use crate::engine::narration::{NarrationRequest, UtteranceId};
use crate::error::CollaboratorError;
use crate::host::{
    AudioSettings, Collaborators, Cue, CuePlayer, ProgressKind, ProgressReporter, SpeechEngine,
};

#[derive(Clone, Debug, PartialEq)]
pub enum SpeechCall {
    Speak(UtteranceId, String),
    Stop,
}

#[derive(Debug, Default)]
struct Log {
    speech: Vec<SpeechCall>,
    cues: Vec<Cue>,
    progress: Vec<ProgressKind>,
    fail_speech: bool,
    fail_cues: bool,
    fail_progress: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Recorder(Rc<RefCell<Log>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn speech(&self) -> RecordingSpeech {
        RecordingSpeech(self.clone())
    }

    pub fn cues(&self) -> RecordingCues {
        RecordingCues(self.clone())
    }

    pub fn progress(&self) -> RecordingProgress {
        RecordingProgress(self.clone())
    }

    pub fn collaborators(&self, settings: impl AudioSettings + 'static) -> Collaborators {
        Collaborators {
            cues: Box::new(self.cues()),
            speech: Box::new(self.speech()),
            progress: Box::new(self.progress()),
            settings: Box::new(settings),
        }
    }

    pub fn speech_calls(&self) -> Vec<SpeechCall> {
        self.0.borrow().speech.clone()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.0
            .borrow()
            .speech
            .iter()
            .filter_map(|c| match c {
                SpeechCall::Speak(_, text) => Some(text.clone()),
                SpeechCall::Stop => None,
            })
            .collect()
    }

    pub fn last_utterance(&self) -> Option<UtteranceId> {
        self.0.borrow().speech.iter().rev().find_map(|c| match c {
            SpeechCall::Speak(id, _) => Some(*id),
            SpeechCall::Stop => None,
        })
    }

    pub fn cues_played(&self) -> Vec<Cue> {
        self.0.borrow().cues.clone()
    }

    pub fn progress_reports(&self) -> Vec<ProgressKind> {
        self.0.borrow().progress.clone()
    }

    pub fn fail_speech(&self, fail: bool) {
        self.0.borrow_mut().fail_speech = fail;
    }

    pub fn fail_cues(&self, fail: bool) {
        self.0.borrow_mut().fail_cues = fail;
    }

    pub fn fail_progress(&self, fail: bool) {
        self.0.borrow_mut().fail_progress = fail;
    }
}

pub struct RecordingSpeech(Recorder);

impl SpeechEngine for RecordingSpeech {
    fn speak(
        &mut self,
        id: UtteranceId,
        request: &NarrationRequest,
    ) -> Result<(), CollaboratorError> {
        let mut log = (self.0).0.borrow_mut();
        if log.fail_speech {
            return Err(CollaboratorError::Speech("no voice available".to_string()));
        }
        log.speech.push(SpeechCall::Speak(id, request.text.clone()));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CollaboratorError> {
        (self.0).0.borrow_mut().speech.push(SpeechCall::Stop);
        Ok(())
    }
}

pub struct RecordingCues(Recorder);

impl CuePlayer for RecordingCues {
    fn play_cue(&mut self, cue: Cue) -> Result<(), CollaboratorError> {
        let mut log = (self.0).0.borrow_mut();
        if log.fail_cues {
            return Err(CollaboratorError::Cue {
                cue: cue.name().to_string(),
                reason: "device busy".to_string(),
            });
        }
        log.cues.push(cue);
        Ok(())
    }
}

pub struct RecordingProgress(Recorder);

impl ProgressReporter for RecordingProgress {
    fn report_progress(&mut self, kind: ProgressKind) -> Result<(), CollaboratorError> {
        let mut log = (self.0).0.borrow_mut();
        // The call is counted even when it fails: one attempt per round.
        log.progress.push(kind);
        if log.fail_progress {
            return Err(CollaboratorError::Progress("disk full".to_string()));
        }
        Ok(())
    }
}
