//! Speech capabilities behind injectable traits.
//!
//! Text-to-speech and speech-to-text are platform concerns; the chat manager
//! only sees these traits, each with an "unavailable" answer so missing
//! support surfaces as a user notice instead of an error.

use std::process::{Child, Command, Stdio};

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("speech capability unavailable")]
    Unavailable,
    #[error("speech failed: {0}")]
    Failed(String),
}

/// Text-to-speech output. A singleton resource: starting an utterance must
/// cancel any prior one first (callers enforce this).
pub trait SpeechSynth {
    fn is_available(&self) -> bool;

    /// Start speaking; returns once playback has begun.
    fn speak(&mut self, text: &str, lang_tag: &str) -> Result<(), SpeechError>;

    /// Stop any current output. No-op when idle.
    fn cancel(&mut self);

    /// True exactly once when the current utterance has ended naturally.
    fn poll_finished(&mut self) -> bool {
        false
    }
}

/// Events from a speech-to-text session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerEvent {
    /// A final transcript.
    Transcript(String),
    /// The session ended.
    End,
    Error(String),
}

/// Speech-to-text input for a fixed locale.
pub trait SpeechRecognizer {
    fn is_available(&self) -> bool;
    fn start(&mut self, locale: &str) -> Result<(), SpeechError>;
    fn poll(&mut self) -> Option<RecognizerEvent>;
}

/// Synth that reports unavailable; used where no TTS backend exists.
#[derive(Debug, Default)]
pub struct NullSpeech;

impl SpeechSynth for NullSpeech {
    fn is_available(&self) -> bool {
        false
    }

    fn speak(&mut self, _text: &str, _lang_tag: &str) -> Result<(), SpeechError> {
        Err(SpeechError::Unavailable)
    }

    fn cancel(&mut self) {}
}

/// Recognizer that reports unavailable; the terminal front end has no mic.
#[derive(Debug, Default)]
pub struct NullRecognizer;

impl SpeechRecognizer for NullRecognizer {
    fn is_available(&self) -> bool {
        false
    }

    fn start(&mut self, _locale: &str) -> Result<(), SpeechError> {
        Err(SpeechError::Unavailable)
    }

    fn poll(&mut self) -> Option<RecognizerEvent> {
        None
    }
}

/// Candidate TTS programs, in preference order.
const TTS_PROGRAMS: [&str; 3] = ["espeak-ng", "espeak", "say"];

/// Best-effort TTS that shells out to a local speech program.
pub struct ProcessSpeech {
    program: Option<String>,
    child: Option<Child>,
}

impl ProcessSpeech {
    /// Pick the first known speech program found on PATH.
    pub fn detect() -> Self {
        let program = TTS_PROGRAMS
            .iter()
            .find(|name| find_on_path(name))
            .map(|s| s.to_string());
        if let Some(ref p) = program {
            log::debug!("speech output via {}", p);
        }
        Self {
            program,
            child: None,
        }
    }

    /// Map a BCP 47 tag to an espeak voice name.
    fn voice(lang_tag: &str) -> &'static str {
        if lang_tag.starts_with("en") {
            "en"
        } else {
            "hi"
        }
    }
}

fn find_on_path(name: &str) -> bool {
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| dir.join(name).is_file())
}

impl SpeechSynth for ProcessSpeech {
    fn is_available(&self) -> bool {
        self.program.is_some()
    }

    fn speak(&mut self, text: &str, lang_tag: &str) -> Result<(), SpeechError> {
        let program = self.program.as_deref().ok_or(SpeechError::Unavailable)?;
        let mut cmd = Command::new(program);
        if program.starts_with("espeak") {
            cmd.arg("-v").arg(Self::voice(lang_tag));
        }
        let child = cmd
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SpeechError::Failed(e.to_string()))?;
        self.child = Some(child);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn poll_finished(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(Some(_)) => {
                self.child = None;
                true
            }
            Ok(None) => false,
            Err(e) => {
                log::warn!("speech process poll failed: {}", e);
                self.child = None;
                true
            }
        }
    }
}

impl Drop for ProcessSpeech {
    fn drop(&mut self) {
        self.cancel();
    }
}
