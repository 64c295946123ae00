//! Contracts with the speech recognizer and speech output engines.

use thiserror::Error;
use tracing::debug;

/// Why a recognition attempt produced no transcript.
///
/// The display text of each variant is shown to the user as-is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RecognitionError {
    #[error("Audio error")]
    Audio,
    #[error("Client error")]
    Client,
    #[error("Network error")]
    Network,
    #[error("No match found")]
    NoMatch,
    #[error("Server error")]
    Server,
    #[error("Recognition failed")]
    Unknown,
}

impl RecognitionError {
    /// Map an Android `RecognizerIntent` result code.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::NoMatch,
            2 => Self::Client,
            3 => Self::Server,
            4 => Self::Network,
            5 => Self::Audio,
            _ => Self::Unknown,
        }
    }
}

/// Voice input cannot be started on this device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum VoiceUnavailable {
    #[error("Mic permission needed")]
    PermissionDenied,
    #[error("Speech recognizer not found")]
    RecognizerMissing,
}

/// A text-to-speech engine. Speaking is fire-and-forget.
pub trait SpeechOutput {
    fn speak(&self, text: &str);
}

/// Speech output that only logs what would have been said.
pub struct SilentSpeech;

impl SpeechOutput for SilentSpeech {
    fn speak(&self, text: &str) {
        debug!(text, "speech output disabled");
    }
}

/// Phrases shown as hints when listening starts.
pub const EXAMPLE_PHRASES: [&str; 9] = [
    "25 multiplied by 45",
    "100 divided by 4",
    "12 plus 48",
    "90 minus 15",
    "22 into 25",
    "10 over 2",
    "30 times 5",
    "add 5 to 10",
    "subtract 20 from 50",
];

/// Listening prompt with an example picked by `seed`.
pub fn prompt(seed: usize) -> String {
    let example = EXAMPLE_PHRASES[seed % EXAMPLE_PHRASES.len()];
    format!("Speak now\nEg: \"{example}\"")
}

/// The sentence spoken after a voice calculation.
pub fn spoken_result(prefix: &str, display: &str) -> String {
    if prefix.is_empty() {
        display.to_string()
    } else {
        format!("{prefix} {display}")
    }
}
