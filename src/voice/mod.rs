//! Voice input support.
//!
//! Speech recognition and text-to-speech engines live outside this crate.
//! A recognizer hands over a raw transcript (or a [`RecognitionError`]),
//! [`PhraseTable::normalize`] rewrites it into an expression, and the
//! result is spoken back through a [`SpeechOutput`].

mod phrases;
mod recognition;

pub use phrases::{PhraseRule, PhraseTable, normalize};
pub use recognition::{
    EXAMPLE_PHRASES, RecognitionError, SilentSpeech, SpeechOutput, VoiceUnavailable, prompt,
    spoken_result,
};
