//! Keypad input state machine.
//!
//! Holds the expression being typed plus the text on the display, and
//! mutates them only through the transition methods below. Renderers
//! observe changes through [`CalculatorState::subscribe`].

use flume::{Receiver, Sender};
use tracing::{debug, info};

use super::detection::{ends_with_operator, trailing_number};
use super::evaluation::{Operator, evaluate_expression};
use super::format::format_result;
use crate::history::{HistoryEntry, HistoryRecorder, now_millis};
use crate::voice::{PhraseTable, RecognitionError, SpeechOutput, VoiceUnavailable, spoken_result};

/// Display text when nothing has been typed.
const EMPTY_DISPLAY: &str = "0";

/// Default prefix for the spoken result of a voice calculation.
pub const DEFAULT_SPEAK_PREFIX: &str = "The result is";

/// Whether the display holds a live evaluation or a finished result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Expression is being built.
    #[default]
    Entering,
    /// The last action was an evaluate; the display holds its result.
    ResultShown,
}

/// A single keypad event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Digit(char),
    Decimal,
    Operator(Operator),
    Equals,
    Backspace,
    Clear,
}

impl Key {
    /// Map a typed character to a key.
    ///
    /// Accepts the operator glyphs and their ASCII spellings, `=` (or a
    /// newline) to evaluate, `<` or DEL/BS for backspace and `c` to clear.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0'..='9' => Some(Self::Digit(c)),
            '.' => Some(Self::Decimal),
            '*' => Some(Self::Operator(Operator::Multiply)),
            '/' => Some(Self::Operator(Operator::Divide)),
            '−' => Some(Self::Operator(Operator::Subtract)),
            '=' | '\n' => Some(Self::Equals),
            '<' | '\u{8}' | '\u{7f}' => Some(Self::Backspace),
            'c' | 'C' => Some(Self::Clear),
            other => Operator::from_char(other).map(Self::Operator),
        }
    }
}

/// Copy of the observable state, sent to subscribers after every transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub expression: String,
    pub display: String,
    pub mode: Mode,
}

/// The calculator's input state.
pub struct CalculatorState {
    expression: String,
    display: String,
    mode: Mode,
    history: Option<HistoryRecorder>,
    phrases: PhraseTable,
    speak_prefix: String,
    clock: fn() -> i64,
    subscribers: Vec<Sender<Snapshot>>,
}

impl Default for CalculatorState {
    fn default() -> Self {
        Self::new()
    }
}

impl CalculatorState {
    pub fn new() -> Self {
        Self {
            expression: String::new(),
            display: EMPTY_DISPLAY.to_string(),
            mode: Mode::Entering,
            history: None,
            phrases: PhraseTable::default(),
            speak_prefix: DEFAULT_SPEAK_PREFIX.to_string(),
            clock: now_millis,
            subscribers: Vec::new(),
        }
    }

    /// Record every evaluation through `recorder`.
    pub fn with_history(mut self, recorder: HistoryRecorder) -> Self {
        self.history = Some(recorder);
        self
    }

    /// Use a custom phrase table for voice input.
    pub fn with_phrases(mut self, phrases: PhraseTable) -> Self {
        self.phrases = phrases;
        self
    }

    /// Set the text spoken before a voice result.
    pub fn with_speak_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.speak_prefix = prefix.into();
        self
    }

    /// Override the source of history timestamps (epoch milliseconds).
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            expression: self.expression.clone(),
            display: self.display.clone(),
            mode: self.mode,
        }
    }

    /// Receive a [`Snapshot`] after every transition.
    pub fn subscribe(&mut self) -> Receiver<Snapshot> {
        let (tx, rx) = flume::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Dispatch a keypad event.
    pub fn press(&mut self, key: Key) {
        match key {
            Key::Digit(digit) => self.input_digit(digit),
            Key::Decimal => self.input_decimal(),
            Key::Operator(op) => self.input_operator(op),
            Key::Equals => {
                self.evaluate();
            }
            Key::Backspace => self.backspace(),
            Key::Clear => self.clear(),
        }
    }

    pub fn input_digit(&mut self, digit: char) {
        if self.mode == Mode::ResultShown {
            self.expression.clear();
            self.mode = Mode::Entering;
        }
        self.expression.push(digit);
        self.refresh_display();
    }

    /// Append a decimal point unless the number being typed already has one.
    ///
    /// A point with no digits before it is written as `0.`.
    pub fn input_decimal(&mut self) {
        if self.mode == Mode::ResultShown {
            self.expression.clear();
            self.mode = Mode::Entering;
        }

        let current = trailing_number(&self.expression);
        if current.contains('.') {
            debug!(expression = %self.expression, "number already has a decimal point");
            return;
        }

        if current.is_empty() {
            self.expression.push('0');
        }
        self.expression.push('.');
        self.refresh_display();
    }

    /// Append an operator, replacing a dangling one.
    ///
    /// After a result, the result becomes the left operand.
    pub fn input_operator(&mut self, op: Operator) {
        if self.mode == Mode::ResultShown {
            let last_result = self
                .expression
                .rsplit('=')
                .next()
                .unwrap_or(EMPTY_DISPLAY)
                .to_string();
            self.expression = last_result;
            self.mode = Mode::Entering;
        }

        if ends_with_operator(&self.expression) {
            self.expression.pop();
        }
        self.expression.push(op.glyph());
        self.refresh_display();
    }

    /// Evaluate the expression and show the result.
    ///
    /// Returns the formatted result, or `None` when there is nothing to
    /// evaluate or a result is already shown.
    pub fn evaluate(&mut self) -> Option<String> {
        if self.expression.is_empty() || self.mode == Mode::ResultShown {
            return None;
        }

        let result = format_result(evaluate_expression(&self.expression));
        let calculation = format!("{}={}", self.expression, result);
        debug!(%calculation, "evaluated");

        if let Some(history) = &self.history {
            history.record(HistoryEntry::new((self.clock)(), calculation.clone()));
        }

        self.expression = calculation;
        self.display = result.clone();
        self.mode = Mode::ResultShown;
        self.publish();

        Some(result)
    }

    /// Remove the last character, or clear everything after a result.
    pub fn backspace(&mut self) {
        if self.mode == Mode::ResultShown {
            self.clear();
            return;
        }

        if self.expression.pop().is_none() {
            return;
        }

        if self.expression.is_empty() {
            self.display = EMPTY_DISPLAY.to_string();
            self.publish();
        } else {
            self.refresh_display();
        }
    }

    pub fn clear(&mut self) {
        self.expression.clear();
        self.display = EMPTY_DISPLAY.to_string();
        self.mode = Mode::Entering;
        self.publish();
    }

    /// Normalise a transcript, evaluate it and return the text to speak.
    pub fn process_voice_input(&mut self, transcript: &str) -> String {
        let normalized = self.phrases.normalize(transcript);
        info!(transcript, %normalized, "voice input");

        self.expression = normalized;
        self.mode = Mode::Entering;
        if self.evaluate().is_none() {
            self.publish();
        }

        spoken_result(&self.speak_prefix, &self.display)
    }

    /// Handle the outcome of one recognition attempt.
    ///
    /// A transcript is evaluated and its result spoken through `speech`.
    /// A failure shows its message and resets the expression.
    pub fn handle_recognition(
        &mut self,
        outcome: Result<String, RecognitionError>,
        speech: &dyn SpeechOutput,
    ) {
        match outcome {
            Ok(transcript) => {
                let spoken = self.process_voice_input(&transcript);
                speech.speak(&spoken);
            }
            Err(error) => self.show_message(&error.to_string()),
        }
    }

    /// Voice input cannot start at all (no permission, no recognizer).
    pub fn voice_unavailable(&mut self, reason: VoiceUnavailable) {
        self.show_message(&reason.to_string());
    }

    fn show_message(&mut self, message: &str) {
        self.display = message.to_string();
        self.expression.clear();
        self.mode = Mode::Entering;
        self.publish();
    }

    fn refresh_display(&mut self) {
        self.display = format_result(evaluate_expression(&self.expression));
        self.publish();
    }

    fn publish(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        self.subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{HistoryStore, MemoryHistory};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn type_keys(state: &mut CalculatorState, keys: &str) {
        for c in keys.chars() {
            state.press(Key::from_char(c).unwrap());
        }
    }

    fn fixed_clock() -> i64 {
        1_700_000_000_000
    }

    #[derive(Default)]
    struct RecordingSpeech {
        spoken: Mutex<Vec<String>>,
    }

    impl SpeechOutput for RecordingSpeech {
        fn speak(&self, text: &str) {
            self.spoken.lock().push(text.to_string());
        }
    }

    #[test]
    fn test_live_display_while_typing() {
        let mut state = CalculatorState::new();
        assert_eq!(state.display(), "0");

        type_keys(&mut state, "12+3");
        assert_eq!(state.expression(), "12+3");
        assert_eq!(state.display(), "15");
        assert_eq!(state.mode(), Mode::Entering);

        type_keys(&mut state, "*");
        assert_eq!(state.expression(), "12+3×");
        assert_eq!(state.display(), "15");
    }

    #[test]
    fn test_backspace_recomputes_display() {
        let mut state = CalculatorState::new();
        type_keys(&mut state, "12+3");
        state.backspace();
        assert_eq!(state.expression(), "12+");
        assert_eq!(state.display(), "12");

        type_keys(&mut state, "<<<");
        assert_eq!(state.expression(), "");
        assert_eq!(state.display(), "0");

        // Nothing left to remove.
        state.backspace();
        assert_eq!(state.expression(), "");
    }

    #[test]
    fn test_operator_replaces_dangling_operator() {
        let mut state = CalculatorState::new();
        type_keys(&mut state, "8+-×");
        assert_eq!(state.expression(), "8×");
    }

    #[test]
    fn test_decimal_point_rules() {
        let mut state = CalculatorState::new();
        type_keys(&mut state, ".");
        assert_eq!(state.expression(), "0.");

        type_keys(&mut state, "5.");
        assert_eq!(state.expression(), "0.5");

        type_keys(&mut state, "+.");
        assert_eq!(state.expression(), "0.5+0.");

        type_keys(&mut state, "25");
        assert_eq!(state.display(), "0.75");
    }

    #[test]
    fn test_evaluate_then_chain_from_result() {
        let mut state = CalculatorState::new();
        type_keys(&mut state, "2+3");
        assert_eq!(state.evaluate(), Some("5".to_string()));
        assert_eq!(state.expression(), "2+3=5");
        assert_eq!(state.display(), "5");
        assert_eq!(state.mode(), Mode::ResultShown);

        type_keys(&mut state, "×4");
        assert_eq!(state.expression(), "5×4");
        assert_eq!(state.mode(), Mode::Entering);
        assert_eq!(state.evaluate(), Some("20".to_string()));
    }

    #[test]
    fn test_digit_after_result_starts_fresh() {
        let mut state = CalculatorState::new();
        type_keys(&mut state, "9-1=7");
        assert_eq!(state.expression(), "7");
        assert_eq!(state.display(), "7");
        assert_eq!(state.mode(), Mode::Entering);
    }

    #[test]
    fn test_decimal_after_result_starts_fresh() {
        let mut state = CalculatorState::new();
        type_keys(&mut state, "9-1=.");
        assert_eq!(state.expression(), "0.");
    }

    #[test]
    fn test_evaluate_no_ops() {
        let mut state = CalculatorState::new();
        assert_eq!(state.evaluate(), None);

        type_keys(&mut state, "1+1=");
        assert_eq!(state.evaluate(), None);
        assert_eq!(state.expression(), "1+1=2");
    }

    #[test]
    fn test_backspace_after_result_clears() {
        let mut state = CalculatorState::new();
        type_keys(&mut state, "6÷3=<");
        assert_eq!(state.expression(), "");
        assert_eq!(state.display(), "0");
        assert_eq!(state.mode(), Mode::Entering);
    }

    #[test]
    fn test_division_by_zero_shows_error() {
        let mut state = CalculatorState::new();
        type_keys(&mut state, "10/0");
        assert_eq!(state.display(), "Error");
        assert_eq!(state.evaluate(), Some("Error".to_string()));
        assert_eq!(state.expression(), "10÷0=Error");
    }

    #[test]
    fn test_clear() {
        let mut state = CalculatorState::new();
        type_keys(&mut state, "42+1=");
        state.press(Key::Clear);
        assert_eq!(state.snapshot(), CalculatorState::new().snapshot());
    }

    #[test]
    fn test_history_records_calculations() {
        let store = Arc::new(MemoryHistory::new());
        let recorder = HistoryRecorder::spawn(store.clone()).unwrap();
        let mut state = CalculatorState::new()
            .with_history(recorder)
            .with_clock(fixed_clock);

        type_keys(&mut state, "2+3=");
        type_keys(&mut state, "×2=");
        drop(state);

        let entries = store.list_all().unwrap();
        let calculations: Vec<&str> = entries.iter().map(|e| e.calculation.as_str()).collect();
        assert_eq!(calculations, vec!["5×2=10", "2+3=5"]);
        assert!(entries.iter().all(|e| e.timestamp == fixed_clock()));
    }

    #[test]
    fn test_subscribers_receive_snapshots() {
        let mut state = CalculatorState::new();
        let rx = state.subscribe();

        type_keys(&mut state, "7=");
        let snapshots: Vec<Snapshot> = rx.try_iter().collect();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].display, "7");
        assert_eq!(snapshots[1].expression, "7=7");
        assert_eq!(snapshots[1].mode, Mode::ResultShown);

        drop(rx);
        state.clear();
        assert!(state.subscribers.is_empty());
    }

    #[test]
    fn test_voice_input_evaluates_and_speaks() {
        let mut state = CalculatorState::new();
        let speech = RecordingSpeech::default();

        state.handle_recognition(Ok("12 plus 48".to_string()), &speech);
        assert_eq!(state.expression(), "12+48=60");
        assert_eq!(state.display(), "60");
        assert_eq!(state.mode(), Mode::ResultShown);
        assert_eq!(*speech.spoken.lock(), vec!["The result is 60".to_string()]);
    }

    #[test]
    fn test_voice_input_after_result() {
        let mut state = CalculatorState::new().with_speak_prefix("Answer:");
        type_keys(&mut state, "1+1=");

        let spoken = state.process_voice_input("six times seven");
        assert_eq!(spoken, "Answer: 42");
        assert_eq!(state.expression(), "6×7=42");
    }

    #[test]
    fn test_recognition_failure_shows_message() {
        let mut state = CalculatorState::new();
        let speech = RecordingSpeech::default();
        type_keys(&mut state, "3+");

        state.handle_recognition(Err(RecognitionError::NoMatch), &speech);
        assert_eq!(state.display(), "No match found");
        assert_eq!(state.expression(), "");
        assert!(speech.spoken.lock().is_empty());

        state.voice_unavailable(VoiceUnavailable::PermissionDenied);
        assert_eq!(state.display(), "Mic permission needed");
    }

    #[test]
    fn test_voice_failure_after_result_resets_mode() {
        let mut state = CalculatorState::new();
        let speech = RecordingSpeech::default();

        type_keys(&mut state, "2+3=");
        assert_eq!(state.mode(), Mode::ResultShown);
        state.handle_recognition(Err(RecognitionError::Server), &speech);
        assert_eq!(state.display(), "Server error");
        assert_eq!(state.expression(), "");
        assert_eq!(state.mode(), Mode::Entering);

        type_keys(&mut state, "4×5=");
        assert_eq!(state.mode(), Mode::ResultShown);
        state.voice_unavailable(VoiceUnavailable::RecognizerMissing);
        assert_eq!(state.display(), "Speech recognizer not found");
        assert_eq!(state.expression(), "");
        assert_eq!(state.mode(), Mode::Entering);

        // Typing continues from a fresh expression.
        type_keys(&mut state, "7");
        assert_eq!(state.expression(), "7");
        assert_eq!(state.display(), "7");
    }
}
