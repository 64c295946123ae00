//! Calculator core.
//!
//! This module provides functionality to:
//! - Evaluate keypad expressions with standard operator precedence
//! - Format results for display
//! - Drive an expression through keypad events
//! - Copy results to the clipboard

mod clipboard;
mod detection;
mod evaluation;
mod format;
mod state;

pub use clipboard::{ClipboardError, copy_to_clipboard};
pub use detection::{
    OPERATOR_CHARS, canonicalize, ends_with_operator, is_operator_char, looks_like_expression,
    strip_trailing_junk, trailing_number,
};
pub use evaluation::{
    CalcResult, EvalError, Operator, Token, evaluate_expression, tokenize, try_evaluate,
};
pub use format::{ERROR_TEXT, format_grouped, format_result};
pub use state::{CalculatorState, DEFAULT_SPEAK_PREFIX, Key, Mode, Snapshot};
