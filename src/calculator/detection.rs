//! Character-level inspection of calculator expressions.
//!
//! Shared by the evaluator (trailing junk, glyph canonicalisation) and the
//! input state machine (dangling operators, the numeric run being typed).

use lazy_static::lazy_static;
use regex::Regex;

/// Canonical operator glyphs, in the order they appear on the keypad.
pub const OPERATOR_CHARS: [char; 4] = ['+', '-', '×', '÷'];

lazy_static! {
    /// A trailing run of anything that cannot end a number, e.g. the `+` in `2+`.
    static ref TRAILING_JUNK: Regex = Regex::new(r"[^0-9.]+$").unwrap();

    /// Matches strings made only of digits, decimal points, operators and spaces.
    static ref KEYPAD_CHARS: Regex = Regex::new(r"^[\d\s\.\+\-×÷\*/−]+$").unwrap();
}

/// Check if a character is one of the canonical operator glyphs.
pub fn is_operator_char(c: char) -> bool {
    OPERATOR_CHARS.contains(&c)
}

/// Replace ASCII and typographic operator spellings with the canonical glyphs.
///
/// `*` becomes `×`, `/` becomes `÷` and the Unicode minus `−` becomes `-`.
pub fn canonicalize(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '*' => '×',
            '/' => '÷',
            '−' => '-',
            other => other,
        })
        .collect()
}

/// Strip a trailing run of characters that are neither digits nor `.`.
pub fn strip_trailing_junk(expression: &str) -> &str {
    match TRAILING_JUNK.find(expression) {
        Some(m) => &expression[..m.start()],
        None => expression,
    }
}

/// Check if the expression currently ends with an operator glyph.
pub fn ends_with_operator(expression: &str) -> bool {
    expression.chars().last().is_some_and(is_operator_char)
}

/// The numeric run being typed: everything after the last operator.
pub fn trailing_number(expression: &str) -> &str {
    match expression.rfind(is_operator_char) {
        Some(idx) => {
            let op_len = expression[idx..].chars().next().map_or(1, char::len_utf8);
            &expression[idx + op_len..]
        }
        None => expression,
    }
}

/// Check if input looks like something the evaluator can do arithmetic on.
///
/// Returns `true` if the input:
/// 1. Contains only digits, decimal points, operators and whitespace
/// 2. Has at least one digit
/// 3. Has at least one operator between two operands
pub fn looks_like_expression(input: &str) -> bool {
    let trimmed = input.trim();

    if trimmed.chars().count() < 3 || !KEYPAD_CHARS.is_match(trimmed) {
        return false;
    }

    let canonical = canonicalize(trimmed);
    let body = strip_trailing_junk(&canonical);
    let mut seen_digit = false;
    for c in body.chars() {
        if c.is_ascii_digit() {
            seen_digit = true;
        } else if is_operator_char(c) && seen_digit {
            return true;
        }
    }

    false
}
