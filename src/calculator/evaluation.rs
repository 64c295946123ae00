//! Expression evaluation for keypad and voice input.
//!
//! Expressions are flat sequences of non-negative decimal literals joined by
//! `+`, `-`, `×` and `÷`. There are no parentheses and no unary minus. The
//! evaluator is tolerant of half-typed input: a trailing operator is ignored
//! and an operator without two operands is discarded.
//!
//! Every run between operators must be a decimal literal. Leftover words
//! from a voice transcript (`whatis6×7`) make the whole expression
//! malformed rather than being skipped, so it evaluates to NaN.

use thiserror::Error;
use tracing::debug;

use super::detection::{canonicalize, strip_trailing_junk};
use super::format::format_result;

/// One of the four binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    /// Parse a canonical operator glyph.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Add),
            '-' => Some(Self::Subtract),
            '×' => Some(Self::Multiply),
            '÷' => Some(Self::Divide),
            _ => None,
        }
    }

    /// The canonical glyph for this operator.
    pub fn glyph(self) -> char {
        match self {
            Self::Add => '+',
            Self::Subtract => '-',
            Self::Multiply => '×',
            Self::Divide => '÷',
        }
    }

    /// Binding strength. Multiplication and division bind tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Add | Self::Subtract => 1,
            Self::Multiply | Self::Divide => 2,
        }
    }

    /// Apply the operator with `lhs` as the earlier operand.
    ///
    /// Division by exactly zero yields NaN instead of a signed infinity.
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::Add => lhs + rhs,
            Self::Subtract => lhs - rhs,
            Self::Multiply => lhs * rhs,
            Self::Divide => {
                if rhs == 0.0 {
                    f64::NAN
                } else {
                    lhs / rhs
                }
            }
        }
    }
}

/// A lexical unit of an expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Number(f64),
    Operator(Operator),
}

/// Failure while turning expression text into tokens.
#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("malformed number literal: {0:?}")]
    MalformedNumber(String),
}

/// Split an expression at operator boundaries.
///
/// Whitespace is dropped and ASCII operator spellings are accepted. Every run
/// between operators must be a decimal literal: digits with at most one `.`.
pub fn tokenize(expression: &str) -> Result<Vec<Token>, EvalError> {
    let canonical: String = canonicalize(expression)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let mut tokens = Vec::new();
    let mut run = String::new();

    for c in canonical.chars() {
        if let Some(op) = Operator::from_char(c) {
            if !run.is_empty() {
                tokens.push(Token::Number(parse_number(&run)?));
                run.clear();
            }
            tokens.push(Token::Operator(op));
        } else {
            run.push(c);
        }
    }

    if !run.is_empty() {
        tokens.push(Token::Number(parse_number(&run)?));
    }

    Ok(tokens)
}

fn parse_number(literal: &str) -> Result<f64, EvalError> {
    let digits = literal.chars().filter(char::is_ascii_digit).count();
    let points = literal.chars().filter(|&c| c == '.').count();

    if digits == 0 || points > 1 || digits + points != literal.chars().count() {
        return Err(EvalError::MalformedNumber(literal.to_string()));
    }

    literal
        .parse::<f64>()
        .map_err(|_| EvalError::MalformedNumber(literal.to_string()))
}

/// Pop one operator and apply it to the top two operands.
///
/// With fewer than two operands the operator is discarded.
fn reduce(values: &mut Vec<f64>, ops: &mut Vec<Operator>) {
    let Some(op) = ops.pop() else {
        return;
    };

    if values.len() < 2 {
        debug!(op = %op.glyph(), "discarding operator without two operands");
        return;
    }

    // Checked above: at least two operands.
    let rhs = values.pop().unwrap_or_default();
    let lhs = values.pop().unwrap_or_default();
    values.push(op.apply(lhs, rhs));
}

/// Evaluate an expression, reporting malformed literals as errors.
///
/// An empty expression, or one holding only operators, evaluates to 0.
pub fn try_evaluate(expression: &str) -> Result<f64, EvalError> {
    let body = strip_trailing_junk(expression);
    if body.is_empty() {
        return Ok(0.0);
    }

    let mut values: Vec<f64> = Vec::new();
    let mut ops: Vec<Operator> = Vec::new();

    for token in tokenize(body)? {
        match token {
            Token::Number(value) => values.push(value),
            Token::Operator(op) => {
                while ops
                    .last()
                    .is_some_and(|top| top.precedence() >= op.precedence())
                {
                    reduce(&mut values, &mut ops);
                }
                ops.push(op);
            }
        }
    }

    while !ops.is_empty() {
        reduce(&mut values, &mut ops);
    }

    Ok(values.pop().unwrap_or(0.0))
}

/// Evaluate an expression. Never fails: any error becomes NaN.
pub fn evaluate_expression(expression: &str) -> f64 {
    match try_evaluate(expression) {
        Ok(value) => value,
        Err(e) => {
            debug!(expression, error = %e, "evaluation failed");
            f64::NAN
        }
    }
}

/// Result of evaluating a calculator expression.
#[derive(Clone, Debug)]
pub enum CalcResult {
    /// Successful calculation with a finite value.
    Success {
        /// The original expression.
        expression: String,
        /// The numeric value.
        value: f64,
        /// Canonical display string.
        display_result: String,
    },
    /// The expression produced the NaN sentinel or an infinity.
    Error {
        /// The original expression.
        expression: String,
        /// Error message to display.
        message: String,
    },
}

impl CalcResult {
    /// Evaluate `input` and render the value.
    pub fn evaluate(input: &str) -> Self {
        let expression = input.trim().to_string();
        let value = evaluate_expression(&expression);
        let display = format_result(value);

        if value.is_finite() {
            Self::Success {
                expression,
                value,
                display_result: display,
            }
        } else {
            Self::Error {
                expression,
                message: display,
            }
        }
    }

    /// Get the expression that was evaluated.
    pub fn expression(&self) -> &str {
        match self {
            Self::Success { expression, .. } => expression,
            Self::Error { expression, .. } => expression,
        }
    }

    /// Check if this is a successful result.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Get the numeric value (only for successful results).
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Success { value, .. } => Some(*value),
            Self::Error { .. } => None,
        }
    }

    /// Get the display string (result or error message).
    pub fn display(&self) -> &str {
        match self {
            Self::Success { display_result, .. } => display_result,
            Self::Error { message, .. } => message,
        }
    }

    /// The `"<expression>=<result>"` line recorded in history.
    pub fn calculation(&self) -> String {
        format!("{}={}", self.expression(), self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_evaluation() {
        assert_eq!(evaluate_expression("2+3"), 5.0);
        assert_eq!(evaluate_expression("7-10"), -3.0);
        assert_eq!(evaluate_expression("6×7"), 42.0);
        assert_eq!(evaluate_expression("9÷4"), 2.25);
    }

    #[test]
    fn test_precedence() {
        assert_eq!(evaluate_expression("2+3×4"), 14.0);
        assert_eq!(evaluate_expression("2×3+4"), 10.0);
        assert_eq!(evaluate_expression("20-6÷3"), 18.0);
        assert_eq!(evaluate_expression("1+2×3-4÷2"), 5.0);
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(evaluate_expression("10-2-3"), 5.0);
        assert_eq!(evaluate_expression("100÷10÷5"), 2.0);
        assert_eq!(evaluate_expression("8÷2×4"), 16.0);
        assert_eq!(evaluate_expression("5-3+1"), 3.0);
    }

    #[test]
    fn test_division_by_zero() {
        assert!(evaluate_expression("10÷0").is_nan());
        assert!(evaluate_expression("1+10÷0.0").is_nan());
        assert_eq!(evaluate_expression("0÷5"), 0.0);
    }

    #[test]
    fn test_partial_expressions() {
        assert_eq!(evaluate_expression("2+"), 2.0);
        assert_eq!(evaluate_expression("12+3×"), 15.0);
        assert_eq!(evaluate_expression(""), 0.0);
        assert_eq!(evaluate_expression("+"), 0.0);
        assert_eq!(evaluate_expression("4."), 4.0);
    }

    #[test]
    fn test_degenerate_operators_discarded() {
        // Leading minus has no left operand, so it is dropped.
        assert_eq!(evaluate_expression("-5"), 5.0);
        assert_eq!(evaluate_expression("+5210"), 5210.0);
        // The second operator reduces with only one operand available.
        assert_eq!(evaluate_expression("2×+3"), 5.0);
    }

    #[test]
    fn test_ascii_operators_and_whitespace() {
        assert_eq!(evaluate_expression("6 * 7"), 42.0);
        assert_eq!(evaluate_expression("9 / 3"), 3.0);
        assert_eq!(evaluate_expression(" 12 + 48 "), 60.0);
        assert_eq!(evaluate_expression("9−4"), 5.0);
    }

    #[test]
    fn test_malformed_literals_are_nan() {
        assert!(evaluate_expression("1.2.3+1").is_nan());
        assert!(evaluate_expression("si×6").is_nan());
        assert!(evaluate_expression(".+1").is_nan());
        assert_eq!(
            try_evaluate("abc+1"),
            Err(EvalError::MalformedNumber("abc".to_string()))
        );
    }

    #[test]
    fn test_transcript_leftovers_are_not_skipped() {
        assert!(evaluate_expression("whatis6×7").is_nan());
        assert_eq!(format_result(evaluate_expression("whatis6×7")), "Error");
        assert!(try_evaluate("6×7of").is_err());
    }

    #[test]
    fn test_leading_decimal_point() {
        assert_eq!(evaluate_expression(".5+1"), 1.5);
        assert_eq!(evaluate_expression("0.25×4"), 1.0);
    }

    #[test]
    fn test_single_operator_matches_arithmetic() {
        let operands = [0.0, 1.0, 2.5, 7.0, 12.0, 1000.0];
        for &a in &operands {
            for &b in &operands {
                let cases = [
                    (format!("{a}+{b}"), a + b),
                    (format!("{a}-{b}"), a - b),
                    (format!("{a}×{b}"), a * b),
                ];
                for (expr, expected) in cases {
                    assert_eq!(evaluate_expression(&expr), expected, "{expr}");
                }
                if b != 0.0 {
                    assert_eq!(evaluate_expression(&format!("{a}÷{b}")), a / b);
                }
            }
        }
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("12+3.5×2").unwrap(),
            vec![
                Token::Number(12.0),
                Token::Operator(Operator::Add),
                Token::Number(3.5),
                Token::Operator(Operator::Multiply),
                Token::Number(2.0),
            ]
        );
        assert_eq!(tokenize("").unwrap(), vec![]);
    }

    #[test]
    fn test_calc_result() {
        let result = CalcResult::evaluate("1÷4");
        assert!(result.is_success());
        assert_eq!(result.display(), "0.25");
        assert_eq!(result.calculation(), "1÷4=0.25");

        let error = CalcResult::evaluate("1÷0");
        assert!(!error.is_success());
        assert_eq!(error.display(), "Error");
        assert_eq!(error.value(), None);
        assert_eq!(error.calculation(), "1÷0=Error");
    }
}
