//! Rendering of evaluation results.

/// Shown in place of NaN and infinite results.
pub const ERROR_TEXT: &str = "Error";

/// Fractional digits rendered before trailing zeros are stripped.
const FRACTION_DIGITS: usize = 10;

/// Format a value in its canonical display form.
///
/// Integral values print without a fractional part. Anything else is printed
/// with ten fractional digits, then trailing zeros and a trailing `.` are
/// removed.
pub fn format_result(value: f64) -> String {
    if !value.is_finite() {
        return ERROR_TEXT.to_string();
    }

    let formatted = if value == value.trunc() {
        format!("{value:.0}")
    } else {
        let fixed = format!("{value:.prec$}", prec = FRACTION_DIGITS);
        fixed
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    };

    // Negative zero, and negatives too small for ten digits, both render as "-0".
    if formatted == "-0" {
        "0".to_string()
    } else {
        formatted
    }
}

/// Format a value for display with thousand separators.
pub fn format_grouped(value: f64) -> String {
    let plain = format_result(value);
    if plain == ERROR_TEXT {
        return plain;
    }

    let (sign, unsigned) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain.as_str()),
    };
    let (int_part, frac_part) = match unsigned.find('.') {
        Some(dot_pos) => unsigned.split_at(dot_pos),
        None => (unsigned, ""),
    };

    format!("{}{}{}", sign, with_separators(int_part), frac_part)
}

/// Insert a comma between every group of three digits.
fn with_separators(digits: &str) -> String {
    let mut result = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}
