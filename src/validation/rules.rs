//! Evaluation of the rules attached to vertices.
//!
//! Numeric rules read values leniently: leading whitespace is skipped and the
//! longest numeric prefix is used, so `"12abc"` reads as `12` and `"abc"` as `0`.
use super::error::ReasonCode;
use crate::store::RuleKind;

/// What a rule is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    /// The recorded value being validated.
    pub value: &'a str,
    /// Distinct answered answers below the rule's question. `None` when the
    /// rule is not attached to a question.
    pub answered_count: Option<usize>,
}

impl<'a> RuleInput<'a> {
    pub fn value(value: &'a str) -> Self {
        Self { value, answered_count: None }
    }
}

impl RuleKind {
    pub fn reason(&self) -> ReasonCode {
        match self {
            RuleKind::Presence => ReasonCode::MustBePresent,
            RuleKind::MinimumLength(_) => ReasonCode::MinimumLength,
            RuleKind::MaximumLength(_) => ReasonCode::MaximumLength,
            RuleKind::MinimumValue(_) => ReasonCode::MinimumValue,
            RuleKind::MaximumValue(_) => ReasonCode::MaximumValue,
            RuleKind::MaximumAnswerCount(_) => ReasonCode::MaximumAnswer,
        }
    }

    pub fn evaluate(&self, input: &RuleInput) -> Result<(), ReasonCode> {
        let value = input.value;
        let passed = match *self {
            RuleKind::Presence => !value.trim().is_empty(),
            RuleKind::MinimumLength(min) => value.chars().count() >= min,
            RuleKind::MaximumLength(max) => value.chars().count() <= max,
            RuleKind::MinimumValue(min) => !value.is_empty() && leading_float(value) >= min,
            RuleKind::MaximumValue(max) => !value.is_empty() && leading_float(value) <= max,
            // Only meaningful on a question.
            RuleKind::MaximumAnswerCount(max) => input.answered_count.is_some_and(|count| count <= max),
        };
        if passed {
            Ok(())
        } else {
            Err(self.reason())
        }
    }
}

fn skip_sign(s: &str) -> (bool, &str) {
    let s = s.trim_start();
    match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    }
}

fn digit_run(s: &str) -> usize {
    s.bytes().take_while(|b| b.is_ascii_digit()).count()
}

/// Integer value of the longest leading numeric prefix, `0` when there is none.
pub(crate) fn leading_int(s: &str) -> i64 {
    let (negative, rest) = skip_sign(s);
    let digits = &rest[..digit_run(rest)];
    let magnitude = digits
        .bytes()
        .fold(0i64, |acc, b| acc.saturating_mul(10).saturating_add(i64::from(b - b'0')));
    if negative { -magnitude } else { magnitude }
}

/// Float value of the longest leading numeric prefix, `0.0` when there is none.
pub(crate) fn leading_float(s: &str) -> f64 {
    let (negative, rest) = skip_sign(s);
    let mut end = digit_run(rest);
    let bytes = rest.as_bytes();
    if bytes.get(end) == Some(&b'.') {
        let fraction = digit_run(&rest[end + 1..]);
        if fraction > 0 {
            end += 1 + fraction;
        }
    }
    if end == 0 {
        return 0.0;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let (_, exp_rest) = skip_sign(&rest[end + 1..]);
        let exp_digits = digit_run(exp_rest);
        let sign_len = rest.len() - (end + 1) - exp_rest.len();
        if exp_digits > 0 && !rest[end + 1..].starts_with(char::is_whitespace) {
            end += 1 + sign_len + exp_digits;
        }
    }
    let magnitude: f64 = rest[..end].parse().unwrap_or(0.0);
    if negative { -magnitude } else { magnitude }
}
