//! Field coercion for loosely typed JSON payloads.
//!
//! Every helper records a human-readable message in `errors` instead of
//! returning early, so a caller can validate a whole payload in one pass and
//! report every problem at once. `None`/`null` is always "not provided" and is
//! never an error.

use serde_json::{Map, Value};

pub(crate) type Errors = Vec<String>;

/// Returns the object at `value`, or records an error when it is not one.
pub(crate) fn object<'a>(
    value: Option<&'a Value>,
    label: &str,
    errors: &mut Errors,
) -> Option<&'a Map<String, Value>> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => {
            errors.push(format!("{label} must be an object."));
            None
        }
    }
}

pub(crate) fn integer(
    value: Option<&Value>,
    label: &str,
    errors: &mut Errors,
    min: i64,
    max: i64,
) -> Option<i64> {
    let number = match value {
        None | Some(Value::Null) => return None,
        Some(Value::Number(number)) => number,
        Some(Value::Bool(_)) => {
            errors.push(format!("{label} must be a number."));
            return None;
        }
        Some(_) => {
            errors.push(format!("{label} must be an integer."));
            return None;
        }
    };

    let parsed = match number.as_i64() {
        Some(int) => int,
        None => match number.as_f64() {
            Some(float) if float.fract() == 0.0 && float.abs() < i64::MAX as f64 => float as i64,
            _ => {
                errors.push(format!("{label} must be an integer."));
                return None;
            }
        },
    };

    if parsed < min || parsed > max {
        errors.push(format!("{label} must be between {min} and {max}."));
        return None;
    }
    Some(parsed)
}

/// Strictly positive integer with no upper bound (counts, budgets, widths).
pub(crate) fn positive_integer(
    value: Option<&Value>,
    label: &str,
    errors: &mut Errors,
) -> Option<u64> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::Number(number)) if number.is_u64() || number.is_i64() => {
            match number.as_i64() {
                Some(int) if int <= 0 => {
                    errors.push(format!("{label} must be positive."));
                    None
                }
                _ => number.as_u64(),
            }
        }
        Some(_) => {
            errors.push(format!("{label} must be an integer."));
            None
        }
    }
}

pub(crate) fn number(
    value: Option<&Value>,
    label: &str,
    errors: &mut Errors,
    min: f64,
    max: f64,
) -> Option<f64> {
    let parsed = optional_number(value, label, errors)?;
    if parsed < min || parsed > max {
        errors.push(format!("{label} must be between {min} and {max}."));
        return None;
    }
    Some(parsed)
}

/// Any finite JSON number, no range check.
pub(crate) fn optional_number(
    value: Option<&Value>,
    label: &str,
    errors: &mut Errors,
) -> Option<f64> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::Number(number)) => number.as_f64(),
        Some(_) => {
            errors.push(format!("{label} must be a number."));
            None
        }
    }
}

pub(crate) fn boolean(value: Option<&Value>, label: &str, errors: &mut Errors) -> Option<bool> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::Bool(flag)) => Some(*flag),
        Some(_) => {
            errors.push(format!("{label} must be a boolean."));
            None
        }
    }
}

/// Trimmed, lowercased string that must be one of `allowed`.
pub(crate) fn choice(
    value: Option<&Value>,
    label: &str,
    allowed: &[&str],
    errors: &mut Errors,
) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => {
            let lowered = raw.trim().to_lowercase();
            if allowed.contains(&lowered.as_str()) {
                Some(lowered)
            } else {
                errors.push(format!("{label} must be one of: {}.", allowed.join(", ")));
                None
            }
        }
        Some(_) => {
            errors.push(format!("{label} must be a string."));
            None
        }
    }
}
