use thiserror::Error;

/// Failure to read a metric value from command output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseNumberError {
    #[error("empty output")]
    Empty,

    #[error("output '{0}' is not a valid number")]
    Invalid(String),
}

/// Parse trimmed command output as an integer or a float.
///
/// Integers are tried first so that large counts keep their exact value up to
/// the precision of `f64`. Non-finite values (`NaN`, `inf`) are rejected since
/// no ordering comparison against them is meaningful.
pub fn parse_number(output: &str) -> Result<f64, ParseNumberError> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Err(ParseNumberError::Empty);
    }

    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(value as f64);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ParseNumberError::Invalid(trimmed.to_string())),
    }
}

/// Render a metric value in shortest round-trip form (`42`, `3.5`, `-0.25`).
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // Avoid "-0"
        return "0".to_string();
    }
    value.to_string()
}
