use crate::value::Value;
use regex::Regex;
use std::sync::OnceLock;

fn numeric_literal() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?$").unwrap())
}

/// Try to read `input` as a decimal numeric literal.
///
/// Integer literals that fit in an `i64` become `Value::Int`, everything else
/// numeric becomes `Value::Float`. Non-numeric input (including hex, `inf`
/// and `NaN`) yields `None`.
pub fn parse_numeric(input: &str) -> Option<Value> {
    let trimmed = input.trim();
    if !numeric_literal().is_match(trimmed) {
        return None;
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Some(Value::Int(n));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Value::Float)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers() {
        assert_eq!(parse_numeric("118"), Some(Value::Int(118)));
        assert_eq!(parse_numeric("-7"), Some(Value::Int(-7)));
        assert_eq!(parse_numeric("+3"), Some(Value::Int(3)));
        assert_eq!(parse_numeric(" 42 "), Some(Value::Int(42)));
        assert_eq!(parse_numeric("0"), Some(Value::Int(0)));
    }

    #[test]
    fn test_floats() {
        assert_eq!(parse_numeric("1.5"), Some(Value::Float(1.5)));
        assert_eq!(parse_numeric(".5"), Some(Value::Float(0.5)));
        assert_eq!(parse_numeric("2."), Some(Value::Float(2.0)));
        assert_eq!(parse_numeric("1e3"), Some(Value::Float(1000.0)));
        assert_eq!(
            parse_numeric("99999999999999999999"),
            Some(Value::Float(99999999999999999999.0))
        );
    }

    #[test]
    fn test_not_numeric() {
        for input in ["", "abc", "12abc", "0x1A", "inf", "NaN", "1e", ".", "-", "1 2"] {
            assert_eq!(parse_numeric(input), None, "{input:?}");
        }
    }
}
