// Wildcard pattern translation - SQL `LIKE` style `%` patterns to anchored regexes

use crate::value::RegexPattern;

const WILDCARD: char = '%';
const ANY: &str = ".*";

/// Translate a `%` wildcard pattern into a regex that behaves like SQL `LIKE`.
///
/// A boundary without `%` is anchored (`^` / `$`), a boundary with `%` is left
/// open (`.*`). Interior `%` become `.*`.
///
/// Callers must pass a non-empty pattern; an empty one yields `^$`.
pub fn to_regex(pattern: &str) -> RegexPattern {
    let value = start_delimiter(pattern);
    let value = end_delimiter(&value);
    RegexPattern::new(value.replace(WILDCARD, ANY))
}

/// Translate a `%` wildcard pattern into a regex matching strings that do NOT
/// match it.
///
/// `%abc%` becomes `^(?!.*abc).*$`. A pattern with a wildcard on only one
/// boundary yields an unbalanced lookahead (`^(?!.*abc$`, `^abc).*$`); this is
/// kept as-is and the store rejects it when compiling.
pub fn to_negative_regex(pattern: &str) -> RegexPattern {
    let value = start_negative_delimiter(pattern);
    let value = end_negative_delimiter(&value);
    RegexPattern::new(value.replace(WILDCARD, ANY))
}

/// Anchor both boundaries of a pattern without expanding interior `%`.
pub fn strict_regex(pattern: &str) -> RegexPattern {
    let value = start_delimiter(pattern);
    RegexPattern::new(end_delimiter(&value))
}

fn start_delimiter(value: &str) -> String {
    if value.starts_with(WILDCARD) {
        format!("{ANY}{}", value.trim_start_matches(WILDCARD))
    } else {
        format!("^{value}")
    }
}

fn end_delimiter(value: &str) -> String {
    if value.ends_with(WILDCARD) {
        format!("{}{ANY}", value.trim_end_matches(WILDCARD))
    } else {
        format!("{value}$")
    }
}

fn start_negative_delimiter(value: &str) -> String {
    if value.starts_with(WILDCARD) {
        format!("^(?!{ANY}{}", value.trim_start_matches(WILDCARD))
    } else {
        format!("^{value}")
    }
}

fn end_negative_delimiter(value: &str) -> String {
    if value.ends_with(WILDCARD) {
        format!("{}).*$", value.trim_end_matches(WILDCARD))
    } else {
        format!("{value}$")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn compiled(pattern: &RegexPattern) -> Regex {
        Regex::new(pattern.as_str()).unwrap()
    }

    #[test]
    fn test_contains_pattern() {
        let re = to_regex("%abc%");
        assert_eq!(re.as_str(), ".*abc.*");
        let re = compiled(&re);
        assert!(re.is_match("xxabcxx"));
        assert!(re.is_match("abc"));
        assert!(!re.is_match("ab c"));
    }

    #[test]
    fn test_prefix_pattern() {
        let re = to_regex("abc%");
        assert_eq!(re.as_str(), "^abc.*");
        let re = compiled(&re);
        assert!(re.is_match("abcdef"));
        assert!(!re.is_match("xabc"));
    }

    #[test]
    fn test_suffix_pattern() {
        let re = to_regex("%abc");
        assert_eq!(re.as_str(), ".*abc$");
        let re = compiled(&re);
        assert!(re.is_match("xyzabc"));
        assert!(!re.is_match("abcx"));
    }

    #[test]
    fn test_exact_pattern() {
        let re = to_regex("abc");
        assert_eq!(re.as_str(), "^abc$");
        let re = compiled(&re);
        assert!(re.is_match("abc"));
        assert!(!re.is_match("abcd"));
        assert!(!re.is_match("zabc"));
    }

    #[test]
    fn test_interior_wildcard() {
        let re = to_regex("Pep%Cola");
        assert_eq!(re.as_str(), "^Pep.*Cola$");
        assert!(compiled(&re).is_match("Pepsi Cola"));
    }

    #[test]
    fn test_repeated_boundary_wildcards_collapse() {
        assert_eq!(to_regex("%%FL%%").as_str(), ".*FL.*");
        assert_eq!(to_negative_regex("%%FL%%").as_str(), "^(?!.*FL).*$");
    }

    #[test]
    fn test_lone_wildcard() {
        assert_eq!(to_regex("%").as_str(), ".*$");
    }

    #[test]
    fn test_negative_contains() {
        assert_eq!(to_negative_regex("%abc%").as_str(), "^(?!.*abc).*$");
    }

    #[test]
    fn test_negative_without_wildcards() {
        assert_eq!(to_negative_regex("abc").as_str(), "^abc$");
    }

    #[test]
    fn test_negative_mixed_boundaries_stay_unbalanced() {
        assert_eq!(to_negative_regex("%abc").as_str(), "^(?!.*abc$");
        assert_eq!(to_negative_regex("abc%").as_str(), "^abc).*$");
        assert!(Regex::new(to_negative_regex("abc%").as_str()).is_err());
    }

    #[test]
    fn test_strict_regex_keeps_interior_wildcards() {
        assert_eq!(strict_regex("a%b").as_str(), "^a%b$");
        assert_eq!(strict_regex("%a%b%").as_str(), ".*a%b.*");
    }

    #[test]
    fn test_empty_input_is_anchored_empty() {
        assert_eq!(to_regex("").as_str(), "^$");
        assert_eq!(to_negative_regex("").as_str(), "^$");
    }
}
