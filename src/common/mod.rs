//! Common utilities shared by the engine, the runner and the CLI

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};

/// Parse a `key=value` pair as given on the command line
pub fn parse_key_value(raw: &str) -> Option<(String, String)> {
    let (key, value) = raw.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

/// Parse a human duration such as `250ms`, `2s`, `1m` or a bare millisecond count
pub fn parse_duration(raw: &str) -> Option<std::time::Duration> {
    use std::time::Duration;

    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (amount, unit) = raw.split_at(split);
    let amount: u64 = amount.parse().ok()?;
    match unit.trim() {
        "" | "ms" => Some(Duration::from_millis(amount)),
        "s" | "sec" => Some(Duration::from_secs(amount)),
        "m" | "min" => amount.checked_mul(60).map(Duration::from_secs),
        "h" => amount.checked_mul(3600).map(Duration::from_secs),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("user=alice"),
            Some(("user".to_string(), "alice".to_string()))
        );
        assert_eq!(
            parse_key_value("empty="),
            Some(("empty".to_string(), String::new()))
        );
        assert_eq!(parse_key_value("a=b=c").unwrap().1, "b=c");
        assert_eq!(parse_key_value("novalue"), None);
        assert_eq!(parse_key_value("=x"), None);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("2s"), Some(Duration::from_secs(2)));
        assert_eq!(parse_duration(" 3 min"), Some(Duration::from_secs(180)));
        assert_eq!(parse_duration("15"), Some(Duration::from_millis(15)));
        assert_eq!(parse_duration("fast"), None);
        assert_eq!(parse_duration("5 parsecs"), None);
    }

    #[test]
    fn test_parse_duration_overflow() {
        assert_eq!(parse_duration("307445734561825861m"), None);
        assert_eq!(parse_duration("5124095576030432h"), None);
        assert_eq!(parse_duration("99999999999999999999ms"), None);
        assert_eq!(
            parse_duration("307445734561825860m"),
            Some(Duration::from_secs(307445734561825860 * 60))
        );
    }
}
