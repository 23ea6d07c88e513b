//! Helpers for reading and parsing environment variables.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Read a variable, treating unset and blank values the same.
pub(super) fn env_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a variable, keeping an explicitly empty value as `Some("")`.
pub(super) fn env_var_raw(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string())
}

/// Parse a variable into `T`, returning `None` when unset.
pub(super) fn parse_env<T>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: Display,
{
    match env_var(name) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {name} ({value}): {e}").into()),
        None => Ok(None),
    }
}

/// Parse a boolean variable. Accepts true/false, 1/0, yes/no, on/off.
pub(super) fn parse_bool_env(name: &str) -> Result<Option<bool>, Box<dyn std::error::Error>> {
    match env_var(name) {
        Some(value) => parse_bool(&value)
            .map(Some)
            .ok_or_else(|| format!("Invalid boolean for {name}: {value}").into()),
        None => Ok(None),
    }
}

pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" on "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
