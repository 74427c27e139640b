//! Helpers for reading configuration from the environment

use std::fmt::Display;
use std::str::FromStr;

use crate::{Error, Result};

/// Look up `key` and parse it, falling back to `default` when unset or blank.
///
/// `lookup` is usually `|k| std::env::var(k).ok()`; tests pass a map instead.
pub fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse::<T>().map_err(|e| {
            Error::Configuration(format!("{} has invalid value '{}': {}", key, raw, e))
        }),
        _ => Ok(default),
    }
}

/// Look up a string variable, falling back to `default` when unset or blank.
pub fn string_var<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
