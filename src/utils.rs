use std::env::var;
use std::str::FromStr;

use anyhow::Context;
use anyhow::Result;

/// Get the value of ENV var, or a default
///
/// Only when:
/// - It is set
/// - It is not empty
pub fn env_var_or_else(var_name: &'static str, or_else: fn() -> String) -> String {
    if let Ok(value) = var(var_name) {
        if !value.is_empty() {
            return value;
        }
    }

    or_else()
}

/// Get the parsed value of ENV var, or a default
///
/// Empty values fall back to the default, invalid values are an error
pub fn env_var_parsed_or<T>(var_name: &'static str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(var_name) {
        Ok(value) if !value.is_empty() => value
            .parse::<T>()
            .with_context(|| format!("`{var_name}` has an invalid value: {value}")),
        _ => Ok(default),
    }
}
