//! Duration strings used in timeout settings ("30m", "45s", "1h30m")

use crate::error::{ConfigError, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::sync::LazyLock;
use std::time::Duration;

static COMPONENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)(ms|s|m|h)").expect("duration pattern is valid"));

/// Parse a duration made of `<number><unit>` components, units `ms`, `s`, `m`, `h`
pub fn parse_duration(input: &str) -> Result<Duration> {
    let trimmed = input.trim();
    let invalid = || ConfigError::InvalidDuration(input.to_string());

    if trimmed.is_empty() {
        return Err(invalid());
    }

    let mut total = Duration::ZERO;
    let mut consumed = 0;

    for caps in COMPONENT.captures_iter(trimmed) {
        let whole = caps.get(0).ok_or_else(invalid)?;
        // Components must be contiguous: "1h 30m" or "1hx" are rejected.
        if whole.start() != consumed {
            return Err(invalid());
        }
        consumed = whole.end();

        let number: u64 = caps[1].parse().map_err(|_| invalid())?;
        let part = match &caps[2] {
            "ms" => Duration::from_millis(number),
            "s" => Duration::from_secs(number),
            "m" => Duration::from_secs(number.saturating_mul(60)),
            "h" => Duration::from_secs(number.saturating_mul(3600)),
            _ => return Err(invalid()),
        };
        total = total.saturating_add(part);
    }

    if consumed != trimmed.len() {
        return Err(invalid());
    }

    Ok(total)
}

/// serde helper for optional duration strings
pub(crate) fn deserialize_optional<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| parse_duration(&s).map_err(serde::de::Error::custom))
        .transpose()
}
