//! Uptime text codec.
//!
//! The control plane reports uptimes as whitespace-separated components
//! such as `"2d 5h 30m"` or `"0h 15m"`.

use std::time::Duration;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Parse an uptime string made of `<n>d`, `<n>h`, `<n>m` and `<n>s`
/// components. Returns `None` for empty input, unknown units, or overflow.
pub fn parse_uptime(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let mut total: u64 = 0;
    for part in s.split_whitespace() {
        let unit = part.chars().last()?;
        let digits = &part[..part.len() - unit.len_utf8()];
        let n: u64 = digits.parse().ok()?;
        let scale = match unit.to_ascii_lowercase() {
            'd' => DAY,
            'h' => HOUR,
            'm' => MINUTE,
            's' => 1,
            _ => return None,
        };
        total = total.checked_add(n.checked_mul(scale)?)?;
    }
    Some(Duration::from_secs(total))
}

/// Render an uptime as days, hours and minutes. Seconds are dropped and
/// the day component is omitted below one day.
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let days = secs / DAY;
    let hours = (secs % DAY) / HOUR;
    let minutes = (secs % HOUR) / MINUTE;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else {
        format!("{hours}h {minutes}m")
    }
}

/// `#[serde(with = "...")]` adapter storing a `Duration` as uptime text.
pub mod text {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(uptime: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_uptime(*uptime))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_uptime(&raw).ok_or_else(|| D::Error::custom(format!("invalid uptime {raw:?}")))
    }
}
