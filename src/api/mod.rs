pub mod admin;
pub mod dialogue;
pub mod transcribe;

pub use admin::AdminClient;
pub use dialogue::DialogueClient;
pub use transcribe::TranscribeClient;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

/// Failure talking to a remote endpoint. Callers decide whether this becomes
/// a fallback message (dialogue), a retained stale list (poll) or an alert
/// (cancel) — it is never surfaced raw.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Parse a wire timestamp. The backend emits both offset-carrying RFC 3339
/// strings and naive local ones; naive values are taken in local time, the
/// same reading a browser `Date` would give them.
pub(crate) fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }
    None
}

pub(crate) fn de_instant<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    let raw = String::deserialize(deserializer)?;
    parse_instant(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_instant_rfc3339() {
        let dt = parse_instant("2026-08-07T14:30:00Z").unwrap();
        assert_eq!(dt.hour(), 14);
        assert_eq!(dt.minute(), 30);
    }

    #[test]
    fn test_parse_instant_with_offset() {
        let dt = parse_instant("2026-08-07T14:30:00-05:00").unwrap();
        assert_eq!(dt.hour(), 19);
    }

    #[test]
    fn test_parse_instant_naive_forms() {
        assert!(parse_instant("2026-08-07T14:30:00").is_some());
        assert!(parse_instant("2026-08-07T14:30").is_some());
        assert!(parse_instant("next tuesday").is_none());
    }
}
