use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Clock format for derived session ids: minute granularity.
pub const SESSION_CLOCK_FORMAT: &str = "%Y%m%d_%H%M";

/// Coarse grouping key for exchanges.
///
/// Derived ids truncate the wall clock to the minute, so unrelated users
/// active in the same minute share one id. Callers that need a
/// per-conversation key supply their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_clock(at: NaiveDateTime) -> Self {
        Self(at.format(SESSION_CLOCK_FORMAT).to_string())
    }

    pub fn now() -> Self {
        Self::from_clock(Local::now().naive_local())
    }

    /// Use the supplied id as-is when it is not blank, otherwise derive one
    /// from the clock.
    pub fn resolve(supplied: Option<&str>) -> Self {
        match supplied {
            Some(id) if !id.trim().is_empty() => Self::new(id),
            _ => Self::now(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_clock_id_has_minute_granularity() {
        assert_eq!(SessionId::from_clock(at(9, 5, 0)).as_str(), "20260314_0905");
        // same minute collides
        assert_eq!(
            SessionId::from_clock(at(9, 5, 1)),
            SessionId::from_clock(at(9, 5, 59))
        );
        assert_ne!(
            SessionId::from_clock(at(9, 5, 59)),
            SessionId::from_clock(at(9, 6, 0))
        );
    }

    #[test]
    fn test_resolve_prefers_supplied() {
        assert_eq!(SessionId::resolve(Some("conv-42")).as_str(), "conv-42");
    }

    #[test]
    fn test_resolve_keeps_supplied_id_verbatim() {
        assert_eq!(SessionId::resolve(Some(" conv-1 ")).as_str(), " conv-1 ");
    }

    #[test]
    fn test_resolve_blank_derives_from_clock() {
        let id = SessionId::resolve(Some("   "));
        assert_eq!(id.as_str().len(), "YYYYMMDD_HHMM".len());
        assert_eq!(id.as_str().as_bytes()[8], b'_');
        let id = SessionId::resolve(None);
        assert!(id.as_str().chars().filter(|c| c.is_ascii_digit()).count() == 12);
    }
}
