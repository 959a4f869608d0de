use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::SessionId;

/// ISO-8601 local timestamp with microseconds.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// One user utterance paired with the generated reply. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub timestamp: String,
    pub session_id: String,
    pub user: String,
    pub bot: String,
}

impl Exchange {
    pub fn new(user: impl Into<String>, bot: impl Into<String>, session_id: &SessionId) -> Self {
        Self::at(Local::now().naive_local(), user, bot, session_id)
    }

    pub fn at(
        at: NaiveDateTime,
        user: impl Into<String>,
        bot: impl Into<String>,
        session_id: &SessionId,
    ) -> Self {
        Self {
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
            session_id: session_id.as_str().to_string(),
            user: user.into(),
            bot: bot.into(),
        }
    }

    /// Row for the tabular store: timestamp, session id, user message, bot response.
    pub fn as_row(&self) -> [&str; 4] {
        [&self.timestamp, &self.session_id, &self.user, &self.bot]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_timestamp_is_iso8601_with_micros() {
        let at = NaiveDate::from_ymd_opt(2026, 1, 2)
            .unwrap()
            .and_hms_micro_opt(3, 4, 5, 60)
            .unwrap();
        let ex = Exchange::at(at, "hi", "yo", &SessionId::new("s"));
        assert_eq!(ex.timestamp, "2026-01-02T03:04:05.000060");
    }

    #[test]
    fn test_serialized_field_names() {
        let ex = Exchange {
            timestamp: "t".into(),
            session_id: "s".into(),
            user: "u".into(),
            bot: "b".into(),
        };
        let v = serde_json::to_value(&ex).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"timestamp": "t", "session_id": "s", "user": "u", "bot": "b"})
        );
        assert_eq!(ex.as_row(), ["t", "s", "u", "b"]);
    }
}
