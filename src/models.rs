use chrono::{DateTime, FixedOffset, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// A due date keeps the UTC offset it was entered in, so the calendar day
/// it names is unambiguous.
pub type DueDate = DateTime<FixedOffset>;

/// Choices offered by the category combo-box. Any other text is accepted too.
pub const CATEGORIES: &[&str] = &["Work", "Personal", "Shopping", "Health", "Finance", "Other"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub text: String,
    pub completed: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::due", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DueDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Todo {
    pub fn new(id: String, text: String) -> Self {
        Self {
            id,
            text,
            completed: false,
            // Stored with millisecond precision, so keep the same precision in memory
            created_at: Utc::now().trunc_subsecs(3),
            due_date: None,
            category: None,
        }
    }
}

/// Replacement values for an edit. `None` leaves the field untouched;
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoEdit {
    pub text: Option<String>,
    pub due_date: Option<Option<DueDate>>,
    pub category: Option<Option<String>>,
}

/// Blank categories are stored as absent.
pub fn normalize_category(category: Option<String>) -> Option<String> {
    category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// ISO-8601 wire format with millisecond precision.
mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }

    pub mod due {
        use super::super::DueDate;
        use chrono::{DateTime, SecondsFormat};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &Option<DueDate>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(due) => serializer.serialize_str(&due.to_rfc3339_opts(SecondsFormat::Millis, true)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DueDate>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => DateTime::parse_from_rfc3339(&raw)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}
