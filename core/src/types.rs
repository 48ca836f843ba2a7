//! Domain DTOs for the todo API.
//!
//! # Design
//! The wire format is camelCase JSON. The backend is loose about dates: due
//! dates come back as full timestamps and `createdAt` may lack an offset, so
//! reading is lenient while writing always produces one canonical form
//! (`YYYY-MM-DD` for due dates, RFC 3339 UTC for timestamps).
//!
//! Fields the server may leave out (`category`, `priority`, `createdAt`) are
//! kept as `Option` and skipped on write when absent. A record is written
//! back with exactly what was read plus the user's edits, never with values
//! made up on the client.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Name of the seed/demo record the backend ships with. Never shown.
pub const PLACEHOLDER_NAME: &str = "item 1";

/// Returned by the `FromStr` impls of `Category` and `Priority`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} `{value}`")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[default]
    Work,
    Personal,
    Other,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Category::Work => "Work",
            Category::Personal => "Personal",
            Category::Other => "Other",
        })
    }
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "work" => Ok(Category::Work),
            "personal" => Ok(Category::Personal),
            "other" => Ok(Category::Other),
            _ => Err(ParseEnumError {
                kind: "category",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        })
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(ParseEnumError {
                kind: "priority",
                value: s.to_string(),
            }),
        }
    }
}

/// A single todo item as stored by the API.
///
/// `id` is assigned by the server; `0` marks an item that has not been
/// created yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, with = "due_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl TodoItem {
    /// True for the backend's seed record, matched case-insensitively.
    pub fn is_placeholder(&self) -> bool {
        self.name.to_lowercase() == PLACEHOLDER_NAME
    }

    /// Copy of this item with `is_complete` flipped and nothing else changed.
    pub fn toggled(&self) -> TodoItem {
        TodoItem {
            is_complete: !self.is_complete,
            ..self.clone()
        }
    }

    pub fn matches(&self, needle_lower: &str) -> bool {
        self.name.to_lowercase().contains(needle_lower)
    }
}

/// The add form: what the user has typed so far for a new todo.
///
/// `Default` is the reset state the form returns to after a successful add.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTodo {
    pub name: String,
    pub category: Category,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

impl NewTodo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
    }

    /// The POST body for this draft, stamped with `now` as its creation time.
    pub fn to_item(&self, now: DateTime<Utc>) -> TodoItem {
        TodoItem {
            id: 0,
            name: self.name.clone(),
            is_complete: false,
            category: Some(self.category),
            priority: Some(self.priority),
            due_date: self.due_date,
            created_at: Some(now),
        }
    }
}

/// Render a date as `DD-MM-YYYY`, or `-` when there is none.
pub fn format_display_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.format("%d-%m-%Y").to_string(),
        None => "-".to_string(),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

mod due_date {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.serialize_str(&d.format("%Y-%m-%d").to_string()),
            None => s.serialize_none(),
        }
    }

    /// Accepts `YYYY-MM-DD` or any timestamp starting with it.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(d)? else {
            return Ok(None);
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        let day = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| D::Error::custom(format!("invalid due date `{raw}`: {e}")))
    }
}

mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => s.serialize_none(),
        }
    }

    /// RFC 3339, or a naive `YYYY-MM-DDThh:mm:ss[.f]` taken as UTC.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(d)? else {
            return Ok(None);
        };
        if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(Some(ts.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Some(naive.and_utc()))
            .map_err(|e| D::Error::custom(format!("invalid timestamp `{raw}`: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_todo_serializes_to_create_body() {
        let draft = NewTodo {
            name: "Buy milk".to_string(),
            category: Category::Personal,
            priority: Priority::Low,
            due_date: None,
        };
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        let json = serde_json::to_value(draft.to_item(now)).unwrap();
        assert_eq!(json["id"], 0);
        assert_eq!(json["name"], "Buy milk");
        assert_eq!(json["isComplete"], false);
        assert_eq!(json["category"], "Personal");
        assert_eq!(json["priority"], "Low");
        assert!(json["dueDate"].is_null());
        assert_eq!(json["createdAt"], "2025-03-01T09:30:00.000Z");
    }

    #[test]
    fn due_date_serializes_as_plain_date() {
        let draft = NewTodo {
            due_date: NaiveDate::from_ymd_opt(2025, 12, 24),
            ..NewTodo::new("Wrap presents")
        };
        let json = serde_json::to_value(draft.to_item(Utc::now())).unwrap();
        assert_eq!(json["dueDate"], "2025-12-24");
    }

    #[test]
    fn reads_backend_shaped_record() {
        let raw = r#"{
            "id": 7,
            "name": "File taxes",
            "isComplete": true,
            "category": "Work",
            "priority": "High",
            "dueDate": "2025-04-15T00:00:00",
            "createdAt": "2025-03-01T09:30:00.123"
        }"#;
        let item: TodoItem = serde_json::from_str(raw).unwrap();
        assert_eq!(item.id, 7);
        assert!(item.is_complete);
        assert_eq!(item.priority, Some(Priority::High));
        assert_eq!(item.due_date, NaiveDate::from_ymd_opt(2025, 4, 15));
        assert_eq!(
            item.created_at.map(|ts| ts.date_naive()),
            NaiveDate::from_ymd_opt(2025, 3, 1)
        );
    }

    #[test]
    fn missing_and_null_fields_stay_unset() {
        let raw = r#"{"id": 3, "name": "Bare", "category": null, "dueDate": null}"#;
        let item: TodoItem = serde_json::from_str(raw).unwrap();
        assert!(!item.is_complete);
        assert_eq!(item.category, None);
        assert_eq!(item.priority, None);
        assert_eq!(item.due_date, None);
        assert_eq!(item.created_at, None);
    }

    #[test]
    fn unset_fields_are_not_written_back() {
        let item: TodoItem = serde_json::from_str(r#"{"id": 7, "name": "Read"}"#).unwrap();
        let json = serde_json::to_value(item.toggled()).unwrap();
        let fields = json.as_object().unwrap();
        assert_eq!(json["isComplete"], true);
        assert!(!fields.contains_key("createdAt"));
        assert!(!fields.contains_key("category"));
        assert!(!fields.contains_key("priority"));
    }

    #[test]
    fn rejects_garbage_due_date() {
        let raw = r#"{"id": 3, "name": "Bad", "dueDate": "next tuesday"}"#;
        assert!(serde_json::from_str::<TodoItem>(raw).is_err());
    }

    #[test]
    fn toggled_only_flips_completion() {
        let item = NewTodo::new("Walk dog").to_item(Utc::now());
        let flipped = item.toggled();
        assert!(flipped.is_complete);
        assert_eq!(TodoItem { is_complete: false, ..flipped }, item);
    }

    #[test]
    fn placeholder_match_ignores_case() {
        let mut item = NewTodo::new("ITEM 1").to_item(Utc::now());
        assert!(item.is_placeholder());
        item.name = "item 10".to_string();
        assert!(!item.is_placeholder());
    }

    #[test]
    fn display_date_formats_day_first() {
        assert_eq!(format_display_date(NaiveDate::from_ymd_opt(2025, 1, 5)), "05-01-2025");
        assert_eq!(format_display_date(None), "-");
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("personal".parse::<Category>().unwrap(), Category::Personal);
        assert_eq!("LOW".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
    }
}
