//! # Ledger Document
//!
//! The single JSON document persisted to disk.
//!
//! ## Schema
//! - options: ordered list of (id **string**, label **string**), order is display and tie-break order
//! - votes: voter id (**string**) to (option **string**, updatedAt **timestamp**), one entry per voter
//! - updatedAt: **timestamp** of the last accepted vote, null until the first one
//!
//! ## Notes
//! - Votes are overwritten, never appended. No history is kept.
//! - A vote pointing at an option that no longer exists is kept on disk but ignored by tallies.
//! - Loading is lenient per field and per vote: a bad entry is dropped or repaired, the rest survives.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

const DEFAULT_OPTIONS: [(&str, &str); 2] =
    [("jjajangmyeon", "짜장면"), ("jjamppong", "짬뽕")];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: String,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub option: String,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    #[serde(default)]
    pub options: Vec<PollOption>,
    #[serde(default)]
    pub votes: BTreeMap<String, Vote>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Ledger {
    pub fn seeded() -> Self {
        Self {
            options: default_options(),
            votes: BTreeMap::new(),
            updated_at: None,
        }
    }

    /// Rebuilds a ledger from whatever a hand-edited or older document holds.
    ///
    /// - options: unusable entries are skipped, an empty or missing list falls back to the seed
    /// - votes: entries without a string `option` are dropped, a missing or bad `updatedAt`
    ///   falls back to the ledger's, then to the epoch
    /// - updatedAt: anything but an RFC 3339 string is null
    ///
    /// `None` only when the document is not a JSON object.
    pub fn from_document(document: Value) -> Option<Self> {
        let Value::Object(mut fields) = document else {
            return None;
        };

        let updated_at = fields
            .remove("updatedAt")
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|raw| timestamp::parse(raw).ok());

        let options: Vec<PollOption> = match fields.remove("options") {
            Some(Value::Array(entries)) => entries
                .into_iter()
                .filter_map(|entry| serde_json::from_value(entry).ok())
                .collect(),
            _ => Vec::new(),
        };

        let votes = match fields.remove("votes") {
            Some(Value::Object(entries)) => entries
                .into_iter()
                .filter_map(|(voter, entry)| match vote_from_entry(&entry, updated_at) {
                    Some(vote) => Some((voter, vote)),
                    None => {
                        warn!("Dropping unreadable vote for {voter}: {entry}");
                        None
                    }
                })
                .collect(),
            _ => BTreeMap::new(),
        };

        Some(Self {
            options: if options.is_empty() {
                default_options()
            } else {
                options
            },
            votes,
            updated_at,
        })
    }

    pub fn has_option(&self, id: &str) -> bool {
        self.options.iter().any(|option| option.id == id)
    }
}

fn vote_from_entry(entry: &Value, fallback: Option<DateTime<Utc>>) -> Option<Vote> {
    let option = entry.get("option")?.as_str()?.to_string();

    let updated_at = entry
        .get("updatedAt")
        .and_then(Value::as_str)
        .and_then(|raw| timestamp::parse(raw).ok())
        .or(fallback)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    Some(Vote { option, updated_at })
}

pub fn default_options() -> Vec<PollOption> {
    DEFAULT_OPTIONS
        .iter()
        .map(|(id, label)| PollOption {
            id: id.to_string(),
            label: label.to_string(),
        })
        .collect()
}

/// ISO-8601 in UTC with millisecond precision, e.g. `2025-11-14T08:30:00.000Z`.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(raw).map(|parsed| parsed.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;

        parse(&raw).map_err(D::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer, de::Error};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        // Empty strings show up in older files and mean "never".
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) if !raw.is_empty() => super::parse(&raw).map(Some).map_err(D::Error::custom),
                _ => Ok(None),
            }
        }
    }
}
