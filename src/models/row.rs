//! Row envelope and table plumbing shared by every UniDB table.

use std::fmt;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::ClientError;

/// Tables consumed by the conference app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Events,
    Speakers,
    Tracks,
    EventTracks,
    EventSpeakers,
    Feedbacks,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::Events,
        Table::Speakers,
        Table::Tracks,
        Table::EventTracks,
        Table::EventSpeakers,
        Table::Feedbacks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Events => "events",
            Table::Speakers => "speakers",
            Table::Tracks => "tracks",
            Table::EventTracks => "event_tracks",
            Table::EventSpeakers => "event_speakers",
            Table::Feedbacks => "feedbacks",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend row envelope: opaque `entry_id` plus the table payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row<T> {
    pub entry_id: String,
    pub data: T,
}

/// A typed table payload.
pub trait Record: DeserializeOwned + Serialize + Clone {
    /// Identity used to collapse duplicate rows within a fetch cycle.
    type Key: Eq + Hash + Clone + fmt::Debug;

    const TABLE: Table;

    fn key(&self) -> Self::Key;

    /// Semantic checks the type system cannot express.
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

impl<T: Record> Row<T> {
    /// Parse one envelope into a typed row.
    pub fn parse(value: Value) -> Result<Self, ClientError> {
        let row: Row<T> = serde_json::from_value(value).map_err(|e| ClientError::Decode {
            table: T::TABLE,
            message: e.to_string(),
        })?;
        row.data.check().map_err(|message| ClientError::Decode {
            table: T::TABLE,
            message,
        })?;
        Ok(row)
    }
}

/// Decode a list response. A body without a `data` array reads as an empty
/// table; rows that fail the schema are logged and skipped.
pub fn decode_rows<T: Record>(body: Value) -> Vec<Row<T>> {
    let items = match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => {
                tracing::warn!("{} response has no data array, treating as empty", T::TABLE);
                return Vec::new();
            }
        },
        _ => {
            tracing::warn!("{} response is not a JSON object, treating as empty", T::TABLE);
            return Vec::new();
        }
    };

    let total = items.len();
    let rows: Vec<Row<T>> = items
        .into_iter()
        .filter_map(|item| match Row::<T>::parse(item) {
            Ok(row) => Some(row),
            Err(e) => {
                tracing::warn!("Skipping row: {}", e);
                None
            }
        })
        .collect();

    if rows.len() < total {
        tracing::debug!("{}: kept {} of {} rows", T::TABLE, rows.len(), total);
    }
    rows
}

/// Body of `POST /data/store`.
#[derive(Debug, Serialize)]
pub struct StoreRequest<'a, T: Serialize> {
    pub table_name: &'a str,
    pub data: &'a T,
}

/// Body of `PUT /data/{table}/update/{entry_id}`.
#[derive(Debug, Serialize)]
pub struct UpdateRequest<'a, T: Serialize> {
    pub data: &'a T,
}

/// Reads JSON `null` as the type's default; the backend stores nulls freely.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
