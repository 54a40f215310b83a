//! Speaker rows as stored in the `speakers` table.

use serde::{Deserialize, Serialize};

use super::row::{null_as_default, Record, Table};

/// One row of the `speakers` table.
///
/// `role` and `bio` are display fields the app does not persist consistently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerRecord {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl Record for SpeakerRecord {
    type Key = i64;
    const TABLE: Table = Table::Speakers;

    fn key(&self) -> i64 {
        self.id
    }
}

/// Request body for creating a speaker.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeakerRequest {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}
