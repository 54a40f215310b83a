//! Tracks and the join tables linking events to tracks and speakers.

use serde::{Deserialize, Serialize};

use super::row::{null_as_default, Record, Table};

/// One row of the `tracks` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: i64,
    #[serde(rename = "nombre", alias = "name", default, deserialize_with = "null_as_default")]
    pub name: String,
}

impl Record for TrackRecord {
    type Key = i64;
    const TABLE: Table = Table::Tracks;

    fn key(&self) -> i64 {
        self.id
    }
}

/// `event_tracks` join row. The backend does not enforce uniqueness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTrack {
    pub event_id: i64,
    pub track_id: i64,
}

impl Record for EventTrack {
    type Key = (i64, i64);
    const TABLE: Table = Table::EventTracks;

    fn key(&self) -> (i64, i64) {
        (self.event_id, self.track_id)
    }
}

/// Legacy `event_speakers` join row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSpeaker {
    pub event_id: i64,
    pub speaker_id: i64,
}

impl Record for EventSpeaker {
    type Key = (i64, i64);
    const TABLE: Table = Table::EventSpeakers;

    fn key(&self) -> (i64, i64) {
        (self.event_id, self.speaker_id)
    }
}
