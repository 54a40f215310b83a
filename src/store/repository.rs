//! Repository over the UniDB tables.
//!
//! Reads come back typed and de-duplicated. Writes reproduce what the app's
//! screens did by hand: cascading link cleanup on delete and `event_tracks`
//! synchronisation on update.

use chrono::Utc;
use serde_json::Value;

use super::UniDbClient;
use crate::errors::ClientError;
use crate::models::{
    decode_rows, EventRecord, EventRequest, EventSpeaker, EventTrack, FeedbackRecord,
    FeedbackRequest, Record, Row, SpeakerRecord, SpeakerRequest, Table, TrackRecord,
    MAX_PARTICIPANTS_LIMIT, MAX_RATING, MIN_RATING,
};
use crate::views::dedup_rows;

/// Outcome of one concurrent fetch of every table. Each table keeps its own
/// result so one failing endpoint does not take the others down.
#[derive(Debug)]
pub struct TableSet {
    pub events: Result<Vec<Row<EventRecord>>, ClientError>,
    pub speakers: Result<Vec<Row<SpeakerRecord>>, ClientError>,
    pub tracks: Result<Vec<Row<TrackRecord>>, ClientError>,
    pub event_tracks: Result<Vec<Row<EventTrack>>, ClientError>,
    pub event_speakers: Result<Vec<Row<EventSpeaker>>, ClientError>,
    pub feedbacks: Result<Vec<Row<FeedbackRecord>>, ClientError>,
}

impl TableSet {
    /// Tables whose fetch failed, with the reason.
    pub fn failures(&self) -> Vec<(Table, &ClientError)> {
        let results = [
            (Table::Events, self.events.as_ref().err()),
            (Table::Speakers, self.speakers.as_ref().err()),
            (Table::Tracks, self.tracks.as_ref().err()),
            (Table::EventTracks, self.event_tracks.as_ref().err()),
            (Table::EventSpeakers, self.event_speakers.as_ref().err()),
            (Table::Feedbacks, self.feedbacks.as_ref().err()),
        ];
        results
            .into_iter()
            .filter_map(|(table, err)| err.map(|e| (table, e)))
            .collect()
    }

    pub fn all_failed(&self) -> bool {
        self.failures().len() == Table::ALL.len()
    }
}

/// Typed access to every conference table.
#[derive(Clone)]
pub struct Repository {
    client: UniDbClient,
}

impl Repository {
    pub fn new(client: UniDbClient) -> Self {
        Self { client }
    }

    /// All rows of `T`'s table exactly as stored, duplicates included.
    pub async fn list_raw<T: Record>(&self) -> Result<Vec<Row<T>>, ClientError> {
        let body = self.client.list(T::TABLE).await?;
        Ok(decode_rows(body))
    }

    /// All rows of `T`'s table, one per key, first occurrence wins.
    pub async fn list<T: Record>(&self) -> Result<Vec<Row<T>>, ClientError> {
        Ok(dedup_rows(self.list_raw().await?))
    }

    /// Fetch every table concurrently and wait for all of them.
    pub async fn fetch_all(&self) -> TableSet {
        let (events, speakers, tracks, event_tracks, event_speakers, feedbacks) = tokio::join!(
            self.list::<EventRecord>(),
            self.list::<SpeakerRecord>(),
            self.list::<TrackRecord>(),
            self.list::<EventTrack>(),
            self.list::<EventSpeaker>(),
            self.list::<FeedbackRecord>(),
        );

        TableSet {
            events,
            speakers,
            tracks,
            event_tracks,
            event_speakers,
            feedbacks,
        }
    }

    // ==================== EVENT OPERATIONS ====================

    /// Get an event row by domain id.
    pub async fn get_event(&self, id: i64) -> Result<Option<Row<EventRecord>>, ClientError> {
        let rows = self.list::<EventRecord>().await?;
        Ok(rows.into_iter().find(|row| row.data.id == id))
    }

    /// Create an event and link its tracks.
    pub async fn create_event(
        &self,
        request: &EventRequest,
    ) -> Result<Row<EventRecord>, ClientError> {
        validate_event(request)?;

        let (events, tracks) = tokio::try_join!(
            self.list::<EventRecord>(),
            self.list::<TrackRecord>()
        )?;
        check_tracks_exist(&request.track_ids, &tracks)?;

        let id = next_id(events.iter().map(|row| row.data.id));
        let record = request.to_record(id, 0);
        let echo = self.client.store(Table::Events, &record).await?;

        let mut entry_id = entry_id_from(&echo);
        if entry_id.is_none() {
            entry_id = self.get_event(id).await?.map(|row| row.entry_id);
        }

        self.sync_event_tracks(id, &request.track_ids).await?;

        tracing::info!("Created event {} ({})", id, record.title);
        Ok(Row {
            entry_id: entry_id.unwrap_or_default(),
            data: record,
        })
    }

    /// Replace an event's row and re-synchronise its tracks. The subscriber
    /// count on the stored row is preserved.
    pub async fn update_event(
        &self,
        id: i64,
        request: &EventRequest,
    ) -> Result<Row<EventRecord>, ClientError> {
        validate_event(request)?;

        let (existing, tracks) = tokio::try_join!(self.get_event(id), self.list::<TrackRecord>())?;
        let existing =
            existing.ok_or_else(|| ClientError::NotFound(format!("Event {} not found", id)))?;
        check_tracks_exist(&request.track_ids, &tracks)?;

        let record = request.to_record(id, existing.data.subscriber_count);
        self.client
            .update(Table::Events, &existing.entry_id, &record)
            .await?;

        self.sync_event_tracks(id, &request.track_ids).await?;

        tracing::info!("Updated event {}", id);
        Ok(Row {
            entry_id: existing.entry_id,
            data: record,
        })
    }

    /// Delete an event, every duplicate row of it, and its link rows.
    pub async fn delete_event(&self, id: i64) -> Result<(), ClientError> {
        let rows: Vec<Row<EventRecord>> = self
            .list_raw::<EventRecord>()
            .await?
            .into_iter()
            .filter(|row| row.data.id == id)
            .collect();

        if rows.is_empty() {
            return Err(ClientError::NotFound(format!("Event {} not found", id)));
        }

        self.delete_where::<EventTrack, _>(|link| link.event_id == id)
            .await?;
        self.delete_where::<EventSpeaker, _>(|link| link.event_id == id)
            .await?;

        for row in &rows {
            self.client.delete(Table::Events, &row.entry_id).await?;
        }

        tracing::info!("Deleted event {} ({} rows)", id, rows.len());
        Ok(())
    }

    /// Take one seat. Refused when the event is full.
    pub async fn subscribe(&self, id: i64) -> Result<EventRecord, ClientError> {
        let row = self
            .get_event(id)
            .await?
            .ok_or_else(|| ClientError::NotFound(format!("Event {} not found", id)))?;

        let mut record = row.data;
        if record.max_participants > 0 && record.subscriber_count >= record.max_participants {
            return Err(ClientError::Conflict(format!(
                "Event {} is full ({}/{})",
                id, record.subscriber_count, record.max_participants
            )));
        }

        record.subscriber_count += 1;
        self.client
            .update(Table::Events, &row.entry_id, &record)
            .await?;
        Ok(record)
    }

    /// Release one seat; never drops below zero.
    pub async fn unsubscribe(&self, id: i64) -> Result<EventRecord, ClientError> {
        let row = self
            .get_event(id)
            .await?
            .ok_or_else(|| ClientError::NotFound(format!("Event {} not found", id)))?;

        let mut record = row.data;
        record.subscriber_count = (record.subscriber_count - 1).max(0);
        self.client
            .update(Table::Events, &row.entry_id, &record)
            .await?;
        Ok(record)
    }

    /// Make the event's `event_tracks` rows exactly `wanted`: stale and
    /// duplicate links are deleted, missing ones inserted.
    async fn sync_event_tracks(&self, event_id: i64, wanted: &[i64]) -> Result<(), ClientError> {
        let links = self.list_raw::<EventTrack>().await?;

        let mut kept: Vec<i64> = Vec::new();
        for row in links.iter().filter(|row| row.data.event_id == event_id) {
            let track_id = row.data.track_id;
            if wanted.contains(&track_id) && !kept.contains(&track_id) {
                kept.push(track_id);
            } else {
                self.client.delete(Table::EventTracks, &row.entry_id).await?;
            }
        }

        let mut inserted: Vec<i64> = Vec::new();
        for &track_id in wanted {
            if kept.contains(&track_id) || inserted.contains(&track_id) {
                continue;
            }
            self.client
                .store(Table::EventTracks, &EventTrack { event_id, track_id })
                .await?;
            inserted.push(track_id);
        }
        Ok(())
    }

    // ==================== SPEAKER OPERATIONS ====================

    /// Create a speaker.
    pub async fn create_speaker(
        &self,
        request: &SpeakerRequest,
    ) -> Result<Row<SpeakerRecord>, ClientError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ClientError::Validation("Speaker name is required".to_string()));
        }

        let speakers = self.list::<SpeakerRecord>().await?;
        let record = SpeakerRecord {
            id: next_id(speakers.iter().map(|row| row.data.id)),
            name: name.to_string(),
            role: request.role.clone(),
            bio: request.bio.clone(),
        };

        let echo = self.client.store(Table::Speakers, &record).await?;
        tracing::info!("Created speaker {} ({})", record.id, record.name);
        Ok(Row {
            entry_id: entry_id_from(&echo).unwrap_or_default(),
            data: record,
        })
    }

    /// Delete a speaker and their legacy `event_speakers` links.
    pub async fn delete_speaker(&self, id: i64) -> Result<(), ClientError> {
        let rows: Vec<Row<SpeakerRecord>> = self
            .list_raw::<SpeakerRecord>()
            .await?
            .into_iter()
            .filter(|row| row.data.id == id)
            .collect();

        if rows.is_empty() {
            return Err(ClientError::NotFound(format!("Speaker {} not found", id)));
        }

        self.delete_where::<EventSpeaker, _>(|link| link.speaker_id == id)
            .await?;
        for row in &rows {
            self.client.delete(Table::Speakers, &row.entry_id).await?;
        }

        tracing::info!("Deleted speaker {}", id);
        Ok(())
    }

    // ==================== FEEDBACK OPERATIONS ====================

    /// Leave feedback on an existing event.
    pub async fn create_feedback(
        &self,
        request: &FeedbackRequest,
    ) -> Result<Row<FeedbackRecord>, ClientError> {
        if !(MIN_RATING..=MAX_RATING).contains(&request.rating) {
            return Err(ClientError::Validation(format!(
                "Rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }

        let (event, feedbacks) = tokio::try_join!(
            self.get_event(request.event_id),
            self.list::<FeedbackRecord>()
        )?;
        if event.is_none() {
            return Err(ClientError::NotFound(format!(
                "Event {} not found",
                request.event_id
            )));
        }

        let record = FeedbackRecord {
            id: next_id(feedbacks.iter().map(|row| row.data.id)),
            event_id: request.event_id,
            rating: request.rating,
            comment: request.comment.trim().to_string(),
            created_at: Some(Utc::now().to_rfc3339()),
        };

        let echo = self.client.store(Table::Feedbacks, &record).await?;
        Ok(Row {
            entry_id: entry_id_from(&echo).unwrap_or_default(),
            data: record,
        })
    }

    /// Delete every row of `T`'s table matching `pred`, duplicates included.
    async fn delete_where<T, F>(&self, pred: F) -> Result<usize, ClientError>
    where
        T: Record,
        F: Fn(&T) -> bool,
    {
        let rows = self.list_raw::<T>().await?;
        let mut deleted = 0;
        for row in rows.iter().filter(|row| pred(&row.data)) {
            self.client.delete(T::TABLE, &row.entry_id).await?;
            deleted += 1;
        }
        if deleted > 0 {
            tracing::debug!("Deleted {} rows from {}", deleted, T::TABLE);
        }
        Ok(deleted)
    }
}

// Helper functions

fn validate_event(request: &EventRequest) -> Result<(), ClientError> {
    if request.title.trim().is_empty() {
        return Err(ClientError::Validation("Title is required".to_string()));
    }
    if request.max_participants < 1 {
        return Err(ClientError::Validation(
            "Max participants must be at least 1".to_string(),
        ));
    }
    if request.max_participants > MAX_PARTICIPANTS_LIMIT {
        return Err(ClientError::Validation(format!(
            "Max participants cannot exceed {}",
            MAX_PARTICIPANTS_LIMIT
        )));
    }
    Ok(())
}

fn check_tracks_exist(wanted: &[i64], tracks: &[Row<TrackRecord>]) -> Result<(), ClientError> {
    match wanted
        .iter()
        .find(|id| !tracks.iter().any(|row| row.data.id == **id))
    {
        Some(missing) => Err(ClientError::Validation(format!(
            "Track {} does not exist",
            missing
        ))),
        None => Ok(()),
    }
}

/// Next free domain id: one past the largest in use.
fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().map_or(1, |max| max + 1)
}

fn entry_id_from(echo: &Value) -> Option<String> {
    match echo.get("entry_id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
