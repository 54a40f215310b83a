//! Denormalized view-models handed to the presentation layer.
//!
//! Field names serialize in camelCase to match the app's TypeScript types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Modality, Table};

/// Category of events whose legacy topic is blank.
pub const OTHER_CATEGORY: &str = "Other";

/// How full an event is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OccupancyStatus {
    Full,
    AlmostFull,
    Available,
    /// No usable capacity on the row
    Unknown,
}

/// Subscribers relative to capacity. All fields are `None` when the capacity
/// is zero or negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Occupancy {
    pub rate: Option<f64>,
    pub percent: Option<u32>,
    pub spots_left: Option<i64>,
    pub status: OccupancyStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub entry_id: String,
    pub title: String,
    pub description: String,
    /// Legacy topic, or [`OTHER_CATEGORY`] when blank
    pub category: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    /// `"HH:MM - HH:MM"`
    pub time: String,
    pub venue: Option<String>,
    pub modality: Option<Modality>,
    pub platform: Option<String>,
    pub image_url: String,
    pub main_speaker: Option<String>,
    pub guest_speakers: Vec<String>,
    /// Main speaker, guests and legacy linked speakers, de-duplicated
    pub speakers: Vec<String>,
    /// Rows of the `speakers` table this event resolves to
    pub speaker_ids: Vec<i64>,
    pub tracks: Vec<String>,
    pub track_ids: Vec<i64>,
    pub rating: f64,
    pub rating_count: usize,
    pub subscriber_count: i64,
    pub max_participants: i64,
    pub occupancy: Occupancy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Speaker {
    pub id: i64,
    pub entry_id: String,
    pub name: String,
    pub role: Option<String>,
    pub bio: Option<String>,
    pub event_count: usize,
    pub event_ids: Vec<i64>,
    /// Mean rating over the feedback of all the speaker's events
    pub rating: f64,
    pub rating_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackView {
    pub id: i64,
    pub event_id: i64,
    /// Empty when the event row no longer exists
    pub event_name: String,
    pub rating: i64,
    pub comment: String,
    pub date: Option<String>,
}

/// Events attributed to one track.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackBucket {
    pub name: String,
    pub events: usize,
    pub subscribers: i64,
    pub capacity: i64,
}

/// Per-track histogram plus the events that resolved to no track.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackHistogram {
    pub buckets: Vec<TrackBucket>,
    pub uncategorized: usize,
}

/// Capacity row of the dashboard subscriptions table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSubscription {
    pub id: i64,
    pub name: String,
    pub date: String,
    pub subscribers: i64,
    pub max_participants: i64,
    pub occupancy: Occupancy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_events: usize,
    pub total_speakers: usize,
    pub total_feedbacks: usize,
    pub average_rating: f64,
    pub upcoming_events: usize,
    pub past_events: usize,
    pub events_by_category: BTreeMap<String, usize>,
    pub events_by_track: TrackHistogram,
    /// Feedback left during the last seven days
    pub recent_activity: usize,
    pub total_subscriptions: i64,
    /// Next events from today on, soonest first
    pub upcoming: Vec<Event>,
    /// Best rated speakers, ties broken by event count
    pub top_speakers: Vec<Speaker>,
}

/// An event with its speakers and feedback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    pub event: Event,
    pub speakers: Vec<Speaker>,
    pub feedback: Vec<FeedbackView>,
}

/// A speaker with the events they appear in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerDetail {
    pub speaker: Speaker,
    pub events: Vec<Event>,
}

/// Everything one refresh cycle produced. Replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub generation: u64,
    pub fetched_at: DateTime<Utc>,
    pub events: Vec<Event>,
    pub speakers: Vec<Speaker>,
    pub feedback: Vec<FeedbackView>,
    pub subscriptions: Vec<EventSubscription>,
    pub dashboard: DashboardStats,
    /// Tables whose fetch failed this cycle; their derived fields are degraded
    pub degraded: Vec<Table>,
}
