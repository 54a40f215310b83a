//! Read-only queries over a published snapshot.

use std::cmp::Ordering;

use serde::Deserialize;

use super::aggregate::parse_timestamp;
use crate::models::{Event, EventDetail, FeedbackView, Snapshot, Speaker, SpeakerDetail};

/// Event list filter. Empty fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFilter {
    /// Case-insensitive substring of the title or description
    #[serde(default)]
    pub search: Option<String>,
    /// Legacy topic or track name, case-insensitive
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackSort {
    #[default]
    Date,
    Rating,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Feedback list query. Defaults to newest first.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackQuery {
    #[serde(default)]
    pub event_id: Option<i64>,
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub sort_by: FeedbackSort,
    #[serde(default)]
    pub order: SortOrder,
}

impl Snapshot {
    pub fn event(&self, id: i64) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn speaker(&self, id: i64) -> Option<&Speaker> {
        self.speakers.iter().find(|s| s.id == id)
    }

    pub fn events_matching(&self, filter: &EventFilter) -> Vec<Event> {
        let search = normalized(&filter.search);
        let category = normalized(&filter.category);

        self.events
            .iter()
            .filter(|event| {
                search.as_deref().map_or(true, |q| {
                    event.title.to_lowercase().contains(q)
                        || event.description.to_lowercase().contains(q)
                })
            })
            .filter(|event| {
                category.as_deref().map_or(true, |c| {
                    event.category.to_lowercase() == c
                        || event.tracks.iter().any(|t| t.to_lowercase() == c)
                })
            })
            .cloned()
            .collect()
    }

    /// The event with its resolved speakers and its feedback, newest first.
    pub fn event_detail(&self, id: i64) -> Option<EventDetail> {
        let event = self.event(id)?.clone();
        let speakers = event
            .speaker_ids
            .iter()
            .filter_map(|sid| self.speaker(*sid))
            .cloned()
            .collect();
        let feedback = self.feedback_matching(&FeedbackQuery {
            event_id: Some(id),
            ..Default::default()
        });

        Some(EventDetail {
            event,
            speakers,
            feedback,
        })
    }

    /// Speakers whose name or role contains `search`, case-insensitive.
    pub fn speakers_matching(&self, search: Option<&str>) -> Vec<Speaker> {
        let search = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        self.speakers
            .iter()
            .filter(|speaker| {
                search.as_deref().map_or(true, |q| {
                    speaker.name.to_lowercase().contains(q)
                        || speaker
                            .role
                            .as_deref()
                            .is_some_and(|r| r.to_lowercase().contains(q))
                })
            })
            .cloned()
            .collect()
    }

    pub fn speaker_detail(&self, id: i64) -> Option<SpeakerDetail> {
        let speaker = self.speaker(id)?.clone();
        let events = speaker
            .event_ids
            .iter()
            .filter_map(|eid| self.event(*eid))
            .cloned()
            .collect();

        Some(SpeakerDetail { speaker, events })
    }

    /// Filtered and sorted feedback. Entries without a date sort last in
    /// either direction.
    pub fn feedback_matching(&self, query: &FeedbackQuery) -> Vec<FeedbackView> {
        let mut items: Vec<FeedbackView> = self
            .feedback
            .iter()
            .filter(|f| query.event_id.map_or(true, |id| f.event_id == id))
            .filter(|f| query.rating.map_or(true, |r| f.rating == r))
            .cloned()
            .collect();

        match query.sort_by {
            FeedbackSort::Rating => {
                items.sort_by(|a, b| directed(a.rating.cmp(&b.rating), query.order))
            }
            FeedbackSort::Date => items.sort_by(|a, b| {
                let a = a.date.as_deref().and_then(parse_timestamp);
                let b = b.date.as_deref().and_then(parse_timestamp);
                match (a, b) {
                    (Some(a), Some(b)) => directed(a.cmp(&b), query.order),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            }),
        }
        items
    }
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

fn normalized(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}
