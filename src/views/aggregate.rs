//! Derived statistics. Everything here is a pure function of its inputs.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use super::resolver::{name_key, LinkIndex, NameIndex};
use crate::models::{
    Event, EventRecord, FeedbackRecord, Occupancy, OccupancyStatus, Speaker, TrackBucket,
    TrackHistogram, OTHER_CATEGORY,
};

/// Occupancy at or above this percentage reads as almost full.
pub const ALMOST_FULL_PERCENT: f64 = 80.0;

/// Window used for the dashboard's recent activity counter.
pub const RECENT_ACTIVITY_DAYS: i64 = 7;

/// Length of the dashboard's upcoming events strip.
pub const UPCOMING_LIMIT: usize = 5;

/// Length of the dashboard's top speakers list.
pub const TOP_SPEAKERS_LIMIT: usize = 4;

/// Count and mean of a set of ratings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatingSummary {
    pub count: usize,
    pub sum: i64,
}

impl RatingSummary {
    pub fn from_ratings<I: IntoIterator<Item = i64>>(ratings: I) -> Self {
        ratings.into_iter().fold(Self::default(), |mut acc, rating| {
            acc.count += 1;
            acc.sum += rating;
            acc
        })
    }

    /// Arithmetic mean, `0.0` when there is nothing to average.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }

    pub fn merge(&mut self, other: &RatingSummary) {
        self.count += other.count;
        self.sum += other.sum;
    }
}

/// One rating summary per event id.
pub fn ratings_by_event(feedback: &[FeedbackRecord]) -> HashMap<i64, RatingSummary> {
    let mut by_event: HashMap<i64, RatingSummary> = HashMap::new();
    for f in feedback {
        let entry = by_event.entry(f.event_id).or_default();
        entry.count += 1;
        entry.sum += f.rating;
    }
    by_event
}

/// Subscribers over capacity. A capacity of zero or less yields an unknown
/// occupancy rather than a division by zero.
pub fn occupancy(subscribers: i64, max_participants: i64) -> Occupancy {
    if max_participants <= 0 {
        return Occupancy {
            rate: None,
            percent: None,
            spots_left: None,
            status: OccupancyStatus::Unknown,
        };
    }

    let subscribers = subscribers.max(0);
    let rate = subscribers as f64 / max_participants as f64;
    let percent = rate * 100.0;
    let status = if subscribers >= max_participants {
        OccupancyStatus::Full
    } else if percent >= ALMOST_FULL_PERCENT {
        OccupancyStatus::AlmostFull
    } else {
        OccupancyStatus::Available
    };

    Occupancy {
        rate: Some(rate),
        percent: Some(percent.round() as u32),
        spots_left: Some((max_participants - subscribers).max(0)),
        status,
    }
}

/// Legacy topic of an event, or [`OTHER_CATEGORY`] when blank.
pub fn category_of(event: &EventRecord) -> &str {
    let topic = event.topic.trim();
    if topic.is_empty() {
        OTHER_CATEGORY
    } else {
        topic
    }
}

/// Events per legacy topic. Every event lands in exactly one bucket.
pub fn category_counts(events: &[EventRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for event in events {
        *counts.entry(category_of(event).to_string()).or_insert(0) += 1;
    }
    counts
}

/// Events, subscribers and capacity per track. An event with no resolvable
/// track goes to `uncategorized`, so every event is counted at least once
/// (exactly once unless it sits on several tracks). Track names are matched
/// case-insensitively, the first spelling seen names the bucket, and buckets
/// are sorted by name.
pub fn track_histogram(
    events: &[EventRecord],
    event_tracks: &LinkIndex,
    tracks: &NameIndex,
) -> TrackHistogram {
    let mut buckets: BTreeMap<String, TrackBucket> = BTreeMap::new();
    let mut uncategorized = 0;

    for event in events {
        let mut seen = HashSet::new();
        let names: Vec<&str> = event_tracks
            .targets(event.id)
            .iter()
            .filter_map(|id| tracks.get(*id))
            .filter(|name| seen.insert(name_key(name)))
            .collect();

        if names.is_empty() {
            uncategorized += 1;
            continue;
        }

        for name in names {
            let bucket = buckets
                .entry(name_key(name))
                .or_insert_with(|| TrackBucket {
                    name: name.to_string(),
                    events: 0,
                    subscribers: 0,
                    capacity: 0,
                });
            bucket.events += 1;
            bucket.subscribers += event.subscriber_count.max(0);
            bucket.capacity += event.max_participants.max(0);
        }
    }

    TrackHistogram {
        buckets: buckets.into_values().collect(),
        uncategorized,
    }
}

/// `(upcoming, past)` relative to `today`. Events with an unparsable date
/// count as neither.
pub fn schedule_counts(events: &[EventRecord], today: NaiveDate) -> (usize, usize) {
    events
        .iter()
        .filter_map(|event| parse_event_date(&event.date))
        .fold((0, 0), |(upcoming, past), date| {
            if date >= today {
                (upcoming + 1, past)
            } else {
                (upcoming, past + 1)
            }
        })
}

/// Feedback created at or after `days` days before `now`. Timestamps ahead
/// of `now` (client clock skew) still count.
pub fn recent_activity(feedback: &[FeedbackRecord], now: DateTime<Utc>, days: i64) -> usize {
    let since = now - Duration::days(days);
    feedback
        .iter()
        .filter_map(|f| f.created_at.as_deref().and_then(parse_timestamp))
        .filter(|at| *at >= since)
        .count()
}

/// Events dated `today` or later, soonest first, at most `limit`.
pub fn next_events(events: &[Event], today: NaiveDate, limit: usize) -> Vec<Event> {
    let mut upcoming: Vec<(NaiveDate, &Event)> = events
        .iter()
        .filter_map(|e| parse_event_date(&e.date).map(|date| (date, e)))
        .filter(|(date, _)| *date >= today)
        .collect();
    upcoming.sort_by(|(da, a), (db, b)| {
        da.cmp(db)
            .then_with(|| a.start_time.cmp(&b.start_time))
            .then(a.id.cmp(&b.id))
    });
    upcoming
        .into_iter()
        .take(limit)
        .map(|(_, e)| e.clone())
        .collect()
}

/// Highest rated speakers first, ties broken by event count, at most `limit`.
pub fn top_speakers(speakers: &[Speaker], limit: usize) -> Vec<Speaker> {
    let mut ranked: Vec<&Speaker> = speakers.iter().collect();
    ranked.sort_by(|a, b| {
        b.rating
            .total_cmp(&a.rating)
            .then(b.event_count.cmp(&a.event_count))
            .then(a.id.cmp(&b.id))
    });
    ranked.into_iter().take(limit).cloned().collect()
}

/// `YYYY-MM-DD`, optionally followed by a time part.
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (read as UTC), or a bare date.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(at.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
}
