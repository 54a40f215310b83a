//! View-model assembler.
//!
//! [`assemble`] turns one fetch cycle's tables into a [`Snapshot`] and never
//! fails: missing tables only degrade the fields derived from them.
//! [`Assembler`] owns the refresh lifecycle around it: concurrent fetch,
//! latest-wins publication and shutdown.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::aggregate::{
    category_counts, category_of, next_events, occupancy, ratings_by_event, recent_activity,
    schedule_counts, top_speakers, track_histogram, RatingSummary, RECENT_ACTIVITY_DAYS,
    TOP_SPEAKERS_LIMIT, UPCOMING_LIMIT,
};
use super::resolver::{name_key, resolve_ids, resolve_names, sanitize_names, LinkIndex, NameIndex};
use crate::errors::ClientError;
use crate::models::{
    DashboardStats, Event, EventRecord, EventSubscription, FeedbackRecord, FeedbackView, Record,
    Row, Snapshot, Speaker, SpeakerRecord,
};
use crate::store::{Repository, TableSet};

// ==================== PURE ASSEMBLY ====================

fn records<T: Record>(rows: &Result<Vec<Row<T>>, ClientError>) -> &[Row<T>] {
    rows.as_deref().unwrap_or(&[])
}

/// Build every view-model of one cycle. Indexes are built once up front and
/// shared by all entities.
pub fn assemble(tables: &TableSet, generation: u64, now: DateTime<Utc>) -> Snapshot {
    let event_rows = records(&tables.events);
    let speaker_rows = records(&tables.speakers);
    let feedback_rows = records(&tables.feedbacks);

    let event_records: Vec<EventRecord> = event_rows.iter().map(|r| r.data.clone()).collect();
    let feedback_records: Vec<FeedbackRecord> =
        feedback_rows.iter().map(|r| r.data.clone()).collect();

    let track_names = NameIndex::new(
        records(&tables.tracks)
            .iter()
            .map(|r| (r.data.id, r.data.name.as_str())),
    );
    let speaker_names = NameIndex::new(
        speaker_rows
            .iter()
            .map(|r| (r.data.id, r.data.name.as_str())),
    );
    let event_tracks = LinkIndex::from_pairs(
        records(&tables.event_tracks)
            .iter()
            .map(|r| (r.data.event_id, r.data.track_id)),
    );
    let event_speakers = LinkIndex::from_pairs(
        records(&tables.event_speakers)
            .iter()
            .map(|r| (r.data.event_id, r.data.speaker_id)),
    );

    let mut speakers_by_name: HashMap<String, i64> = HashMap::new();
    for row in speaker_rows {
        let key = name_key(&row.data.name);
        if !key.is_empty() {
            speakers_by_name.entry(key).or_insert(row.data.id);
        }
    }

    let ratings = ratings_by_event(&feedback_records);

    let events: Vec<Event> = event_rows
        .iter()
        .map(|row| {
            build_event(
                row,
                &track_names,
                &event_tracks,
                &speaker_names,
                &event_speakers,
                &speakers_by_name,
                ratings.get(&row.data.id).copied().unwrap_or_default(),
            )
        })
        .collect();

    // speaker -> events, derived from the already resolved events
    let events_by_speaker = LinkIndex::from_pairs(
        events
            .iter()
            .flat_map(|e| e.speaker_ids.iter().map(move |sid| (e.id, *sid))),
    )
    .inverted();

    let speakers: Vec<Speaker> = speaker_rows
        .iter()
        .map(|row| build_speaker(row, &events_by_speaker, &ratings))
        .collect();

    let titles: HashMap<i64, &str> = event_records
        .iter()
        .map(|e| (e.id, e.title.as_str()))
        .collect();
    let feedback: Vec<FeedbackView> = feedback_records
        .iter()
        .map(|f| FeedbackView {
            id: f.id,
            event_id: f.event_id,
            event_name: titles.get(&f.event_id).copied().unwrap_or_default().to_string(),
            rating: f.rating,
            comment: f.comment.clone(),
            date: f.created_at.clone(),
        })
        .collect();

    let mut subscriptions: Vec<EventSubscription> = events
        .iter()
        .map(|e| EventSubscription {
            id: e.id,
            name: e.title.clone(),
            date: e.date.clone(),
            subscribers: e.subscriber_count,
            max_participants: e.max_participants,
            occupancy: e.occupancy.clone(),
        })
        .collect();
    subscriptions.sort_by(|a, b| b.subscribers.cmp(&a.subscribers).then(a.id.cmp(&b.id)));

    let (upcoming_events, past_events) = schedule_counts(&event_records, now.date_naive());
    let dashboard = DashboardStats {
        total_events: events.len(),
        total_speakers: speakers.len(),
        total_feedbacks: feedback.len(),
        average_rating: RatingSummary::from_ratings(feedback_records.iter().map(|f| f.rating))
            .average(),
        upcoming_events,
        past_events,
        events_by_category: category_counts(&event_records),
        events_by_track: track_histogram(&event_records, &event_tracks, &track_names),
        recent_activity: recent_activity(&feedback_records, now, RECENT_ACTIVITY_DAYS),
        total_subscriptions: events.iter().map(|e| e.subscriber_count.max(0)).sum(),
        upcoming: next_events(&events, now.date_naive(), UPCOMING_LIMIT),
        top_speakers: top_speakers(&speakers, TOP_SPEAKERS_LIMIT),
    };

    Snapshot {
        generation,
        fetched_at: now,
        events,
        speakers,
        feedback,
        subscriptions,
        dashboard,
        degraded: tables.failures().into_iter().map(|(t, _)| t).collect(),
    }
}

fn build_event(
    row: &Row<EventRecord>,
    track_names: &NameIndex,
    event_tracks: &LinkIndex,
    speaker_names: &NameIndex,
    event_speakers: &LinkIndex,
    speakers_by_name: &HashMap<String, i64>,
    rating: RatingSummary,
) -> Event {
    let record = &row.data;
    let guest_speakers = sanitize_names(record.guest_speakers.iter().map(|g| g.as_deref()));

    let named: Vec<String> = sanitize_names(
        std::iter::once(record.main_speaker.as_deref())
            .chain(guest_speakers.iter().map(|g| Some(g.as_str()))),
    );
    let linked = resolve_names(event_speakers, record.id, speaker_names);
    let speakers = sanitize_names(named.iter().chain(linked.iter()).map(Some));

    let mut seen = HashSet::new();
    let speaker_ids: Vec<i64> = resolve_ids(event_speakers, record.id, speaker_names)
        .into_iter()
        .chain(
            named
                .iter()
                .filter_map(|name| speakers_by_name.get(&name_key(name)).copied()),
        )
        .filter(|id| seen.insert(*id))
        .collect();

    Event {
        id: record.id,
        entry_id: row.entry_id.clone(),
        title: record.title.clone(),
        description: record.description.clone(),
        category: category_of(record).to_string(),
        date: record.date.clone(),
        start_time: record.start_time.clone(),
        end_time: record.end_time.clone(),
        time: time_range(&record.start_time, &record.end_time),
        venue: record.venue.clone(),
        modality: record.modality,
        platform: record.platform.clone(),
        image_url: record.image_url.clone(),
        main_speaker: sanitize_names([record.main_speaker.as_deref()]).pop(),
        guest_speakers,
        speakers,
        speaker_ids,
        tracks: resolve_names(event_tracks, record.id, track_names),
        track_ids: resolve_ids(event_tracks, record.id, track_names),
        rating: rating.average(),
        rating_count: rating.count,
        subscriber_count: record.subscriber_count,
        max_participants: record.max_participants,
        occupancy: occupancy(record.subscriber_count, record.max_participants),
    }
}

fn build_speaker(
    row: &Row<SpeakerRecord>,
    events_by_speaker: &LinkIndex,
    ratings: &HashMap<i64, RatingSummary>,
) -> Speaker {
    let event_ids = events_by_speaker.targets(row.data.id).to_vec();
    let mut rating = RatingSummary::default();
    for id in &event_ids {
        if let Some(summary) = ratings.get(id) {
            rating.merge(summary);
        }
    }

    Speaker {
        id: row.data.id,
        entry_id: row.entry_id.clone(),
        name: row.data.name.trim().to_string(),
        role: row.data.role.clone(),
        bio: row.data.bio.clone(),
        event_count: event_ids.len(),
        event_ids,
        rating: rating.average(),
        rating_count: rating.count,
    }
}

/// Resolves once the shutdown flag is set.
async fn wait_closed(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|closed| *closed).await;
}

fn time_range(start: &str, end: &str) -> String {
    match (start.trim(), end.trim()) {
        ("", "") => String::new(),
        (start, "") => start.to_string(),
        ("", end) => end.to_string(),
        (start, end) => format!("{} - {}", start, end),
    }
}

// ==================== REFRESH LIFECYCLE ====================

/// Result of a refresh that did not fail.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// This refresh's snapshot is now the published one
    Published(Arc<Snapshot>),
    /// A newer refresh published first; this result was discarded
    Superseded,
}

/// What a consumer should render.
#[derive(Debug, Clone)]
pub enum ViewStatus {
    Loading,
    Ready(Arc<Snapshot>),
    Failed {
        error: ClientError,
        last_good: Option<Arc<Snapshot>>,
    },
}

#[derive(Default)]
struct Published {
    generation: u64,
    snapshot: Option<Arc<Snapshot>>,
    last_error: Option<ClientError>,
}

/// Owns the published snapshot. Cheap to share behind an `Arc`.
pub struct Assembler {
    repo: Repository,
    next_generation: AtomicU64,
    published: RwLock<Published>,
    shutdown: watch::Sender<bool>,
}

impl Assembler {
    pub fn new(repo: Repository) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            repo,
            next_generation: AtomicU64::new(0),
            published: RwLock::new(Published::default()),
            shutdown,
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Fetch every table and publish the result unless a newer refresh got
    /// there first. Fails when the events table (or every table) could not
    /// be fetched, or after [`close`](Self::close). A failure keeps the last
    /// good snapshot published.
    pub async fn refresh(&self) -> Result<RefreshOutcome, ClientError> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut closed = self.shutdown.subscribe();

        let tables = tokio::select! {
            tables = self.repo.fetch_all() => tables,
            _ = wait_closed(&mut closed) => {
                tracing::debug!("Refresh {} abandoned on close", generation);
                return Err(ClientError::Closed);
            }
        };

        let failures = tables.failures();
        for (table, err) in &failures {
            tracing::warn!("Refresh {}: {} unavailable: {}", generation, table, err);
        }

        // An events outage keeps the last good snapshot published
        let result = if tables.all_failed() {
            Err(ClientError::LoadFailed(format!(
                "all {} tables failed to load",
                failures.len()
            )))
        } else if let Err(err) = &tables.events {
            Err(ClientError::LoadFailed(format!("events unavailable: {}", err)))
        } else {
            Ok(Arc::new(assemble(&tables, generation, Utc::now())))
        };

        let mut published = self.published.write().await;
        if self.is_closed() {
            return Err(ClientError::Closed);
        }
        if generation <= published.generation {
            tracing::debug!(
                "Refresh {} superseded by {}",
                generation,
                published.generation
            );
            return Ok(RefreshOutcome::Superseded);
        }
        published.generation = generation;

        match result {
            Ok(snapshot) => {
                tracing::info!(
                    "Published snapshot {} ({} events, {} degraded tables)",
                    generation,
                    snapshot.events.len(),
                    snapshot.degraded.len()
                );
                published.snapshot = Some(Arc::clone(&snapshot));
                published.last_error = None;
                Ok(RefreshOutcome::Published(snapshot))
            }
            Err(err) => {
                tracing::error!("Refresh {} failed: {}", generation, err);
                published.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Latest published snapshot, if any refresh has succeeded.
    pub async fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.published.read().await.snapshot.clone()
    }

    pub async fn status(&self) -> ViewStatus {
        let published = self.published.read().await;
        match (&published.last_error, &published.snapshot) {
            (Some(error), last_good) => ViewStatus::Failed {
                error: error.clone(),
                last_good: last_good.clone(),
            },
            (None, Some(snapshot)) => ViewStatus::Ready(Arc::clone(snapshot)),
            (None, None) => ViewStatus::Loading,
        }
    }

    /// Abandon in-flight refreshes and refuse new ones. The last published
    /// snapshot stays readable.
    pub fn close(&self) {
        if !self.shutdown.send_replace(true) {
            tracing::info!("Assembler closed");
        }
    }

    /// Refresh every `interval` until closed. The interval is measured from
    /// the end of the previous refresh, so a slow backend never sees
    /// back-to-back catch-up refreshes.
    pub fn spawn_auto_refresh(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let mut closed = self.shutdown.subscribe();
        let period = interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = wait_closed(&mut closed) => break,
                }

                match this.refresh().await {
                    Ok(_) => {}
                    Err(ClientError::Closed) => break,
                    Err(e) => tracing::warn!("Background refresh failed: {}", e),
                }
                ticker.reset();
            }
            tracing::debug!("Auto refresh stopped");
        })
    }
}
