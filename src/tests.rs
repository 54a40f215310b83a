//! Integration tests against a fake UniDB backend.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};

use crate::config::Config;
use crate::errors::{codes, ClientError};
use crate::models::{
    EventRequest, FeedbackRequest, OccupancyStatus, SpeakerRequest, Table, TrackRecord,
    OTHER_CATEGORY,
};
use crate::store::{Repository, UniDbClient};
use crate::views::{Assembler, RefreshOutcome, ViewStatus};

const CONTRACT: &str = "test-contract";

// ==================== FAKE UNIDB ====================

#[derive(Default)]
struct FakeState {
    /// table -> row envelopes in insertion order
    tables: HashMap<String, Vec<Value>>,
    failing: HashSet<String>,
    raw_bodies: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    last_query: HashMap<String, HashMap<String, String>>,
    /// table -> arrival time of every list request
    requests: HashMap<String, Vec<Instant>>,
}

type Shared = Arc<Mutex<FakeState>>;

async fn list_rows(
    State(state): State<Shared>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let (delay, failing, raw, rows) = {
        let mut fake = state.lock().unwrap();
        fake.last_query.insert(table.clone(), query);
        fake.requests
            .entry(table.clone())
            .or_default()
            .push(Instant::now());
        (
            fake.delays.get(&table).copied(),
            fake.failing.contains(&table),
            fake.raw_bodies.get(&table).cloned(),
            fake.tables.get(&table).cloned().unwrap_or_default(),
        )
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if failing {
        return (StatusCode::SERVICE_UNAVAILABLE, "table offline").into_response();
    }
    if let Some(raw) = raw {
        return (StatusCode::OK, raw).into_response();
    }
    Json(json!({ "data": rows })).into_response()
}

async fn store_row(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let Some(table) = body["table_name"].as_str() else {
        return (StatusCode::BAD_REQUEST, "table_name is required").into_response();
    };
    let entry_id = uuid::Uuid::new_v4().to_string();
    let envelope = json!({ "entry_id": entry_id, "data": body["data"].clone() });

    state
        .lock()
        .unwrap()
        .tables
        .entry(table.to_string())
        .or_default()
        .push(envelope.clone());

    (StatusCode::CREATED, Json(envelope)).into_response()
}

async fn update_row(
    State(state): State<Shared>,
    Path((table, entry_id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> StatusCode {
    let mut fake = state.lock().unwrap();
    let rows = fake.tables.entry(table).or_default();
    match rows.iter_mut().find(|row| row["entry_id"] == entry_id.as_str()) {
        Some(row) => {
            row["data"] = body["data"].clone();
            StatusCode::OK
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn delete_row(
    State(state): State<Shared>,
    Path((table, entry_id)): Path<(String, String)>,
) -> StatusCode {
    let mut fake = state.lock().unwrap();
    let rows = fake.tables.entry(table).or_default();
    let before = rows.len();
    rows.retain(|row| row["entry_id"] != entry_id.as_str());
    if rows.len() < before {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Test fixture for integration tests.
struct TestFixture {
    fake: Shared,
    base_url: String,
    repo: Repository,
    assembler: Arc<Assembler>,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    async fn with_config(tune: impl FnOnce(&mut Config)) -> Self {
        let fake: Shared = Arc::new(Mutex::new(FakeState::default()));

        let routes = Router::new()
            .route("/data/{table}/all", get(list_rows))
            .route("/data/store", post(store_row))
            .route("/data/{table}/update/{entry_id}", put(update_row))
            .route("/data/{table}/delete/{entry_id}", delete(delete_row));
        let app = Router::new()
            .nest(&format!("/{}", CONTRACT), routes)
            .with_state(fake.clone());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut config = Config::new(base_url.clone(), CONTRACT);
        config.request_timeout = Duration::from_secs(5);
        tune(&mut config);

        let repo = Repository::new(UniDbClient::new(&config).expect("Failed to build client"));
        let assembler = Arc::new(Assembler::new(repo.clone()));

        TestFixture {
            fake,
            base_url,
            repo,
            assembler,
        }
    }

    fn seed(&self, table: Table, rows: Vec<Value>) {
        let envelopes = rows
            .into_iter()
            .map(|data| json!({ "entry_id": uuid::Uuid::new_v4().to_string(), "data": data }))
            .collect();
        self.fake
            .lock()
            .unwrap()
            .tables
            .insert(table.to_string(), envelopes);
    }

    fn rows(&self, table: Table) -> Vec<Value> {
        self.fake
            .lock()
            .unwrap()
            .tables
            .get(table.as_str())
            .map(|rows| rows.iter().map(|row| row["data"].clone()).collect())
            .unwrap_or_default()
    }

    fn fail(&self, table: Table) {
        self.fake.lock().unwrap().failing.insert(table.to_string());
    }

    fn fail_all(&self) {
        for table in Table::ALL {
            self.fail(table);
        }
    }

    fn raw_body(&self, table: Table, body: &str) {
        self.fake
            .lock()
            .unwrap()
            .raw_bodies
            .insert(table.to_string(), body.to_string());
    }

    fn delay(&self, table: Table, delay: Option<Duration>) {
        let mut fake = self.fake.lock().unwrap();
        match delay {
            Some(d) => fake.delays.insert(table.to_string(), d),
            None => fake.delays.remove(table.as_str()),
        };
    }

    fn last_query(&self, table: Table) -> HashMap<String, String> {
        self.fake
            .lock()
            .unwrap()
            .last_query
            .get(table.as_str())
            .cloned()
            .unwrap_or_default()
    }

    fn requests(&self, table: Table) -> Vec<Instant> {
        self.fake
            .lock()
            .unwrap()
            .requests
            .get(table.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Tracks AI/Web, events 10 and 11, speakers Ana/Luis/Marta and three
    /// ratings on event 10.
    fn seed_conference(&self) {
        self.seed(
            Table::Tracks,
            vec![json!({ "id": 1, "nombre": "AI" }), json!({ "id": 2, "nombre": "Web" })],
        );
        self.seed(
            Table::EventTracks,
            vec![
                json!({ "event_id": 10, "track_id": 1 }),
                json!({ "event_id": 10, "track_id": 1 }),
                json!({ "event_id": 11, "track_id": 99 }),
            ],
        );
        self.seed(
            Table::Events,
            vec![
                json!({
                    "id": 10, "titulo": "Rust Day", "tema": "Backend", "fecha": "2099-01-01",
                    "hora_inicio": "10:00", "hora_fin": "12:00", "modalidad": "Presencial",
                    "lugar": "Aula 1", "max_participantes": 50, "suscritos": 10,
                    "ponente": "ana ", "invitados_especiales": ["Luis", null, ""]
                }),
                json!({
                    "id": 11, "titulo": "CSS Night", "tema": null, "fecha": "2000-01-01",
                    "modalidad": "Virtual", "plataforma": "Zoom",
                    "max_participantes": 0, "suscritos": 5
                }),
            ],
        );
        self.seed(
            Table::Speakers,
            vec![
                json!({ "id": 1, "name": "Ana", "role": "Engineer" }),
                json!({ "id": 2, "name": "Luis" }),
                json!({ "id": 3, "name": "Marta" }),
            ],
        );
        self.seed(
            Table::EventSpeakers,
            vec![
                json!({ "event_id": 11, "speaker_id": 3 }),
                json!({ "event_id": 11, "speaker_id": 1 }),
            ],
        );
        self.seed(
            Table::Feedbacks,
            vec![
                json!({ "id": 1, "event_id": 10, "rating": 4, "comment": "good" }),
                json!({ "id": 2, "event_id": 10, "rating": 5, "comment": "great" }),
                json!({ "id": 3, "event_id": 10, "rating": 3, "comment": null }),
            ],
        );
    }

    async fn published(&self) -> Arc<crate::models::Snapshot> {
        match self.assembler.refresh().await.expect("refresh failed") {
            RefreshOutcome::Published(snapshot) => snapshot,
            RefreshOutcome::Superseded => panic!("refresh was superseded"),
        }
    }
}

fn event_request(title: &str, max: i64, track_ids: Vec<i64>) -> EventRequest {
    EventRequest {
        title: title.to_string(),
        date: "2099-03-01".to_string(),
        start_time: "09:00".to_string(),
        end_time: "10:00".to_string(),
        max_participants: max,
        track_ids,
        ..Default::default()
    }
}

// ==================== SNAPSHOT TESTS ====================

#[tokio::test]
async fn test_snapshot_scenario() {
    let fixture = TestFixture::new().await;
    fixture.seed_conference();

    assert!(matches!(fixture.assembler.status().await, ViewStatus::Loading));
    let snapshot = fixture.published().await;

    assert_eq!(snapshot.generation, 1);
    assert!(snapshot.degraded.is_empty());

    let rust = snapshot.event(10).unwrap();
    assert_eq!(rust.tracks, vec!["AI"]);
    assert_eq!(rust.rating, 4.0);
    assert_eq!(rust.rating_count, 3);
    assert_eq!(rust.speakers, vec!["ana", "Luis"]);
    assert_eq!(rust.speaker_ids, vec![1, 2]);
    assert_eq!(rust.venue.as_deref(), Some("Aula 1"));
    assert_eq!(rust.occupancy.percent, Some(20));

    let css = snapshot.event(11).unwrap();
    assert!(css.tracks.is_empty());
    assert_eq!(css.category, OTHER_CATEGORY);
    assert_eq!(css.occupancy.status, OccupancyStatus::Unknown);
    assert!(css.occupancy.rate.is_none());

    let dashboard = &snapshot.dashboard;
    assert_eq!(dashboard.total_events, 2);
    assert_eq!(dashboard.events_by_track.uncategorized, 1);
    assert_eq!(dashboard.upcoming_events, 1);
    assert_eq!(dashboard.past_events, 1);
    assert_eq!(dashboard.total_subscriptions, 15);

    let upcoming: Vec<i64> = dashboard.upcoming.iter().map(|e| e.id).collect();
    assert_eq!(upcoming, vec![10]);
    let top: Vec<i64> = dashboard.top_speakers.iter().map(|s| s.id).collect();
    assert_eq!(top, vec![1, 2, 3]);

    assert!(matches!(fixture.assembler.status().await, ViewStatus::Ready(_)));
}

#[tokio::test]
async fn test_snapshot_serializes_camel_case() {
    let fixture = TestFixture::new().await;
    fixture.seed_conference();
    let snapshot = fixture.published().await;

    let value = serde_json::to_value(snapshot.as_ref()).unwrap();
    let event = &value["events"][0];
    assert_eq!(event["title"], "Rust Day");
    assert_eq!(event["maxParticipants"], 50);
    assert_eq!(event["modality"], "Presencial");
    assert_eq!(event["occupancy"]["status"], "available");
    assert!(value["dashboard"]["eventsByCategory"].is_object());
}

#[tokio::test]
async fn test_duplicate_rows_collapse() {
    let fixture = TestFixture::new().await;
    fixture.seed(
        Table::Events,
        vec![
            json!({ "id": 10, "titulo": "First" }),
            json!({ "id": 10, "titulo": "Second" }),
            json!({ "id": 12, "titulo": "Other" }),
        ],
    );

    let snapshot = fixture.published().await;
    assert_eq!(snapshot.events.len(), 2);
    assert_eq!(snapshot.event(10).unwrap().title, "First");
    assert_eq!(snapshot.dashboard.total_events, 2);
}

#[tokio::test]
async fn test_out_of_range_feedback_is_dropped() {
    let fixture = TestFixture::new().await;
    fixture.seed(Table::Events, vec![json!({ "id": 1, "titulo": "Talk" })]);
    fixture.seed(
        Table::Feedbacks,
        vec![
            json!({ "id": 1, "event_id": 1, "rating": 5 }),
            json!({ "id": 2, "event_id": 1, "rating": 9 }),
            json!({ "id": 3, "event_id": 1, "rating": 0 }),
        ],
    );

    let snapshot = fixture.published().await;
    assert_eq!(snapshot.feedback.len(), 1);
    assert_eq!(snapshot.event(1).unwrap().rating, 5.0);
}

#[tokio::test]
async fn test_feedback_outage_degrades_ratings() {
    let fixture = TestFixture::new().await;
    fixture.seed_conference();
    fixture.fail(Table::Feedbacks);

    let snapshot = fixture.published().await;
    assert_eq!(snapshot.degraded, vec![Table::Feedbacks]);
    assert_eq!(snapshot.events.len(), 2);
    assert!(snapshot.events.iter().all(|e| e.rating == 0.0));
    assert_eq!(snapshot.dashboard.average_rating, 0.0);
}

#[tokio::test]
async fn test_total_outage_keeps_last_good() {
    let fixture = TestFixture::new().await;
    fixture.seed_conference();
    fixture.published().await;

    fixture.fail_all();
    let err = fixture.assembler.refresh().await.unwrap_err();
    assert_eq!(err.error_code(), codes::LOAD_FAILED);

    match fixture.assembler.status().await {
        ViewStatus::Failed { error, last_good } => {
            assert!(matches!(error, ClientError::LoadFailed(_)));
            assert_eq!(last_good.unwrap().generation, 1);
        }
        other => panic!("unexpected status {:?}", other),
    }
    assert_eq!(fixture.assembler.snapshot().await.unwrap().events.len(), 2);
}

#[tokio::test]
async fn test_events_outage_keeps_last_good() {
    let fixture = TestFixture::new().await;
    fixture.seed_conference();
    fixture.published().await;

    fixture.fail(Table::Events);
    let err = fixture.assembler.refresh().await.unwrap_err();
    assert_eq!(err.error_code(), codes::LOAD_FAILED);

    match fixture.assembler.status().await {
        ViewStatus::Failed { error, last_good } => {
            assert!(matches!(error, ClientError::LoadFailed(_)));
            let last_good = last_good.unwrap();
            assert_eq!(last_good.generation, 1);
            assert_eq!(last_good.events.len(), 2);
        }
        other => panic!("unexpected status {:?}", other),
    }
    let current = fixture.assembler.snapshot().await.unwrap();
    assert_eq!(current.generation, 1);
    assert_eq!(current.dashboard.total_events, 2);
}

#[tokio::test]
async fn test_events_outage_on_first_refresh_fails() {
    let fixture = TestFixture::new().await;
    fixture.seed_conference();
    fixture.fail(Table::Events);

    assert!(fixture.assembler.refresh().await.is_err());
    match fixture.assembler.status().await {
        ViewStatus::Failed { last_good, .. } => assert!(last_good.is_none()),
        other => panic!("unexpected status {:?}", other),
    }
}

#[tokio::test]
async fn test_tables_are_fetched_concurrently() {
    let fixture = TestFixture::new().await;
    fixture.seed_conference();
    let delay = Duration::from_millis(300);
    for table in Table::ALL {
        fixture.delay(table, Some(delay));
    }

    let started = Instant::now();
    let snapshot = fixture.published().await;
    let elapsed = started.elapsed();

    assert_eq!(snapshot.events.len(), 2);
    assert!(elapsed >= delay);
    // Sequential fetches would take six delays
    assert!(elapsed < delay * 3, "refresh took {:?}", elapsed);
}

#[tokio::test]
async fn test_malformed_body_reads_as_empty() {
    let fixture = TestFixture::new().await;
    fixture.seed_conference();
    fixture.raw_body(Table::Tracks, "<html>maintenance</html>");
    fixture.raw_body(Table::EventSpeakers, r#"{"rows": []}"#);

    let snapshot = fixture.published().await;
    assert!(snapshot.degraded.is_empty());
    assert!(snapshot.events.iter().all(|e| e.tracks.is_empty()));
    assert_eq!(snapshot.dashboard.events_by_track.uncategorized, 2);
    assert!(snapshot.event(11).unwrap().speaker_ids.is_empty());
}

#[tokio::test]
async fn test_latest_refresh_wins() {
    let fixture = TestFixture::new().await;
    fixture.seed_conference();
    fixture.delay(Table::Events, Some(Duration::from_millis(600)));

    let slow = {
        let assembler = fixture.assembler.clone();
        tokio::spawn(async move { assembler.refresh().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    fixture.delay(Table::Events, None);
    fixture.seed(Table::Events, vec![json!({ "id": 20, "titulo": "Fresh" })]);
    let fast = fixture.published().await;
    assert_eq!(fast.generation, 2);

    let slow = slow.await.unwrap().unwrap();
    assert!(matches!(slow, RefreshOutcome::Superseded));

    let current = fixture.assembler.snapshot().await.unwrap();
    assert_eq!(current.generation, 2);
    assert_eq!(current.events[0].title, "Fresh");
}

#[tokio::test]
async fn test_close_abandons_refresh() {
    let fixture = TestFixture::new().await;
    fixture.seed_conference();
    fixture.delay(Table::Speakers, Some(Duration::from_secs(3)));

    let pending = {
        let assembler = fixture.assembler.clone();
        tokio::spawn(async move { assembler.refresh().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    fixture.assembler.close();

    let result = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .expect("refresh was not abandoned")
        .unwrap();
    assert!(matches!(result, Err(ClientError::Closed)));
    assert!(fixture.assembler.snapshot().await.is_none());

    let again = fixture.assembler.refresh().await;
    assert!(matches!(again, Err(ClientError::Closed)));
}

#[tokio::test]
async fn test_auto_refresh_publishes_until_closed() {
    let fixture = TestFixture::new().await;
    fixture.seed_conference();

    let handle = fixture
        .assembler
        .spawn_auto_refresh(Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(300)).await;

    let snapshot = fixture.assembler.snapshot().await.unwrap();
    assert!(snapshot.generation >= 2);

    fixture.assembler.close();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("auto refresh kept running")
        .unwrap();
}

#[tokio::test]
async fn test_auto_refresh_waits_for_slow_refresh() {
    let fixture = TestFixture::new().await;
    fixture.seed_conference();
    fixture.delay(Table::Events, Some(Duration::from_millis(200)));

    let handle = fixture
        .assembler
        .spawn_auto_refresh(Duration::from_millis(150));
    tokio::time::sleep(Duration::from_millis(1200)).await;
    fixture.assembler.close();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("auto refresh kept running")
        .unwrap();

    // Each refresh starts a full interval after the previous one ended
    let starts = fixture.requests(Table::Events);
    assert!(starts.len() >= 2, "only {} refreshes", starts.len());
    for pair in starts.windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(gap >= Duration::from_millis(300), "refreshes {:?} apart", gap);
    }
}

// ==================== TRANSPORT TESTS ====================

#[tokio::test]
async fn test_list_request_shape() {
    let fixture = TestFixture::new().await;
    fixture.repo.list::<TrackRecord>().await.unwrap();

    let query = fixture.last_query(Table::Tracks);
    assert_eq!(query.get("format").map(String::as_str), Some("json"));
    assert!(query.get("t").is_some_and(|t| t.parse::<i64>().is_ok()));

    let uncached = TestFixture::with_config(|c| c.cache_bust = false).await;
    uncached.repo.list::<TrackRecord>().await.unwrap();
    assert!(uncached.last_query(Table::Tracks).get("t").is_none());
}

#[tokio::test]
async fn test_http_failure_is_typed() {
    let fixture = TestFixture::new().await;
    fixture.fail(Table::Tracks);

    match fixture.repo.list::<TrackRecord>().await {
        Err(ClientError::Status { table, status, .. }) => {
            assert_eq!(table, Table::Tracks);
            assert_eq!(status, 503);
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_timeout_is_typed() {
    let fixture = TestFixture::with_config(|c| c.request_timeout = Duration::from_millis(200)).await;
    fixture.delay(Table::Tracks, Some(Duration::from_secs(2)));

    let err = fixture.repo.list::<TrackRecord>().await.unwrap_err();
    assert_eq!(err.error_code(), codes::TIMEOUT);
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = Config::new(format!("http://{}", addr), CONTRACT);
    let repo = Repository::new(UniDbClient::new(&config).unwrap());
    let err = repo.list::<TrackRecord>().await.unwrap_err();
    assert_eq!(err.error_code(), codes::TRANSPORT_ERROR);
}

// ==================== WRITE TESTS ====================

#[tokio::test]
async fn test_event_crud_cascades() {
    let fixture = TestFixture::new().await;
    fixture.seed(
        Table::Tracks,
        vec![json!({ "id": 1, "nombre": "AI" }), json!({ "id": 2, "nombre": "Web" })],
    );
    fixture.seed(Table::Events, vec![json!({ "id": 4, "titulo": "Existing" })]);

    // Create
    let created = fixture
        .repo
        .create_event(&event_request("Launch", 30, vec![1, 2]))
        .await
        .unwrap();
    assert_eq!(created.data.id, 5);
    assert!(!created.entry_id.is_empty());
    assert_eq!(fixture.rows(Table::EventTracks).len(), 2);

    // Unknown track is rejected before anything is written
    let err = fixture
        .repo
        .create_event(&event_request("Bad", 10, vec![7]))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), codes::VALIDATION_ERROR);
    assert_eq!(fixture.rows(Table::Events).len(), 2);

    // Subscriber count survives a full replacement
    fixture.repo.subscribe(5).await.unwrap();
    let updated = fixture
        .repo
        .update_event(5, &event_request("Launch v2", 30, vec![2]))
        .await
        .unwrap();
    assert_eq!(updated.data.subscriber_count, 1);

    let links = fixture.rows(Table::EventTracks);
    assert_eq!(links, vec![json!({ "event_id": 5, "track_id": 2 })]);

    let snapshot = fixture.published().await;
    let launch = snapshot.event(5).unwrap();
    assert_eq!(launch.title, "Launch v2");
    assert_eq!(launch.tracks, vec!["Web"]);
    assert_eq!(launch.subscriber_count, 1);

    // Delete cascades into both join tables
    fixture.seed(
        Table::EventSpeakers,
        vec![
            json!({ "event_id": 5, "speaker_id": 1 }),
            json!({ "event_id": 4, "speaker_id": 1 }),
        ],
    );
    fixture.repo.delete_event(5).await.unwrap();
    assert_eq!(fixture.rows(Table::Events).len(), 1);
    assert!(fixture.rows(Table::EventTracks).is_empty());
    assert_eq!(
        fixture.rows(Table::EventSpeakers),
        vec![json!({ "event_id": 4, "speaker_id": 1 })]
    );

    let err = fixture.repo.delete_event(5).await.unwrap_err();
    assert_eq!(err.error_code(), codes::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_event_removes_duplicates() {
    let fixture = TestFixture::new().await;
    fixture.seed(
        Table::Events,
        vec![
            json!({ "id": 3, "titulo": "Dup" }),
            json!({ "id": 3, "titulo": "Dup again" }),
        ],
    );

    fixture.repo.delete_event(3).await.unwrap();
    assert!(fixture.rows(Table::Events).is_empty());
}

#[tokio::test]
async fn test_subscribe_respects_capacity() {
    let fixture = TestFixture::new().await;
    fixture.seed(
        Table::Events,
        vec![json!({ "id": 1, "titulo": "Small room", "max_participantes": 2, "suscritos": 1 })],
    );

    let record = fixture.repo.subscribe(1).await.unwrap();
    assert_eq!(record.subscriber_count, 2);

    let err = fixture.repo.subscribe(1).await.unwrap_err();
    assert_eq!(err.error_code(), codes::CONFLICT);

    for _ in 0..3 {
        fixture.repo.unsubscribe(1).await.unwrap();
    }
    assert_eq!(fixture.rows(Table::Events)[0]["suscritos"], 0);

    let err = fixture.repo.subscribe(99).await.unwrap_err();
    assert_eq!(err.error_code(), codes::NOT_FOUND);
}

#[tokio::test]
async fn test_create_feedback() {
    let fixture = TestFixture::new().await;
    fixture.seed(Table::Events, vec![json!({ "id": 1, "titulo": "Talk" })]);

    let bad_rating = FeedbackRequest {
        event_id: 1,
        rating: 6,
        comment: String::new(),
    };
    let err = fixture.repo.create_feedback(&bad_rating).await.unwrap_err();
    assert_eq!(err.error_code(), codes::VALIDATION_ERROR);

    let no_event = FeedbackRequest {
        event_id: 2,
        rating: 4,
        comment: String::new(),
    };
    let err = fixture.repo.create_feedback(&no_event).await.unwrap_err();
    assert_eq!(err.error_code(), codes::NOT_FOUND);

    let ok = FeedbackRequest {
        event_id: 1,
        rating: 4,
        comment: " Nice ".to_string(),
    };
    let row = fixture.repo.create_feedback(&ok).await.unwrap();
    assert_eq!(row.data.id, 1);
    assert_eq!(row.data.comment, "Nice");
    assert!(row.data.created_at.is_some());

    let snapshot = fixture.published().await;
    assert_eq!(snapshot.event(1).unwrap().rating, 4.0);
    assert_eq!(snapshot.feedback[0].event_name, "Talk");
    assert_eq!(snapshot.dashboard.recent_activity, 1);
}

#[tokio::test]
async fn test_speaker_writes_and_detail() {
    let fixture = TestFixture::new().await;
    fixture.seed_conference();

    let err = fixture
        .repo
        .create_speaker(&SpeakerRequest {
            name: "  ".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), codes::VALIDATION_ERROR);

    let created = fixture
        .repo
        .create_speaker(&SpeakerRequest {
            name: "Sofia".to_string(),
            role: Some("Designer".to_string()),
            bio: None,
        })
        .await
        .unwrap();
    assert_eq!(created.data.id, 4);

    let snapshot = fixture.published().await;
    // Ana is the main speaker of 10 and linked to 11 through the legacy table
    let ana = snapshot.speaker_detail(1).unwrap();
    let event_ids: Vec<i64> = ana.events.iter().map(|e| e.id).collect();
    assert_eq!(event_ids, vec![10, 11]);
    assert_eq!(ana.speaker.rating, 4.0);
    assert_eq!(snapshot.speakers_matching(Some("design"))[0].name, "Sofia");

    fixture.repo.delete_speaker(3).await.unwrap();
    assert_eq!(
        fixture.rows(Table::EventSpeakers),
        vec![json!({ "event_id": 11, "speaker_id": 1 })]
    );
    let snapshot = fixture.published().await;
    assert!(snapshot.speaker(3).is_none());
    assert_eq!(snapshot.event(11).unwrap().speakers, vec!["Ana"]);
}

#[tokio::test]
async fn test_fixture_base_url() {
    let fixture = TestFixture::new().await;
    let resp = reqwest::get(format!(
        "{}/{}/data/events/all?format=json",
        fixture.base_url, CONTRACT
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"], json!([]));
}
