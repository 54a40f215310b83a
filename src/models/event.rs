//! Event rows as stored in the `events` table.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::row::{null_as_default, Record, Table};

/// Largest capacity an event may be created or edited with.
pub const MAX_PARTICIPANTS_LIMIT: i64 = 10_000;

/// How an event is attended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    InPerson,
    Virtual,
    Hybrid,
}

impl Modality {
    /// Wire value written by the app.
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::InPerson => "Presencial",
            Modality::Virtual => "Virtual",
            Modality::Hybrid => "Hibrida",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "presencial" | "in-person" | "in_person" | "inperson" => Some(Modality::InPerson),
            "virtual" => Some(Modality::Virtual),
            "hibrida" | "híbrida" | "hybrid" => Some(Modality::Hybrid),
            _ => None,
        }
    }
}

impl Serialize for Modality {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Modality {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Modality::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown modality {:?}", raw)))
    }
}

/// Unknown or blank modality strings read as absent instead of failing the row.
fn lenient_modality<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Modality>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.and_then(|raw| Modality::parse(&raw)))
}

/// One row of the `events` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: i64,
    #[serde(rename = "titulo", alias = "title", default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(
        rename = "descripcion",
        alias = "description",
        default,
        deserialize_with = "null_as_default"
    )]
    pub description: String,
    /// Legacy free-text category
    #[serde(rename = "tema", alias = "topic", default, deserialize_with = "null_as_default")]
    pub topic: String,
    /// `YYYY-MM-DD`
    #[serde(rename = "fecha", alias = "date", default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(
        rename = "hora_inicio",
        alias = "startTime",
        default,
        deserialize_with = "null_as_default"
    )]
    pub start_time: String,
    #[serde(
        rename = "hora_fin",
        alias = "endTime",
        default,
        deserialize_with = "null_as_default"
    )]
    pub end_time: String,
    #[serde(rename = "lugar", alias = "venue", alias = "location", default)]
    pub venue: Option<String>,
    #[serde(
        rename = "modalidad",
        alias = "modality",
        default,
        deserialize_with = "lenient_modality"
    )]
    pub modality: Option<Modality>,
    #[serde(rename = "plataforma", alias = "platform", default)]
    pub platform: Option<String>,
    #[serde(
        rename = "max_participantes",
        alias = "maxParticipants",
        default,
        deserialize_with = "null_as_default"
    )]
    pub max_participants: i64,
    #[serde(
        rename = "suscritos",
        alias = "subscriberCount",
        default,
        deserialize_with = "null_as_default"
    )]
    pub subscriber_count: i64,
    #[serde(rename = "imageUrl", default, deserialize_with = "null_as_default")]
    pub image_url: String,
    #[serde(rename = "ponente", alias = "mainSpeaker", default)]
    pub main_speaker: Option<String>,
    /// May contain nulls and blanks; sanitized by the resolver.
    #[serde(
        rename = "invitados_especiales",
        alias = "guestSpeakers",
        default,
        deserialize_with = "null_as_default"
    )]
    pub guest_speakers: Vec<Option<String>>,
}

impl Record for EventRecord {
    type Key = i64;
    const TABLE: Table = Table::Events;

    fn key(&self) -> i64 {
        self.id
    }
}

/// Request body for creating an event or fully replacing one.
///
/// Blank guest names are dropped before the row is written; the subscriber
/// count is owned by the repository and never taken from a request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub topic: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub modality: Option<Modality>,
    #[serde(default)]
    pub platform: Option<String>,
    pub max_participants: i64,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub main_speaker: Option<String>,
    #[serde(default)]
    pub guest_speakers: Vec<String>,
    /// Tracks to link through `event_tracks`
    #[serde(default)]
    pub track_ids: Vec<i64>,
}

impl EventRequest {
    /// Build the row payload for `id`.
    pub fn to_record(&self, id: i64, subscriber_count: i64) -> EventRecord {
        // Virtual events have no venue; physical ones no platform.
        let (venue, platform) = match self.modality {
            Some(Modality::Virtual) => (None, trimmed(&self.platform)),
            Some(_) => (trimmed(&self.venue), None),
            None => (trimmed(&self.venue), trimmed(&self.platform)),
        };

        EventRecord {
            id,
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            topic: self.topic.trim().to_string(),
            date: self.date.trim().to_string(),
            start_time: self.start_time.trim().to_string(),
            end_time: self.end_time.trim().to_string(),
            venue,
            modality: self.modality,
            platform,
            max_participants: self.max_participants,
            subscriber_count,
            image_url: self.image_url.trim().to_string(),
            main_speaker: trimmed(&self.main_speaker),
            guest_speakers: self
                .guest_speakers
                .iter()
                .map(|g| g.trim())
                .filter(|g| !g.is_empty())
                .map(|g| Some(g.to_string()))
                .collect(),
        }
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
