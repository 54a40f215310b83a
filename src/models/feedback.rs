//! Feedback rows as stored in the `feedbacks` table.

use serde::{Deserialize, Serialize};

use super::row::{null_as_default, Record, Table};

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// One row of the `feedbacks` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: i64,
    pub event_id: i64,
    pub rating: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Record for FeedbackRecord {
    type Key = i64;
    const TABLE: Table = Table::Feedbacks;

    fn key(&self) -> i64 {
        self.id
    }

    fn check(&self) -> Result<(), String> {
        if (MIN_RATING..=MAX_RATING).contains(&self.rating) {
            Ok(())
        } else {
            Err(format!(
                "feedback {} has rating {} outside {}..={}",
                self.id, self.rating, MIN_RATING, MAX_RATING
            ))
        }
    }
}

/// Request body for leaving feedback on an event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub event_id: i64,
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}
