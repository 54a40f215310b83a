//! First-occurrence-wins de-duplication.
//!
//! The backend happily stores several rows with the same domain id. Within a
//! fetch cycle they collapse to the row fetched first.

use std::collections::HashSet;
use std::hash::Hash;

use crate::models::{Record, Row};

/// Keep the first item for every key, preserving fetch order.
pub fn dedup_by_key<T, K, F>(items: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::with_capacity(items.len());
    items.into_iter().filter(|item| seen.insert(key(item))).collect()
}

/// De-duplicate rows by their record key.
pub fn dedup_rows<T: Record>(rows: Vec<Row<T>>) -> Vec<Row<T>> {
    let before = rows.len();
    let rows = dedup_by_key(rows, |row| row.data.key());
    if rows.len() < before {
        tracing::debug!(
            "{}: collapsed {} duplicate rows",
            T::TABLE,
            before - rows.len()
        );
    }
    rows
}
