//! Relational view-model builder.
//!
//! Flat UniDB tables go in; de-duplicated, resolved and aggregated
//! view-models come out as an immutable [`Snapshot`](crate::models::Snapshot).

mod aggregate;
mod assembler;
mod dedup;
mod query;
mod resolver;

pub use aggregate::*;
pub use assembler::*;
pub use dedup::*;
pub use query::*;
pub use resolver::*;
