//! Data models for the UniDB conference tables.
//!
//! Row types mirror the backend's column names; view types mirror the app's
//! TypeScript interfaces.

mod event;
mod feedback;
mod row;
mod speaker;
mod track;
mod view;

pub use event::*;
pub use feedback::*;
pub use row::*;
pub use speaker::*;
pub use track::*;
pub use view::*;
