//! This crate provides the calendar data layer of a kiosk dashboard.
//!
//! The dashboard displays two kinds of events side by side: a read-only feed of holidays (an ICS document fetched over HTTP) and the events the user created by clicking the calendar grid.
//!
//! The [`ical`] module parses the feed document into [`Event`]s, that can be told apart from user events by their namespaced [`EventId`].
//!
//! These two "event sources" are merged by a [`CalendarStore`]. \
//! A `CalendarStore` owns the merged set, exposes the create/move/delete operations the calendar UI needs, and persists the user events (and only those) through an injected storage collaborator. \
//! Because the feed may be slow or unreachable, and the dashboard should keep showing the user events regardless, the store degrades to the locally saved events whenever the feed cannot be fetched.

pub mod traits;

mod event;
pub use event::Event;
pub use event::EventId;
pub use event::Provenance;
mod error;
pub use error::StoreError;
pub mod store;
pub use store::CalendarStore;
pub use store::StoreState;
pub use store::Subsets;

pub mod client;
pub mod storage;
pub mod ical;
pub mod mock;

pub mod settings;
pub mod utils;
