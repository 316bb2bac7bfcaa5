//! The errors this crate can report
//!
//! Nothing here is fatal: feed and storage failures are recovered with degraded results, and the contract violations ([`StoreError::NotFound`], [`StoreError::ImmutableEvent`]) are surfaced so the UI can display a message. The worst possible outcome is an empty calendar.

use thiserror::Error;

use crate::event::EventId;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The feed document could not be parsed at all.
    /// Individual malformed entries do not trigger this: they are skipped, so that the rest of the feed is still displayed.
    #[error("malformed feed document: {0}")]
    MalformedFeed(String),

    /// The feed could not be fetched. The store keeps working on the saved user events.
    #[error("unable to fetch the feed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The saved user events could not be decoded. They are treated as an empty set.
    #[error("unable to decode the saved user events: {0}")]
    PersistenceDecode(#[source] serde_json::Error),

    /// The storage collaborator itself failed
    #[error("the event storage is unavailable: {0}")]
    Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The mutation target is not in the current event set
    #[error("no event {0} in the current event set")]
    NotFound(EventId),

    /// The mutation target comes from the feed. Feed events would be overwritten on the next reload, so the store refuses to edit them.
    #[error("event {0} comes from the feed and cannot be edited")]
    ImmutableEvent(EventId),

    /// A mutation was attempted before any successful load
    #[error("the store has not loaded any events yet")]
    NotLoaded,
}
