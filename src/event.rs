//! Calendar events and their namespaced identifiers

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::settings::LOCAL_EVENT_COLOR;

/// The prefix that namespaces ids of events parsed from the feed
const FEED_PREFIX: &str = "ics-";
/// The prefix that namespaces ids of events the user created
const LOCAL_PREFIX: &str = "user-";

/// Tells which side of the merge an event belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provenance {
    /// The event was parsed from the read-only feed. It is replaced wholesale on every reload and never persisted.
    Feed,
    /// The event was created by the user. This is the only kind of event that gets persisted.
    Local,
}

/// An event identifier that carries its provenance as a structural prefix (e.g. `ics-abc123` or `user-6ff3fe70-…`)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventId {
    content: String,
}

impl EventId {
    /// The id of a feed entry, namespaced after its UID
    pub fn feed<S: AsRef<str>>(uid: S) -> Self {
        Self { content: format!("{}{}", FEED_PREFIX, uid.as_ref()) }
    }

    /// Generate a random user-namespaced EventId
    pub fn random_local() -> Self {
        let random = uuid::Uuid::new_v4().to_hyphenated().to_string();
        Self { content: format!("{}{}", LOCAL_PREFIX, random) }
    }

    /// Tells whether this id names a feed event or a user event.
    ///
    /// This is the single place where provenance is decided. An id that carries no known prefix can only have entered through the saved user events, so it counts as [`Provenance::Local`].
    pub fn provenance(&self) -> Provenance {
        if self.content.starts_with(FEED_PREFIX) {
            Provenance::Feed
        } else {
            Provenance::Local
        }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }
}

impl From<String> for EventId {
    fn from(content: String) -> Self {
        Self { content }
    }
}
impl From<&str> for EventId {
    fn from(content: &str) -> Self {
        Self { content: content.to_string() }
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.content)
    }
}

/// Used to support serde
impl Serialize for EventId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.content)
    }
}
/// Used to support serde
impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D>(deserializer: D) -> Result<EventId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let content = String::deserialize(deserializer)?;
        Ok(EventId { content })
    }
}


/// A calendar event, either parsed from the feed or created by the user.
///
/// The serialized field names are camelCased, so that the persisted records match what the calendar widget consumes directly. Records written by older versions (or by hand) may miss the `end` or `color` fields and may carry extra ones; both are tolerated on decode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    id: EventId,
    title: String,
    start: DateTime<Utc>,
    #[serde(default)]
    end: Option<DateTime<Utc>>,
    all_day: bool,
    #[serde(default = "default_color")]
    color: String,
}

fn default_color() -> String {
    LOCAL_EVENT_COLOR.lock().unwrap().to_hex_string()
}

impl Event {
    pub fn new(id: EventId, title: String, start: DateTime<Utc>, end: Option<DateTime<Utc>>, all_day: bool, color: String) -> Self {
        Self { id, title, start, end, all_day, color }
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    pub fn all_day(&self) -> bool {
        self.all_day
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn provenance(&self) -> Provenance {
        self.id.provenance()
    }

    /// Move or resize the event. A `None` end means the event has no duration of its own (e.g. a whole-day entry).
    pub fn set_period(&mut self, start: DateTime<Utc>, end: Option<DateTime<Utc>>) {
        self.start = start;
        self.end = end;
    }
}
