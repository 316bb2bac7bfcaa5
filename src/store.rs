//! This module merges the two event sources of the dashboard into a single virtual one
//!
//! A [`CalendarStore`] owns the merged set of events: the feed subset (rebuilt wholesale from the feed document on every load) and the local subset (the events the user created, the only ones that are ever persisted). \
//! Every mutation goes through the store, so that the two subsets cannot drift: user events are re-persisted after each change, and feed events are refused edits that the next reload would overwrite anyway.

use std::collections::HashMap;

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use url::Url;

use crate::error::StoreError;
use crate::event::{Event, EventId, Provenance};
use crate::settings::LOCAL_EVENT_COLOR;
use crate::traits::{FeedTransport, KeyValueStore};

bitflags! {
    /// Flags to tell which events should be returned
    pub struct Subsets: u8 {
        /// The events parsed from the feed
        const FEED = 1;
        /// The events the user created
        const LOCAL = 2;
    }
}

/// The lifecycle of a [`CalendarStore`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreState {
    /// [`CalendarStore::load`] has never been called
    Uninitialized,
    /// A load is in flight
    Loading,
    /// Both the feed and the saved user events are available
    Ready,
    /// The last load could not reach the feed; the saved user events are available
    DegradedReady,
    /// The last load could neither reach the feed nor find usable user events. Only load retries are accepted.
    Failed,
}

/// What reading the saved user events yielded
enum LocalRead {
    /// A decodable save (possibly an empty list)
    Loaded(HashMap<EventId, Event>),
    /// Nothing was ever saved under the storage key
    Missing,
    /// A save exists but cannot be decoded
    Corrupt,
    /// The storage collaborator itself failed
    Unavailable,
}

/// The event store of the dashboard calendar.
///
/// `T` fetches the feed document (usually [`Client`](crate::client::Client)), `S` persists the user events (usually [`FileStore`](crate::storage::FileStore)). Both can be swapped for mocks in tests.
///
/// All operations take `&mut self`: a single owner drives the store, so a mutation can never interleave with an in-flight load, and two loads cannot race each other.
pub struct CalendarStore<T, S>
where
    T: FeedTransport,
    S: KeyValueStore,
{
    transport: T,
    storage: S,
    feed_url: Url,
    storage_key: String,

    state: StoreState,
    /// Whether some load has completed already. Unlike `state`, this survives a load that was dropped mid-flight, so the in-memory user events stay authoritative.
    has_loaded: bool,
    feed_events: HashMap<EventId, Event>,
    local_events: HashMap<EventId, Event>,
}

impl<T, S> CalendarStore<T, S>
where
    T: FeedTransport,
    S: KeyValueStore,
{
    /// Create a store. This does not load anything yet
    pub fn new(transport: T, storage: S, feed_url: Url, storage_key: String) -> Self {
        Self {
            transport, storage, feed_url, storage_key,
            state: StoreState::Uninitialized,
            has_loaded: false,
            feed_events: HashMap::new(),
            local_events: HashMap::new(),
        }
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    /// Returns the collaborator the feed is fetched through
    pub fn transport(&self) -> &T { &self.transport }
    /// Returns the collaborator the user events are saved to
    pub fn storage(&self) -> &S { &self.storage }

    /// Fetch the feed, read the saved user events, and publish their union.
    ///
    /// The feed subset is replaced wholesale. An unreadable save degrades to an empty local subset (with a warning) rather than failing the load. An unreachable feed returns the user events alone, in [`StoreState::DegradedReady`]; it only is an error when there are no usable user events either.
    ///
    /// On a re-load, the user events kept in memory are authoritative: they are not re-read from storage, so a mutation whose persistence write failed is not lost by reloading.
    pub async fn load(&mut self) -> Result<Vec<Event>, StoreError> {
        let already_loaded = self.has_loaded;
        self.state = StoreState::Loading;

        let feed = self.fetch_feed().await;

        let local = if already_loaded {
            LocalRead::Loaded(std::mem::take(&mut self.local_events))
        } else {
            self.read_local().await
        };

        match feed {
            Ok(feed_events) => {
                self.feed_events = feed_events;
                self.local_events = match local {
                    LocalRead::Loaded(events) => events,
                    // Warned about in read_local already; the calendar starts over feed-only
                    LocalRead::Missing | LocalRead::Corrupt | LocalRead::Unavailable => HashMap::new(),
                };
                self.state = StoreState::Ready;
                self.has_loaded = true;
                Ok(self.merged())
            },
            Err(err) => match local {
                LocalRead::Loaded(events) => {
                    log::warn!("The feed is not available, displaying the saved user events only: {}", err);
                    self.feed_events.clear();
                    self.local_events = events;
                    self.state = StoreState::DegradedReady;
                    self.has_loaded = true;
                    Ok(self.merged())
                },
                LocalRead::Missing | LocalRead::Corrupt | LocalRead::Unavailable => {
                    self.state = StoreState::Failed;
                    Err(err)
                },
            },
        }
    }

    /// Replace the feed subset with a fresh copy of the feed, leaving the user events untouched.
    ///
    /// Calling this twice with an unchanged feed document (and no mutation in between) yields the same merged set.
    pub async fn reload(&mut self) -> Result<Vec<Event>, StoreError> {
        self.load().await
    }

    /// Create a new user event and persist it.
    ///
    /// The id is minted in the user namespace and is guaranteed not to collide with any event currently known: creation never overwrites an existing entry.
    pub async fn add_event(&mut self, title: String, start: DateTime<Utc>, all_day: bool) -> Result<Event, StoreError> {
        self.ensure_mutable()?;

        let id = loop {
            let id = EventId::random_local();
            if self.get_event(&id).is_none() {
                break id;
            }
        };

        let color = LOCAL_EVENT_COLOR.lock().unwrap().to_hex_string();
        let event = Event::new(id.clone(), title, start, None, all_day, color);
        self.local_events.insert(id, event.clone());
        self.persist_local().await;
        Ok(event)
    }

    /// Move or resize an event and persist the change.
    ///
    /// Feed events are refused with [`StoreError::ImmutableEvent`]: the feed subset is replaced wholesale on every reload, so an edit to it could not survive anyway.
    pub async fn update_event(&mut self, id: &EventId, new_start: DateTime<Utc>, new_end: Option<DateTime<Utc>>) -> Result<Event, StoreError> {
        self.ensure_mutable()?;

        match id.provenance() {
            Provenance::Feed => {
                if self.feed_events.contains_key(id) {
                    Err(StoreError::ImmutableEvent(id.clone()))
                } else {
                    Err(StoreError::NotFound(id.clone()))
                }
            },
            Provenance::Local => {
                let event = match self.local_events.get_mut(id) {
                    None => return Err(StoreError::NotFound(id.clone())),
                    Some(event) => {
                        event.set_period(new_start, new_end);
                        event.clone()
                    },
                };
                self.persist_local().await;
                Ok(event)
            },
        }
    }

    /// Delete a user event and persist the removal.
    ///
    /// Feed events are not deletable; asking to delete one (or an id that does not exist at all) is a silent no-op, and nothing is re-persisted.
    pub async fn delete_event(&mut self, id: &EventId) -> Result<(), StoreError> {
        self.ensure_mutable()?;

        if self.local_events.remove(id).is_none() {
            return Ok(());
        }
        self.persist_local().await;
        Ok(())
    }

    /// Returns every event currently known, feed and user ones alike, sorted by id
    pub fn events(&self) -> Vec<&Event> {
        self.events_matching(Subsets::all())
    }

    /// Returns the events that belong to the given subsets, sorted by id
    pub fn events_matching(&self, subsets: Subsets) -> Vec<&Event> {
        let mut events = Vec::new();
        if subsets.contains(Subsets::FEED) {
            events.extend(self.feed_events.values());
        }
        if subsets.contains(Subsets::LOCAL) {
            events.extend(self.local_events.values());
        }
        events.sort_by(|a, b| a.id().as_str().cmp(b.id().as_str()));
        events
    }

    pub fn get_event(&self, id: &EventId) -> Option<&Event> {
        self.feed_events.get(id).or_else(|| self.local_events.get(id))
    }

    /// Render the user events as an ICS document
    pub fn export_local(&self) -> String {
        crate::ical::build_document(self.events_matching(Subsets::LOCAL))
    }


    async fn fetch_feed(&self) -> Result<HashMap<EventId, Event>, StoreError> {
        let text = self.transport.fetch_document(&self.feed_url).await
            .map_err(StoreError::Transport)?;
        let events = crate::ical::parse(&text)?;
        Ok(events.into_iter().map(|event| (event.id().clone(), event)).collect())
    }

    async fn read_local(&self) -> LocalRead {
        let text = match self.storage.get(&self.storage_key).await {
            Err(err) => {
                log::warn!("{}", StoreError::Persistence(err));
                return LocalRead::Unavailable;
            },
            Ok(None) => return LocalRead::Missing,
            Ok(Some(text)) => text,
        };

        let events: Vec<Event> = match serde_json::from_str(&text) {
            Err(err) => {
                log::warn!("{}", StoreError::PersistenceDecode(err));
                return LocalRead::Corrupt;
            },
            Ok(events) => events,
        };

        // A feed-namespaced id has no business in the save file; keeping it would let it shadow (or be resurrected as) a feed event
        let mut local_events = HashMap::new();
        for event in events {
            match event.provenance() {
                Provenance::Local => { local_events.insert(event.id().clone(), event); },
                Provenance::Feed => log::warn!("Ignoring saved event {}: it claims to come from the feed", event.id()),
            }
        }
        LocalRead::Loaded(local_events)
    }

    /// Save the whole local subset, not a delta, so the save file always decodes to a consistent set
    async fn persist_local(&mut self) {
        let mut events: Vec<&Event> = self.local_events.values().collect();
        events.sort_by(|a, b| a.id().as_str().cmp(b.id().as_str()));

        let json = match serde_json::to_string(&events) {
            Err(err) => {
                log::warn!("Unable to serialize the user events: {}", err);
                return;
            },
            Ok(json) => json,
        };

        if let Err(err) = self.storage.set(&self.storage_key, &json).await {
            log::warn!("Unable to save the user events: {}", err);
        }
    }

    fn ensure_mutable(&self) -> Result<(), StoreError> {
        match self.state {
            StoreState::Ready | StoreState::DegradedReady => Ok(()),
            _ => Err(StoreError::NotLoaded),
        }
    }

    fn merged(&self) -> Vec<Event> {
        let mut events: Vec<Event> = self.feed_events.values()
            .chain(self.local_events.values())
            .cloned()
            .collect();
        events.sort_by(|a, b| a.id().as_str().cmp(b.id().as_str()));
        events
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MemoryStore, MockBehaviour, MockTransport};

    use std::sync::{Arc, Mutex};

    const FEED_URL: &str = "https://example.com/calendarifestius_es.ics";
    const STORAGE_KEY: &str = "userEvents";

    const SINGLE_HOLIDAY_FEED: &str = "BEGIN:VCALENDAR\r\n\
        VERSION:2.0\r\n\
        PRODID:-//Generalitat//Festius//CA\r\n\
        BEGIN:VEVENT\r\n\
        UID:abc123\r\n\
        DTSTAMP:20240101T000000\r\n\
        DTSTART;VALUE=DATE:20241225\r\n\
        SUMMARY:Holiday\r\n\
        END:VEVENT\r\n\
        END:VCALENDAR\r\n";

    fn new_store(document: &str, storage: MemoryStore) -> CalendarStore<MockTransport, MemoryStore> {
        CalendarStore::new(
            MockTransport::new(document),
            storage,
            FEED_URL.parse().unwrap(),
            String::from(STORAGE_KEY),
        )
    }

    fn start() -> DateTime<Utc> {
        "2024-06-01T10:00:00Z".parse().unwrap()
    }

    #[tokio::test]
    async fn load_merges_feed_and_empty_save() {
        let mut store = new_store(SINGLE_HOLIDAY_FEED, MemoryStore::new());

        let events = store.load().await.unwrap();
        assert_eq!(store.state(), StoreState::Ready);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id().as_str(), "ics-abc123");
        assert_eq!(events[0].all_day(), true);
    }

    #[tokio::test]
    async fn add_event_mints_a_user_id_and_persists() {
        let mut store = new_store(SINGLE_HOLIDAY_FEED, MemoryStore::new());
        store.load().await.unwrap();

        let event = store.add_event(String::from("Dentist"), start(), false).await.unwrap();
        assert_eq!(event.provenance(), Provenance::Local);
        assert!(event.id().as_str().starts_with("user-"));
        assert_eq!(event.title(), "Dentist");
        assert_eq!(event.all_day(), false);
        assert_eq!(event.color(), "#936639");

        // The save decodes to exactly that single event: feed events are never persisted
        let saved: Vec<Event> = serde_json::from_str(store.storage().raw(STORAGE_KEY).unwrap()).unwrap();
        assert_eq!(saved, vec![event]);
        assert_eq!(store.events().len(), 2);
    }

    #[tokio::test]
    async fn update_moves_a_user_event() {
        let mut store = new_store(SINGLE_HOLIDAY_FEED, MemoryStore::new());
        store.load().await.unwrap();

        let event = store.add_event(String::from("Dentist"), start(), false).await.unwrap();
        let new_start: DateTime<Utc> = "2024-06-02T09:00:00Z".parse().unwrap();
        let new_end: DateTime<Utc> = "2024-06-02T10:00:00Z".parse().unwrap();

        let updated = store.update_event(event.id(), new_start, Some(new_end)).await.unwrap();
        assert_eq!(updated.start(), new_start);
        assert_eq!(updated.end(), Some(new_end));

        let saved: Vec<Event> = serde_json::from_str(store.storage().raw(STORAGE_KEY).unwrap()).unwrap();
        assert_eq!(saved, vec![updated]);
    }

    #[tokio::test]
    async fn update_refuses_feed_events() {
        let mut store = new_store(SINGLE_HOLIDAY_FEED, MemoryStore::new());
        store.load().await.unwrap();

        let id = EventId::from("ics-abc123");
        let outcome = store.update_event(&id, start(), None).await;
        assert!(matches!(outcome, Err(StoreError::ImmutableEvent(_))));

        let unknown = EventId::from("user-does-not-exist");
        let outcome = store.update_event(&unknown, start(), None).await;
        assert!(matches!(outcome, Err(StoreError::NotFound(_))));

        let unknown_feed = EventId::from("ics-does-not-exist");
        let outcome = store.update_event(&unknown_feed, start(), None).await;
        assert!(matches!(outcome, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_only_affects_the_local_subset() {
        let mut store = new_store(SINGLE_HOLIDAY_FEED, MemoryStore::new());
        store.load().await.unwrap();
        let event = store.add_event(String::from("Dentist"), start(), false).await.unwrap();
        let saved_before = store.storage().raw(STORAGE_KEY).unwrap().clone();

        // Deleting a feed event is a no-op, and nothing is re-persisted
        store.delete_event(&EventId::from("ics-abc123")).await.unwrap();
        assert_eq!(store.events().len(), 2);
        assert_eq!(store.storage().raw(STORAGE_KEY).unwrap(), &saved_before);

        store.delete_event(event.id()).await.unwrap();
        assert_eq!(store.events().len(), 1);
        let saved: Vec<Event> = serde_json::from_str(store.storage().raw(STORAGE_KEY).unwrap()).unwrap();
        assert_eq!(saved, Vec::new());
    }

    #[tokio::test]
    async fn corrupt_save_degrades_to_feed_only() {
        let mut storage = MemoryStore::new();
        storage.insert(STORAGE_KEY, "this is not valid JSON");
        let mut store = new_store(SINGLE_HOLIDAY_FEED, storage);

        let events = store.load().await.unwrap();
        assert_eq!(store.state(), StoreState::Ready);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id().as_str(), "ics-abc123");
    }

    #[tokio::test]
    async fn feed_namespaced_saves_are_ignored() {
        let mut storage = MemoryStore::new();
        storage.insert(STORAGE_KEY, r#"[
            {"id": "ics-abc123", "title": "A smuggled feed event", "start": "2024-12-25T00:00:00Z", "allDay": true},
            {"id": "user-1700000000000", "title": "Dentist", "start": "2024-06-01T10:00:00Z", "allDay": false}
        ]"#);
        let mut store = new_store(SINGLE_HOLIDAY_FEED, storage);

        let events = store.load().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(store.events_matching(Subsets::LOCAL).len(), 1);
        assert_eq!(store.events_matching(Subsets::FEED)[0].title(), "Holiday");
    }

    #[tokio::test]
    async fn unreachable_feed_degrades_to_saved_events() {
        let mut storage = MemoryStore::new();
        storage.insert(STORAGE_KEY, r#"[{"id": "user-1700000000000", "title": "Dentist", "start": "2024-06-01T10:00:00Z", "allDay": false}]"#);

        let behaviour = Arc::new(Mutex::new(MockBehaviour::fail_now(1)));
        let transport = MockTransport::with_behaviour(SINGLE_HOLIDAY_FEED, Arc::clone(&behaviour));
        let mut store = CalendarStore::new(transport, storage, FEED_URL.parse().unwrap(), String::from(STORAGE_KEY));

        let events = store.load().await.unwrap();
        assert_eq!(store.state(), StoreState::DegradedReady);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title(), "Dentist");

        // Mutations are accepted while degraded
        store.add_event(String::from("Groceries"), start(), false).await.unwrap();
        assert_eq!(store.events().len(), 2);

        // The transport works again: the feed comes back without losing the user events
        let events = store.reload().await.unwrap();
        assert_eq!(store.state(), StoreState::Ready);
        assert_eq!(events.len(), 3);
    }

    #[tokio::test]
    async fn unreachable_feed_with_no_save_is_a_failure() {
        let behaviour = Arc::new(Mutex::new(MockBehaviour::fail_now(1)));
        let transport = MockTransport::with_behaviour(SINGLE_HOLIDAY_FEED, Arc::clone(&behaviour));
        let mut store = CalendarStore::new(transport, MemoryStore::new(), FEED_URL.parse().unwrap(), String::from(STORAGE_KEY));

        assert!(matches!(store.load().await, Err(StoreError::Transport(_))));
        assert_eq!(store.state(), StoreState::Failed);

        // Only load retries are accepted in this state
        assert!(matches!(store.add_event(String::from("Dentist"), start(), false).await, Err(StoreError::NotLoaded)));

        let events = store.load().await.unwrap();
        assert_eq!(store.state(), StoreState::Ready);
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn mutations_are_refused_before_the_first_load() {
        let mut store = new_store(SINGLE_HOLIDAY_FEED, MemoryStore::new());
        assert_eq!(store.state(), StoreState::Uninitialized);
        assert!(matches!(store.add_event(String::from("Dentist"), start(), false).await, Err(StoreError::NotLoaded)));
        assert!(matches!(store.delete_event(&EventId::from("user-x")).await, Err(StoreError::NotLoaded)));
    }

    #[tokio::test]
    async fn reload_keeps_unpersisted_mutations() {
        // Every save fails: the user events only live in memory
        let behaviour = Arc::new(Mutex::new(MockBehaviour::new()));
        behaviour.lock().unwrap().set_behaviour = (0, u32::MAX);
        let storage = MemoryStore::with_behaviour(Arc::clone(&behaviour));
        let mut store = new_store(SINGLE_HOLIDAY_FEED, storage);

        store.load().await.unwrap();
        let event = store.add_event(String::from("Dentist"), start(), false).await.unwrap();
        assert!(store.storage().raw(STORAGE_KEY).is_none());

        let events = store.reload().await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(store.get_event(event.id()).is_some());
    }

    #[tokio::test]
    async fn reload_replaces_the_feed_wholesale() {
        const TWO_HOLIDAYS_FEED: &str = "BEGIN:VCALENDAR\r\n\
            VERSION:2.0\r\n\
            PRODID:-//Generalitat//Festius//CA\r\n\
            BEGIN:VEVENT\r\n\
            UID:abc123\r\n\
            DTSTAMP:20240101T000000\r\n\
            DTSTART;VALUE=DATE:20241225\r\n\
            SUMMARY:Holiday\r\n\
            END:VEVENT\r\n\
            BEGIN:VEVENT\r\n\
            UID:ghi789\r\n\
            DTSTAMP:20240101T000000\r\n\
            DTSTART;VALUE=DATE:20250101\r\n\
            SUMMARY:New year\r\n\
            END:VEVENT\r\n\
            END:VCALENDAR\r\n";

        let transport = MockTransport::new(TWO_HOLIDAYS_FEED);
        let document = transport.document();
        let mut store = CalendarStore::new(transport, MemoryStore::new(), FEED_URL.parse().unwrap(), String::from(STORAGE_KEY));

        store.load().await.unwrap();
        let event = store.add_event(String::from("Dentist"), start(), false).await.unwrap();
        assert_eq!(store.events().len(), 3);

        // The feed dropped an entry: the next reload must drop it too, but keep the user event
        *document.lock().unwrap() = String::from(SINGLE_HOLIDAY_FEED);
        let events = store.reload().await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(store.get_event(&EventId::from("ics-ghi789")).is_none());
        assert!(store.get_event(event.id()).is_some());
    }

    #[tokio::test]
    async fn reload_is_idempotent() {
        let mut store = new_store(SINGLE_HOLIDAY_FEED, MemoryStore::new());
        store.load().await.unwrap();
        store.add_event(String::from("Dentist"), start(), false).await.unwrap();

        let first = store.reload().await.unwrap();
        let second = store.reload().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn every_merged_event_has_exactly_one_provenance() {
        let mut storage = MemoryStore::new();
        storage.insert(STORAGE_KEY, r#"[{"id": "user-1700000000000", "title": "Dentist", "start": "2024-06-01T10:00:00Z", "allDay": false}]"#);
        let mut store = new_store(SINGLE_HOLIDAY_FEED, storage);
        store.load().await.unwrap();

        for event in store.events_matching(Subsets::FEED) {
            assert_eq!(event.provenance(), Provenance::Feed);
        }
        for event in store.events_matching(Subsets::LOCAL) {
            assert_eq!(event.provenance(), Provenance::Local);
        }
        assert_eq!(store.events().len(), store.events_matching(Subsets::FEED).len() + store.events_matching(Subsets::LOCAL).len());
    }

    #[tokio::test]
    async fn export_contains_only_user_events() {
        let mut store = new_store(SINGLE_HOLIDAY_FEED, MemoryStore::new());
        store.load().await.unwrap();
        store.add_event(String::from("Dentist"), start(), false).await.unwrap();

        let ical = store.export_local();
        assert!(ical.contains("SUMMARY:Dentist"));
        assert!(ical.contains("UID:user-") );
        assert!(ical.contains("ics-abc123") == false);
    }
}
