//! This module provides mocked collaborators, so that tests can run without a network or a disk
#![cfg(any(test, feature = "mock_collaborators"))]

use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use url::Url;

use crate::traits::{FeedTransport, KeyValueStore};

/// This stores some behaviour tweaks, that describe how a mocked collaborator will behave during a given test
///
/// So that a function fails _n_ times after _m_ initial successes, set `(m, n)` for the suited parameter
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    /// If this is true, every action will be allowed
    pub is_suspended: bool,

    // From the FeedTransport trait
    pub fetch_document_behaviour: (u32, u32),

    // From the KeyValueStore trait
    pub get_behaviour: (u32, u32),
    pub set_behaviour: (u32, u32),
}

impl MockBehaviour {
    pub fn new() -> Self {
        Self::default()
    }

    /// All operations will fail at once, for `n_fails` times
    pub fn fail_now(n_fails: u32) -> Self {
        Self {
            is_suspended: false,
            fetch_document_behaviour: (0, n_fails),
            get_behaviour: (0, n_fails),
            set_behaviour: (0, n_fails),
        }
    }

    /// Suspend this mock behaviour until you call `resume`
    pub fn suspend(&mut self) {
        self.is_suspended = true;
    }
    /// Make this behaviour active again
    pub fn resume(&mut self) {
        self.is_suspended = false;
    }

    pub fn can_fetch_document(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.fetch_document_behaviour, "fetch_document")
    }
    pub fn can_get(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.get_behaviour, "get")
    }
    pub fn can_set(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.set_behaviour, "set")
    }
}

/// Return Ok(()) in case the value is `(1+, _)` or `(_, 0)`, or return Err and decrement otherwise
fn decrement(value: &mut (u32, u32), descr: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    let remaining_successes = value.0;
    let remaining_failures = value.1;

    if remaining_successes > 0 {
        value.0 = value.0 - 1;
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    } else {
        if remaining_failures > 0 {
            value.1 = value.1 - 1;
            log::debug!("Mock behaviour: failing a {} ({:?})", descr, value);
            Err(format!("Mocked behaviour requires this {} to fail this time. ({:?})", descr, value).into())
        } else {
            log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
            Ok(())
        }
    }
}


/// A [`FeedTransport`] that serves a canned document instead of reaching the network
pub struct MockTransport {
    document: Arc<Mutex<String>>,
    mock_behaviour: Arc<Mutex<MockBehaviour>>,
}

impl MockTransport {
    pub fn new<S: ToString>(document: S) -> Self {
        Self {
            document: Arc::new(Mutex::new(document.to_string())),
            mock_behaviour: Arc::new(Mutex::new(MockBehaviour::new())),
        }
    }

    pub fn with_behaviour<S: ToString>(document: S, mock_behaviour: Arc<Mutex<MockBehaviour>>) -> Self {
        Self {
            document: Arc::new(Mutex::new(document.to_string())),
            mock_behaviour,
        }
    }

    /// Returns a handle to the served document, so a test can change the feed between two loads
    pub fn document(&self) -> Arc<Mutex<String>> {
        Arc::clone(&self.document)
    }
}

#[async_trait]
impl FeedTransport for MockTransport {
    async fn fetch_document(&self, _url: &Url) -> Result<String, Box<dyn Error + Send + Sync>> {
        self.mock_behaviour.lock().unwrap().can_fetch_document()?;
        let document = self.document.lock().unwrap().clone();
        Ok(document)
    }
}


/// A [`KeyValueStore`] that keeps everything in memory
#[derive(Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    mock_behaviour: Arc<Mutex<MockBehaviour>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behaviour(mock_behaviour: Arc<Mutex<MockBehaviour>>) -> Self {
        Self {
            entries: HashMap::new(),
            mock_behaviour,
        }
    }

    /// Pre-populate an entry, e.g. to simulate the save file of a previous session
    pub fn insert(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    /// Returns the raw stored text, so a test can inspect what was actually persisted
    pub fn raw(&self, key: &str) -> Option<&String> {
        self.entries.get(key)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
        self.mock_behaviour.lock().unwrap().can_get()?;
        Ok(self.entries.get(key).cloned())
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.mock_behaviour.lock().unwrap().can_set()?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
