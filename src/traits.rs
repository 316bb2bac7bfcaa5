use std::error::Error;

use async_trait::async_trait;
use url::Url;

/// Where the feed document is fetched from.
///
/// The production implementation is [`Client`](crate::client::Client); tests inject a mocked one.
#[async_trait]
pub trait FeedTransport {
    /// Returns the raw text of the feed document.
    /// This function may be a long process, or may even fail, e.g. in case of a remote server.
    async fn fetch_document(&self, url: &Url) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// Where the user events are durably saved.
///
/// The store serializes its whole local subset under a single key, so implementations only need naive whole-value semantics. The production implementation is [`FileStore`](crate::storage::FileStore).
#[async_trait]
pub trait KeyValueStore {
    /// Returns the text saved under `key`, or `None` in case nothing was ever saved there
    async fn get(&self, key: &str) -> Result<Option<String>, Box<dyn Error + Send + Sync>>;
    /// Saves `value` under `key`, replacing any previous content
    async fn set(&mut self, key: &str, value: &str) -> Result<(), Box<dyn Error + Send + Sync>>;
}
