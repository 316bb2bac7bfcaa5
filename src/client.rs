//! This module provides a client to fetch the feed document from a web server

use std::error::Error;

use async_trait::async_trait;
use url::Url;

use crate::traits::FeedTransport;

/// A [`FeedTransport`] that fetches the document with a plain HTTP GET
#[derive(Debug, Default)]
pub struct Client {}

impl Client {
    /// Create a client. This does not start a connection
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait]
impl FeedTransport for Client {
    async fn fetch_document(&self, url: &Url) -> Result<String, Box<dyn Error + Send + Sync>> {
        let res = reqwest::Client::new()
            .get(url.as_str())
            .send()
            .await?;

        if res.status().is_success() == false {
            return Err(format!("Unexpected HTTP status code {:?}", res.status()).into());
        }

        let text = res.text().await?;
        Ok(text)
    }
}
