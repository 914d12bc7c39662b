//! Photo lookup through the Unsplash search API.

use std::future::Future;

use log::{debug, error, warn};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{BotError, Result};

const UNSPLASH_API_URL: &str = "https://api.unsplash.com";

/// Finds a photo URL for a query.
pub trait ImageSearch: Send + Sync {
    fn find_photo(&self, query: &str) -> impl Future<Output = Option<String>> + Send;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
}

#[derive(Debug, Clone)]
pub struct UnsplashClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl UnsplashClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, UNSPLASH_API_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            client: Client::new(),
        }
    }

    /// Search for popular landscape photos and return the first one's URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Unsplash answers with a
    /// non-success status.
    pub async fn search(&self, query: &str) -> Result<Option<String>> {
        debug!("Searching Unsplash for '{query}'");
        let response = self
            .client
            .get(format!(
                "{}/search/photos",
                self.base_url.trim_end_matches('/')
            ))
            .query(&[
                ("query", query),
                ("client_id", self.api_key.as_str()),
                ("order_by", "popular"),
                ("orientation", "landscape"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error response: {e}"));
            return Err(BotError::UnsplashApi { status, message });
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.results.into_iter().next().map(|photo| photo.urls.regular))
    }
}

impl ImageSearch for UnsplashClient {
    async fn find_photo(&self, query: &str) -> Option<String> {
        match self.search(query).await {
            Ok(Some(url)) => Some(url),
            Ok(None) => {
                warn!("Unsplash returned no results for query: '{query}'");
                None
            }
            Err(e) => {
                error!("Unsplash request failed: {e}");
                None
            }
        }
    }
}
