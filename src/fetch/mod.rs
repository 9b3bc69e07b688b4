//! HTTP plumbing for the results API.
//!
//! Requests go through the [`HttpClient`] trait so decorators such as
//! [`Paced`] can wrap the transport, and tests can substitute a stub.

mod basic;
mod paced;

pub use basic::BasicClient;
pub use paced::Paced;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{Request, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Transport used by every results API call.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

/// GETs `url` and returns the body, failing on a non-success status.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(anyhow!("{url} returned status {status}: {body}"));
    }

    let bytes = resp.bytes().await?.to_vec();
    debug!(url, bytes = bytes.len(), "Fetched");
    Ok(bytes)
}

/// GETs `url` and decodes the JSON body into `T`.
pub async fn fetch_json<C: HttpClient, T: DeserializeOwned>(client: &C, url: &str) -> Result<T> {
    let bytes = fetch_bytes(client, url).await?;
    serde_json::from_slice(&bytes).map_err(|e| anyhow!("Failed to parse response from {url}: {e}"))
}
