// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use crate::error::Result;

/// Accept header for document downloads.
pub const PDF_ACCEPT: &str = "application/pdf,application/octet-stream;q=0.9,*/*;q=0.8";

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Body and response metadata of a binary GET.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    /// URL after redirects
    pub final_url: String,
    /// Media type without parameters, lower-cased
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// GET a binary resource. Non-2xx statuses are errors.
pub async fn fetch_binary(client: &Client, url: &str, accept: &str) -> Result<FetchedBody> {
    let response = client
        .get(url)
        .header(ACCEPT, accept)
        .send()
        .await?
        .error_for_status()?;

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_lowercase())
        .unwrap_or_default();
    let bytes = response.bytes().await?.to_vec();

    Ok(FetchedBody {
        final_url,
        content_type,
        bytes,
    })
}
