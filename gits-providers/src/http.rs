//! Shared HTTP plumbing for the REST providers

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::{Error, Result};

/// Per-request timeout for provider API calls
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest response body kept in error messages
const MAX_ERROR_BODY: usize = 512;

/// HTTP client with the tool's user agent and timeout
pub(crate) fn client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("gits/", env!("CARGO_PKG_VERSION")))
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}

/// Decode a JSON body, turning non-success statuses into [`Error::Status`]
pub(crate) async fn json<T: DeserializeOwned>(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let mut body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response".to_string());
        if body.len() > MAX_ERROR_BODY {
            let mut end = MAX_ERROR_BODY;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
        }
        return Err(Error::Status {
            provider,
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::Parse(format!("{} response: {}", provider, e)))
}
