use crate::CompletionError;
use bytes::Bytes;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::Serialize;
use std::time::Duration;

const CONNECT_TIMEOUT_SECS: u64 = 10;

pub(crate) fn build_client(timeout_seconds: u64) -> Result<Client, CompletionError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .map_err(|e| CompletionError::CompletionError(format!("Failed to create HTTP client: {e}")))
}

/// Build HTTP request headers
pub(crate) fn build_headers(api_key: Option<&str>) -> Result<HeaderMap, String> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(api_key) = api_key {
        let auth_value = format!("Bearer {api_key}");
        let header_value = HeaderValue::from_str(&auth_value)
            .map_err(|e| format!("Invalid API key format: {e}"))?;
        headers.insert(AUTHORIZATION, header_value);
    }

    Ok(headers)
}

/// POST a JSON body and return the raw success body.
///
/// Non-2xx responses become `HttpError` carrying the upstream body unmodified.
pub(crate) async fn post_json<B: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    api_key: Option<&str>,
    body: &B,
) -> Result<Bytes, CompletionError> {
    let headers = build_headers(api_key).map_err(CompletionError::CompletionError)?;

    let response = client
        .post(url)
        .headers(headers)
        .json(body)
        .send()
        .await
        .map_err(|e| CompletionError::CompletionError(e.to_string()))?;

    if !response.status().is_success() {
        let status_code = response.status().as_u16();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|e| format!("Failed to read error response body: {e}"));
        return Err(CompletionError::HttpError {
            status_code,
            message: error_text,
        });
    }

    response
        .bytes()
        .await
        .map_err(|e| CompletionError::CompletionError(e.to_string()))
}
