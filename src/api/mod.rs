/// API Client Module
///
/// This module handles all interactions with the PokeAPI REST endpoints.
/// It wraps a reqwest client with a fixed per-request timeout and exposes a
/// single JSON GET used by the extract stage for listing and detail pages.
use anyhow::{Context, Result};
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors from a single GET request
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection failure, timeout, or body read failure
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Any response other than 200 OK
    #[error("failed to fetch data from {url}, status code: {status}")]
    Status { url: String, status: u16 },

    /// Body is not valid JSON or lacks an expected key
    #[error("malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Source of JSON documents addressed by URL
#[allow(async_fn_in_trait)]
pub trait JsonSource {
    async fn get_json(&self, url: &str) -> std::result::Result<Value, FetchError>;
}

pub struct ApiClient {
    client: reqwest::Client,
}

impl ApiClient {
    /// Create a new client applying `timeout` to every request
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }
}

impl JsonSource for ApiClient {
    async fn get_json(&self, url: &str) -> std::result::Result<Value, FetchError> {
        tracing::debug!("GET {}", url);

        let response =
            self.client.get(url).send().await.map_err(|source| FetchError::Transport { url: url.to_string(), source })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() });
        }

        let body = response.bytes().await.map_err(|source| FetchError::Transport { url: url.to_string(), source })?;

        serde_json::from_slice(&body).map_err(|source| FetchError::Decode { url: url.to_string(), source })
    }
}

/// Join the API base URL and a resource path
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Extract the natural identifier from a detail URL (`.../pokemon/25/` -> 25)
pub fn id_from_url(url: &str) -> Option<u64> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/').rsplit('/').next().and_then(|segment| segment.parse().ok())
}

/// Apply a page size to a listing URL, replacing any existing `limit` parameter
pub fn with_limit(url: &str, limit: u32) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| key != "limit")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    parsed.query_pairs_mut().clear().extend_pairs(kept).append_pair("limit", &limit.to_string());
    Some(parsed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Client that ignores proxy settings from the environment
    fn local_client() -> ApiClient {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(5)).no_proxy().build().unwrap();
        ApiClient { client }
    }

    /// Serve a single canned HTTP response and return the URL to request
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\
                 Connection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{addr}/api/v2/pokemon")
    }

    #[tokio::test]
    async fn test_get_json_returns_listing_page() {
        let body = r#"{"results":[{"name":"bulbasaur","url":"https://x/pokemon/1/"}],"next":null}"#;
        let url = serve_once("200 OK", body).await;

        let value = local_client().get_json(&url).await.unwrap();
        assert_eq!(value["results"][0]["name"], "bulbasaur");
        assert!(value["next"].is_null());
    }

    #[tokio::test]
    async fn test_get_json_rejects_non_200_success() {
        let url = serve_once("201 Created", r#"{"results":[],"next":null}"#).await;

        let err = local_client().get_json(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 201, .. }));
    }

    #[tokio::test]
    async fn test_get_json_reports_server_error_status() {
        let url = serve_once("503 Service Unavailable", "{}").await;

        let err = local_client().get_json(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_get_json_malformed_body() {
        let url = serve_once("200 OK", "not json").await;

        let err = local_client().get_json(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
        assert!(err.to_string().starts_with("malformed response from http://127.0.0.1:"));
    }

    #[tokio::test]
    async fn test_get_json_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = local_client().get_json(&format!("http://{addr}/api/v2/pokemon")).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
    }

    #[test]
    fn test_id_from_url() {
        assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon/1/"), Some(1));
        assert_eq!(id_from_url("https://pokeapi.co/api/v2/evolution-chain/67"), Some(67));
        assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon/10034/?lang=en"), Some(10034));
        assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon/pikachu/"), None);
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://pokeapi.co/api/v2/", "/pokemon"), "https://pokeapi.co/api/v2/pokemon");
        assert_eq!(join_url("http://localhost:8080", "pokemon"), "http://localhost:8080/pokemon");
    }

    #[test]
    fn test_with_limit() {
        assert_eq!(with_limit("https://x/pokemon", 50).as_deref(), Some("https://x/pokemon?limit=50"));
        assert_eq!(
            with_limit("https://x/evolution-chain/?offset=0&limit=10", 50).as_deref(),
            Some("https://x/evolution-chain/?offset=0&limit=50")
        );
        assert!(with_limit("not a url", 50).is_none());
    }

    #[test]
    fn test_status_error_message() {
        let err = FetchError::Status { url: "https://x/pokemon".into(), status: 503 };
        assert_eq!(err.to_string(), "failed to fetch data from https://x/pokemon, status code: 503");
    }
}
