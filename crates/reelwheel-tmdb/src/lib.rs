// TMDB title resolver.
//
// Looks a free-text title up with The Movie Database v3 search endpoint and
// turns the first hit into an `Item`. Without an API key the resolver is
// `Disabled` and every lookup fails with `ResolveError::NotConfigured`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use reelwheel_core::config::{Config, TmdbConfig};
use reelwheel_core::{Item, ResolveError, TitleResolver};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Poster shown for titles TMDB has no artwork for.
pub const PLACEHOLDER_POSTER: &str = "https://via.placeholder.com/200x300?text=Not+Found";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: u64,
    title: String,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    overview: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    status_message: Option<String>,
}

// ---------------------------------------------------------------------------
// TmdbClient
// ---------------------------------------------------------------------------

/// HTTP client for the TMDB search API.
pub struct TmdbClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    image_base_url: String,
    language: String,
}

impl TmdbClient {
    pub fn new(api_key: String, settings: &TmdbConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            image_base_url: settings.image_base_url.trim_end_matches('/').to_string(),
            language: settings.language.clone(),
        }
    }

    /// Search for `title` and return the best match, if any.
    pub async fn search(&self, title: &str) -> Result<Option<Item>, ResolveError> {
        let url = format!("{}/search/movie", self.base_url);
        debug!(%title, "searching TMDB");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
                ("query", title),
                ("page", "1"),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| ResolveError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ResolveError::Transport(e.without_url().to_string()))?;

        if !status.is_success() {
            let message = parse_error_message(&body).unwrap_or_else(|| status.to_string());
            warn!(status = status.as_u16(), "TMDB search failed: {message}");
            return Err(ResolveError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let item = parse_first_result(&body, &self.image_base_url)?;
        match &item {
            Some(item) => debug!(%title, id = %item.id, matched = %item.title, "TMDB match"),
            None => debug!(%title, "no TMDB match"),
        }
        Ok(item)
    }
}

// ---------------------------------------------------------------------------
// TmdbResolver
// ---------------------------------------------------------------------------

/// Either a live TMDB client or a stand-in used when no key is configured.
pub enum TmdbResolver {
    Active(TmdbClient),
    Disabled,
}

impl TmdbResolver {
    /// `Active` when credentials carry a non-empty key, otherwise `Disabled`.
    pub fn from_config(config: &Config) -> Self {
        match &config.credentials.tmdb_api_key {
            Some(key) if !key.trim().is_empty() => {
                TmdbResolver::Active(TmdbClient::new(key.trim().to_string(), &config.tmdb))
            }
            _ => TmdbResolver::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, TmdbResolver::Active(_))
    }
}

#[async_trait]
impl TitleResolver for TmdbResolver {
    async fn resolve(&self, title: &str) -> Result<Option<Item>, ResolveError> {
        match self {
            TmdbResolver::Active(client) => client.search(title).await,
            TmdbResolver::Disabled => Err(ResolveError::NotConfigured),
        }
    }
}

// ---------------------------------------------------------------------------
// JSON parsing helpers
// ---------------------------------------------------------------------------

/// Map the first search hit to an `Item`. An empty result set is `None`.
fn parse_first_result(body: &str, image_base_url: &str) -> Result<Option<Item>, ResolveError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| ResolveError::Parse(e.to_string()))?;
    Ok(response
        .results
        .into_iter()
        .next()
        .map(|hit| to_item(hit, image_base_url)))
}

fn to_item(hit: SearchResult, image_base_url: &str) -> Item {
    let poster = match hit.poster_path.as_deref().filter(|p| !p.is_empty()) {
        Some(path) if path.starts_with('/') => format!("{image_base_url}{path}"),
        Some(path) => format!("{image_base_url}/{path}"),
        None => PLACEHOLDER_POSTER.to_string(),
    };
    let item = Item::new(hit.id.to_string(), hit.title, poster);
    match hit.overview.filter(|o| !o.trim().is_empty()) {
        Some(overview) => item.with_description(overview),
        None => item,
    }
}

fn parse_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.status_message)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const IMAGES: &str = "https://image.tmdb.org/t/p/w200";

    fn settings(base_url: String) -> TmdbConfig {
        TmdbConfig {
            base_url,
            image_base_url: IMAGES.to_string(),
            language: "en-US".to_string(),
        }
    }

    /// Serve one canned HTTP response and hand back the raw request line.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            request.lines().next().unwrap_or_default().to_string()
        });
        (format!("http://{addr}/3"), task)
    }

    // -- parsing --

    #[test]
    fn first_result_maps_to_item() {
        let body = r#"{
            "page": 1,
            "results": [
                {"id": 603, "title": "The Matrix", "poster_path": "/matrix.jpg", "overview": "A hacker learns the truth."},
                {"id": 604, "title": "The Matrix Reloaded", "poster_path": "/reloaded.jpg"}
            ]
        }"#;
        let item = parse_first_result(body, IMAGES).unwrap().unwrap();
        assert_eq!(item.id, "603");
        assert_eq!(item.title, "The Matrix");
        assert_eq!(item.poster_ref, format!("{IMAGES}/matrix.jpg"));
        assert_eq!(item.description.as_deref(), Some("A hacker learns the truth."));
    }

    #[test]
    fn missing_poster_uses_placeholder() {
        let body = r#"{"results": [{"id": 1, "title": "Obscure", "poster_path": null, "overview": ""}]}"#;
        let item = parse_first_result(body, IMAGES).unwrap().unwrap();
        assert_eq!(item.poster_ref, PLACEHOLDER_POSTER);
        assert!(item.description.is_none());
    }

    #[test]
    fn empty_results_is_no_match() {
        assert!(parse_first_result(r#"{"page":1,"results":[]}"#, IMAGES)
            .unwrap()
            .is_none());
    }

    #[test]
    fn malformed_body_is_parse_error() {
        let err = parse_first_result("<html>", IMAGES).unwrap_err();
        assert!(matches!(err, ResolveError::Parse(_)));
    }

    #[test]
    fn error_body_message_is_extracted() {
        let body = r#"{"status_code": 7, "status_message": "Invalid API key: You must be granted a valid key.", "success": false}"#;
        assert_eq!(
            parse_error_message(body).as_deref(),
            Some("Invalid API key: You must be granted a valid key.")
        );
        assert_eq!(parse_error_message("nope"), None);
    }

    // -- resolver --

    #[tokio::test]
    async fn disabled_resolver_is_not_configured() {
        let err = TmdbResolver::Disabled.resolve("Alien").await.unwrap_err();
        assert!(matches!(err, ResolveError::NotConfigured));
        assert!(!TmdbResolver::Disabled.is_enabled());
    }

    #[tokio::test]
    async fn search_sends_query_and_maps_hit() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"results":[{"id":348,"title":"Alien","poster_path":"/alien.jpg","overview":"In space..."}]}"#,
        )
        .await;
        let client = TmdbClient::new("test-key".into(), &settings(base));

        let item = client.search("Alien").await.unwrap().unwrap();
        assert_eq!(item.id, "348");
        assert_eq!(item.poster_ref, format!("{IMAGES}/alien.jpg"));

        let request_line = server.await.unwrap();
        assert!(request_line.starts_with("GET /3/search/movie?"));
        assert!(request_line.contains("api_key=test-key"));
        assert!(request_line.contains("query=Alien"));
        assert!(request_line.contains("language=en-US"));
        assert!(request_line.contains("page=1"));
    }

    #[tokio::test]
    async fn search_error_status_is_reported() {
        let (base, server) = serve_once(
            "401 Unauthorized",
            r#"{"status_code":7,"status_message":"Invalid API key"}"#,
        )
        .await;
        let client = TmdbClient::new("bad-key".into(), &settings(base));

        let err = client.search("Alien").await.unwrap_err();
        match err {
            ResolveError::Status { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API key");
            }
            other => panic!("expected Status, got: {other}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = TmdbClient::new("k".into(), &settings(format!("http://{addr}")));
        let err = client.search("Alien").await.unwrap_err();
        assert!(matches!(err, ResolveError::Transport(_)));
    }
}
