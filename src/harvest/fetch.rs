// src/harvest/fetch.rs
//! HTTP seam for the harvesters: a live reqwest client and an in-memory fixture server.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            timeout,
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// `url?k=v&...` for logs and fixture call records (not percent-encoded).
    pub fn display(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let q = self
            .query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.url, q)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Json(Value),
    /// 404: no results for this query.
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("cannot build HTTP client: {0}")]
    Client(String),
    #[error("malformed JSON body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get_json(&self, req: &FetchRequest) -> Result<FetchOutcome, FetchError>;
}

/// Live client. One request at a time; the per-request timeout comes from the catalog.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("clinical-ground-truth/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get_json(&self, req: &FetchRequest) -> Result<FetchOutcome, FetchError> {
        let resp = self
            .client
            .get(&req.url)
            .query(&req.query)
            .timeout(req.timeout)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        match resp.status() {
            StatusCode::OK => {
                let body = resp
                    .text()
                    .await
                    .map_err(|e| FetchError::Transport(e.to_string()))?;
                Ok(FetchOutcome::Json(serde_json::from_str(&body)?))
            }
            StatusCode::NOT_FOUND => Ok(FetchOutcome::NotFound),
            other => Err(FetchError::Status(other.as_u16())),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FixtureResponse {
    Json(Value),
    /// Raw body served with status 200 (e.g. to exercise decode failures).
    Body(String),
    Status(u16),
}

struct Route {
    url: String,
    query: Option<(String, String)>,
    response: FixtureResponse,
}

/// Canned responses keyed by URL and optionally one query pair. Unknown routes answer 404.
/// First matching route wins; every call is recorded.
#[derive(Default)]
pub struct FixtureFetcher {
    routes: Vec<Route>,
    calls: Mutex<Vec<String>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, response: FixtureResponse) -> Self {
        self.routes.push(Route {
            url: url.to_string(),
            query: None,
            response,
        });
        self
    }

    pub fn route_query(mut self, url: &str, key: &str, value: &str, response: FixtureResponse) -> Self {
        self.routes.push(Route {
            url: url.to_string(),
            query: Some((key.to_string(), value.to_string())),
            response,
        });
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn find(&self, req: &FetchRequest) -> Option<&FixtureResponse> {
        self.routes
            .iter()
            .find(|r| {
                r.url == req.url
                    && r.query
                        .as_ref()
                        .map_or(true, |(k, v)| req.query.iter().any(|(qk, qv)| qk == k && qv == v))
            })
            .map(|r| &r.response)
    }
}

#[async_trait]
impl Fetcher for FixtureFetcher {
    async fn get_json(&self, req: &FetchRequest) -> Result<FetchOutcome, FetchError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(req.display());
        }
        match self.find(req) {
            None | Some(FixtureResponse::Status(404)) => Ok(FetchOutcome::NotFound),
            Some(FixtureResponse::Status(code)) => Err(FetchError::Status(*code)),
            Some(FixtureResponse::Json(v)) => Ok(FetchOutcome::Json(v.clone())),
            Some(FixtureResponse::Body(s)) => Ok(FetchOutcome::Json(serde_json::from_str(s)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn req(url: &str) -> FetchRequest {
        FetchRequest::new(url, Duration::from_secs(1))
    }

    #[test]
    fn http_client_builds() {
        assert!(HttpFetcher::new().is_ok());
    }

    #[tokio::test]
    async fn fixture_routes_by_url_and_query() {
        let f = FixtureFetcher::new()
            .route_query("http://x/s", "q", "a", FixtureResponse::Json(json!({"n": 1})))
            .route("http://x/s", FixtureResponse::Json(json!({"n": 2})));

        let a = f.get_json(&req("http://x/s").param("q", "a")).await.unwrap();
        let b = f.get_json(&req("http://x/s").param("q", "b")).await.unwrap();
        assert_eq!(a, FetchOutcome::Json(json!({"n": 1})));
        assert_eq!(b, FetchOutcome::Json(json!({"n": 2})));
        assert_eq!(f.calls(), vec!["http://x/s?q=a", "http://x/s?q=b"]);
    }

    #[tokio::test]
    async fn fixture_statuses_and_bad_bodies() {
        let f = FixtureFetcher::new()
            .route("http://x/500", FixtureResponse::Status(500))
            .route("http://x/bad", FixtureResponse::Body("{not json".into()));

        assert_eq!(f.get_json(&req("http://x/none")).await.unwrap(), FetchOutcome::NotFound);
        assert!(matches!(
            f.get_json(&req("http://x/500")).await,
            Err(FetchError::Status(500))
        ));
        assert!(matches!(
            f.get_json(&req("http://x/bad")).await,
            Err(FetchError::Decode(_))
        ));
    }
}
