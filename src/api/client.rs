use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::models::NewsResponse;

pub const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2";

/// Value shipped in sample configs; treated the same as no key at all.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";

const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const ERROR_EXCERPT_LEN: usize = 200;

// The upstream protection layer serves a challenge page to clients that do
// not look like a browser.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API key not set")]
    MissingApiKey,
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out after {}s", REQUEST_TIMEOUT.as_secs())]
    Timeout,
    #[error("HTTP error {status}: {message}")]
    HttpStatus { status: u16, message: String },
    #[error("API returned HTML instead of JSON")]
    AntiBotInterception,
    #[error("Malformed response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("API error: {message}")]
    Api {
        code: Option<String>,
        message: String,
    },
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Invalid UTF-8 in response")]
    InvalidUtf8,
}

impl ApiError {
    /// Short text suitable for a status line or dialog.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::MissingApiKey => {
                "API key not set. Get a free key at https://newsapi.org/ and run \
                 `newsdesk settings set api_key <KEY>` or export NEWSAPI_KEY."
                    .to_string()
            }
            ApiError::Network(e) => {
                let text = error_chain_text(e);
                if text.contains("dns") || text.contains("resolve") {
                    "No internet connection".to_string()
                } else if e.is_timeout() {
                    "Connection timeout".to_string()
                } else {
                    format!("Connection error: {e}")
                }
            }
            ApiError::Timeout => "Connection timeout".to_string(),
            ApiError::AntiBotInterception => "Error: API returned HTML instead of JSON.\n\
                 Either the API key is invalid or expired, or the request was blocked \
                 by the provider's protection layer."
                .to_string(),
            other => other.to_string(),
        }
    }
}

/// Lowercased display of an error and all of its sources.
fn error_chain_text(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = err.to_string().to_lowercase();
    let mut source = err.source();
    while let Some(inner) = source {
        text.push_str(": ");
        text.push_str(&inner.to_string().to_lowercase());
        source = inner.source();
    }
    text
}

/// True for empty, whitespace-only, or the sample placeholder key.
pub fn is_placeholder_key(key: &str) -> bool {
    let key = key.trim();
    key.is_empty() || key == PLACEHOLDER_API_KEY
}

/// Parameters for `GET /top-headlines`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlinesQuery {
    pub category: String,
    pub page_size: u32,
    pub country: String,
}

impl Default for HeadlinesQuery {
    fn default() -> Self {
        Self {
            category: "general".to_string(),
            page_size: 50,
            country: "us".to_string(),
        }
    }
}

/// Parameters for `GET /everything`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub page_size: u32,
    pub sort_by: String,
    pub language: String,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page_size: 20,
            sort_by: "publishedAt".to_string(),
            language: "en".to_string(),
        }
    }
}

/// Read-only client for the NewsAPI REST endpoints.
///
/// Cheap to clone; the inner `reqwest::Client` shares its connection pool.
#[derive(Clone)]
pub struct NewsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl std::fmt::Debug for NewsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewsClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl NewsClient {
    /// Build a client against `base_url` (defaults to [`DEFAULT_BASE_URL`]).
    ///
    /// The key travels in the query string, so plain HTTP is refused except
    /// for localhost.
    pub fn new(base_url: Option<&str>, api_key: Option<SecretString>) -> Result<Self, ApiError> {
        let base = base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/');

        if !base.starts_with("https://") {
            let is_localhost =
                base.starts_with("http://127.0.0.1") || base.starts_with("http://localhost");
            if !is_localhost {
                tracing::error!(base_url = %base, "Rejecting non-HTTPS base URL");
                return Err(ApiError::InsecureBaseUrl);
            }
            tracing::warn!(base_url = %base, "Using non-HTTPS NewsAPI base URL (localhost only)");
        }
        Url::parse(base).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base.to_string(),
            api_key,
        })
    }

    /// Whether a usable (non-placeholder) key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|k| !is_placeholder_key(k.expose_secret()))
    }

    /// `GET /top-headlines?category=&apiKey=&pageSize=&country=`
    pub async fn top_headlines(&self, query: &HeadlinesQuery) -> Result<NewsResponse, ApiError> {
        tracing::debug!(
            category = %query.category,
            page_size = query.page_size,
            country = %query.country,
            "Requesting top headlines"
        );
        let page_size = query.page_size.to_string();
        self.get(
            "top-headlines",
            &[
                ("category", query.category.as_str()),
                ("pageSize", page_size.as_str()),
                ("country", query.country.as_str()),
            ],
        )
        .await
    }

    /// `GET /everything?q=&apiKey=&pageSize=&sortBy=&language=`
    pub async fn search(&self, query: &SearchQuery) -> Result<NewsResponse, ApiError> {
        tracing::debug!(
            query = %query.query,
            page_size = query.page_size,
            sort_by = %query.sort_by,
            language = %query.language,
            "Searching articles"
        );
        let page_size = query.page_size.to_string();
        self.get(
            "everything",
            &[
                ("q", query.query.as_str()),
                ("pageSize", page_size.as_str()),
                ("sortBy", query.sort_by.as_str()),
                ("language", query.language.as_str()),
            ],
        )
        .await
    }

    async fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<NewsResponse, ApiError> {
        // Checked before anything goes on the wire
        let key = match &self.api_key {
            Some(k) if !is_placeholder_key(k.expose_secret()) => k,
            _ => return Err(ApiError::MissingApiKey),
        };

        let mut url = Url::parse(&format!("{}/{}", self.base_url, endpoint))
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in params {
                pairs.append_pair(name, value);
            }
            pairs.append_pair("apiKey", key.expose_secret());
        }

        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::Network(e)
            }
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let body = read_limited_text(response, MAX_RESPONSE_SIZE).await?;
        let result = classify_response(status, content_type.as_deref(), &body);

        match &result {
            Ok(parsed) => tracing::debug!(
                endpoint = %endpoint,
                total_results = parsed.total_results.unwrap_or(0),
                returned = parsed.articles.len(),
                "NewsAPI request succeeded"
            ),
            Err(e) => tracing::warn!(endpoint = %endpoint, status = status, error = %e, "NewsAPI request failed"),
        }
        result
    }
}

/// Turn a raw HTTP response into a parsed body or a classified error.
///
/// HTML is detected by content type first and then by sniffing the body, so
/// a challenge page is never reported as a JSON parse failure. A body that
/// opens as a JSON object is never sniffed.
pub fn classify_response(
    status: u16,
    content_type: Option<&str>,
    body: &str,
) -> Result<NewsResponse, ApiError> {
    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html")) {
        return Err(ApiError::AntiBotInterception);
    }

    if !(200..300).contains(&status) {
        let message = match status {
            401 => "Invalid API key".to_string(),
            429 => "Request limit exceeded. Try again later.".to_string(),
            _ if looks_like_html(body) => return Err(ApiError::AntiBotInterception),
            _ => describe_error_body(body),
        };
        return Err(ApiError::HttpStatus { status, message });
    }

    if looks_like_html(body) {
        return Err(ApiError::AntiBotInterception);
    }

    let parsed: NewsResponse = serde_json::from_str(body)?;
    if !parsed.is_ok() {
        return Err(ApiError::Api {
            code: parsed.code.clone(),
            message: parsed
                .message
                .clone()
                .or_else(|| parsed.status.clone())
                .unwrap_or_else(|| "unknown status".to_string()),
        });
    }
    Ok(parsed)
}

fn looks_like_html(body: &str) -> bool {
    if body.trim_start().starts_with('{') {
        return false;
    }
    let head: String = body.chars().take(2048).collect::<String>().to_ascii_lowercase();
    head.contains("<!doctype html") || head.contains("<html") || head.contains("just a moment")
}

/// Best-effort message for a non-2xx body.
fn describe_error_body(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<NewsResponse>(body) {
        if let Some(message) = parsed.message {
            return message;
        }
    }
    if body.contains("apiKey") || body.contains("Invalid API key") {
        return format!("API key problem: {}", excerpt(body));
    }
    if body.contains("rateLimit") {
        return "Request limit exceeded".to_string();
    }
    if body.trim().is_empty() {
        return "empty response body".to_string();
    }
    excerpt(body)
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() > ERROR_EXCERPT_LEN {
        let cut: String = trimmed.chars().take(ERROR_EXCERPT_LEN).collect();
        format!("{cut}...")
    } else {
        trimmed.to_string()
    }
}

/// Read a response body, refusing anything larger than `limit` bytes.
async fn read_limited_text(response: reqwest::Response, limit: usize) -> Result<String, ApiError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    String::from_utf8(bytes).map_err(|_| ApiError::InvalidUtf8)
}
