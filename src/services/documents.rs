// src/services/documents.rs

//! Document service client.
//!
//! [`DocumentSource`] is the seam between the fetch loop and the network.
//! [`WikipediaClient`] talks to a MediaWiki site:
//!
//! - `html`: `GET {base}/api/rest_v1/page/html/{title}` returns the article HTML.
//! - `text`: `GET {base}/w/api.php?action=query&prop=extracts&explaintext=1...`
//!   returns JSON carrying the plain-text extract.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::error::Result;
use crate::models::{
    ClientIdentity, Config, DocumentsConfig, FetchError, FetchRequest, OutputFormat,
};
use crate::utils::http::create_async_client;

/// Anything that can produce a document body for a request.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, request: FetchRequest<'_>) -> std::result::Result<String, FetchError>;
}

/// MediaWiki-backed document source.
#[derive(Debug, Clone)]
pub struct WikipediaClient {
    client: Client,
    documents: DocumentsConfig,
}

impl WikipediaClient {
    /// Build a client that identifies itself as `identity` on every request.
    pub fn new(config: &Config, identity: &ClientIdentity) -> Result<Self> {
        let client = create_async_client(&config.http, &identity.user_agent())?;
        Ok(Self::with_client(client, config.documents.clone()))
    }

    pub fn with_client(client: Client, documents: DocumentsConfig) -> Self {
        Self { client, documents }
    }
}

#[async_trait]
impl DocumentSource for WikipediaClient {
    async fn fetch(&self, request: FetchRequest<'_>) -> std::result::Result<String, FetchError> {
        let base = self
            .documents
            .base_url_for(request.language)
            .map_err(FetchError::transport)?;
        let url = document_url(&base, &request);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::transport)?;
        let retry_after = response.headers().get(RETRY_AFTER);
        if let Some(error) = classify_status(response.status(), retry_after) {
            return Err(error);
        }

        let body = response.text().await.map_err(FetchError::transport)?;
        match request.format {
            OutputFormat::Html => {
                if body.trim().is_empty() {
                    Err(FetchError::malformed("empty document"))
                } else {
                    Ok(body)
                }
            }
            OutputFormat::Text => parse_extract(&body),
        }
    }
}

/// Compose the request URL for one identifier.
///
/// The identifier is percent-encoded as a single path segment (`/` included)
/// for `html`, and form-encoded into the `titles` parameter for `text`.
pub fn document_url(base: &Url, request: &FetchRequest<'_>) -> Url {
    let mut url = base.clone();
    match request.format {
        OutputFormat::Html => {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments
                    .pop_if_empty()
                    .extend(["api", "rest_v1", "page", "html"])
                    .push(request.identifier.as_str());
            }
        }
        OutputFormat::Text => {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.pop_if_empty().extend(["w", "api.php"]);
            }
            url.query_pairs_mut()
                .append_pair("action", "query")
                .append_pair("format", "json")
                .append_pair("formatversion", "2")
                .append_pair("prop", "extracts")
                .append_pair("explaintext", "1")
                .append_pair("exsectionformat", "plain")
                .append_pair("redirects", "1")
                .append_pair("titles", request.identifier.as_str());
        }
    }
    url
}

/// Map a non-success status to its failure kind. `None` means success.
pub fn classify_status(
    status: StatusCode,
    retry_after: Option<&HeaderValue>,
) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }
    let error = match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => FetchError::NotFound,
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited {
            retry_after_secs: retry_after
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse().ok()),
        },
        other => FetchError::Rejected {
            status: other.as_u16(),
        },
    };
    Some(error)
}

#[derive(Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    query: Option<ExtractQuery>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: Vec<ExtractPage>,
}

#[derive(Deserialize)]
struct ExtractPage {
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    #[serde(default)]
    extract: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}

/// Pull the plain-text extract out of an `action=query` response
/// (`formatversion=2`).
pub fn parse_extract(body: &str) -> std::result::Result<String, FetchError> {
    let response: ExtractResponse = serde_json::from_str(body).map_err(FetchError::malformed)?;

    if let Some(error) = response.error {
        return Err(match error.code.as_str() {
            "ratelimited" | "maxlag" => FetchError::RateLimited {
                retry_after_secs: None,
            },
            _ => FetchError::malformed(format!("API error {}: {}", error.code, error.info)),
        });
    }

    let page = response
        .query
        .and_then(|query| query.pages.into_iter().next())
        .ok_or_else(|| FetchError::malformed("response has no pages"))?;

    if page.missing || page.invalid {
        return Err(FetchError::NotFound);
    }

    match page.extract {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(FetchError::malformed("page has no extract")),
    }
}
