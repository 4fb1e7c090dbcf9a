//! HTTP client for the tracking backend.
//!
//! Every request carries the bearer token when one is configured. Responses
//! are classified by status before decoding: 401 becomes
//! [`ApiError::SessionExpired`], 404 [`ApiError::NotFound`]. Nothing is
//! retried.

use std::time::Duration;

use colitrack_types::{Agency, Parcel, StatusFilter, TrackingCode};
use reqwest::Url;
use tracing::{debug, warn};

use crate::dto::{Page, TrackHistory, parse_agencies, parse_parcels, parse_track};
use crate::error::{ApiError, classify_status};

/// Query for `GET /colis/{statusFilter}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParcelQuery {
    /// Status selector, sent as the path segment.
    pub status: StatusFilter,
    /// Free-text search, sent as `search`.
    pub search: String,
    /// 1-based page.
    pub page: u32,
    /// Page size.
    pub per_page: u32,
}

impl Default for ParcelQuery {
    fn default() -> Self {
        Self {
            status: StatusFilter::All,
            search: String::new(),
            page: 1,
            per_page: 50,
        }
    }
}

/// Client for the tracking backend REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `http://localhost:8000/api`).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] if the URL cannot be used as a base or
    /// the HTTP client cannot be built.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Config(format!("invalid API base URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Config(format!("API base URL {base_url} cannot be a base")));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Base URL requests are resolved against.
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append path segments to the base URL, percent-encoding each.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Config(format!("API base URL {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url, query: &[(&str, String)], resource: &str) -> Result<String, ApiError> {
        debug!(url = %url, "GET");
        let mut request = self.client.get(url).header("Accept", "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Request(format!("{resource}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            let err = classify_status(status.as_u16(), body, resource);
            warn!(resource, status = status.as_u16(), error = %err, "backend request failed");
            return Err(err);
        }

        response
            .text()
            .await
            .map_err(|e| ApiError::Request(format!("{resource}: failed to read body: {e}")))
    }

    /// Fetch the tracking history of `code` (`GET /track/{code}`).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown code,
    /// [`ApiError::SessionExpired`] on 401, and transport or decode errors
    /// otherwise.
    pub async fn fetch_history(&self, code: &TrackingCode) -> Result<TrackHistory, ApiError> {
        let url = self.endpoint(&["track", code.as_str()])?;
        let body = self.get(url, &[], code.as_str()).await?;
        let history = parse_track(code, &body)?;
        debug!(code = %code, steps = history.steps.len(), "history fetched");
        Ok(history)
    }

    /// List agencies (`GET /agences`).
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::fetch_history`].
    pub async fn list_agencies(&self) -> Result<Page<Agency>, ApiError> {
        let url = self.endpoint(&["agences"])?;
        let body = self.get(url, &[], "agences").await?;
        parse_agencies(&body)
    }

    /// List one page of parcels (`GET /colis/{statusFilter}`).
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::fetch_history`].
    pub async fn list_parcels(&self, query: &ParcelQuery) -> Result<Page<Parcel>, ApiError> {
        let url = self.endpoint(&["colis", query.status.as_path_segment()])?;
        let params = [
            ("search", query.search.clone()),
            ("page", query.page.to_string()),
            ("per_page", query.per_page.to_string()),
        ];
        let body = self.get(url, &params, "colis").await?;
        parse_parcels(&body)
    }

    /// List every parcel matching `query`, following pagination from
    /// `query.page` up to `max_pages` pages.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::fetch_history`]; the first failing page aborts
    /// the listing.
    pub async fn list_all_parcels(
        &self,
        query: &ParcelQuery,
        max_pages: u32,
    ) -> Result<Vec<Parcel>, ApiError> {
        let mut query = query.clone();
        let mut parcels = Vec::new();
        for _ in 0..max_pages {
            let page = self.list_parcels(&query).await?;
            let more = page.has_more() && !page.items.is_empty();
            parcels.extend(page.items);
            if !more {
                break;
            }
            query.page = page.current_page.saturating_add(1);
        }
        Ok(parcels)
    }
}
