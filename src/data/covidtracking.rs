//! Remote per-day feeds in the covidtracking.com layout.
//!
//! `{base}/states/daily` returns every state's history (rows carry `state`);
//! `{base}/us/daily` returns the national history (no `state`, assigned to the
//! default region). Both are merged into one in-memory source.

use log::{info, warn};
use reqwest::blocking::Client;

use crate::data::source::InMemorySource;
use crate::domain::RegionCode;
use crate::error::AppError;
use crate::io::ingest::{IngestedRecords, parse_daily_json};

pub const DEFAULT_API_BASE: &str = "https://covidtracking.com/api";
const STATES_DAILY: &str = "states/daily";
const NATIONAL_DAILY: &str = "us/daily";

pub struct CovidTrackingClient {
    client: Client,
    base_url: String,
}

impl CovidTrackingClient {
    /// Build a client; `EPI_API_BASE` (env or `.env`) overrides the base URL.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let base_url = std::env::var("EPI_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Self::new(base_url)
    }

    pub fn new(base_url: impl Into<String>) -> Result<Self, AppError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(AppError::new(2, "API base URL must not be empty."));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch state and national feeds and merge them.
    pub fn fetch_all(&self, default_region: &RegionCode) -> Result<InMemorySource, AppError> {
        let mut ingested = self.fetch_feed(STATES_DAILY, default_region)?;
        let national = self.fetch_feed(NATIONAL_DAILY, default_region)?;
        ingested.merge(national);

        if !ingested.row_errors.is_empty() {
            warn!("{} feed rows were dropped during ingest", ingested.row_errors.len());
        }
        info!(
            "fetched {} records across {} regions from {}",
            ingested.record_count(),
            ingested.records.len(),
            self.base_url
        );
        Ok(InMemorySource::new(ingested))
    }

    fn fetch_feed(&self, path: &str, default_region: &RegionCode) -> Result<IngestedRecords, AppError> {
        let url = format!("{}/{path}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| AppError::new(4, format!("Request to {url} failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("Request to {url} failed with status {}.", resp.status()),
            ));
        }

        let body = resp
            .text()
            .map_err(|e| AppError::new(4, format!("Failed to read response from {url}: {e}")))?;
        parse_daily_json(&body, default_region).map_err(|e| AppError::new(4, format!("{url}: {e}")))
    }
}
