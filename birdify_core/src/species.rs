//! Read-only client for the bird species reference lookup, independent of
//! the sighting core. Feeds the dictionary screen only.

use crate::config::{HttpConfig, SpeciesConfig};
use crate::error::{BirdifyError, Result};
use crate::mapper::coerce_id;
use crate::models::SpeciesEntry;
use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

pub struct SpeciesDirectory {
    config: SpeciesConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct SpeciesRow {
    #[serde(default)]
    id: Value,
    name: String,
    #[serde(rename = "sciName", default)]
    sci_name: String,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    identification: Option<String>,
    #[serde(default)]
    habitat: Option<String>,
    #[serde(default)]
    diet: Option<String>,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    behavior: Option<String>,
}

/// The lookup service has returned both a wrapped object and a bare array
/// across versions; accept either.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SpeciesPayload {
    Wrapped { entities: Vec<SpeciesRow> },
    Bare(Vec<SpeciesRow>),
}

impl SpeciesDirectory {
    pub fn new(config: SpeciesConfig, http: &HttpConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(http.timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { config, client })
    }

    /// Fetches one page of species records with images.
    pub async fn list(&self) -> Result<Vec<SpeciesEntry>> {
        let url = format!("{}/v2/birds", self.config.base_url);
        let page_size = self.config.page_size.to_string();
        let mut request = self.client.get(url).query(&[
            ("hasImg", "true"),
            ("page", "1"),
            ("pageSize", page_size.as_str()),
        ]);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("api-key", api_key);
        }

        let payload: SpeciesPayload = request
            .send()
            .await
            .context("species lookup request failed")
            .map_err(BirdifyError::Fetch)?
            .error_for_status()
            .context("species lookup rejected")
            .map_err(BirdifyError::Fetch)?
            .json()
            .await
            .context("species payload was not valid JSON")
            .map_err(BirdifyError::Fetch)?;

        Ok(flatten(payload))
    }
}

fn flatten(payload: SpeciesPayload) -> Vec<SpeciesEntry> {
    let rows = match payload {
        SpeciesPayload::Wrapped { entities } => entities,
        SpeciesPayload::Bare(rows) => rows,
    };
    rows.into_iter().map(to_entry).collect()
}

fn to_entry(row: SpeciesRow) -> SpeciesEntry {
    SpeciesEntry {
        id: coerce_id(&row.id).unwrap_or_default(),
        name: row.name,
        sci_name: row.sci_name,
        image: row.images.into_iter().next(),
        description: row.description,
        identification: row.identification,
        habitat: row.habitat,
        diet: row.diet,
        size: row.size,
        behavior: row.behavior,
    }
}
