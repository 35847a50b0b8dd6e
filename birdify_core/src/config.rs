use anyhow::{Context, Result};
use reqwest::Url;
use std::env;
use std::time::Duration;

const DEFAULT_SPECIES_URL: &str = "https://nuthatch.lastelm.software";
const DEFAULT_SPECIES_PAGE_SIZE: u32 = 20;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct BirdifyConfig {
    pub supabase: SupabaseConfig,
    pub species: SpeciesConfig,
    pub http: HttpConfig,
}

impl BirdifyConfig {
    /// Reads the full configuration from the environment. The remote store
    /// base address is mandatory and must be valid before the first fetch.
    pub fn from_env() -> Result<Self> {
        let supabase = SupabaseConfig::from_env()?;
        let species = SpeciesConfig::from_env()?;
        let http = HttpConfig::from_env();
        Ok(Self {
            supabase,
            species,
            http,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub base_url: String,
    pub anon_key: String,
}

impl SupabaseConfig {
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("BIRDIFY_SUPABASE_URL")
            .context("BIRDIFY_SUPABASE_URL is not set")
            .and_then(sanitize_base_url)?;
        let anon_key =
            env::var("BIRDIFY_SUPABASE_ANON_KEY").context("BIRDIFY_SUPABASE_ANON_KEY is not set")?;
        Ok(Self { base_url, anon_key })
    }

    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: sanitize_base_url(base_url.into())?,
            anon_key: anon_key.into(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SpeciesConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub page_size: u32,
}

impl SpeciesConfig {
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("BIRDIFY_SPECIES_URL")
            .ok()
            .filter(|raw| !raw.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SPECIES_URL.to_string());
        let api_key = env::var("BIRDIFY_SPECIES_API_KEY")
            .ok()
            .filter(|raw| !raw.trim().is_empty());
        let page_size = env::var("BIRDIFY_SPECIES_PAGE_SIZE")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_SPECIES_PAGE_SIZE);
        Ok(Self {
            base_url: sanitize_base_url(base_url)?,
            api_key,
            page_size,
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
}

impl HttpConfig {
    pub fn from_env() -> Self {
        let secs = env::var("BIRDIFY_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
        Self {
            timeout: Duration::from_secs(secs),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

fn sanitize_base_url(mut base: String) -> Result<String> {
    if !base.starts_with("http://") && !base.starts_with("https://") {
        base = format!("https://{base}");
    }
    while base.ends_with('/') {
        base.pop();
    }
    let _ = Url::parse(&base).context("invalid base URL")?;
    Ok(base)
}
