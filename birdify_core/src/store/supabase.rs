use super::{NewCommentRecord, NewSightingRecord, ProfileRow, RemoteStore, SightingRow};
use crate::config::{HttpConfig, SupabaseConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::sync::RwLock;

const SIGHTING_SELECT: &str =
    "*,profiles(id,username,full_name,avatar_url),comments(*,profiles(id,username,full_name,avatar_url))";
const PHOTO_BUCKET: &str = "photos";

/// Hosted database-as-a-service backend: PostgREST for rows, the storage API
/// for photo objects. Requests act as the anon role until the session gate
/// hands over an access token.
pub struct SupabaseStore {
    base_url: String,
    anon_key: String,
    client: Client,
    access_token: RwLock<Option<String>>,
}

impl SupabaseStore {
    pub fn new(config: &SupabaseConfig, http: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(http.timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            base_url: config.base_url.clone(),
            anon_key: config.anon_key.clone(),
            client,
            access_token: RwLock::new(None),
        })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn storage_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/{PHOTO_BUCKET}/{}",
            self.base_url,
            name.trim_start_matches('/')
        )
    }

    fn headers(&self) -> Result<HeaderMap> {
        let token = self
            .access_token
            .read()
            .ok()
            .and_then(|guard| guard.clone())
            .unwrap_or_else(|| self.anon_key.clone());
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))?,
        );
        Ok(headers)
    }
}

#[async_trait]
impl RemoteStore for SupabaseStore {
    async fn list_sightings(&self) -> Result<Vec<SightingRow>> {
        let response = self
            .client
            .get(self.rest_url("sightings"))
            .headers(self.headers()?)
            .query(&[
                ("select", SIGHTING_SELECT),
                ("order", "created_at.desc"),
                // embedded rows are unordered unless asked for explicitly
                ("comments.order", "created_at.asc"),
            ])
            .send()
            .await
            .context("list sightings request failed")?
            .error_for_status()
            .context("list sightings rejected")?;
        response
            .json()
            .await
            .context("list sightings payload was not valid JSON")
    }

    async fn insert_sighting(&self, record: &NewSightingRecord) -> Result<()> {
        self.client
            .post(self.rest_url("sightings"))
            .headers(self.headers()?)
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await
            .context("insert sighting request failed")?
            .error_for_status()
            .context("insert sighting rejected")?;
        Ok(())
    }

    async fn delete_sighting(&self, id: &str) -> Result<()> {
        self.client
            .delete(self.rest_url("sightings"))
            .headers(self.headers()?)
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await
            .context("delete sighting request failed")?
            .error_for_status()
            .context("delete sighting rejected")?;
        Ok(())
    }

    async fn insert_comment(&self, record: &NewCommentRecord) -> Result<()> {
        self.client
            .post(self.rest_url("comments"))
            .headers(self.headers()?)
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await
            .context("insert comment request failed")?
            .error_for_status()
            .context("insert comment rejected")?;
        Ok(())
    }

    async fn delete_comment(&self, id: &str) -> Result<()> {
        self.client
            .delete(self.rest_url("comments"))
            .headers(self.headers()?)
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await
            .context("delete comment request failed")?
            .error_for_status()
            .context("delete comment rejected")?;
        Ok(())
    }

    async fn upload_photo(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .post(self.storage_url(name))
            .headers(self.headers()?)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .context("photo upload request failed")?
            .error_for_status()
            .context("photo upload rejected")?;
        Ok(())
    }

    async fn remove_photo(&self, name: &str) -> Result<()> {
        self.client
            .delete(self.storage_url(name))
            .headers(self.headers()?)
            .send()
            .await
            .context("photo removal request failed")?
            .error_for_status()
            .context("photo removal rejected")?;
        Ok(())
    }

    async fn profile_for_user(&self, user_id: &str) -> Result<Option<ProfileRow>> {
        let id_filter = format!("eq.{user_id}");
        let rows: Vec<ProfileRow> = self
            .client
            .get(self.rest_url("profiles"))
            .headers(self.headers()?)
            .query(&[
                ("select", "id,username,full_name,avatar_url,email"),
                ("id", id_filter.as_str()),
                ("limit", "1"),
            ])
            .send()
            .await
            .context("profile lookup request failed")?
            .error_for_status()
            .context("profile lookup rejected")?
            .json()
            .await
            .context("profile payload was not valid JSON")?;
        Ok(rows.into_iter().next())
    }

    async fn email_for_username(&self, username: &str) -> Result<Option<String>> {
        let username_filter = format!("eq.{username}");
        let rows: Vec<ProfileRow> = self
            .client
            .get(self.rest_url("profiles"))
            .headers(self.headers()?)
            .query(&[
                ("select", "email"),
                ("username", username_filter.as_str()),
                ("limit", "1"),
            ])
            .send()
            .await
            .context("username lookup request failed")?
            .error_for_status()
            .context("username lookup rejected")?
            .json()
            .await
            .context("username payload was not valid JSON")?;
        Ok(rows.into_iter().next().and_then(|row| row.email))
    }

    fn set_access_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.access_token.write() {
            *guard = token;
        }
    }
}
