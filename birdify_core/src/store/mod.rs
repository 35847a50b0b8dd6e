//! Remote data store boundary. Raw row shapes live here and never leak past
//! the mapper; everything above works with the normalized models instead.

mod memory;
mod supabase;

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A sighting row as the backend returns it, with nested author and comment
/// joins. Identifiers arrive as either numbers or strings depending on the
/// backend, so they stay `Value` until the mapper coerces them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SightingRow {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub sighting_date: Option<String>,
    #[serde(default)]
    pub sighting_time: Option<String>,
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub profiles: Option<ProfileRow>,
    #[serde(default)]
    pub comments: Vec<CommentRow>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentRow {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub sighting_id: Value,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub profiles: Option<ProfileRow>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileRow {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSightingRecord {
    pub species: String,
    pub location: String,
    pub count: i64,
    pub notes: String,
    pub sighting_date: String,
    pub sighting_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCommentRecord {
    pub sighting_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Everything the sighting core needs from a backend. Implementations are the
/// hosted Supabase-style store and an in-memory one for tests and demos.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Full list with nested author and comment joins, newest sighting first.
    async fn list_sightings(&self) -> Result<Vec<SightingRow>>;

    async fn insert_sighting(&self, record: &NewSightingRecord) -> Result<()>;

    async fn delete_sighting(&self, id: &str) -> Result<()>;

    async fn insert_comment(&self, record: &NewCommentRecord) -> Result<()>;

    async fn delete_comment(&self, id: &str) -> Result<()>;

    async fn upload_photo(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    async fn remove_photo(&self, name: &str) -> Result<()>;

    async fn profile_for_user(&self, user_id: &str) -> Result<Option<ProfileRow>>;

    /// Username-based login support: resolve a username to the email the
    /// identity provider actually authenticates against.
    async fn email_for_username(&self, username: &str) -> Result<Option<String>>;

    /// Tells the store which identity subsequent requests act as. The
    /// in-memory store has no use for this; the hosted store swaps its
    /// bearer token.
    fn set_access_token(&self, _token: Option<String>) {}
}
