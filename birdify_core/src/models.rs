use serde::{Deserialize, Serialize};

/// A bird observation as the rest of the app sees it, after the mapper has
/// normalized the raw backend row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sighting {
    pub id: String,
    pub species: String,
    pub location: String,
    /// Observation date, `YYYY-MM-DD`.
    pub date: String,
    /// Observation time-of-day, `HH:MM`.
    pub time: String,
    pub count: u32,
    #[serde(default)]
    pub notes: Option<String>,
    /// Display URL, already resolved against the storage base.
    #[serde(default)]
    pub photo_url: Option<String>,
    /// Storage key for the photo object, when the backend holds one. Absent
    /// for rows that stored a direct URL instead.
    #[serde(default)]
    pub photo_path: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub owner: Option<UserProfile>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    /// Resolved display name: live profile username, then the stored author
    /// text, then "Anonymous".
    pub author: String,
    #[serde(default)]
    pub author_id: Option<String>,
    pub text: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// An established identity. Persisted verbatim by the CLI so a restart can
/// restore the session without re-entering credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user_id: String,
    pub email: String,
}

/// Input for creating a sighting. Location and photo are mandatory; the rest
/// fall back to defaults at submit time.
#[derive(Debug, Clone, Default)]
pub struct SightingDraft {
    pub species: String,
    pub location: String,
    pub count: Option<u32>,
    pub notes: String,
    pub photo: Option<CapturedPhoto>,
}

/// A just-captured image, read back from the capture device as raw bytes.
#[derive(Debug, Clone)]
pub struct CapturedPhoto {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl CapturedPhoto {
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: "image/jpeg".to_string(),
        }
    }
}

/// Registration input. Username and full name are forwarded as profile
/// metadata so the backend can create the profile row.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub username: String,
    pub full_name: String,
}

/// One entry from the species reference lookup, used by the dictionary only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesEntry {
    pub id: String,
    pub name: String,
    pub sci_name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub identification: Option<String>,
    #[serde(default)]
    pub habitat: Option<String>,
    #[serde(default)]
    pub diet: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub behavior: Option<String>,
}
