use super::{
    CommentRow, NewCommentRecord, NewSightingRecord, ProfileRow, RemoteStore, SightingRow,
};
use crate::utils::now_utc_iso;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// In-memory backend. Tests and offline demos run against this; it keeps the
/// same nested join shape and newest-first ordering as the hosted store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    sightings: Vec<StoredSighting>,
    comments: Vec<StoredComment>,
    profiles: HashMap<String, ProfileRow>,
    photos: HashMap<String, Vec<u8>>,
    seq: u64,
}

struct StoredSighting {
    id: String,
    seq: u64,
    record: NewSightingRecord,
    created_at: String,
}

struct StoredComment {
    id: String,
    seq: u64,
    record: NewCommentRecord,
    created_at: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a profile row, keyed by user id. Tests use this to model
    /// already-registered users.
    pub fn insert_profile(&self, user_id: &str, profile: ProfileRow) {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner.profiles.insert(user_id.to_string(), profile);
    }

    pub fn photo_count(&self) -> usize {
        self.inner.lock().expect("memory store poisoned").photos.len()
    }

    pub fn has_photo(&self, name: &str) -> bool {
        self.inner
            .lock()
            .expect("memory store poisoned")
            .photos
            .contains_key(name)
    }

    pub fn sighting_count(&self) -> usize {
        self.inner
            .lock()
            .expect("memory store poisoned")
            .sightings
            .len()
    }

    fn profile_for(inner: &Inner, user_id: Option<&String>) -> Option<ProfileRow> {
        user_id.and_then(|id| inner.profiles.get(id).cloned())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list_sightings(&self) -> Result<Vec<SightingRow>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        let mut sightings: Vec<&StoredSighting> = inner.sightings.iter().collect();
        sightings.sort_by(|a, b| b.seq.cmp(&a.seq));

        let rows = sightings
            .into_iter()
            .map(|stored| {
                let mut comments: Vec<&StoredComment> = inner
                    .comments
                    .iter()
                    .filter(|comment| comment.record.sighting_id == stored.id)
                    .collect();
                comments.sort_by_key(|comment| comment.seq);

                SightingRow {
                    id: Value::String(stored.id.clone()),
                    species: Some(stored.record.species.clone()),
                    location: Some(stored.record.location.clone()),
                    sighting_date: Some(stored.record.sighting_date.clone()),
                    sighting_time: Some(stored.record.sighting_time.clone()),
                    count: Some(stored.record.count),
                    notes: Some(stored.record.notes.clone()),
                    image_path: stored.record.image_path.clone(),
                    user_id: stored.record.user_id.clone().map(Value::String),
                    created_at: Some(stored.created_at.clone()),
                    profiles: Self::profile_for(&inner, stored.record.user_id.as_ref()),
                    comments: comments
                        .into_iter()
                        .map(|comment| CommentRow {
                            id: Value::String(comment.id.clone()),
                            sighting_id: Value::String(comment.record.sighting_id.clone()),
                            author: comment.record.author.clone(),
                            text: Some(comment.record.text.clone()),
                            user_id: comment.record.user_id.clone().map(Value::String),
                            created_at: Some(comment.created_at.clone()),
                            profiles: Self::profile_for(&inner, comment.record.user_id.as_ref()),
                        })
                        .collect(),
                }
            })
            .collect();
        Ok(rows)
    }

    async fn insert_sighting(&self, record: &NewSightingRecord) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner.seq += 1;
        let seq = inner.seq;
        inner.sightings.push(StoredSighting {
            id: Uuid::new_v4().to_string(),
            seq,
            record: record.clone(),
            created_at: now_utc_iso(),
        });
        Ok(())
    }

    async fn delete_sighting(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        let before = inner.sightings.len();
        inner.sightings.retain(|stored| stored.id != id);
        if inner.sightings.len() == before {
            return Err(anyhow!("sighting {id} not found"));
        }
        inner
            .comments
            .retain(|comment| comment.record.sighting_id != id);
        Ok(())
    }

    async fn insert_comment(&self, record: &NewCommentRecord) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        if !inner
            .sightings
            .iter()
            .any(|stored| stored.id == record.sighting_id)
        {
            return Err(anyhow!("sighting {} not found", record.sighting_id));
        }
        inner.seq += 1;
        let seq = inner.seq;
        inner.comments.push(StoredComment {
            id: Uuid::new_v4().to_string(),
            seq,
            record: record.clone(),
            created_at: now_utc_iso(),
        });
        Ok(())
    }

    async fn delete_comment(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        let before = inner.comments.len();
        inner.comments.retain(|comment| comment.id != id);
        if inner.comments.len() == before {
            return Err(anyhow!("comment {id} not found"));
        }
        Ok(())
    }

    async fn upload_photo(&self, name: &str, bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner.photos.insert(name.to_string(), bytes);
        Ok(())
    }

    async fn remove_photo(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner.photos.remove(name);
        Ok(())
    }

    async fn profile_for_user(&self, user_id: &str) -> Result<Option<ProfileRow>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        Ok(inner.profiles.get(user_id).cloned())
    }

    async fn email_for_username(&self, username: &str) -> Result<Option<String>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        Ok(inner
            .profiles
            .values()
            .find(|profile| profile.username.as_deref() == Some(username))
            .and_then(|profile| profile.email.clone()))
    }
}
