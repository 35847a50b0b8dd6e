//! Sighting repository. Every mutation is a write followed by a full
//! re-fetch: the in-memory list is only ever replaced wholesale by the most
//! recent successful fetch, never patched, so the rendered list is always a
//! literal snapshot of backend state.

use crate::error::{BirdifyError, Result};
use crate::mapper::{self, PhotoResolver, UNKNOWN_SPECIES};
use crate::models::{Comment, Session, Sighting, SightingDraft};
use crate::policy::OwnershipPolicy;
use crate::store::{NewCommentRecord, NewSightingRecord, RemoteStore};
use crate::utils;
use anyhow::anyhow;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct SightingRepository {
    store: Arc<dyn RemoteStore>,
    photos: PhotoResolver,
    policy: OwnershipPolicy,
    snapshot: RwLock<Vec<Sighting>>,
}

impl SightingRepository {
    pub fn new(store: Arc<dyn RemoteStore>, photos: PhotoResolver) -> Self {
        Self::with_policy(store, photos, OwnershipPolicy::default())
    }

    pub fn with_policy(
        store: Arc<dyn RemoteStore>,
        photos: PhotoResolver,
        policy: OwnershipPolicy,
    ) -> Self {
        Self {
            store,
            photos,
            policy,
            snapshot: RwLock::new(Vec::new()),
        }
    }

    pub fn policy(&self) -> &OwnershipPolicy {
        &self.policy
    }

    /// Current list, newest sighting first. A clone of the last successful
    /// fetch; never partially updated.
    pub async fn snapshot(&self) -> Vec<Sighting> {
        self.snapshot.read().await.clone()
    }

    /// Re-reads the full joined list. On failure the previous snapshot stays
    /// untouched and the error is logged; read failures are non-fatal and the
    /// next explicit refresh simply tries again.
    pub async fn refresh(&self) -> Result<()> {
        match self.store.list_sightings().await {
            Ok(rows) => {
                let sightings: Vec<Sighting> = rows
                    .iter()
                    .filter_map(|row| mapper::map_sighting(row, &self.photos))
                    .collect();
                *self.snapshot.write().await = sightings;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "sighting fetch failed; keeping previous snapshot");
                Err(BirdifyError::Fetch(err))
            }
        }
    }

    /// Wipes the list on loss of session so no data leaks across identities.
    pub async fn clear(&self) {
        self.snapshot.write().await.clear();
    }

    /// Creates a sighting: photo first, metadata second, then re-fetch.
    /// If the metadata insert fails after the upload succeeded, the photo is
    /// left behind as an orphan; there is no compensating rollback.
    pub async fn create(&self, actor: &Session, draft: SightingDraft) -> Result<()> {
        let location = draft.location.trim();
        if location.is_empty() {
            return Err(BirdifyError::Validation("location is required".into()));
        }
        let Some(photo) = draft.photo else {
            return Err(BirdifyError::Validation("a photo is required".into()));
        };

        let object_name = utils::photo_object_name();
        self.store
            .upload_photo(&object_name, photo.bytes, &photo.content_type)
            .await
            .map_err(BirdifyError::Mutation)?;

        let species = draft.species.trim();
        let record = NewSightingRecord {
            species: if species.is_empty() {
                UNKNOWN_SPECIES.to_string()
            } else {
                species.to_string()
            },
            location: location.to_string(),
            count: draft.count.filter(|count| *count > 0).unwrap_or(1) as i64,
            notes: draft.notes.trim().to_string(),
            sighting_date: utils::today_local_date(),
            sighting_time: utils::now_local_time(),
            image_path: Some(object_name.clone()),
            user_id: Some(actor.user_id.clone()),
        };
        if let Err(err) = self.store.insert_sighting(&record).await {
            tracing::warn!(object = %object_name, "sighting insert failed; uploaded photo is now orphaned");
            return Err(BirdifyError::Mutation(err));
        }

        self.refresh_after_mutation().await;
        Ok(())
    }

    /// Deletes an owned sighting. Photo object removal is best-effort: a
    /// failed removal is logged and the record delete proceeds anyway.
    pub async fn delete(&self, actor: &Session, sighting_id: &str) -> Result<()> {
        let sighting = self.find_sighting(sighting_id).await?;
        if !self
            .policy
            .can_delete(&actor.user_id, sighting.owner_id.as_deref())
        {
            return Err(BirdifyError::Forbidden(
                "only the owner can delete a sighting".into(),
            ));
        }

        if let Some(path) = &sighting.photo_path {
            if let Err(err) = self.store.remove_photo(path).await {
                tracing::warn!(error = %err, object = %path, "photo removal failed; deleting record anyway");
            }
        }
        self.store
            .delete_sighting(sighting_id)
            .await
            .map_err(BirdifyError::Mutation)?;

        self.refresh_after_mutation().await;
        Ok(())
    }

    pub async fn add_comment(
        &self,
        actor: &Session,
        sighting_id: &str,
        author: Option<String>,
        text: &str,
    ) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(BirdifyError::Validation("comment text is required".into()));
        }
        let sighting = self.find_sighting(sighting_id).await?;
        if !self
            .policy
            .can_comment(&actor.user_id, sighting.owner_id.as_deref())
        {
            return Err(BirdifyError::Forbidden(
                "you cannot comment on your own sighting".into(),
            ));
        }

        let record = NewCommentRecord {
            sighting_id: sighting_id.to_string(),
            author: author
                .map(|author| author.trim().to_string())
                .filter(|author| !author.is_empty()),
            text: text.to_string(),
            user_id: Some(actor.user_id.clone()),
        };
        self.store
            .insert_comment(&record)
            .await
            .map_err(BirdifyError::Mutation)?;

        self.refresh_after_mutation().await;
        Ok(())
    }

    /// Deletes a comment; only its own author may do so.
    pub async fn delete_comment(&self, actor: &Session, comment_id: &str) -> Result<()> {
        let comment = self.find_comment(comment_id).await?;
        if !self
            .policy
            .can_delete(&actor.user_id, comment.author_id.as_deref())
        {
            return Err(BirdifyError::Forbidden(
                "only the author can delete a comment".into(),
            ));
        }

        self.store
            .delete_comment(comment_id)
            .await
            .map_err(BirdifyError::Mutation)?;

        self.refresh_after_mutation().await;
        Ok(())
    }

    async fn find_sighting(&self, sighting_id: &str) -> Result<Sighting> {
        self.snapshot
            .read()
            .await
            .iter()
            .find(|sighting| sighting.id == sighting_id)
            .cloned()
            .ok_or_else(|| BirdifyError::Mutation(anyhow!("sighting {sighting_id} not found")))
    }

    async fn find_comment(&self, comment_id: &str) -> Result<Comment> {
        self.snapshot
            .read()
            .await
            .iter()
            .flat_map(|sighting| sighting.comments.iter())
            .find(|comment| comment.id == comment_id)
            .cloned()
            .ok_or_else(|| BirdifyError::Mutation(anyhow!("comment {comment_id} not found")))
    }

    /// A mutation that already succeeded stays a success even when the
    /// follow-up fetch fails; refresh() has logged the failure and the stale
    /// snapshot remains readable until the next refresh.
    async fn refresh_after_mutation(&self) {
        let _ = self.refresh().await;
    }
}
