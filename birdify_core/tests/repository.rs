use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use birdify_core::mapper::PhotoResolver;
use birdify_core::models::{CapturedPhoto, Session, SightingDraft};
use birdify_core::policy::{CommentPolicy, OwnershipPolicy};
use birdify_core::repository::SightingRepository;
use birdify_core::store::{
    MemoryStore, NewCommentRecord, NewSightingRecord, ProfileRow, RemoteStore, SightingRow,
};
use birdify_core::BirdifyError;

fn session(user_id: &str) -> Session {
    Session {
        access_token: format!("token-{user_id}"),
        user_id: user_id.to_string(),
        email: format!("{user_id}@example.com"),
    }
}

fn setup() -> (Arc<MemoryStore>, SightingRepository) {
    let store = Arc::new(MemoryStore::new());
    let repo = SightingRepository::new(store.clone(), PhotoResolver::new("https://x"));
    (store, repo)
}

fn draft(location: &str, with_photo: bool) -> SightingDraft {
    SightingDraft {
        location: location.to_string(),
        photo: with_photo.then(|| CapturedPhoto::jpeg(vec![0xff, 0xd8, 0xff])),
        ..Default::default()
    }
}

#[tokio::test]
async fn create_without_location_uploads_nothing() {
    let (store, repo) = setup();
    let err = repo
        .create(&session("alice"), draft("   ", true))
        .await
        .unwrap_err();
    assert!(matches!(err, BirdifyError::Validation(_)));
    assert_eq!(store.photo_count(), 0);
    assert_eq!(store.sighting_count(), 0);
    assert!(repo.snapshot().await.is_empty());
}

#[tokio::test]
async fn create_without_photo_is_rejected() {
    let (store, repo) = setup();
    let mut input = draft("Central Park", false);
    input.count = Some(2);
    let err = repo.create(&session("alice"), input).await.unwrap_err();
    assert!(matches!(err, BirdifyError::Validation(_)));
    assert_eq!(store.sighting_count(), 0);
}

#[tokio::test]
async fn create_applies_defaults_and_lands_newest_first() {
    let (_store, repo) = setup();
    let alice = session("alice");

    repo.create(&alice, draft("Central Park", true))
        .await
        .expect("first create");
    let mut second = draft("Prospect Park", true);
    second.species = "Blue Jay".to_string();
    second.count = Some(3);
    repo.create(&alice, second).await.expect("second create");

    let sightings = repo.snapshot().await;
    assert_eq!(sightings.len(), 2);
    // newest first
    assert_eq!(sightings[0].location, "Prospect Park");
    assert_eq!(sightings[0].species, "Blue Jay");
    assert_eq!(sightings[0].count, 3);
    // defaults on the earlier one
    assert_eq!(sightings[1].species, "Unknown");
    assert_eq!(sightings[1].count, 1);
    assert_eq!(sightings[1].owner_id.as_deref(), Some("alice"));
    let url = sightings[1].photo_url.as_deref().expect("photo url");
    assert!(url.starts_with("https://x/storage/v1/object/public/photos/"));
}

#[tokio::test]
async fn delete_removes_record_and_photo_object() {
    let (store, repo) = setup();
    let alice = session("alice");
    repo.create(&alice, draft("Central Park", true))
        .await
        .expect("create");

    let sighting = repo.snapshot().await.remove(0);
    let photo_path = sighting.photo_path.clone().expect("storage key");
    assert!(store.has_photo(&photo_path));

    repo.delete(&alice, &sighting.id).await.expect("delete");
    assert!(!store.has_photo(&photo_path));
    assert!(repo.snapshot().await.is_empty());
}

#[tokio::test]
async fn delete_by_non_owner_is_denied_without_store_mutation() {
    let (store, repo) = setup();
    let alice = session("alice");
    repo.create(&alice, draft("Central Park", true))
        .await
        .expect("create");
    let sighting = repo.snapshot().await.remove(0);

    let err = repo.delete(&session("bob"), &sighting.id).await.unwrap_err();
    assert!(matches!(err, BirdifyError::Forbidden(_)));
    assert_eq!(store.sighting_count(), 1);
    assert_eq!(store.photo_count(), 1);
}

#[tokio::test]
async fn ownerless_sightings_are_not_deletable_by_default() {
    let (store, repo) = setup();
    store
        .insert_sighting(&NewSightingRecord {
            species: "Unknown".into(),
            location: "Legacy Meadow".into(),
            count: 1,
            notes: String::new(),
            sighting_date: "2020-01-01".into(),
            sighting_time: "08:00".into(),
            image_path: None,
            user_id: None,
        })
        .await
        .expect("seed legacy row");
    repo.refresh().await.expect("refresh");

    let sighting = repo.snapshot().await.remove(0);
    let err = repo.delete(&session("bob"), &sighting.id).await.unwrap_err();
    assert!(matches!(err, BirdifyError::Forbidden(_)));
    assert_eq!(store.sighting_count(), 1);
}

#[tokio::test]
async fn empty_comment_text_is_rejected() {
    let (_store, repo) = setup();
    let alice = session("alice");
    repo.create(&alice, draft("Central Park", true))
        .await
        .expect("create");
    let sighting = repo.snapshot().await.remove(0);

    let err = repo
        .add_comment(&session("bob"), &sighting.id, None, "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, BirdifyError::Validation(_)));
    assert!(repo.snapshot().await[0].comments.is_empty());
}

#[tokio::test]
async fn owner_cannot_comment_on_own_sighting() {
    let (_store, repo) = setup();
    let alice = session("alice");
    repo.create(&alice, draft("Central Park", true))
        .await
        .expect("create");
    let sighting = repo.snapshot().await.remove(0);

    let err = repo
        .add_comment(&alice, &sighting.id, None, "what a find")
        .await
        .unwrap_err();
    assert!(matches!(err, BirdifyError::Forbidden(_)));

    repo.add_comment(&session("bob"), &sighting.id, None, "what a find")
        .await
        .expect("non-owner comment");
    assert_eq!(repo.snapshot().await[0].comments.len(), 1);
}

#[tokio::test]
async fn allow_owner_policy_permits_self_commentary() {
    let store = Arc::new(MemoryStore::new());
    let repo = SightingRepository::with_policy(
        store.clone(),
        PhotoResolver::new("https://x"),
        OwnershipPolicy {
            comments: CommentPolicy::AllowOwner,
            ..Default::default()
        },
    );
    let alice = session("alice");
    repo.create(&alice, draft("Central Park", true))
        .await
        .expect("create");
    let sighting = repo.snapshot().await.remove(0);
    repo.add_comment(&alice, &sighting.id, None, "my own note")
        .await
        .expect("self comment allowed");
}

#[tokio::test]
async fn comment_author_resolution_prefers_profile_join() {
    let (store, repo) = setup();
    store.insert_profile(
        "bob",
        ProfileRow {
            username: Some("bob_birder".into()),
            ..Default::default()
        },
    );
    let alice = session("alice");
    repo.create(&alice, draft("Central Park", true))
        .await
        .expect("create");
    let sighting = repo.snapshot().await.remove(0);

    repo.add_comment(
        &session("bob"),
        &sighting.id,
        Some("Bobby".into()),
        "profile wins",
    )
    .await
    .expect("comment with profile");
    repo.add_comment(
        &session("carol"),
        &sighting.id,
        Some("Carol T".into()),
        "stored author wins",
    )
    .await
    .expect("comment with stored author");
    repo.add_comment(&session("dave"), &sighting.id, None, "nothing at all")
        .await
        .expect("anonymous comment");

    let comments = repo.snapshot().await.remove(0).comments;
    assert_eq!(comments.len(), 3);
    assert_eq!(comments[0].author, "bob_birder");
    assert_eq!(comments[1].author, "Carol T");
    assert_eq!(comments[2].author, "Anonymous");
}

#[tokio::test]
async fn only_the_author_may_delete_a_comment() {
    let (_store, repo) = setup();
    let alice = session("alice");
    repo.create(&alice, draft("Central Park", true))
        .await
        .expect("create");
    let sighting = repo.snapshot().await.remove(0);
    repo.add_comment(&session("bob"), &sighting.id, None, "hello")
        .await
        .expect("comment");
    let comment = repo.snapshot().await.remove(0).comments.remove(0);

    let err = repo
        .delete_comment(&session("carol"), &comment.id)
        .await
        .unwrap_err();
    assert!(matches!(err, BirdifyError::Forbidden(_)));

    repo.delete_comment(&session("bob"), &comment.id)
        .await
        .expect("author delete");
    assert!(repo.snapshot().await[0].comments.is_empty());
}

/// Delegating store whose list call can be made to fail, for exercising the
/// keep-the-previous-snapshot guarantee.
struct FlakyStore {
    inner: MemoryStore,
    fail_listing: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_listing: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl RemoteStore for FlakyStore {
    async fn list_sightings(&self) -> Result<Vec<SightingRow>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(anyhow!("backend unreachable"));
        }
        self.inner.list_sightings().await
    }

    async fn insert_sighting(&self, record: &NewSightingRecord) -> Result<()> {
        self.inner.insert_sighting(record).await
    }

    async fn delete_sighting(&self, id: &str) -> Result<()> {
        self.inner.delete_sighting(id).await
    }

    async fn insert_comment(&self, record: &NewCommentRecord) -> Result<()> {
        self.inner.insert_comment(record).await
    }

    async fn delete_comment(&self, id: &str) -> Result<()> {
        self.inner.delete_comment(id).await
    }

    async fn upload_photo(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.inner.upload_photo(name, bytes, content_type).await
    }

    async fn remove_photo(&self, name: &str) -> Result<()> {
        self.inner.remove_photo(name).await
    }

    async fn profile_for_user(&self, user_id: &str) -> Result<Option<ProfileRow>> {
        self.inner.profile_for_user(user_id).await
    }

    async fn email_for_username(&self, username: &str) -> Result<Option<String>> {
        self.inner.email_for_username(username).await
    }
}

#[tokio::test]
async fn failed_refresh_keeps_previous_snapshot() {
    let store = Arc::new(FlakyStore::new());
    let repo = SightingRepository::new(store.clone(), PhotoResolver::new("https://x"));
    let alice = session("alice");
    repo.create(&alice, draft("Central Park", true))
        .await
        .expect("create");
    assert_eq!(repo.snapshot().await.len(), 1);

    store.fail_listing.store(true, Ordering::SeqCst);
    let err = repo.refresh().await.unwrap_err();
    assert!(matches!(err, BirdifyError::Fetch(_)));
    assert_eq!(repo.snapshot().await.len(), 1);
}

#[tokio::test]
async fn mutation_stays_successful_when_followup_fetch_fails() {
    let store = Arc::new(FlakyStore::new());
    let repo = SightingRepository::new(store.clone(), PhotoResolver::new("https://x"));
    let alice = session("alice");
    repo.create(&alice, draft("Central Park", true))
        .await
        .expect("create");

    store.fail_listing.store(true, Ordering::SeqCst);
    let mut second = draft("Prospect Park", true);
    second.species = "Wren".to_string();
    repo.create(&alice, second).await.expect("create succeeds despite fetch failure");

    // stale but intact snapshot
    assert_eq!(repo.snapshot().await.len(), 1);

    store.fail_listing.store(false, Ordering::SeqCst);
    repo.refresh().await.expect("refresh");
    let sightings = repo.snapshot().await;
    assert_eq!(sightings.len(), 2);
    assert_eq!(sightings[0].species, "Wren");
}
