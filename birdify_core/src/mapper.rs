//! Boundary transformation from raw backend rows to the application models.
//! Pure and total: malformed optional fields come out absent, never as an
//! error. Raw row shapes stop here.

use crate::models::{Comment, Sighting, UserProfile};
use crate::store::{CommentRow, ProfileRow, SightingRow};
use serde_json::Value;

pub const UNKNOWN_SPECIES: &str = "Unknown";
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// Resolves storage-relative photo paths to public URLs against a configured
/// base address. Already-absolute URLs pass through untouched.
#[derive(Debug, Clone)]
pub struct PhotoResolver {
    base_url: String,
}

impl PhotoResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/storage/v1/object/public/photos/{}",
            self.base_url,
            path.trim_start_matches('/')
        )
    }
}

/// Identifiers arrive as numbers or strings depending on the backend;
/// everything internal wants the canonical string form.
pub fn coerce_id(value: &Value) -> Option<String> {
    match value {
        Value::String(raw) if !raw.is_empty() => Some(raw.clone()),
        Value::Number(num) => Some(num.to_string()),
        _ => None,
    }
}

pub fn map_profile(row: &ProfileRow) -> Option<UserProfile> {
    let username = row.username.clone().filter(|name| !name.is_empty())?;
    Some(UserProfile {
        username,
        full_name: row.full_name.clone().filter(|name| !name.is_empty()),
        avatar_url: row.avatar_url.clone().filter(|url| !url.is_empty()),
    })
}

/// Display author for a comment: live profile username first, then the
/// stored free-text author field, then "Anonymous".
pub fn comment_author(profile: Option<&ProfileRow>, stored: Option<&str>) -> String {
    if let Some(username) = profile
        .and_then(|row| row.username.as_deref())
        .filter(|name| !name.trim().is_empty())
    {
        return username.to_string();
    }
    if let Some(author) = stored.filter(|author| !author.trim().is_empty()) {
        return author.trim().to_string();
    }
    ANONYMOUS_AUTHOR.to_string()
}

pub fn map_comment(row: &CommentRow) -> Option<Comment> {
    let id = coerce_id(&row.id)?;
    let text = row.text.clone().unwrap_or_default();
    Some(Comment {
        id,
        author: comment_author(row.profiles.as_ref(), row.author.as_deref()),
        author_id: row.user_id.as_ref().and_then(coerce_id),
        text,
        created_at: row.created_at.clone().unwrap_or_default(),
    })
}

/// Maps one raw sighting row, nested joins included. Rows without a usable
/// identifier are dropped rather than surfaced half-formed.
pub fn map_sighting(row: &SightingRow, photos: &PhotoResolver) -> Option<Sighting> {
    let id = coerce_id(&row.id)?;
    let species = row
        .species
        .clone()
        .filter(|species| !species.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_SPECIES.to_string());
    let count = row
        .count
        .filter(|count| *count > 0)
        .and_then(|count| u32::try_from(count).ok())
        .unwrap_or(1);
    let photo_path = row
        .image_path
        .clone()
        .filter(|path| !path.trim().is_empty());
    let photo_url = photo_path.as_deref().map(|path| photos.resolve(path));
    let photo_path = photo_path.filter(|path| !path.starts_with("http://") && !path.starts_with("https://"));

    // Creation order within a sighting, whatever order the join came back
    // in. The sort is stable, so rows sharing a timestamp keep input order.
    let mut comments: Vec<Comment> = row.comments.iter().filter_map(map_comment).collect();
    comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    Some(Sighting {
        id,
        species,
        location: row.location.clone().unwrap_or_default(),
        date: row.sighting_date.clone().unwrap_or_default(),
        time: row.sighting_time.clone().unwrap_or_default(),
        count,
        notes: row.notes.clone().filter(|notes| !notes.trim().is_empty()),
        photo_url,
        photo_path,
        owner_id: row.user_id.as_ref().and_then(coerce_id),
        owner: row.profiles.as_ref().and_then(map_profile),
        comments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn resolver() -> PhotoResolver {
        PhotoResolver::new("https://x")
    }

    #[test]
    fn relative_path_becomes_public_storage_url() {
        let row = SightingRow {
            id: json!("s1"),
            image_path: Some("abc.jpg".into()),
            ..Default::default()
        };
        let sighting = map_sighting(&row, &resolver()).unwrap();
        assert_eq!(
            sighting.photo_url.as_deref(),
            Some("https://x/storage/v1/object/public/photos/abc.jpg")
        );
        assert_eq!(sighting.photo_path.as_deref(), Some("abc.jpg"));
    }

    #[test]
    fn absent_path_yields_no_photo() {
        let row = SightingRow {
            id: json!("s1"),
            ..Default::default()
        };
        let sighting = map_sighting(&row, &resolver()).unwrap();
        assert_eq!(sighting.photo_url, None);
        assert_eq!(sighting.photo_path, None);
    }

    #[test]
    fn absolute_url_passes_through_with_no_storage_key() {
        let row = SightingRow {
            id: json!("s1"),
            image_path: Some("https://cdn.example/bird.png".into()),
            ..Default::default()
        };
        let sighting = map_sighting(&row, &resolver()).unwrap();
        assert_eq!(
            sighting.photo_url.as_deref(),
            Some("https://cdn.example/bird.png")
        );
        assert_eq!(sighting.photo_path, None);
    }

    #[test]
    fn numeric_ids_are_coerced_to_strings() {
        let row = SightingRow {
            id: json!(42),
            user_id: Some(json!(7)),
            ..Default::default()
        };
        let sighting = map_sighting(&row, &resolver()).unwrap();
        assert_eq!(sighting.id, "42");
        assert_eq!(sighting.owner_id.as_deref(), Some("7"));
    }

    #[test]
    fn rows_without_id_are_dropped() {
        let row = SightingRow::default();
        assert!(map_sighting(&row, &resolver()).is_none());
    }

    #[test]
    fn empty_species_defaults_to_unknown_and_count_to_one() {
        let row = SightingRow {
            id: json!("s1"),
            species: Some("  ".into()),
            count: Some(0),
            ..Default::default()
        };
        let sighting = map_sighting(&row, &resolver()).unwrap();
        assert_eq!(sighting.species, "Unknown");
        assert_eq!(sighting.count, 1);
    }

    #[test]
    fn out_of_range_counts_fall_back_to_one() {
        for raw in [-3_i64, i64::MAX] {
            let row = SightingRow {
                id: json!("s1"),
                count: Some(raw),
                ..Default::default()
            };
            let sighting = map_sighting(&row, &resolver()).unwrap();
            assert_eq!(sighting.count, 1);
        }
    }

    #[test]
    fn comments_are_ordered_by_creation_regardless_of_join_order() {
        let comment = |id: &str, created_at: &str| CommentRow {
            id: json!(id),
            text: Some("hi".into()),
            created_at: Some(created_at.into()),
            ..Default::default()
        };
        let row = SightingRow {
            id: json!("s1"),
            comments: vec![
                comment("c3", "2026-08-29T10:30:00Z"),
                comment("c1", "2026-08-29T09:00:00Z"),
                comment("c2", "2026-08-29T10:00:00Z"),
            ],
            ..Default::default()
        };
        let sighting = map_sighting(&row, &resolver()).unwrap();
        let ids: Vec<&str> = sighting
            .comments
            .iter()
            .map(|comment| comment.id.as_str())
            .collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
    }

    #[test]
    fn comment_author_prefers_profile_then_stored_then_anonymous() {
        let profile = ProfileRow {
            username: Some("robin_fan".into()),
            ..Default::default()
        };
        assert_eq!(
            comment_author(Some(&profile), Some("Old Name")),
            "robin_fan"
        );
        assert_eq!(comment_author(None, Some("  Old Name ")), "Old Name");
        assert_eq!(comment_author(None, Some("  ")), "Anonymous");
        assert_eq!(comment_author(None, None), "Anonymous");
    }

    #[test]
    fn comment_with_no_join_and_empty_author_displays_anonymous() {
        let row = CommentRow {
            id: json!("c1"),
            author: Some(String::new()),
            text: Some("nice spot".into()),
            ..Default::default()
        };
        let comment = map_comment(&row).unwrap();
        assert_eq!(comment.author, "Anonymous");
        assert_eq!(comment.text, "nice spot");
    }
}
