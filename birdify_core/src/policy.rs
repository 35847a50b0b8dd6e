//! Client-side ownership rules. Advisory only: they drive which actions the
//! UI offers and short-circuit obviously denied requests, while the backend
//! remains the authoritative enforcement point.

/// Whether a sighting's owner may comment on their own sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentPolicy {
    AllowOwner,
    /// Authorship and commentary are mutually exclusive.
    DenyOwner,
}

#[derive(Debug, Clone, Copy)]
pub struct OwnershipPolicy {
    pub comments: CommentPolicy,
    /// Data created before accounts existed carries no owner. When set,
    /// such ownerless records are deletable by anyone.
    pub legacy_ownerless_delete: bool,
}

impl Default for OwnershipPolicy {
    fn default() -> Self {
        Self {
            comments: CommentPolicy::DenyOwner,
            legacy_ownerless_delete: false,
        }
    }
}

impl OwnershipPolicy {
    pub fn can_delete(&self, actor_id: &str, owner_id: Option<&str>) -> bool {
        match owner_id {
            Some(owner) => owner == actor_id,
            None => self.legacy_ownerless_delete,
        }
    }

    pub fn can_comment(&self, actor_id: &str, sighting_owner_id: Option<&str>) -> bool {
        match self.comments {
            CommentPolicy::AllowOwner => true,
            CommentPolicy::DenyOwner => sighting_owner_id != Some(actor_id),
        }
    }
}
