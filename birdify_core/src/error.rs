use thiserror::Error;

/// Error taxonomy for the core. Every user action maps its failure into one
/// of these variants; nothing propagates past the action that triggered it.
#[derive(Debug, Error)]
pub enum BirdifyError {
    /// A required field is missing or empty. Surfaced immediately, blocks
    /// the action, nothing was sent to the backend.
    #[error("{0}")]
    Validation(String),

    /// A read failed. Non-fatal: callers keep rendering the previous
    /// snapshot and may retry on the next explicit refresh.
    #[error("fetch failed: {0}")]
    Fetch(#[source] anyhow::Error),

    /// A write failed. Surfaced as a dismissable notice; partially completed
    /// steps (an already uploaded photo, say) are not rolled back.
    #[error("mutation failed: {0}")]
    Mutation(#[source] anyhow::Error),

    /// Sign-in, sign-up, or sign-out failed.
    #[error("{0}")]
    Auth(String),

    /// The ownership policy denied the action before any request was made.
    #[error("{0}")]
    Forbidden(String),
}

pub type Result<T> = std::result::Result<T, BirdifyError>;
