pub mod auth;
pub mod config;
pub mod error;
pub mod mapper;
pub mod models;
pub mod policy;
pub mod repository;
pub mod session;
pub mod species;
pub mod store;
pub mod telemetry;
pub mod utils;

pub use config::BirdifyConfig;
pub use error::BirdifyError;
pub use models::{CapturedPhoto, Comment, NewAccount, Session, Sighting, SightingDraft, UserProfile};
pub use repository::SightingRepository;
pub use session::{AuthState, SessionGate};
