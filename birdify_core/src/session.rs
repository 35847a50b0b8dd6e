//! Session gate: tracks whether an identity is established, publishes state
//! changes on a side channel, and resolves the signed-in user's profile.

use crate::auth::IdentityProvider;
use crate::error::{BirdifyError, Result};
use crate::mapper;
use crate::models::{NewAccount, Session, UserProfile};
use crate::repository::SightingRepository;
use crate::store::RemoteStore;
use std::sync::{Arc, OnceLock};
use tokio::sync::{watch, RwLock};

#[derive(Debug, Clone, Default)]
pub enum AuthState {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated(Session),
}

impl AuthState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }
}

pub struct SessionGate {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn RemoteStore>,
    state_tx: watch::Sender<AuthState>,
    profile: RwLock<Option<UserProfile>>,
    sightings: OnceLock<Arc<SightingRepository>>,
}

impl SessionGate {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn RemoteStore>) -> Self {
        let (state_tx, _) = watch::channel(AuthState::Anonymous);
        Self {
            identity,
            store,
            state_tx,
            profile: RwLock::new(None),
            sightings: OnceLock::new(),
        }
    }

    /// Couples the sighting list to the session lifecycle: on any loss of
    /// session the gate wipes the bound repository's snapshot along with the
    /// profile, so no identity-scoped data survives. The first binding wins.
    pub fn bind_sightings(&self, repository: Arc<SightingRepository>) {
        let _ = self.sightings.set(repository);
    }

    /// Read-only subscription to session-state changes. Receivers cannot
    /// publish into the channel.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    pub fn current(&self) -> AuthState {
        self.state_tx.borrow().clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.current().session().cloned()
    }

    pub async fn profile(&self) -> Option<UserProfile> {
        self.profile.read().await.clone()
    }

    /// Signs in by username or email. Identifiers without an `@` are first
    /// resolved to an email through the profile lookup; an unknown username
    /// fails before the identity provider is ever contacted.
    pub async fn sign_in(&self, identifier: &str, password: &str) -> Result<Session> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(BirdifyError::Validation("username or email is required".into()));
        }
        if password.is_empty() {
            return Err(BirdifyError::Validation("password is required".into()));
        }

        self.state_tx.send_replace(AuthState::Authenticating);

        let email = if identifier.contains('@') {
            identifier.to_string()
        } else {
            match self.store.email_for_username(identifier).await {
                Ok(Some(email)) => email,
                Ok(None) => {
                    self.state_tx.send_replace(AuthState::Anonymous);
                    return Err(BirdifyError::Auth(format!("user {identifier} not found")));
                }
                Err(err) => {
                    self.state_tx.send_replace(AuthState::Anonymous);
                    return Err(BirdifyError::Auth(format!("username lookup failed: {err}")));
                }
            }
        };

        match self.identity.sign_in(&email, password).await {
            Ok(session) => {
                self.establish(session.clone()).await;
                Ok(session)
            }
            Err(err) => {
                self.state_tx.send_replace(AuthState::Anonymous);
                Err(BirdifyError::Auth(err.to_string()))
            }
        }
    }

    /// Registers an account. Providers that defer the session (email
    /// confirmation) leave the gate anonymous and return `None`.
    pub async fn sign_up(&self, account: NewAccount) -> Result<Option<Session>> {
        if account.email.trim().is_empty()
            || account.username.trim().is_empty()
            || account.full_name.trim().is_empty()
        {
            return Err(BirdifyError::Validation(
                "email, username, and full name are required".into(),
            ));
        }
        if account.password.is_empty() {
            return Err(BirdifyError::Validation("password is required".into()));
        }

        self.state_tx.send_replace(AuthState::Authenticating);
        match self.identity.sign_up(&account).await {
            Ok(Some(session)) => {
                self.establish(session.clone()).await;
                Ok(Some(session))
            }
            Ok(None) => {
                self.state_tx.send_replace(AuthState::Anonymous);
                Ok(None)
            }
            Err(err) => {
                self.state_tx.send_replace(AuthState::Anonymous);
                Err(BirdifyError::Auth(err.to_string()))
            }
        }
    }

    /// Re-enters a previously persisted session through the same transition
    /// a fresh sign-in takes.
    pub async fn restore(&self, session: Session) {
        self.establish(session).await;
    }

    /// Requests termination from the identity provider and only then drops
    /// to anonymous. Never assumes success synchronously: a rejected sign-out
    /// leaves the session in place.
    pub async fn sign_out(&self) -> Result<()> {
        let Some(session) = self.session() else {
            return Ok(());
        };
        self.identity
            .sign_out(&session.access_token)
            .await
            .map_err(|err| BirdifyError::Auth(err.to_string()))?;
        self.clear().await;
        Ok(())
    }

    /// External session invalidation (token expiry reported by the backend).
    pub async fn invalidate(&self) {
        self.clear().await;
    }

    async fn establish(&self, session: Session) {
        self.store
            .set_access_token(Some(session.access_token.clone()));
        let user_id = session.user_id.clone();
        self.state_tx
            .send_replace(AuthState::Authenticated(session));

        // Profile resolution is best-effort; the session stands without it.
        let profile = match self.store.profile_for_user(&user_id).await {
            Ok(Some(row)) => mapper::map_profile(&row),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(error = %err, user_id = %user_id, "profile resolution failed");
                None
            }
        };
        *self.profile.write().await = profile;
    }

    /// Drops all identity-scoped state. No stale profile or sighting list
    /// may survive into a different or anonymous identity.
    async fn clear(&self) {
        *self.profile.write().await = None;
        if let Some(repository) = self.sightings.get() {
            repository.clear().await;
        }
        self.store.set_access_token(None);
        self.state_tx.send_replace(AuthState::Anonymous);
    }
}
