//! Identity provider boundary: the hosted auth service plus an in-memory
//! stand-in for tests.

use crate::config::{HttpConfig, SupabaseConfig};
use crate::models::{NewAccount, Session};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// Registers an account. Returns `None` when the provider defers the
    /// session (email confirmation flows).
    async fn sign_up(&self, account: &NewAccount) -> Result<Option<Session>>;

    async fn sign_out(&self, access_token: &str) -> Result<()>;
}

/// GoTrue-style auth endpoints of the hosted backend.
pub struct GoTrueProvider {
    base_url: String,
    anon_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    user: Option<AuthUser>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SignupResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<AuthUser>,
}

impl GoTrueProvider {
    pub fn new(config: &SupabaseConfig, http: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(http.timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            base_url: config.base_url.clone(),
            anon_key: config.anon_key.clone(),
            client,
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }
}

#[async_trait]
impl IdentityProvider for GoTrueProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .context("sign-in request failed")?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("sign-in rejected ({status}): {body}"));
        }
        let token: TokenResponse = response
            .json()
            .await
            .context("sign-in payload was not valid JSON")?;
        let user = token.user.ok_or_else(|| anyhow!("sign-in response carried no user"))?;
        Ok(Session {
            access_token: token.access_token,
            user_id: user.id,
            email: user.email.unwrap_or_else(|| email.to_string()),
        })
    }

    async fn sign_up(&self, account: &NewAccount) -> Result<Option<Session>> {
        let response = self
            .client
            .post(self.auth_url("signup"))
            .header("apikey", &self.anon_key)
            .json(&json!({
                "email": account.email,
                "password": account.password,
                "data": {
                    "username": account.username,
                    "full_name": account.full_name,
                    "display_name": account.username,
                },
            }))
            .send()
            .await
            .context("sign-up request failed")?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("sign-up rejected ({status}): {body}"));
        }
        let payload: SignupResponse = response
            .json()
            .await
            .context("sign-up payload was not valid JSON")?;
        match (payload.access_token, payload.user) {
            (Some(access_token), Some(user)) => Ok(Some(Session {
                access_token,
                user_id: user.id,
                email: user.email.unwrap_or_else(|| account.email.clone()),
            })),
            _ => Ok(None),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        self.client
            .post(self.auth_url("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .context("sign-out request failed")?
            .error_for_status()
            .context("sign-out rejected")?;
        Ok(())
    }
}

/// Deterministic provider for tests: accounts registered up front, sign-in by
/// exact credential match.
#[derive(Default)]
pub struct MemoryIdentity {
    accounts: Mutex<HashMap<String, MemoryAccount>>,
}

#[derive(Clone)]
struct MemoryAccount {
    password: String,
    user_id: String,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, email: &str, password: &str, user_id: &str) -> Self {
        self.accounts.lock().expect("identity poisoned").insert(
            email.to_string(),
            MemoryAccount {
                password: password.to_string(),
                user_id: user_id.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let accounts = self.accounts.lock().expect("identity poisoned");
        let account = accounts
            .get(email)
            .filter(|account| account.password == password)
            .ok_or_else(|| anyhow!("invalid credentials"))?;
        Ok(Session {
            access_token: Uuid::new_v4().to_string(),
            user_id: account.user_id.clone(),
            email: email.to_string(),
        })
    }

    async fn sign_up(&self, account: &NewAccount) -> Result<Option<Session>> {
        let mut accounts = self.accounts.lock().expect("identity poisoned");
        if accounts.contains_key(&account.email) {
            return Err(anyhow!("email already registered"));
        }
        let user_id = Uuid::new_v4().to_string();
        accounts.insert(
            account.email.clone(),
            MemoryAccount {
                password: account.password.clone(),
                user_id: user_id.clone(),
            },
        );
        Ok(Some(Session {
            access_token: Uuid::new_v4().to_string(),
            user_id,
            email: account.email.clone(),
        }))
    }

    async fn sign_out(&self, _access_token: &str) -> Result<()> {
        Ok(())
    }
}
