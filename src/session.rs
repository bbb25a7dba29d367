//! Signed-in identity.
//!
//! A [`Session`] is created by [`SessionManager::sign_in`], persisted to a JSON
//! file so later runs can [`SessionManager::restore`] it, and removed by
//! [`SessionManager::sign_out`].

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::IdentityConfig;
use crate::error::AuthError;

pub type AuthResult<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub profile: Profile,
    pub signed_in_at: DateTime<Utc>,
}

impl Session {
    /// Tasks are scoped to this id.
    pub fn owner_id(&self) -> &str {
        &self.profile.display_name
    }

    pub fn display_name(&self) -> &str {
        &self.profile.display_name
    }

    pub fn photo_url(&self) -> Option<&str> {
        self.profile.photo_url.as_deref()
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self) -> AuthResult<Profile>;

    async fn sign_out(&self) -> AuthResult<()>;
}

/// Provider that hands out a fixed profile.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    display_name: Option<String>,
    photo_url: Option<String>,
}

impl StaticIdentity {
    pub fn new(display_name: Option<String>, photo_url: Option<String>) -> Self {
        Self {
            display_name,
            photo_url,
        }
    }

    /// Explicit values win over the `[identity]` table.
    pub fn from_config(
        config: &IdentityConfig,
        display_name: Option<String>,
        photo_url: Option<String>,
    ) -> Self {
        Self {
            display_name: display_name.or_else(|| config.display_name.clone()),
            photo_url: photo_url.or_else(|| config.photo_url.clone()),
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn sign_in(&self) -> AuthResult<Profile> {
        let display_name = self
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(AuthError::NoIdentity)?;
        Ok(Profile {
            display_name: display_name.to_string(),
            photo_url: self.photo_url.clone().filter(|url| !url.trim().is_empty()),
        })
    }

    async fn sign_out(&self) -> AuthResult<()> {
        Ok(())
    }
}

pub struct SessionManager<P> {
    provider: P,
    path: PathBuf,
}

impl<P: IdentityProvider> SessionManager<P> {
    pub fn new(provider: P, path: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            path: path.into(),
        }
    }

    /// Sign in through the provider and persist the session.
    pub async fn sign_in(&self) -> AuthResult<Session> {
        let profile = self.provider.sign_in().await.map_err(|err| {
            error!(error = %err, "sign-in failed");
            err
        })?;
        let session = Session {
            profile,
            signed_in_at: Utc::now(),
        };
        self.persist(&session).await?;
        info!(user = %session.display_name(), "signed in");
        Ok(session)
    }

    /// Load the persisted session, if any.
    pub async fn restore(&self) -> AuthResult<Option<Session>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => Ok(Some(serde_json::from_str(&data)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Sign out through the provider and drop the persisted session.
    ///
    /// A provider failure is logged; the local session is removed regardless.
    pub async fn sign_out(&self) -> AuthResult<()> {
        if let Err(err) = self.provider.sign_out().await {
            warn!(error = %err, "provider sign-out failed");
        }
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("signed out");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn persist(&self, session: &Session) -> AuthResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_string_pretty(session)?;
        tokio::fs::write(&self.path, data).await?;
        Ok(())
    }
}
