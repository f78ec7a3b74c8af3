use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{ClientSecrets, TokenResponse};
use crate::{error::*, google::oauth};

pub const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

// Tokens this close to their expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 225;

/// An OAuth2 user credential in the authorized-user JSON layout written by
/// Google's client libraries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    /// Fields we don't interpret (`universe_domain`, `account`, ...) survive a
    /// load/save round trip.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_token_uri() -> String {
    TOKEN_URI.to_string()
}

impl Credential {
    /// Builds a credential from the result of an authorization code exchange.
    pub fn from_grant(
        secrets: &ClientSecrets,
        scopes: &[&str],
        token: TokenResponse,
    ) -> Result<Self> {
        let client = &secrets.installed;
        let mut c = Self {
            token: None,
            refresh_token: None,
            token_uri: client.token_uri.clone(),
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            expiry: None,
            extra: Default::default(),
        };
        c.apply(token, Utc::now())?;
        Ok(c)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            None => false,
            Some(exp) => now >= exp - Duration::seconds(EXPIRY_SKEW_SECS),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_valid(&self) -> bool {
        self.token.is_some() && !self.is_expired()
    }

    pub fn auth_header(&self) -> Result<String> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| Error::Auth("credential carries no access token".into()))?;

        Ok(format!("Bearer {token}"))
    }

    /// Stores a freshly issued token. The refresh token and scopes are only
    /// replaced when the server sent new ones.
    pub fn apply(&mut self, token: TokenResponse, now: DateTime<Utc>) -> Result<()> {
        let expiry = token
            .expires_in
            .map(|secs| {
                i64::try_from(secs)
                    .ok()
                    .and_then(Duration::try_seconds)
                    .and_then(|d| now.checked_add_signed(d))
                    .ok_or_else(|| Error::Auth(format!("token lifetime {secs}s is out of range")))
            })
            .transpose()?;

        self.token = Some(token.access_token);
        self.expiry = expiry;

        if let Some(r) = token.refresh_token {
            self.refresh_token = Some(r);
        }

        if let Some(scope) = token.scope {
            self.scopes = scope.split_whitespace().map(String::from).collect();
        }

        Ok(())
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let refresh_token = self
            .refresh_token
            .clone()
            .ok_or_else(|| Error::Auth("credential carries no refresh token".into()))?;

        let token = oauth::request_token(
            &self.token_uri,
            &[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ],
        )
        .await?;

        self.apply(token, Utc::now())
    }
}
