use std::path::Path;

use serde::Deserialize;

use super::credential::TOKEN_URI;
use crate::error::*;

const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// The `credentials.json` file downloaded from the cloud console.
#[derive(Debug, Deserialize)]
pub struct ClientSecrets {
    #[serde(alias = "web")]
    pub installed: InstalledClient,
}

#[derive(Debug, Deserialize)]
pub struct InstalledClient {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    TOKEN_URI.to_string()
}

impl ClientSecrets {
    pub async fn from_file(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Config(format!(
                "could not read client secrets `{}`: {e}",
                path.display()
            ))
        })?;

        serde_json::from_str(&contents).map_err(|e| {
            Error::Config(format!(
                "invalid client secrets `{}`: {e}",
                path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installed_and_web_layouts() -> anyhow::Result<()> {
        let s = serde_json::from_str::<ClientSecrets>(
            r#"{"installed": {"client_id": "id", "client_secret": "secret",
                "redirect_uris": ["http://localhost"]}}"#,
        )?;
        assert_eq!(s.installed.client_id, "id");
        assert_eq!(s.installed.auth_uri, AUTH_URI);
        assert_eq!(s.installed.token_uri, TOKEN_URI);

        let s = serde_json::from_str::<ClientSecrets>(
            r#"{"web": {"client_id": "w", "client_secret": "s",
                "token_uri": "https://example.test/token"}}"#,
        )?;
        assert_eq!(s.installed.client_id, "w");
        assert_eq!(s.installed.token_uri, "https://example.test/token");

        Ok(())
    }

    #[tokio::test]
    async fn missing_file_is_a_config_error() {
        let res = ClientSecrets::from_file(Path::new("/nonexistent/credentials.json")).await;
        assert!(matches!(res, Err(Error::Config(_))));
    }
}
