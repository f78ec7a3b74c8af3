use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use super::{types::*, utils::Res, HTTP};
use crate::error::*;

pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets.readonly",
    "https://www.googleapis.com/auth/drive",
];

const SUCCESS_PAGE: &str =
    "The authentication flow has completed. You may close this window.";
const FAILURE_PAGE: &str = "The authentication flow failed. See the terminal for details.";

// Upper bound on the size of the redirect request we are willing to buffer.
const MAX_REQUEST: usize = 16 * 1024;

/// Posts a grant to an OAuth2 token endpoint.
pub(crate) async fn request_token(token_uri: &str, form: &[(&str, &str)]) -> Result<TokenResponse> {
    let res = HTTP.post(token_uri).form(form).send().await?;

    Res::from(res)
        .json::<TokenResponse>()
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::Malformed | ErrorKind::Denied => {
                Error::Auth(e.to_string())
            }
            _ => e,
        })
}

/// Acquires and renews credentials.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn refresh(&self, credential: &mut Credential) -> Result<()>;

    /// Obtains a brand new credential, usually with the user's help.
    async fn authorize(&self) -> Result<Credential>;
}

/// The persisted token file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Option<Credential>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&contents).map(Some).map_err(|e| {
            Error::Auth(format!(
                "invalid token file `{}`: {e}",
                self.path.display()
            ))
        })
    }

    pub async fn save(&self, credential: &Credential) -> Result<()> {
        let json = serde_json::to_string(credential)?;
        tokio::fs::write(&self.path, json).await?;
        debug!(path = %self.path.display(), "credential saved");
        Ok(())
    }
}

/// Returns a usable credential: the stored one when still valid, otherwise a
/// refreshed or newly authorized one, which is written back to `store`.
pub async fn obtain_credentials<A>(store: &TokenStore, authorizer: &A) -> Result<Credential>
where
    A: Authorizer + ?Sized,
{
    let credential = match store.load().await? {
        Some(c) if c.is_valid() => {
            debug!("stored credential is valid");
            return Ok(c);
        }
        // Expired, or never issued an access token.
        Some(mut c) if c.refresh_token.is_some() => {
            info!("refreshing credential");
            authorizer.refresh(&mut c).await?;
            c
        }
        _ => {
            info!("no usable credential, starting authorization flow");
            authorizer.authorize().await?
        }
    };

    store.save(&credential).await?;

    Ok(credential)
}

/// Interactive authorization for installed applications: the user approves
/// access in a browser and Google redirects the code to a loopback listener.
pub struct InstalledAppFlow {
    secrets_path: PathBuf,
    scopes: &'static [&'static str],
}

impl InstalledAppFlow {
    pub fn new(secrets_path: impl Into<PathBuf>, scopes: &'static [&'static str]) -> Self {
        Self {
            secrets_path: secrets_path.into(),
            scopes,
        }
    }
}

#[async_trait]
impl Authorizer for InstalledAppFlow {
    async fn refresh(&self, credential: &mut Credential) -> Result<()> {
        credential.refresh().await
    }

    async fn authorize(&self) -> Result<Credential> {
        let secrets = ClientSecrets::from_file(&self.secrets_path).await?;
        let client = &secrets.installed;

        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://localhost:{port}/");
        let state = Uuid::new_v4().simple().to_string();

        let url = authorization_url(client, &redirect_uri, self.scopes, &state)?;
        eprintln!("Please visit this URL to authorize this application: {url}");

        let code = receive_code(&listener, &state).await?;
        debug!("authorization code received");

        let token = request_token(
            &client.token_uri,
            &[
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.as_str()),
            ],
        )
        .await?;

        Credential::from_grant(&secrets, self.scopes, token)
    }
}

fn authorization_url(
    client: &InstalledClient,
    redirect_uri: &str,
    scopes: &[&str],
    state: &str,
) -> Result<Url> {
    Url::parse_with_params(
        &client.auth_uri,
        &[
            ("response_type", "code"),
            ("client_id", client.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", scopes.join(" ").as_str()),
            ("state", state),
            ("access_type", "offline"),
        ],
    )
    .map_err(|e| Error::Config(format!("invalid auth_uri `{}`: {e}", client.auth_uri)))
}

/// Serves the loopback redirect until a request carrying the authorization
/// result arrives. Unrelated requests (favicons, preconnects) get a 404.
async fn receive_code(listener: &TcpListener, state: &str) -> Result<String> {
    loop {
        let (mut stream, peer) = listener.accept().await?;
        debug!(%peer, "connection on redirect listener");

        let mut buf = Vec::with_capacity(1024);
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.len() > MAX_REQUEST {
                break;
            }
        }

        let request = String::from_utf8_lossy(&buf);
        let result = parse_redirect(&request, state);

        let (status, body) = match &result {
            Ok(Some(_)) => ("200 OK", SUCCESS_PAGE),
            Ok(None) => ("404 Not Found", ""),
            Err(_) => ("200 OK", FAILURE_PAGE),
        };
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await?;
        stream.shutdown().await?;

        if let Some(code) = result? {
            return Ok(code);
        }
    }
}

/// Extracts the authorization code from the raw redirect request.
/// `Ok(None)` means the request is not the redirect.
fn parse_redirect(request: &str, expected_state: &str) -> Result<Option<String>> {
    let line = request.lines().next().unwrap_or_default();
    let mut parts = line.split_whitespace();
    let (Some(_method), Some(target)) = (parts.next(), parts.next()) else {
        return Ok(None);
    };

    let url = Url::parse("http://localhost")
        .and_then(|base| base.join(target))
        .map_err(|e| Error::Auth(format!("invalid redirect target `{target}`: {e}")))?;
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

    if let Some(err) = params.get("error") {
        return Err(Error::Auth(format!("authorization denied: {err}")));
    }

    let Some(code) = params.get("code") else {
        return Ok(None);
    };

    if params.get("state").map(String::as_str) != Some(expected_state) {
        return Err(Error::Auth("state mismatch in authorization redirect".into()));
    }

    Ok(Some(code.clone()))
}
