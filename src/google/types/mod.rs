mod client_secrets;
mod credential;
mod drive_file;

pub use client_secrets::{ClientSecrets, InstalledClient};
pub use credential::{Credential, TOKEN_URI};
pub use drive_file::{DriveFile, FOLDER};

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<u64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub files: Vec<DriveFile>,
}

/// Response of `spreadsheets.values.get`. Empty ranges omit `values`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default)]
    pub values: Vec<Vec<String>>,
}
