use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

use crate::{
    error::*,
    fetch::{FetchOptions, FolderMatch},
    google::RetryPolicy,
};

pub const DEFAULT_RANGE: &str = "AURA!A3:F";
pub const DEFAULT_COLUMN: &str = "Alexa Interaction";
pub const DEFAULT_PATIENT_LIMIT: usize = 5;

/// Run settings. Every field has a default except `spreadsheet_id`, which
/// must be supplied by the config file or the command line.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub spreadsheet_id: String,
    /// A1 range holding one patient per row.
    pub range: String,
    /// Zero-based column of `range` holding the patient id.
    pub id_column: usize,
    /// Column extracted from every CSV file.
    pub column: String,
    /// Only this many patients, from the top of the sheet, are fetched.
    pub patient_limit: usize,
    pub folder_match: FolderMatch,
    pub token_path: PathBuf,
    pub client_secrets_path: PathBuf,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            range: DEFAULT_RANGE.into(),
            id_column: 1,
            column: DEFAULT_COLUMN.into(),
            patient_limit: DEFAULT_PATIENT_LIMIT,
            folder_match: FolderMatch::First,
            token_path: "token.json".into(),
            client_secrets_path: "credentials.json".into(),
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    pub async fn from_file(path: &std::path::Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Config(format!("could not read `{}`: {e}", path.display()))
        })?;

        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.spreadsheet_id.trim().is_empty() {
            return Err(Error::Config("spreadsheet_id is not set".into()));
        }
        if self.column.is_empty() {
            return Err(Error::Config("column must not be empty".into()));
        }
        if self.patient_limit == 0 {
            return Err(Error::Config("patient_limit must be at least 1".into()));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            folder_match: self.folder_match,
            retry: self.retry_policy(),
        }
    }
}
