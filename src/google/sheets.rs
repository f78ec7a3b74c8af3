use async_trait::async_trait;
use reqwest::header::*;
use tracing::debug;
use url::Url;

use super::{types::*, utils::Res, HTTP};
use crate::error::*;

pub const RES_URI: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Reads `range` (A1 notation) of a spreadsheet, row major.
    async fn values(
        &self,
        credential: &Credential,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<ValueRange>;
}

/// Sheets v4 over HTTP.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoogleSheets;

#[async_trait]
impl SheetsApi for GoogleSheets {
    async fn values(
        &self,
        credential: &Credential,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<ValueRange> {
        let url = values_url(spreadsheet_id, range)?;
        debug!(%url, "reading sheet range");

        let res = HTTP
            .get(url)
            .header(AUTHORIZATION, credential.auth_header()?)
            .send()
            .await?;

        Res::from(res).json::<ValueRange>().await
    }
}

fn values_url(spreadsheet_id: &str, range: &str) -> Result<Url> {
    let mut url = Url::parse(RES_URI).map_err(|e| Error::Config(e.to_string()))?;

    url.path_segments_mut()
        .map_err(|_| Error::Config(format!("`{RES_URI}` cannot be a base")))?
        .extend([spreadsheet_id, "values", range]);

    Ok(url)
}
