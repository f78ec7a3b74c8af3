use std::io;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use reqwest::header::*;
use tokio::io::AsyncReadExt;
use tokio_util::compat::FuturesAsyncReadCompatExt;
use tracing::debug;

use super::{query::DriveQuery, types::*, utils::Res, HTTP};
use crate::error::*;

pub const RES_URI: &str = "https://www.googleapis.com/drive/v3/files";

lazy_static::lazy_static! {
    static ref GET_FIELDS: String = DriveFile::fields().join(",");
    static ref LIST_FIELDS: String = format!("nextPageToken,files({})", GET_FIELDS.as_str());
}

/// The Drive operations the fetcher relies on.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Every item matching `query`, across all result pages, in API order.
    async fn search(&self, credential: &Credential, query: &DriveQuery) -> Result<Vec<DriveFile>>;

    /// The full content of a file.
    async fn download(&self, credential: &Credential, file_id: &str) -> Result<Vec<u8>>;
}

/// Drive v3 over HTTP.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoogleDrive;

#[async_trait]
impl DriveApi for GoogleDrive {
    async fn search(&self, credential: &Credential, query: &DriveQuery) -> Result<Vec<DriveFile>> {
        let q = query.to_string();
        debug!(query = %q, "searching drive");

        search_pages(credential, &q).try_collect().await
    }

    async fn download(&self, credential: &Credential, file_id: &str) -> Result<Vec<u8>> {
        let res = HTTP
            .get(format!("{RES_URI}/{file_id}"))
            .query(&[("alt", "media")])
            .header(AUTHORIZATION, credential.auth_header()?)
            .send()
            .await?;

        let mut reader = Res::from(res)
            .checked()
            .await?
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
            .into_async_read()
            .compat();

        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .map_err(|e| Error::Transient(format!("download of `{file_id}` interrupted: {e}")))?;

        debug!(file_id, bytes = buf.len(), "downloaded");
        Ok(buf)
    }
}

fn search_pages<'a>(
    credential: &'a Credential,
    q: &'a str,
) -> impl Stream<Item = Result<DriveFile>> + Send + 'a {
    let mut next_page_token: Option<String> = None;

    try_stream! {
        loop {
            let res = list(credential, q, next_page_token.as_deref()).await?;

            for f in res.files.into_iter() {
                yield f;
            }

            match res.next_page_token {
                None => break,
                Some(t) => next_page_token = Some(t),
            };
        }
    }
}

async fn list(credential: &Credential, q: &str, page_token: Option<&str>) -> Result<ListResponse> {
    let req = HTTP
        .get(RES_URI)
        .header(AUTHORIZATION, credential.auth_header()?);

    let req = match page_token {
        None => req.query(&[
            ("fields", LIST_FIELDS.as_str()),
            ("q", q),
            ("pageSize", "1000"),
        ]),
        Some(s) => req.query(&[
            ("fields", LIST_FIELDS.as_str()),
            ("q", q),
            ("pageSize", "1000"),
            ("pageToken", s),
        ]),
    };

    Res::from(req.send().await?).json::<ListResponse>().await
}
