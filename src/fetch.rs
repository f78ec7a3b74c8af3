use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    error::*,
    google::{utils::retry, Credential, DriveApi, DriveQuery, RetryPolicy},
    table::Table,
    types::*,
};

/// How to pick a patient's folder when several share its name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FolderMatch {
    /// Take the first folder the search returns.
    #[default]
    First,
    /// Refuse to guess.
    Unique,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    pub folder_match: FolderMatch,
    pub retry: RetryPolicy,
}

/// Downloads and parses every file in `patient`'s folder, last listed first.
///
/// Returns `Ok(None)` when the folder holds no files.
pub async fn fetch_tables<D>(
    drive: &D,
    credential: &Credential,
    patient: &PatientId,
    options: &FetchOptions,
) -> Result<Option<Vec<Table>>>
where
    D: DriveApi + ?Sized,
{
    let folder = find_folder(drive, credential, patient, options).await?;
    debug!(%patient, folder_id = %folder.id, "folder resolved");

    let query = DriveQuery::children_of(&folder.id);
    let files: Vec<RemoteFile> = retry(&options.retry, "folder listing", || {
        drive.search(credential, &query)
    })
    .await?
    .into_iter()
    .map(RemoteFile::from)
    .filter(|f| match f.kind {
        FileKind::Folder => {
            debug!(name = %f.name, "skipping nested folder");
            false
        }
        FileKind::File => true,
    })
    .collect();

    if files.is_empty() {
        info!(%patient, "No files found.");
        return Ok(None);
    }

    let mut tables = Vec::with_capacity(files.len());
    for file in files.iter().rev() {
        debug!(name = %file.name, size = ?file.size, "downloading");
        let bytes = retry(&options.retry, "download", || {
            drive.download(credential, &file.id)
        })
        .await?;

        tables.push(parse(file, &bytes)?);
    }

    Ok(Some(tables))
}

async fn find_folder<D>(
    drive: &D,
    credential: &Credential,
    patient: &PatientId,
    options: &FetchOptions,
) -> Result<RemoteFolder>
where
    D: DriveApi + ?Sized,
{
    let query = DriveQuery::folder_named(patient.as_str());
    let mut folders = retry(&options.retry, "folder search", || {
        drive.search(credential, &query)
    })
    .await?;

    match (folders.len(), options.folder_match) {
        (0, _) => Err(Error::NotFound(format!("no folder named {:?}", patient.as_str()))),
        (1, _) => Ok(folders.swap_remove(0).into()),
        (count, FolderMatch::First) => {
            warn!(%patient, count, "several folders match, using the first");
            Ok(folders.swap_remove(0).into())
        }
        (count, FolderMatch::Unique) => Err(Error::AmbiguousFolder {
            name: patient.to_string(),
            count,
        }),
    }
}

fn parse(file: &RemoteFile, bytes: &[u8]) -> Result<Table> {
    if std::str::from_utf8(bytes).is_err() {
        let mime = tree_magic_mini::from_u8(bytes);
        return Err(Error::MalformedResponse(format!(
            "`{}` ({}) is not UTF-8 text, looks like {mime}",
            file.name, file.mime_type
        )));
    }

    Table::from_csv(bytes).map_err(|e| match e {
        Error::Csv(e) => Error::MalformedResponse(format!("`{}`: {e}", file.name)),
        e => e,
    })
}
