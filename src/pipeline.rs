use serde::Serialize;
use tracing::{error, info};
use unwrap_or::unwrap_ok_or;

use crate::{
    config::Settings,
    error::*,
    extract::extract_column,
    fetch::fetch_tables,
    google::{Credential, DriveApi, SheetsApi},
    patients::read_patient_ids,
    table::{Table, Value},
    types::PatientId,
};

#[derive(Debug, Clone, Serialize)]
pub struct PatientReport {
    pub patient_id: PatientId,
    /// One list per file, oldest file first. `None` when the patient has no data.
    pub values: Option<Vec<Vec<Value>>>,
}

/// Reads the patient list, fetches the first `settings.patient_limit`
/// patients' files and extracts `settings.column` from each.
///
/// A patient whose fetch fails with a skippable error is reported without
/// data. Authorization and local errors end the run.
pub async fn run<S, D>(
    sheets: &S,
    drive: &D,
    credential: &Credential,
    settings: &Settings,
) -> Result<Vec<PatientReport>>
where
    S: SheetsApi + ?Sized,
    D: DriveApi + ?Sized,
{
    let ids = read_patient_ids(
        sheets,
        credential,
        &settings.spreadsheet_id,
        &settings.range,
        settings.id_column,
        &settings.retry_policy(),
    )
    .await?;

    if ids.is_empty() {
        return Ok(vec![]);
    }

    if ids.len() > settings.patient_limit {
        info!(
            total = ids.len(),
            limit = settings.patient_limit,
            "fetching the first patients only"
        );
    }

    let options = settings.fetch_options();
    let mut fetched: Vec<(PatientId, Option<Vec<Table>>)> = Vec::new();

    for id in ids.into_iter().take(settings.patient_limit) {
        let tables = unwrap_ok_or!(fetch_tables(drive, credential, &id, &options).await, e, {
            if e.disposition() == Disposition::Abort {
                return Err(e);
            }
            error!(patient = %id, error = %e, "An error occurred");
            None
        });

        fetched.push((id, tables));
    }

    fetched
        .into_iter()
        .map(|(patient_id, tables)| -> Result<PatientReport> {
            let values = tables
                .map(|t| extract_column(&t, &settings.column))
                .transpose()?;

            Ok(PatientReport { patient_id, values })
        })
        .collect()
}
