use tracing::{debug, warn};

use crate::{
    error::*,
    google::{utils::retry, Credential, RetryPolicy, SheetsApi},
    types::PatientId,
};

/// Reads `range` and returns column `id_column` of every row, in sheet order.
/// An empty range yields an empty vector.
pub async fn read_patient_ids<S>(
    sheets: &S,
    credential: &Credential,
    spreadsheet_id: &str,
    range: &str,
    id_column: usize,
    policy: &RetryPolicy,
) -> Result<Vec<PatientId>>
where
    S: SheetsApi + ?Sized,
{
    let res = retry(policy, "sheet read", || {
        sheets.values(credential, spreadsheet_id, range)
    })
    .await?;

    if res.values.is_empty() {
        warn!(range, "No data found.");
        return Ok(vec![]);
    }

    let ids = res
        .values
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            row.into_iter().nth(id_column).map(PatientId).ok_or_else(|| {
                Error::MalformedResponse(format!(
                    "row {} of `{range}` has no column {id_column}",
                    i + 1
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(count = ids.len(), "patient ids read");
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[tokio::test]
    async fn takes_the_second_column() -> anyhow::Result<()> {
        let sheets = FakeSheets::rows(&[&["1", "P-001", "x"], &["2", "P-002"]]);

        let ids = read_patient_ids(
            &sheets,
            &credential(),
            "sheet",
            "AURA!A3:F",
            1,
            &RetryPolicy::none(),
        )
        .await?;

        assert_eq!(ids, vec![PatientId::from("P-001"), PatientId::from("P-002")]);
        Ok(())
    }

    #[tokio::test]
    async fn no_rows_is_empty() -> anyhow::Result<()> {
        let sheets = FakeSheets::rows(&[]);

        let ids =
            read_patient_ids(&sheets, &credential(), "sheet", "AURA!A3:F", 1, &RetryPolicy::none())
                .await?;

        assert!(ids.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn short_row_is_malformed() {
        let sheets = FakeSheets::rows(&[&["1", "P-001"], &["2"]]);

        let res =
            read_patient_ids(&sheets, &credential(), "sheet", "AURA!A3:F", 1, &RetryPolicy::none())
                .await;

        assert!(matches!(res, Err(Error::MalformedResponse(_))));
    }
}
