use crate::{
    error::*,
    table::{Table, Value},
};

/// Pulls `column_name` out of every table, dropping missing cells.
///
/// Fails on the first table that lacks the column.
pub fn extract_column(tables: &[Table], column_name: &str) -> Result<Vec<Vec<Value>>> {
    tables
        .iter()
        .map(|t| {
            t.column(column_name)
                .map(|c| c.non_null())
                .ok_or_else(|| Error::MissingColumn(column_name.to_string()))
        })
        .collect()
}
