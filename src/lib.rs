pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod google;
pub mod patients;
pub mod pipeline;
pub mod table;
pub mod types;

#[cfg(test)]
mod testing;

pub use error::{Disposition, Error, ErrorKind, Result};
pub use extract::extract_column;
pub use fetch::{fetch_tables, FetchOptions, FolderMatch};
pub use patients::read_patient_ids;
pub use pipeline::{run, PatientReport};
pub use table::{Table, Value};
pub use types::*;
