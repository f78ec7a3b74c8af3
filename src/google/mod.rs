pub mod drive;
pub mod oauth;
pub mod query;
pub mod sheets;
pub mod types;
pub mod utils;

use reqwest::Client;

pub use drive::{DriveApi, GoogleDrive};
pub use oauth::{obtain_credentials, Authorizer, InstalledAppFlow, TokenStore, SCOPES};
pub use query::DriveQuery;
pub use sheets::{GoogleSheets, SheetsApi};
pub use types::*;
pub use utils::RetryPolicy;

lazy_static::lazy_static! {
    pub static ref HTTP: Client = Client::new();
}
