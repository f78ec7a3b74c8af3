//! In-memory stand-ins for the Google APIs.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::{
    error::*,
    google::{Credential, DriveApi, DriveFile, DriveQuery, SheetsApi, ValueRange, FOLDER, TOKEN_URI},
};

pub fn credential() -> Credential {
    Credential {
        token: Some("test-token".into()),
        refresh_token: Some("test-refresh".into()),
        token_uri: TOKEN_URI.into(),
        client_id: "id".into(),
        client_secret: "secret".into(),
        scopes: vec![],
        expiry: Some(Utc::now() + Duration::hours(1)),
        extra: Default::default(),
    }
}

pub struct FakeSheets {
    rows: Vec<Vec<String>>,
    pub calls: AtomicUsize,
}

impl FakeSheets {
    pub fn rows(rows: &[&[&str]]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    /// A sheet whose second column holds `ids`.
    pub fn ids(ids: &[&str]) -> Self {
        let rows: Vec<Vec<&str>> = ids.iter().map(|id| vec!["", *id]).collect();
        let rows: Vec<&[&str]> = rows.iter().map(Vec::as_slice).collect();
        Self::rows(&rows)
    }
}

#[async_trait]
impl SheetsApi for FakeSheets {
    async fn values(&self, _: &Credential, _: &str, _: &str) -> Result<ValueRange> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ValueRange {
            values: self.rows.clone(),
            ..Default::default()
        })
    }
}

fn drive_file(id: &str, name: &str, mime_type: &str) -> DriveFile {
    DriveFile {
        id: id.into(),
        name: name.into(),
        mime_type: mime_type.into(),
        size: None,
    }
}

#[derive(Default)]
pub struct FakeDrive {
    results: HashMap<String, Vec<DriveFile>>,
    contents: HashMap<String, Vec<u8>>,
    flaky: Mutex<HashMap<String, usize>>,
    errors: HashMap<String, fn() -> Error>,
    searches: Mutex<Vec<String>>,
    downloads: Mutex<Vec<String>>,
}

impl FakeDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a folder named `patient`.
    pub fn folder(mut self, patient: &str, folder_id: &str) -> Self {
        self.results
            .entry(DriveQuery::folder_named(patient).to_string())
            .or_default()
            .push(drive_file(folder_id, patient, FOLDER));
        self
    }

    pub fn file(mut self, folder_id: &str, file_id: &str, csv: &str) -> Self {
        self.results
            .entry(DriveQuery::children_of(folder_id).to_string())
            .or_default()
            .push(drive_file(file_id, &format!("{file_id}.csv"), "text/csv"));
        self.contents.insert(file_id.into(), csv.as_bytes().to_vec());
        self
    }

    pub fn raw_file(mut self, folder_id: &str, file_id: &str, bytes: &[u8]) -> Self {
        self.results
            .entry(DriveQuery::children_of(folder_id).to_string())
            .or_default()
            .push(drive_file(file_id, file_id, "application/octet-stream"));
        self.contents.insert(file_id.into(), bytes.to_vec());
        self
    }

    pub fn subfolder(mut self, folder_id: &str, id: &str) -> Self {
        self.results
            .entry(DriveQuery::children_of(folder_id).to_string())
            .or_default()
            .push(drive_file(id, id, FOLDER));
        self
    }

    /// The next `failures` downloads of `file_id` fail transiently.
    pub fn flaky(self, file_id: &str, failures: usize) -> Self {
        self.flaky
            .lock()
            .unwrap()
            .insert(file_id.into(), failures);
        self
    }

    /// Every search for `patient`'s folder fails with `error()`.
    pub fn failing(mut self, patient: &str, error: fn() -> Error) -> Self {
        self.errors
            .insert(DriveQuery::folder_named(patient).to_string(), error);
        self
    }

    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl DriveApi for FakeDrive {
    async fn search(&self, _: &Credential, query: &DriveQuery) -> Result<Vec<DriveFile>> {
        let q = query.to_string();
        self.searches.lock().unwrap().push(q.clone());

        if let Some(error) = self.errors.get(&q) {
            return Err(error());
        }

        Ok(self.results.get(&q).cloned().unwrap_or_default())
    }

    async fn download(&self, _: &Credential, file_id: &str) -> Result<Vec<u8>> {
        self.downloads.lock().unwrap().push(file_id.to_string());

        if let Some(n) = self.flaky.lock().unwrap().get_mut(file_id) {
            if *n > 0 {
                *n -= 1;
                return Err(Error::Transient("connection reset".into()));
            }
        }

        self.contents
            .get(file_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(file_id.to_string()))
    }
}
