use std::fmt;

use super::types::FOLDER;

/// A Drive `files.list` search expression. Every value goes through
/// [`literal`], so names containing quotes or backslashes stay well formed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriveQuery {
    clauses: Vec<String>,
}

impl DriveQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folders whose name is exactly `name`.
    pub fn folder_named(name: &str) -> Self {
        Self::new().mime_type(FOLDER).name(name)
    }

    /// Items directly inside the folder `parent_id`.
    pub fn children_of(parent_id: &str) -> Self {
        Self::new().parent(parent_id)
    }

    pub fn mime_type(mut self, mime: &str) -> Self {
        self.clauses.push(format!("mimeType = {}", literal(mime)));
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.clauses.push(format!("name = {}", literal(name)));
        self
    }

    pub fn parent(mut self, parent_id: &str) -> Self {
        self.clauses.push(format!("{} in parents", literal(parent_id)));
        self
    }
}

impl fmt::Display for DriveQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clauses.join(" and "))
    }
}

/// Quotes `s` as a query string literal.
pub fn literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}
