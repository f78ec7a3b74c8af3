use fievar::Fields;
use serde::Deserialize;

use crate::types::*;

pub const FOLDER: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Clone, Deserialize, Fields)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "mimeType")]
    #[fievar(name = "mimeType")]
    pub mime_type: String,
    pub size: Option<String>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER
    }
}

impl From<DriveFile> for RemoteFolder {
    fn from(file: DriveFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
        }
    }
}

impl From<DriveFile> for RemoteFile {
    fn from(file: DriveFile) -> Self {
        // Google-native documents report no size.
        let size = file.size.and_then(|s| s.parse::<u64>().ok());

        let kind = match file.mime_type.as_str() {
            FOLDER => FileKind::Folder,
            _ => FileKind::File,
        };

        Self {
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            kind,
            size,
        }
    }
}
