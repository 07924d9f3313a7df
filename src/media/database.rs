use chrono::{DateTime, Utc};

use super::Media;

/// A media item rebuilt from a `SyncFiles` record.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseMedia {
    pub remote_id: String,
    pub url: Option<String>,
    pub relative_folder: String,
    pub file_name: String,
    pub orig_name: String,
    pub duplicate_number: u32,
    pub size: u64,
    pub mime_type: Option<String>,
    pub description: String,
    pub camera_model: Option<String>,
    pub modify_date: DateTime<Utc>,
    pub create_date: DateTime<Utc>,
    pub sync_date: DateTime<Utc>,
    pub downloaded: bool,
}

impl Media for DatabaseMedia {
    fn id(&self) -> &str {
        &self.remote_id
    }

    fn orig_name(&self) -> &str {
        &self.orig_name
    }

    fn relative_folder(&self) -> &str {
        &self.relative_folder
    }

    fn duplicate_number(&self) -> u32 {
        self.duplicate_number
    }

    /// The name recorded at index time, which may have been fitted to the
    /// filesystem's length limit.
    fn filename(&self) -> String {
        self.file_name.clone()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn create_date(&self) -> DateTime<Utc> {
        self.create_date
    }

    fn modify_date(&self) -> DateTime<Utc> {
        self.modify_date
    }

    fn sync_date(&self) -> DateTime<Utc> {
        self.sync_date
    }

    fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn camera_model(&self) -> Option<&str> {
        self.camera_model.as_deref()
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn downloaded(&self) -> bool {
        self.downloaded
    }
}
