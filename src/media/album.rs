use chrono::{DateTime, Utc};
use serde_json::Value;

use super::error::MediaError;
use crate::filesystem::{sanitize, FilesystemProfile};

/// An album and the span of its contents' create dates.
///
/// The date span is unknown until the album's items have been indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub sync_date: Option<DateTime<Utc>>,
}

impl Album {
    /// Build from a remote album descriptor `{id, title, mediaItemsCount}`.
    /// The count arrives as a decimal string but a bare number is accepted.
    pub fn from_descriptor(json: &Value, profile: &FilesystemProfile) -> Result<Self, MediaError> {
        let id = json["id"]
            .as_str()
            .filter(|id| !id.is_empty())
            .ok_or(MediaError::MissingField("id"))?
            .to_string();
        let name = sanitize(json["title"].as_str().unwrap_or_default(), profile);
        let count = &json["mediaItemsCount"];
        let size = count
            .as_u64()
            .or_else(|| count.as_str().and_then(|s| s.parse().ok()))
            .unwrap_or(0);

        Ok(Self {
            id,
            name,
            size,
            start_date: None,
            end_date: None,
            sync_date: Some(Utc::now()),
        })
    }
}
