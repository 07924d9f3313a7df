//! Plain result types returned by the sync state store.

use chrono::{DateTime, Utc};

/// One file to materialize inside an album folder.
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumFileEntry {
    /// Folder of the file relative to the sync root.
    pub path: String,
    pub file_name: String,
    pub album_name: String,
    /// Create date of the album's newest item, if known.
    pub album_end_date: Option<DateTime<Utc>>,
}

/// Summary of the current index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSummary {
    /// Number of files tracked.
    pub total: u64,
    /// Number of files already downloaded.
    pub downloaded: u64,
    /// Number of files still to download.
    pub pending: u64,
    /// Number of albums tracked.
    pub albums: u64,
    /// The incremental index watermark, if an index has completed.
    pub last_index: Option<DateTime<Utc>>,
}
