//! Media model: remote descriptors and their database counterparts.
//!
//! [`Media`] is the domain view shared by items fresh from the remote API
//! ([`GooglePhotosMedia`]) and items rebuilt from the store
//! ([`DatabaseMedia`]). Row conversion lives in [`crate::state::rows`].

pub mod album;
pub mod database;
pub mod error;
pub mod google;
pub mod naming;

use chrono::{DateTime, Utc};

pub use album::Album;
pub use database::DatabaseMedia;
pub use error::MediaError;
pub use google::GooglePhotosMedia;

/// A media item as the sync engine sees it.
pub trait Media {
    /// Remote identifier, unique across the library.
    fn id(&self) -> &str;

    /// Sanitized base name with any provider duplicate marker removed.
    fn orig_name(&self) -> &str;

    /// Folder relative to the sync root, `/` separated.
    fn relative_folder(&self) -> &str;

    fn duplicate_number(&self) -> u32;

    /// Local file name: [`Media::orig_name`] with the duplicate number applied.
    fn filename(&self) -> String {
        naming::with_duplicate_suffix(self.orig_name(), self.duplicate_number())
    }

    fn description(&self) -> &str;
    fn create_date(&self) -> DateTime<Utc>;
    fn modify_date(&self) -> DateTime<Utc>;

    /// When this item was last fetched from the remote library.
    fn sync_date(&self) -> DateTime<Utc>;

    fn mime_type(&self) -> Option<&str>;
    fn url(&self) -> Option<&str>;
    fn camera_model(&self) -> Option<&str>;

    /// Size in bytes, 0 when unknown.
    fn size(&self) -> u64;

    fn downloaded(&self) -> bool;

    fn is_video(&self) -> bool {
        self.mime_type().is_some_and(|m| m.starts_with("video/"))
    }
}
