use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::error::MediaError;
use super::naming::{date_folder, strip_duplicate_suffix, with_duplicate_suffix};
use super::Media;
use crate::dates::{minimum_date, parse_date};
use crate::filesystem::{fit_name, sanitize, FilesystemProfile};

/// A media item as delivered by the remote API.
///
/// Wraps the raw JSON descriptor:
/// `{id, filename, description, mimeType, productUrl,
///   mediaMetadata: {creationTime, photo|video: {cameraModel}}}`.
/// Names are sanitized with the profile the item was built against.
#[derive(Debug, Clone)]
pub struct GooglePhotosMedia {
    json: Value,
    id: String,
    orig_name: String,
    description: String,
    create_date: DateTime<Utc>,
    sync_date: DateTime<Utc>,
    relative_folder: String,
    duplicate_number: u32,
    /// Longest local name allowed in the item's folder.
    name_budget: usize,
    profile: FilesystemProfile,
}

impl GooglePhotosMedia {
    /// Parse a descriptor. Only `id` is required; a missing name becomes
    /// empty and a missing or malformed `creationTime` becomes the minimum
    /// date.
    pub fn new(
        json: Value,
        profile: &FilesystemProfile,
        lowercase: bool,
    ) -> Result<Self, MediaError> {
        let id = json["id"]
            .as_str()
            .filter(|id| !id.is_empty())
            .ok_or(MediaError::MissingField("id"))?
            .to_string();

        let mut name = strip_duplicate_suffix(json["filename"].as_str().unwrap_or_default());
        if lowercase {
            name = name.to_lowercase();
        }
        let orig_name = sanitize(&name, profile);

        let description = json["description"]
            .as_str()
            .map(|d| sanitize(d, profile))
            .unwrap_or_default();

        let create_date = json["mediaMetadata"]["creationTime"]
            .as_str()
            .and_then(parse_date)
            .unwrap_or_else(|| {
                tracing::debug!(id = %id, "No usable creationTime, using minimum date");
                minimum_date()
            });

        Ok(Self {
            json,
            id,
            orig_name,
            description,
            create_date,
            sync_date: Utc::now(),
            relative_folder: String::new(),
            duplicate_number: 0,
            name_budget: profile.max_name_length,
            profile: profile.clone(),
        })
    }

    /// File the item under a date-derived folder, e.g. `photos/2020/01`.
    pub fn set_path_by_date(&mut self, layout: &str) {
        self.relative_folder = date_folder(layout, &self.create_date);
    }

    /// Limit the local name so that `sync_root/relative_folder/name` stays
    /// within the profile's name and path limits. Call after the folder is
    /// set.
    pub fn fit_under(&mut self, sync_root: &Path) {
        let parent = sync_root.join(&self.relative_folder);
        self.name_budget = self.profile.name_budget(&parent);
        if self.name_budget < self.orig_name.len() {
            tracing::debug!(
                id = %self.id,
                budget = self.name_budget,
                parent = %parent.display(),
                "Local name will be shortened"
            );
        }
    }

    pub fn set_duplicate_number(&mut self, duplicate_number: u32) {
        self.duplicate_number = duplicate_number;
    }

    pub fn json(&self) -> &Value {
        &self.json
    }

    fn metadata_block(&self) -> &Value {
        let meta = &self.json["mediaMetadata"];
        if meta["video"].is_object() {
            &meta["video"]
        } else {
            &meta["photo"]
        }
    }
}

impl Media for GooglePhotosMedia {
    fn id(&self) -> &str {
        &self.id
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

    /// The base name is fitted first so the duplicate marker always survives.
    fn filename(&self) -> String {
        let marker_len = match self.duplicate_number {
            0 => 0,
            n => format!(" ({})", n).len(),
        };
        let base = fit_name(
            &self.orig_name,
            self.name_budget.saturating_sub(marker_len),
            &self.profile,
        );
        with_duplicate_suffix(&base, self.duplicate_number)
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn create_date(&self) -> DateTime<Utc> {
        self.create_date
    }

    /// The remote API has no modification time.
    fn modify_date(&self) -> DateTime<Utc> {
        minimum_date()
    }

    fn sync_date(&self) -> DateTime<Utc> {
        self.sync_date
    }

    fn mime_type(&self) -> Option<&str> {
        self.json["mimeType"].as_str()
    }

    fn url(&self) -> Option<&str> {
        self.json["productUrl"].as_str()
    }

    fn camera_model(&self) -> Option<&str> {
        self.metadata_block()["cameraModel"].as_str()
    }

    fn size(&self) -> u64 {
        0
    }

    fn downloaded(&self) -> bool {
        false
    }

    fn is_video(&self) -> bool {
        self.json["mediaMetadata"]["video"].is_object()
            || self.mime_type().is_some_and(|m| m.starts_with("video/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn photo_json() -> Value {
        json!({
            "id": "AGj1epU",
            "productUrl": "https://photos.example.com/lr/photo/AGj1epU",
            "mimeType": "image/jpeg",
            "filename": "IMG_0001 (2).jpg",
            "description": "Beach: day/night",
            "mediaMetadata": {
                "creationTime": "2020-01-15T10:20:30Z",
                "width": "4032",
                "height": "3024",
                "photo": { "cameraMake": "Apple", "cameraModel": "iPhone X" }
            }
        })
    }

    #[test]
    fn test_parse_photo() {
        let media =
            GooglePhotosMedia::new(photo_json(), &FilesystemProfile::posix_default(), false)
                .unwrap();
        assert_eq!(media.id(), "AGj1epU");
        assert_eq!(media.orig_name(), "IMG_0001.jpg");
        assert_eq!(media.description(), "Beach: day_night");
        assert_eq!(
            media.create_date(),
            Utc.with_ymd_and_hms(2020, 1, 15, 10, 20, 30).unwrap()
        );
        assert_eq!(media.modify_date(), minimum_date());
        assert_eq!(media.mime_type(), Some("image/jpeg"));
        assert_eq!(
            media.url(),
            Some("https://photos.example.com/lr/photo/AGj1epU")
        );
        assert_eq!(media.camera_model(), Some("iPhone X"));
        assert!(!media.is_video());
        assert!(!media.downloaded());
    }

    #[test]
    fn test_windows_profile_sanitizes_description() {
        let media =
            GooglePhotosMedia::new(photo_json(), &FilesystemProfile::conservative(), false)
                .unwrap();
        assert_eq!(media.description(), "Beach_ day_night");
    }

    #[test]
    fn test_video_metadata() {
        let descriptor = json!({
            "id": "vid1",
            "filename": "MOV_0001.mp4",
            "mimeType": "video/mp4",
            "mediaMetadata": {
                "creationTime": "2021-03-01T00:00:00Z",
                "video": { "cameraModel": "Pixel 4", "fps": 30.0 }
            }
        });
        let media =
            GooglePhotosMedia::new(descriptor, &FilesystemProfile::posix_default(), false)
                .unwrap();
        assert!(media.is_video());
        assert_eq!(media.camera_model(), Some("Pixel 4"));
    }

    #[test]
    fn test_missing_fields_tolerated() {
        let media = GooglePhotosMedia::new(
            json!({ "id": "x1" }),
            &FilesystemProfile::posix_default(),
            false,
        )
        .unwrap();
        assert_eq!(media.orig_name(), "");
        assert_eq!(media.description(), "");
        assert_eq!(media.create_date(), minimum_date());
        assert!(media.camera_model().is_none());
        assert!(media.mime_type().is_none());
    }

    #[test]
    fn test_bad_creation_time() {
        let media = GooglePhotosMedia::new(
            json!({ "id": "x1", "mediaMetadata": { "creationTime": "last tuesday" } }),
            &FilesystemProfile::posix_default(),
            false,
        )
        .unwrap();
        assert_eq!(media.create_date(), minimum_date());
    }

    #[test]
    fn test_missing_id_rejected() {
        let err = GooglePhotosMedia::new(
            json!({ "filename": "a.jpg" }),
            &FilesystemProfile::posix_default(),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, MediaError::MissingField("id")));
    }

    #[test]
    fn test_lowercase() {
        let media =
            GooglePhotosMedia::new(photo_json(), &FilesystemProfile::posix_default(), true)
                .unwrap();
        assert_eq!(media.orig_name(), "img_0001.jpg");
    }

    #[test]
    fn test_filename_applies_duplicate_number() {
        let mut media =
            GooglePhotosMedia::new(photo_json(), &FilesystemProfile::posix_default(), false)
                .unwrap();
        assert_eq!(media.filename(), "IMG_0001.jpg");
        media.set_duplicate_number(1);
        assert_eq!(media.filename(), "IMG_0001 (1).jpg");
    }

    #[test]
    fn test_filename_fits_name_limit_and_keeps_marker() {
        let profile = FilesystemProfile {
            max_name_length: 16,
            ..FilesystemProfile::posix_default()
        };
        let mut media = GooglePhotosMedia::new(
            json!({ "id": "long", "filename": "a_very_long_file_name.jpg" }),
            &profile,
            false,
        )
        .unwrap();
        assert_eq!(media.filename(), "a_very_long_.jpg");
        media.set_duplicate_number(3);
        let name = media.filename();
        assert_eq!(name, "a_very_l (3).jpg");
        assert!(name.len() <= 16);
    }

    #[test]
    fn test_set_path_by_date() {
        let mut media =
            GooglePhotosMedia::new(photo_json(), &FilesystemProfile::posix_default(), false)
                .unwrap();
        media.set_path_by_date("photos/%Y/%m");
        assert_eq!(media.relative_folder(), "photos/2020/01");
    }

    #[test]
    fn test_fit_under_honours_path_limit() {
        let profile = FilesystemProfile {
            max_path_length: 50,
            ..FilesystemProfile::posix_default()
        };
        let mut media = GooglePhotosMedia::new(
            json!({
                "id": "deep",
                "filename": "holiday_in_the_mountains.jpg",
                "mediaMetadata": { "creationTime": "2020-01-15T10:20:30Z" }
            }),
            &profile,
            false,
        )
        .unwrap();
        media.set_path_by_date("a_rather_long_folder/%Y/%m");
        media.fit_under(Path::new("/s"));

        let parent = Path::new("/s").join(media.relative_folder());
        for number in [0, 1, 12] {
            media.set_duplicate_number(number);
            let full = parent.join(media.filename());
            assert!(full.as_os_str().len() <= 50, "{}", full.display());
            assert!(media.filename().ends_with(".jpg"));
        }
        media.set_duplicate_number(0);
        assert_eq!(media.filename(), "holiday_in_the.jpg");
        // the duplicate key keeps the full name
        assert_eq!(media.orig_name(), "holiday_in_the_mountains.jpg");
    }

    #[test]
    fn test_fitted_name_has_no_trailing_dot_on_windows() {
        let profile = FilesystemProfile {
            max_name_length: 10,
            ..FilesystemProfile::conservative()
        };
        let media = GooglePhotosMedia::new(
            json!({ "id": "w", "filename": "trip. to the sea.jpg" }),
            &profile,
            false,
        )
        .unwrap();
        assert_eq!(media.filename(), "trip.jpg");
    }
}
