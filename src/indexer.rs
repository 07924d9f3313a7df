//! Feeds remote descriptors into the sync state store.
//!
//! For each item: derive the local folder from its create date, fit the
//! name to the folder, resolve the duplicate number for its base name, then
//! insert or update its row.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::filesystem::FilesystemProfile;
use crate::media::{Album, GooglePhotosMedia, Media, MediaError};
use crate::state::{AlbumRow, StateError, SyncFileRow, SyncStateDb};

/// A library listing as exported from the remote API:
/// `{"mediaItems": [...], "albums": [...]}`. Both arrays are optional.
///
/// Album descriptors may carry a `mediaItemIds` array naming their members.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryExport {
    #[serde(default)]
    pub media_items: Vec<Value>,
    #[serde(default)]
    pub albums: Vec<Value>,
}

impl LibraryExport {
    pub fn from_json(text: &str) -> Result<Self, MediaError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// How descriptors become local names.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Date folder layout, e.g. `%Y/%m`, or `none`.
    pub folder_layout: String,
    pub lowercase: bool,
    /// Local folder the relative paths are created under. Counts against
    /// the filesystem's path length limit.
    pub sync_root: PathBuf,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            folder_layout: "%Y/%m".to_string(),
            lowercase: false,
            sync_root: PathBuf::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    New,
    Updated,
}

/// Counts from one indexing pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexReport {
    pub new: u64,
    pub updated: u64,
    /// Descriptors that could not be parsed.
    pub skipped: u64,
    pub albums: u64,
    /// Newest create date seen; the next watermark.
    pub newest: Option<DateTime<Utc>>,
}

/// Record one media item, assigning its duplicate number.
///
/// Re-indexing a known item keeps its duplicate number and its Downloaded
/// flag; every other field is refreshed from the descriptor. A new item
/// whose local name is already in use in its folder (after shortening, or
/// ignoring case where `profile` is case-insensitive) takes the next free
/// number.
pub fn index_media(
    store: &SyncStateDb,
    media: &mut GooglePhotosMedia,
    profile: &FilesystemProfile,
) -> Result<IndexOutcome, StateError> {
    let (mut duplicate_number, existing) =
        store.resolve_duplicate(media.orig_name(), media.relative_folder(), media.id())?;
    media.set_duplicate_number(duplicate_number);

    if !existing.is_empty() {
        let mut row = SyncFileRow::from_domain(&*media);
        if let Some(downloaded) = existing.boolean("Downloaded") {
            row.set("Downloaded", downloaded)?;
        }
        store.put_file(&row, true)?;
        tracing::debug!(remote_id = %media.id(), "Updated known item");
        return Ok(IndexOutcome::Updated);
    }

    while store.is_name_taken(
        media.relative_folder(),
        &media.filename(),
        profile.is_case_sensitive,
    )? {
        duplicate_number += 1;
        media.set_duplicate_number(duplicate_number);
    }
    store.put_file(&SyncFileRow::from_domain(&*media), false)?;
    tracing::debug!(
        remote_id = %media.id(),
        path = %media.relative_folder(),
        name = %media.filename(),
        "Indexed new item"
    );
    Ok(IndexOutcome::New)
}

/// Index a batch of media item descriptors.
///
/// Descriptors without an `id` are skipped with a warning.
pub fn index_descriptors<I>(
    store: &SyncStateDb,
    items: I,
    profile: &FilesystemProfile,
    options: &IndexOptions,
) -> Result<IndexReport, StateError>
where
    I: IntoIterator<Item = Value>,
{
    let mut report = IndexReport::default();
    for item in items {
        let mut media = match GooglePhotosMedia::new(item, profile, options.lowercase) {
            Ok(media) => media,
            Err(e) => {
                tracing::warn!("Skipping media item: {}", e);
                report.skipped += 1;
                continue;
            }
        };
        media.set_path_by_date(&options.folder_layout);
        media.fit_under(&options.sync_root);

        match index_media(store, &mut media, profile)? {
            IndexOutcome::New => report.new += 1,
            IndexOutcome::Updated => report.updated += 1,
        }
        let created = media.create_date();
        if report.newest.map_or(true, |newest| created > newest) {
            report.newest = Some(created);
        }
    }
    tracing::info!(
        new = report.new,
        updated = report.updated,
        skipped = report.skipped,
        "Indexed media items"
    );
    Ok(report)
}

/// Rebuild album records and memberships from album descriptors.
///
/// Existing memberships are cleared first. Each album's date span is taken
/// from the create dates of its members that are already indexed. Returns
/// the number of albums stored.
pub fn index_albums<I>(
    store: &SyncStateDb,
    albums: I,
    profile: &FilesystemProfile,
) -> Result<u64, StateError>
where
    I: IntoIterator<Item = Value>,
{
    store.clear_album_memberships()?;
    let mut count = 0;
    for descriptor in albums {
        let mut album = match Album::from_descriptor(&descriptor, profile) {
            Ok(album) => album,
            Err(e) => {
                tracing::warn!("Skipping album: {}", e);
                continue;
            }
        };

        let members = descriptor["mediaItemIds"].as_array().map(Vec::as_slice).unwrap_or_default();
        for remote_id in members.iter().filter_map(Value::as_str) {
            let file = store.get_file_by_id(remote_id)?;
            let Some(created) = file.timestamp("CreateDate") else {
                tracing::debug!(album = %album.id, remote_id, "Album member not indexed");
                continue;
            };
            store.put_album_membership(&album.id, remote_id)?;
            album.start_date = Some(album.start_date.map_or(created, |d| d.min(created)));
            album.end_date = Some(album.end_date.map_or(created, |d| d.max(created)));
        }

        store.put_album(&AlbumRow::from_domain(&album))?;
        count += 1;
    }
    tracing::info!(albums = count, "Indexed albums");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn item(id: &str, filename: &str, created: &str) -> Value {
        json!({
            "id": id,
            "filename": filename,
            "mimeType": "image/jpeg",
            "mediaMetadata": { "creationTime": created }
        })
    }

    fn profile() -> FilesystemProfile {
        FilesystemProfile::posix_default()
    }

    #[test]
    fn test_index_media_new_then_updated() {
        let store = SyncStateDb::open_in_memory().unwrap();
        let mut media =
            GooglePhotosMedia::new(item("A", "a.jpg", "2020-01-01T00:00:00Z"), &profile(), false)
                .unwrap();
        media.set_path_by_date("%Y/%m");
        assert_eq!(index_media(&store, &mut media, &profile()).unwrap(), IndexOutcome::New);
        assert_eq!(
            index_media(&store, &mut media, &profile()).unwrap(),
            IndexOutcome::Updated
        );
        assert_eq!(store.summary().unwrap().total, 1);
    }

    #[test]
    fn test_reindex_preserves_downloaded() {
        let store = SyncStateDb::open_in_memory().unwrap();
        let items = vec![item("A", "a.jpg", "2020-01-01T00:00:00Z")];
        index_descriptors(&store, items.clone(), &profile(), &IndexOptions::default()).unwrap();
        store.set_downloaded("A", true).unwrap();

        let report =
            index_descriptors(&store, items, &profile(), &IndexOptions::default()).unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(store.get_file_by_id("A").unwrap().boolean("Downloaded"), Some(true));
    }

    #[test]
    fn test_colliding_names_get_numbered() {
        let store = SyncStateDb::open_in_memory().unwrap();
        let items = vec![
            item("A", "IMG_0001.jpg", "2020-01-01T00:00:00Z"),
            item("B", "IMG_0001.jpg", "2020-01-02T00:00:00Z"),
            item("C", "IMG_0001 (1).jpg", "2020-01-03T00:00:00Z"),
            item("D", "IMG_0001.jpg", "2020-02-01T00:00:00Z"),
        ];
        let report =
            index_descriptors(&store, items.clone(), &profile(), &IndexOptions::default())
                .unwrap();
        assert_eq!(report.new, 4);

        let name = |id| {
            let row = store.get_file_by_id(id).unwrap();
            format!(
                "{}/{}",
                row.text("Path").unwrap(),
                row.text("FileName").unwrap()
            )
        };
        assert_eq!(name("A"), "2020/01/IMG_0001.jpg");
        assert_eq!(name("B"), "2020/01/IMG_0001 (1).jpg");
        assert_eq!(name("C"), "2020/01/IMG_0001 (2).jpg");
        assert_eq!(name("D"), "2020/02/IMG_0001.jpg");

        // a rerun assigns the same names
        let report =
            index_descriptors(&store, items, &profile(), &IndexOptions::default()).unwrap();
        assert_eq!(report.updated, 4);
        assert_eq!(name("B"), "2020/01/IMG_0001 (1).jpg");
        assert_eq!(name("C"), "2020/01/IMG_0001 (2).jpg");
    }

    fn local_name(store: &SyncStateDb, id: &str) -> String {
        let row = store.get_file_by_id(id).unwrap();
        format!("{}/{}", row.text("Path").unwrap(), row.text("FileName").unwrap())
    }

    #[test]
    fn test_names_differing_in_case_on_case_insensitive_fs() {
        let items = vec![
            item("A", "IMG_0001.JPG", "2020-01-01T00:00:00Z"),
            item("B", "img_0001.jpg", "2020-01-02T00:00:00Z"),
        ];

        let insensitive = FilesystemProfile {
            is_case_sensitive: false,
            ..profile()
        };
        let store = SyncStateDb::open_in_memory().unwrap();
        index_descriptors(&store, items.clone(), &insensitive, &IndexOptions::default())
            .unwrap();
        let a = local_name(&store, "A");
        let b = local_name(&store, "B");
        assert_eq!(a, "2020/01/IMG_0001.JPG");
        assert_eq!(b, "2020/01/img_0001 (1).jpg");
        assert_ne!(a.to_lowercase(), b.to_lowercase());

        // stable on rerun
        index_descriptors(&store, items.clone(), &insensitive, &IndexOptions::default())
            .unwrap();
        assert_eq!(local_name(&store, "B"), b);

        let store = SyncStateDb::open_in_memory().unwrap();
        index_descriptors(&store, items, &profile(), &IndexOptions::default()).unwrap();
        assert_eq!(local_name(&store, "B"), "2020/01/img_0001.jpg");
    }

    #[test]
    fn test_shortened_names_stay_distinct() {
        let short = FilesystemProfile {
            max_name_length: 20,
            ..profile()
        };
        let items = vec![
            item("A", "holiday_in_the_mountains_1.jpg", "2020-01-01T00:00:00Z"),
            item("B", "holiday_in_the_mountains_2.jpg", "2020-01-02T00:00:00Z"),
            item("C", "holiday_in_the_mountains_2.jpg", "2020-01-03T00:00:00Z"),
        ];
        let store = SyncStateDb::open_in_memory().unwrap();
        index_descriptors(&store, items.clone(), &short, &IndexOptions::default()).unwrap();

        let names: Vec<String> = ["A", "B", "C"]
            .iter()
            .map(|id| local_name(&store, id))
            .collect();
        assert_eq!(names[0], "2020/01/holiday_in_the_m.jpg");
        assert_eq!(names[1], "2020/01/holiday_in_t (1).jpg");
        assert_eq!(names[2], "2020/01/holiday_in_t (2).jpg");
        for name in &names {
            assert!(name.rsplit('/').next().unwrap().len() <= 20);
        }

        let report = index_descriptors(&store, items, &short, &IndexOptions::default()).unwrap();
        assert_eq!(report.updated, 3);
        let again: Vec<String> = ["A", "B", "C"]
            .iter()
            .map(|id| local_name(&store, id))
            .collect();
        assert_eq!(again, names);
    }

    #[test]
    fn test_names_fit_path_limit_under_sync_root() {
        let limited = FilesystemProfile {
            max_path_length: 40,
            ..profile()
        };
        let options = IndexOptions {
            folder_layout: "a_rather_long_folder/%Y/%m".to_string(),
            sync_root: PathBuf::from("/s"),
            ..IndexOptions::default()
        };
        let store = SyncStateDb::open_in_memory().unwrap();
        index_descriptors(
            &store,
            vec![
                item("A", "holiday_in_the_mountains.jpg", "2020-01-01T00:00:00Z"),
                item("B", "holiday_in_the_mountains.jpg", "2020-01-02T00:00:00Z"),
            ],
            &limited,
            &options,
        )
        .unwrap();

        for id in ["A", "B"] {
            let full = options.sync_root.join(local_name(&store, id));
            assert!(full.as_os_str().len() <= 40, "{}", full.display());
        }
        assert_eq!(local_name(&store, "A"), "a_rather_long_folder/2020/01/holi.jpg");
        assert_ne!(local_name(&store, "A"), local_name(&store, "B"));
    }

    #[test]
    fn test_bad_descriptors_skipped() {
        let store = SyncStateDb::open_in_memory().unwrap();
        let items = vec![
            json!({ "filename": "no_id.jpg" }),
            item("A", "a.jpg", "2021-05-05T00:00:00Z"),
            item("B", "b.jpg", "2021-03-03T00:00:00Z"),
        ];
        let report =
            index_descriptors(&store, items, &profile(), &IndexOptions::default()).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.new, 2);
        assert_eq!(
            report.newest,
            Some(Utc.with_ymd_and_hms(2021, 5, 5, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_layout_and_lowercase_options() {
        let store = SyncStateDb::open_in_memory().unwrap();
        let options = IndexOptions {
            folder_layout: "none".to_string(),
            lowercase: true,
            ..IndexOptions::default()
        };
        index_descriptors(
            &store,
            vec![item("A", "IMG_9.JPG", "2020-01-01T00:00:00Z")],
            &profile(),
            &options,
        )
        .unwrap();
        assert!(!store.get_file_by_path("", "img_9.jpg").unwrap().is_empty());
    }

    #[test]
    fn test_index_albums() {
        let store = SyncStateDb::open_in_memory().unwrap();
        index_descriptors(
            &store,
            vec![
                item("p1", "a.jpg", "2020-07-01T00:00:00Z"),
                item("p2", "b.jpg", "2020-08-15T00:00:00Z"),
            ],
            &profile(),
            &IndexOptions::default(),
        )
        .unwrap();

        let albums = vec![
            json!({
                "id": "alb",
                "title": "Summer",
                "mediaItemsCount": "3",
                "mediaItemIds": ["p1", "p2", "unknown"]
            }),
            json!({ "title": "no id" }),
        ];
        assert_eq!(index_albums(&store, albums, &profile()).unwrap(), 1);

        let album = store.get_album("alb").unwrap().to_domain().unwrap();
        assert_eq!(album.name, "Summer");
        assert_eq!(album.size, 3);
        assert_eq!(
            album.start_date,
            Some(Utc.with_ymd_and_hms(2020, 7, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            album.end_date,
            Some(Utc.with_ymd_and_hms(2020, 8, 15, 0, 0, 0).unwrap())
        );

        let entries: Vec<_> = store
            .list_album_files("%")
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].path, "2020/08");
        assert_eq!(entries[1].album_end_date, album.end_date);
    }

    #[test]
    fn test_library_export_parse() {
        let export = LibraryExport::from_json(
            r#"{"mediaItems": [{"id": "a"}], "nextPageToken": "x"}"#,
        )
        .unwrap();
        assert_eq!(export.media_items.len(), 1);
        assert!(export.albums.is_empty());
        assert!(matches!(
            LibraryExport::from_json("not json"),
            Err(MediaError::Json(_))
        ));
    }
}
