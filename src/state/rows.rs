//! The persisted tables, declared as [`RowSchema`]s, and their conversion
//! to and from the media model.

use std::sync::OnceLock;

use super::row::{Column, ColumnType, DomainRow, FieldValue, Row, RowSchema, SqlFragments};
use crate::dates::minimum_date;
use crate::media::{Album, DatabaseMedia, Media};

/// `SyncFiles`: one record per remote media item.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncFileSchema;

pub type SyncFileRow = Row<SyncFileSchema>;

impl RowSchema for SyncFileSchema {
    const TABLE: &'static str = "SyncFiles";
    const COLUMNS: &'static [Column] = &[
        Column::key("RemoteId", ColumnType::Text),
        Column::new("Url", ColumnType::Text),
        Column::new("Path", ColumnType::Text),
        Column::new("FileName", ColumnType::Text),
        Column::new("OrigFileName", ColumnType::Text),
        Column::new("DuplicateNo", ColumnType::Integer),
        Column::new("FileSize", ColumnType::Integer),
        Column::new("MimeType", ColumnType::Text),
        Column::new("Description", ColumnType::Text),
        Column::new("CameraModel", ColumnType::Text),
        Column::new("ModifyDate", ColumnType::Timestamp),
        Column::new("CreateDate", ColumnType::Timestamp),
        Column::new("SyncDate", ColumnType::Timestamp),
        Column::new("Downloaded", ColumnType::Boolean),
    ];

    fn fragments() -> &'static SqlFragments {
        static FRAGMENTS: OnceLock<SqlFragments> = OnceLock::new();
        FRAGMENTS.get_or_init(|| SqlFragments::derive(Self::COLUMNS))
    }
}

impl DomainRow for SyncFileSchema {
    type Domain = DatabaseMedia;
    type Source = dyn Media;

    fn to_domain(row: &SyncFileRow) -> DatabaseMedia {
        let text = |name| row.text(name).unwrap_or_default().to_string();
        let date = |name| row.timestamp(name).unwrap_or_else(minimum_date);
        DatabaseMedia {
            remote_id: text("RemoteId"),
            url: row.text("Url").map(str::to_string),
            relative_folder: text("Path"),
            file_name: text("FileName"),
            orig_name: text("OrigFileName"),
            duplicate_number: row
                .integer("DuplicateNo")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0),
            size: row
                .integer("FileSize")
                .and_then(|n| u64::try_from(n).ok())
                .unwrap_or(0),
            mime_type: row.text("MimeType").map(str::to_string),
            description: text("Description"),
            camera_model: row.text("CameraModel").map(str::to_string),
            modify_date: date("ModifyDate"),
            create_date: date("CreateDate"),
            sync_date: date("SyncDate"),
            downloaded: row.boolean("Downloaded").unwrap_or(false),
        }
    }

    fn from_domain(media: &dyn Media) -> SyncFileRow {
        Row::from_values(vec![
            FieldValue::text(media.id()),
            FieldValue::opt_text(media.url()),
            FieldValue::text(media.relative_folder()),
            FieldValue::text(media.filename()),
            FieldValue::text(media.orig_name()),
            FieldValue::Integer(i64::from(media.duplicate_number())),
            FieldValue::Integer(i64::try_from(media.size()).unwrap_or(i64::MAX)),
            FieldValue::opt_text(media.mime_type()),
            FieldValue::text(media.description()),
            FieldValue::opt_text(media.camera_model()),
            FieldValue::Timestamp(media.modify_date()),
            FieldValue::Timestamp(media.create_date()),
            FieldValue::Timestamp(media.sync_date()),
            FieldValue::Boolean(media.downloaded()),
        ])
    }
}

/// `Albums`: one record per remote album.
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumSchema;

pub type AlbumRow = Row<AlbumSchema>;

impl RowSchema for AlbumSchema {
    const TABLE: &'static str = "Albums";
    const COLUMNS: &'static [Column] = &[
        Column::key("AlbumId", ColumnType::Text),
        Column::new("AlbumName", ColumnType::Text),
        Column::new("Size", ColumnType::Integer),
        Column::new("StartDate", ColumnType::Timestamp),
        Column::new("EndDate", ColumnType::Timestamp),
        Column::new("SyncDate", ColumnType::Timestamp),
    ];

    fn fragments() -> &'static SqlFragments {
        static FRAGMENTS: OnceLock<SqlFragments> = OnceLock::new();
        FRAGMENTS.get_or_init(|| SqlFragments::derive(Self::COLUMNS))
    }
}

impl DomainRow for AlbumSchema {
    type Domain = Album;
    type Source = Album;

    fn to_domain(row: &AlbumRow) -> Album {
        Album {
            id: row.text("AlbumId").unwrap_or_default().to_string(),
            name: row.text("AlbumName").unwrap_or_default().to_string(),
            size: row
                .integer("Size")
                .and_then(|n| u64::try_from(n).ok())
                .unwrap_or(0),
            start_date: row.timestamp("StartDate"),
            end_date: row.timestamp("EndDate"),
            sync_date: row.timestamp("SyncDate"),
        }
    }

    fn from_domain(album: &Album) -> AlbumRow {
        let date = |d: Option<_>| d.map(FieldValue::Timestamp).unwrap_or(FieldValue::Null);
        Row::from_values(vec![
            FieldValue::text(album.id.as_str()),
            FieldValue::text(album.name.as_str()),
            FieldValue::Integer(i64::try_from(album.size).unwrap_or(i64::MAX)),
            date(album.start_date),
            date(album.end_date),
            date(album.sync_date),
        ])
    }
}
