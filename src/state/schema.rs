//! Database schema definition and version lifecycle.
//!
//! There are no incremental migrations: a store written by an older schema
//! is archived and recreated empty, which makes the next sync a full
//! re-index. A store written by a newer schema is refused.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension};

use super::error::StateError;

/// Current schema version. Increment when making schema changes.
pub const SCHEMA_VERSION: f64 = 5.0;

/// Suffix appended to a store file that is moved aside on version mismatch.
pub const ARCHIVE_SUFFIX: &str = ".previous";

/// Schema DDL. Dropping first makes this double as the reset script.
const SCHEMA: &str = r#"
DROP TABLE IF EXISTS Globals;
DROP TABLE IF EXISTS AlbumFiles;
DROP TABLE IF EXISTS Albums;
DROP TABLE IF EXISTS SyncFiles;

CREATE TABLE Globals (
    Id INTEGER PRIMARY KEY,
    Version REAL NOT NULL,
    LastIndex TEXT
);

CREATE TABLE SyncFiles (
    RemoteId TEXT PRIMARY KEY NOT NULL,
    Url TEXT,
    Path TEXT,
    FileName TEXT,
    OrigFileName TEXT,
    DuplicateNo INTEGER NOT NULL DEFAULT 0,
    FileSize INTEGER,
    MimeType TEXT,
    Description TEXT,
    CameraModel TEXT,
    ModifyDate TEXT,
    CreateDate TEXT,
    SyncDate TEXT,
    Downloaded INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX FileNameIdx ON SyncFiles (Path, FileName);
CREATE INDEX OrigNameIdx ON SyncFiles (Path, OrigFileName);
CREATE INDEX CreateDateIdx ON SyncFiles (CreateDate);
CREATE INDEX ModifyDateIdx ON SyncFiles (ModifyDate);
CREATE INDEX DownloadedIdx ON SyncFiles (Downloaded);

CREATE TABLE Albums (
    AlbumId TEXT PRIMARY KEY NOT NULL,
    AlbumName TEXT,
    Size INTEGER,
    StartDate TEXT,
    EndDate TEXT,
    SyncDate TEXT
);

CREATE TABLE AlbumFiles (
    AlbumRec TEXT NOT NULL,
    DriveRec TEXT NOT NULL,
    PRIMARY KEY (AlbumRec, DriveRec)
);

CREATE INDEX AlbumFilesDriveIdx ON AlbumFiles (DriveRec);
"#;

/// Create a fresh, empty schema at the current version.
pub(crate) fn create(conn: &Connection) -> Result<(), StateError> {
    conn.execute_batch(SCHEMA)?;
    conn.execute(
        "INSERT INTO Globals (Id, Version, LastIndex) VALUES (1, ?1, NULL)",
        [SCHEMA_VERSION],
    )?;
    tracing::debug!("Initialized database schema at version {}", SCHEMA_VERSION);
    Ok(())
}

/// Read the stored schema version. A store without a `Globals` row reads
/// as version 0, i.e. older than anything we write.
pub(crate) fn stored_version(conn: &Connection) -> Result<f64, StateError> {
    let has_globals: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'Globals'",
        [],
        |row| row.get(0),
    )?;
    if !has_globals {
        return Ok(0.0);
    }
    let version: Option<f64> = conn
        .query_row("SELECT Version FROM Globals WHERE Id = 1", [], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(version.unwrap_or(0.0))
}

/// Check the stored version against [`SCHEMA_VERSION`].
///
/// Newer: refuse. Older: close `conn`, rename the file to
/// `<file>.previous`, and return a connection to a freshly created store.
pub(crate) fn check_version(
    conn: Connection,
    path: &Path,
    open: impl Fn(&Path) -> Result<Connection, StateError>,
) -> Result<Connection, StateError> {
    let version = stored_version(&conn)?;
    if version > SCHEMA_VERSION {
        return Err(StateError::UnsupportedSchemaVersion {
            found: version,
            expected: SCHEMA_VERSION,
        });
    }
    if version == SCHEMA_VERSION {
        return Ok(conn);
    }

    tracing::warn!(
        found = version,
        expected = SCHEMA_VERSION,
        "Database schema out of date. Flushing index ..."
    );
    conn.close().map_err(|(_, e)| StateError::Sqlite(e))?;

    let archive = archive_path(path);
    if archive.exists() {
        std::fs::remove_file(&archive).map_err(|source| StateError::Archive {
            path: path.to_path_buf(),
            source,
        })?;
    }
    std::fs::rename(path, &archive).map_err(|source| StateError::Archive {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(archive = %archive.display(), "Archived previous database");

    let conn = open(path)?;
    create(&conn)?;
    Ok(conn)
}

/// `<file>.previous` next to the store file.
pub fn archive_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(ARCHIVE_SUFFIX);
    PathBuf::from(name)
}
