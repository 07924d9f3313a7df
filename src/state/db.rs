//! SQLite implementation of the sync state store.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension};

use super::error::StateError;
use super::row::{DomainRow, FieldValue, Row, RowSchema};
use super::rows::{AlbumRow, AlbumSchema, SyncFileRow, SyncFileSchema};
use super::scan::{PagedScan, BLOCK_SIZE};
use super::schema;
use super::types::{AlbumFileEntry, IndexSummary};
use crate::dates::{format_date, parse_date};
use crate::media::DatabaseMedia;

/// Name of the store file inside the sync root.
pub const DB_FILE_NAME: &str = "gphotos.sqlite";

/// The persistent index of remote items, albums and download state.
///
/// Owns a single connection and assumes a single, sequential writer. Writes
/// run inside an implicit transaction that is committed by [`persist`],
/// [`close`], or when the store is dropped outside of a panic. Anything
/// written after the last commit is lost if the process dies.
///
/// [`persist`]: SyncStateDb::persist
/// [`close`]: SyncStateDb::close
pub struct SyncStateDb {
    conn: Connection,
    /// Path to the database file (for error messages).
    path: PathBuf,
    block_size: usize,
}

impl std::fmt::Debug for SyncStateDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncStateDb")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SyncStateDb {
    /// Open or create the store in `root_folder`.
    ///
    /// A missing file, or `reset_index`, gets a fresh schema. Otherwise the
    /// stored schema version is checked: newer is refused, older is archived
    /// to `gphotos.sqlite.previous` and replaced by an empty store.
    pub fn open(root_folder: &Path, reset_index: bool) -> Result<Self, StateError> {
        let path = root_folder.join(DB_FILE_NAME);
        let is_new = !path.exists();

        let conn = connect(&path)?;
        let conn = if is_new || reset_index {
            if reset_index && !is_new {
                tracing::info!(path = %path.display(), "Resetting index");
            }
            schema::create(&conn)?;
            conn
        } else {
            schema::check_version(conn, &path, connect)?
        };
        conn.execute_batch("BEGIN")?;
        tracing::debug!(path = %path.display(), "Opened sync state database");

        Ok(Self {
            conn,
            path,
            block_size: BLOCK_SIZE,
        })
    }

    /// Open a fresh in-memory store.
    pub fn open_in_memory() -> Result<Self, StateError> {
        let conn = Connection::open_in_memory().map_err(|e| StateError::Open {
            path: PathBuf::from(":memory:"),
            source: e,
        })?;
        schema::create(&conn)?;
        conn.execute_batch("BEGIN")?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
            block_size: BLOCK_SIZE,
        })
    }

    /// Get the path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Commit every pending write and start a new implicit transaction.
    pub fn persist(&self) -> Result<(), StateError> {
        tracing::info!("Saving Database ...");
        self.commit()?;
        self.conn.execute_batch("BEGIN")?;
        tracing::info!("Database Saved.");
        Ok(())
    }

    /// Commit pending writes and release the connection.
    pub fn close(self) -> Result<(), StateError> {
        self.commit()
    }

    fn commit(&self) -> Result<(), StateError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    // ── Watermark ──

    /// Record the incremental index watermark.
    pub fn set_scan_date(&self, date: DateTime<Utc>) -> Result<(), StateError> {
        self.conn.execute(
            "UPDATE Globals SET LastIndex = ?1 WHERE Id = 1",
            [format_date(&date)],
        )?;
        Ok(())
    }

    /// The incremental index watermark, or `None` before the first index.
    pub fn get_scan_date(&self) -> Result<Option<DateTime<Utc>>, StateError> {
        let last: Option<String> = self
            .conn
            .query_row("SELECT LastIndex FROM Globals WHERE Id = 1", [], |row| {
                row.get::<_, Option<String>>(0)
            })
            .optional()?
            .flatten();
        Ok(last.as_deref().and_then(parse_date))
    }

    // ── Files ──

    /// Stream the files whose RemoteId matches `remote_id_pattern` (a SQL
    /// `LIKE` pattern, `%` for all).
    ///
    /// With date bounds, a file matches when its ModifyDate or its
    /// CreateDate lies within `[start, end]`; either bound may be open.
    /// Results arrive in insertion order, one bounded page at a time.
    pub fn search_files(
        &self,
        remote_id_pattern: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        skip_downloaded: bool,
    ) -> PagedScan<'_, DatabaseMedia> {
        let mut params = vec![(":pattern", FieldValue::text(remote_id_pattern))];
        let mut clauses = String::new();

        if start.is_some() || end.is_some() {
            let within = |column: &str| {
                let mut bounds = Vec::new();
                if start.is_some() {
                    bounds.push(format!("{} >= :start", column));
                }
                if end.is_some() {
                    bounds.push(format!("{} <= :end", column));
                }
                format!("({})", bounds.join(" AND "))
            };
            clauses.push_str(&format!(
                " AND ({} OR {})",
                within("ModifyDate"),
                within("CreateDate")
            ));
        }
        if let Some(start) = start {
            params.push((":start", FieldValue::Timestamp(start)));
        }
        if let Some(end) = end {
            params.push((":end", FieldValue::Timestamp(end)));
        }
        if skip_downloaded {
            clauses.push_str(" AND Downloaded = 0");
        }

        let sql = format!(
            "SELECT rowid AS ScanKey, {} FROM SyncFiles \
             WHERE RemoteId LIKE :pattern{} AND rowid > :after \
             ORDER BY rowid LIMIT :limit",
            SyncFileSchema::column_list(),
            clauses
        );
        PagedScan::new(&self.conn, sql, params, self.block_size, |row| {
            Ok(SyncFileSchema::to_domain(&SyncFileRow::from_record(Some(row))?))
        })
    }

    /// Look up a file by folder and final file name. Empty when absent.
    pub fn get_file_by_path(&self, folder: &str, name: &str) -> Result<SyncFileRow, StateError> {
        self.query_one(
            &format!(
                "SELECT {} FROM SyncFiles WHERE Path = ?1 AND FileName = ?2",
                SyncFileSchema::column_list()
            ),
            [folder, name],
        )
    }

    /// Look up a file by RemoteId. Empty when absent.
    pub fn get_file_by_id(&self, remote_id: &str) -> Result<SyncFileRow, StateError> {
        self.query_one(
            &format!(
                "SELECT {} FROM SyncFiles WHERE RemoteId = ?1",
                SyncFileSchema::column_list()
            ),
            [remote_id],
        )
    }

    /// Insert a file record, or update the existing one with the same
    /// RemoteId when `is_update` is set. Returns the number of rows written.
    ///
    /// A constraint violation (e.g. inserting a RemoteId twice) is logged
    /// with the full row and returned as [`StateError::Constraint`].
    pub fn put_file(&self, row: &SyncFileRow, is_update: bool) -> Result<usize, StateError> {
        let sql = if is_update {
            format!(
                "UPDATE SyncFiles SET {} WHERE RemoteId = :RemoteId",
                SyncFileSchema::update_assignments()
            )
        } else {
            format!(
                "INSERT INTO SyncFiles ({}) VALUES ({})",
                SyncFileSchema::column_list(),
                SyncFileSchema::parameter_placeholders()
            )
        };

        let mut stmt = self.conn.prepare_cached(&sql)?;
        match stmt.execute(row.named_params().as_slice()) {
            Ok(n) => Ok(n),
            Err(e) if is_constraint_violation(&e) => {
                let fields = row.to_dict();
                tracing::error!(row = ?fields, "SQL constraint issue");
                Err(StateError::Constraint {
                    row: format!("{:?}", fields),
                    source: e,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Pick the duplicate number for a remote item named `name` in `path`.
    ///
    /// A known RemoteId keeps the number it was given before, and its
    /// existing row is returned with it. A new item gets one more than the
    /// highest number already used for `(path, name)`, or 0 if the name is
    /// free; the returned row is then empty.
    pub fn resolve_duplicate(
        &self,
        name: &str,
        path: &str,
        remote_id: &str,
    ) -> Result<(u32, SyncFileRow), StateError> {
        let existing = self.get_file_by_id(remote_id)?;
        if !existing.is_empty() {
            let number = existing
                .integer("DuplicateNo")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0);
            return Ok((number, existing));
        }

        let max: Option<i64> = self
            .conn
            .prepare_cached(
                "SELECT MAX(DuplicateNo) FROM SyncFiles WHERE Path = ?1 AND OrigFileName = ?2",
            )?
            .query_row([path, name], |row| row.get(0))?;
        let number = match max {
            Some(n) => u32::try_from(n + 1).unwrap_or(u32::MAX),
            None => 0,
        };
        Ok((number, Row::empty()))
    }

    /// Whether some record already uses `file_name` in `folder`.
    ///
    /// With `case_sensitive` false the comparison ignores ASCII case, as a
    /// case-insensitive filesystem would.
    pub fn is_name_taken(
        &self,
        folder: &str,
        file_name: &str,
        case_sensitive: bool,
    ) -> Result<bool, StateError> {
        let sql = if case_sensitive {
            "SELECT EXISTS(SELECT 1 FROM SyncFiles WHERE Path = ?1 AND FileName = ?2)"
        } else {
            "SELECT EXISTS(SELECT 1 FROM SyncFiles \
             WHERE Path = ?1 COLLATE NOCASE AND FileName = ?2 COLLATE NOCASE)"
        };
        let taken: bool = self
            .conn
            .prepare_cached(sql)?
            .query_row([folder, file_name], |row| row.get(0))?;
        Ok(taken)
    }

    /// Set or clear the Downloaded flag of one file.
    pub fn set_downloaded(&self, remote_id: &str, downloaded: bool) -> Result<usize, StateError> {
        let n = self.conn.execute(
            "UPDATE SyncFiles SET Downloaded = ?1 WHERE RemoteId = ?2",
            rusqlite::params![downloaded, remote_id],
        )?;
        if n == 0 {
            tracing::warn!(remote_id, "No such file to mark");
        }
        Ok(n)
    }

    /// Number of files with the given Downloaded flag.
    pub fn count_by_downloaded(&self, downloaded: bool) -> Result<u64, StateError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM SyncFiles WHERE Downloaded = ?1",
            [downloaded],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ── Albums ──

    /// Look up an album by id. Empty when absent.
    pub fn get_album(&self, album_id: &str) -> Result<AlbumRow, StateError> {
        self.query_one(
            &format!(
                "SELECT {} FROM Albums WHERE AlbumId = ?1",
                AlbumSchema::column_list()
            ),
            [album_id],
        )
    }

    /// Insert an album, replacing any existing record with the same id.
    pub fn put_album(&self, row: &AlbumRow) -> Result<(), StateError> {
        let sql = format!(
            "INSERT OR REPLACE INTO Albums ({}) VALUES ({})",
            AlbumSchema::column_list(),
            AlbumSchema::parameter_placeholders()
        );
        self.conn
            .prepare_cached(&sql)?
            .execute(row.named_params().as_slice())?;
        Ok(())
    }

    /// Record that `remote_id` belongs to `album_id`. Idempotent.
    pub fn put_album_membership(&self, album_id: &str, remote_id: &str) -> Result<(), StateError> {
        self.conn
            .prepare_cached("INSERT OR REPLACE INTO AlbumFiles (AlbumRec, DriveRec) VALUES (?1, ?2)")?
            .execute([album_id, remote_id])?;
        Ok(())
    }

    /// Remove every album membership, ahead of a full membership rebuild.
    pub fn clear_album_memberships(&self) -> Result<usize, StateError> {
        let n = self.conn.execute("DELETE FROM AlbumFiles", [])?;
        tracing::debug!(removed = n, "Cleared album memberships");
        Ok(n)
    }

    /// Stream `(path, file name, album name, album end date)` for every
    /// member of the albums matching `album_id_pattern` (`%` for all).
    pub fn list_album_files(&self, album_id_pattern: &str) -> PagedScan<'_, AlbumFileEntry> {
        let sql = "SELECT AlbumFiles.rowid AS ScanKey, SyncFiles.Path, SyncFiles.FileName, \
                   Albums.AlbumName, Albums.EndDate FROM AlbumFiles \
                   INNER JOIN SyncFiles ON AlbumFiles.DriveRec = SyncFiles.RemoteId \
                   INNER JOIN Albums ON AlbumFiles.AlbumRec = Albums.AlbumId \
                   WHERE Albums.AlbumId LIKE :pattern AND AlbumFiles.rowid > :after \
                   ORDER BY AlbumFiles.rowid LIMIT :limit";
        PagedScan::new(
            &self.conn,
            sql.to_string(),
            vec![(":pattern", FieldValue::text(album_id_pattern))],
            self.block_size,
            |row| {
                let end_date: Option<String> = row.get("EndDate")?;
                Ok(AlbumFileEntry {
                    path: row.get::<_, Option<String>>("Path")?.unwrap_or_default(),
                    file_name: row.get::<_, Option<String>>("FileName")?.unwrap_or_default(),
                    album_name: row.get::<_, Option<String>>("AlbumName")?.unwrap_or_default(),
                    album_end_date: end_date.as_deref().and_then(parse_date),
                })
            },
        )
    }

    // ── Reporting ──

    pub fn summary(&self) -> Result<IndexSummary, StateError> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM SyncFiles", [], |row| row.get(0))?;
        let albums: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM Albums", [], |row| row.get(0))?;
        let downloaded = self.count_by_downloaded(true)?;

        Ok(IndexSummary {
            total: total as u64,
            downloaded,
            pending: (total as u64).saturating_sub(downloaded),
            albums: albums as u64,
            last_index: self.get_scan_date()?,
        })
    }

    fn query_one<S: RowSchema, P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Row<S>, StateError> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let mut rows = stmt.query(params)?;
        let row = Row::from_record(rows.next()?)?;
        Ok(row)
    }
}

impl Drop for SyncStateDb {
    fn drop(&mut self) {
        if std::thread::panicking() || self.conn.is_autocommit() {
            return;
        }
        if let Err(e) = self.conn.execute_batch("COMMIT") {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to commit on close");
        }
    }
}

fn connect(path: &Path) -> Result<Connection, StateError> {
    let conn = Connection::open(path).map_err(|e| StateError::Open {
        path: path.to_path_buf(),
        source: e,
    })?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(conn)
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(f, _) if f.code == ErrorCode::ConstraintViolation)
}
