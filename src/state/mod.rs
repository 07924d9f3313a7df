//! Persistent sync state.
//!
//! An SQLite index of every remote media item seen, the local name chosen
//! for it, its download status and its album memberships. It enables:
//! - Deterministic duplicate numbering for colliding file names
//! - Incremental re-index from a persisted watermark date
//! - Paged searches over large libraries
//! - Album folder materialization

pub mod db;
pub mod error;
pub mod row;
pub mod rows;
pub mod scan;
pub mod schema;
pub mod types;

pub use db::{SyncStateDb, DB_FILE_NAME};
pub use error::StateError;
pub use row::{Column, ColumnType, DomainRow, FieldValue, Row, RowSchema, SqlFragments};
pub use rows::{AlbumRow, AlbumSchema, SyncFileRow, SyncFileSchema};
pub use scan::{PagedScan, BLOCK_SIZE};
pub use types::{AlbumFileEntry, IndexSummary};
