//! Forward-only paged scans.
//!
//! A scan re-runs its query once per page, resuming after the last table
//! rowid it returned. No statement stays open between pages, so point reads
//! and writes on the same connection can be interleaved with iteration
//! without disturbing the scan position.

use std::collections::VecDeque;

use rusqlite::{Connection, ToSql};

use super::error::StateError;
use super::row::FieldValue;

/// Rows fetched per page.
pub const BLOCK_SIZE: usize = 10_000;

type RowMapper<T> = fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>;

/// A lazy, finite sequence of query results fetched in bounded pages.
///
/// The query must select the scanned table's rowid as `ScanKey`, restrict
/// to `rowid > :after`, order by rowid and end in `LIMIT :limit`.
pub struct PagedScan<'c, T> {
    conn: &'c Connection,
    sql: String,
    params: Vec<(&'static str, FieldValue)>,
    map: RowMapper<T>,
    page_size: usize,
    last_key: i64,
    page: VecDeque<T>,
    done: bool,
}

impl<'c, T> PagedScan<'c, T> {
    pub(crate) fn new(
        conn: &'c Connection,
        sql: String,
        params: Vec<(&'static str, FieldValue)>,
        page_size: usize,
        map: RowMapper<T>,
    ) -> Self {
        Self {
            conn,
            sql,
            params,
            map,
            page_size: page_size.max(1),
            last_key: 0,
            page: VecDeque::new(),
            done: false,
        }
    }

    fn fetch_page(&mut self) -> Result<(), StateError> {
        let conn = self.conn;
        let map = self.map;
        let after = self.last_key;
        let limit = i64::try_from(self.page_size).unwrap_or(i64::MAX);

        let mut bound: Vec<(&str, &dyn ToSql)> = self
            .params
            .iter()
            .map(|(name, value)| (*name, value as &dyn ToSql))
            .collect();
        bound.push((":after", &after));
        bound.push((":limit", &limit));

        let mut stmt = conn.prepare_cached(&self.sql)?;
        let fetched = stmt
            .query_map(bound.as_slice(), |row| {
                Ok((row.get::<_, i64>("ScanKey")?, map(row)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tracing::trace!(rows = fetched.len(), after, "Fetched scan page");
        if fetched.len() < self.page_size {
            self.done = true;
        }
        for (key, item) in fetched {
            self.last_key = key;
            self.page.push_back(item);
        }
        Ok(())
    }
}

impl<T> Iterator for PagedScan<'_, T> {
    type Item = Result<T, StateError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.page.is_empty() && !self.done {
            if let Err(e) = self.fetch_page() {
                self.done = true;
                return Some(Err(e));
            }
        }
        self.page.pop_front().map(Ok)
    }
}

impl<T> std::fmt::Debug for PagedScan<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagedScan")
            .field("sql", &self.sql)
            .field("last_key", &self.last_key)
            .field("buffered", &self.page.len())
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}
