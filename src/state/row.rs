//! Schema-described rows.
//!
//! A table is declared once as a [`RowSchema`]: an ordered list of
//! [`Column`]s with a semantic type and an immutability flag. The SQL
//! fragments every statement needs (column list, named placeholders,
//! update assignments) are derived from that list on first use and cached.
//! [`Row<S>`] holds one value per declared column and is either fully
//! empty (the "not found" sentinel) or fully populated.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::ToSql;

use super::error::StateError;
use crate::dates::{format_date, parse_date};

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Boolean,
    /// Persisted as sortable text, see [`crate::dates::format_date`].
    Timestamp,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
        }
    }

    fn accepts(&self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (_, FieldValue::Null)
                | (Self::Text, FieldValue::Text(_))
                | (Self::Integer, FieldValue::Integer(_))
                | (Self::Boolean, FieldValue::Boolean(_))
                | (Self::Timestamp, FieldValue::Timestamp(_))
        )
    }
}

/// One declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
    /// Excluded from UPDATE assignments (primary keys).
    pub immutable: bool,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnType) -> Self {
        Self {
            name,
            kind,
            immutable: false,
        }
    }

    pub const fn key(name: &'static str, kind: ColumnType) -> Self {
        Self {
            name,
            kind,
            immutable: true,
        }
    }
}

/// SQL text derived from a column list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFragments {
    /// `A,B,C` for `SELECT {}` / `INSERT INTO t ({})`.
    pub columns: String,
    /// `:A,:B,:C` for `VALUES ({})`.
    pub params: String,
    /// `B=:B,C=:C` for `UPDATE t SET {}`, immutable columns left out.
    pub update: String,
    param_names: Vec<String>,
}

impl SqlFragments {
    pub fn derive(columns: &[Column]) -> Self {
        let param_names: Vec<String> = columns.iter().map(|c| format!(":{}", c.name)).collect();
        Self {
            columns: columns.iter().map(|c| c.name).collect::<Vec<_>>().join(","),
            params: param_names.join(","),
            update: columns
                .iter()
                .filter(|c| !c.immutable)
                .map(|c| format!("{0}=:{0}", c.name))
                .collect::<Vec<_>>()
                .join(","),
            param_names,
        }
    }
}

/// Declaration of a persisted table.
///
/// Implementors cache their fragments in a `static OnceLock` inside
/// [`RowSchema::fragments`].
pub trait RowSchema: Sized + 'static {
    const TABLE: &'static str;
    const COLUMNS: &'static [Column];

    fn fragments() -> &'static SqlFragments;

    fn column_list() -> &'static str {
        &Self::fragments().columns
    }

    fn parameter_placeholders() -> &'static str {
        &Self::fragments().params
    }

    fn update_assignments() -> &'static str {
        &Self::fragments().update
    }

    fn column_index(name: &str) -> Option<usize> {
        Self::COLUMNS.iter().position(|c| c.name == name)
    }
}

/// Conversion between a row variant and its domain object.
pub trait DomainRow: RowSchema {
    /// What a populated row turns into.
    type Domain;
    /// What a row can be built from.
    type Source: ?Sized;

    fn to_domain(row: &Row<Self>) -> Self::Domain;
    fn from_domain(source: &Self::Source) -> Row<Self>;
}

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
}

static NULL: FieldValue = FieldValue::Null;

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn opt_text(s: Option<impl Into<String>>) -> Self {
        s.map(|s| Self::Text(s.into())).unwrap_or(Self::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert a raw SQLite value according to the declared column type.
    /// Timestamps are parsed from their text form; other values pass through.
    fn from_sql(kind: ColumnType, value: ValueRef<'_>) -> Self {
        match (kind, value) {
            (_, ValueRef::Null) => Self::Null,
            (ColumnType::Timestamp, ValueRef::Text(bytes)) => {
                match parse_date(&String::from_utf8_lossy(bytes)) {
                    Some(date) => Self::Timestamp(date),
                    None => Self::Null,
                }
            }
            (ColumnType::Boolean, ValueRef::Integer(i)) => Self::Boolean(i != 0),
            (_, ValueRef::Integer(i)) => Self::Integer(i),
            (_, ValueRef::Real(f)) => Self::Real(f),
            (_, ValueRef::Text(bytes)) | (_, ValueRef::Blob(bytes)) => {
                Self::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Self::Integer(i) => ToSqlOutput::from(*i),
            Self::Real(f) => ToSqlOutput::from(*f),
            Self::Boolean(b) => ToSqlOutput::from(*b),
            Self::Timestamp(d) => ToSqlOutput::from(format_date(d)),
        })
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(d: DateTime<Utc>) -> Self {
        Self::Timestamp(d)
    }
}

/// One record of table `S`.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<S: RowSchema> {
    values: Vec<Option<FieldValue>>,
    empty: bool,
    _schema: PhantomData<S>,
}

impl<S: RowSchema> Row<S> {
    /// A row with no backing record: every field unset.
    pub fn empty() -> Self {
        Self {
            values: vec![None; S::COLUMNS.len()],
            empty: true,
            _schema: PhantomData,
        }
    }

    /// Build a row from a query result, or an empty row when there is none.
    ///
    /// The query must select every declared column by name.
    pub fn from_record(record: Option<&rusqlite::Row<'_>>) -> rusqlite::Result<Self> {
        let Some(record) = record else {
            return Ok(Self::empty());
        };
        let values = S::COLUMNS
            .iter()
            .map(|col| {
                record
                    .get_ref(col.name)
                    .map(|value| Some(FieldValue::from_sql(col.kind, value)))
            })
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Self {
            values,
            empty: false,
            _schema: PhantomData,
        })
    }

    /// Build a populated row from named values. Columns not mentioned are
    /// null. Fails on an unknown column or a value of the wrong type.
    pub fn make<'a, I, V>(fields: I) -> Result<Self, StateError>
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: Into<FieldValue>,
    {
        let mut row = Self {
            values: vec![Some(FieldValue::Null); S::COLUMNS.len()],
            empty: false,
            _schema: PhantomData,
        };
        for (name, value) in fields {
            row.set(name, value)?;
        }
        Ok(row)
    }

    /// Build a populated row from values given in declared column order.
    /// Missing trailing values are null.
    pub(crate) fn from_values(mut values: Vec<FieldValue>) -> Self {
        debug_assert!(values.len() <= S::COLUMNS.len());
        values.resize(S::COLUMNS.len(), FieldValue::Null);
        Self {
            values: values.into_iter().map(Some).collect(),
            empty: false,
            _schema: PhantomData,
        }
    }

    /// Set one field. Setting a field on an empty row populates it, with
    /// every other field null.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<(), StateError> {
        let idx = S::column_index(name).ok_or_else(|| StateError::NoSuchColumn {
            table: S::TABLE,
            column: name.to_string(),
        })?;
        let column = &S::COLUMNS[idx];
        let value = value.into();
        if !column.kind.accepts(&value) {
            return Err(StateError::ColumnType {
                table: S::TABLE,
                column: column.name,
                expected: column.kind.as_str(),
            });
        }
        if self.empty {
            self.values.iter_mut().for_each(|v| *v = Some(FieldValue::Null));
            self.empty = false;
        }
        self.values[idx] = Some(value);
        Ok(())
    }

    /// True when built without a backing record.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// The value of `name`; `None` if the row is empty or the column unknown.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        S::column_index(name).and_then(|idx| self.values[idx].as_ref())
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(FieldValue::Integer(i)) => Some(*i),
            Some(FieldValue::Boolean(b)) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(FieldValue::Boolean(b)) => Some(*b),
            Some(FieldValue::Integer(i)) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn timestamp(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.get(name) {
            Some(FieldValue::Timestamp(d)) => Some(*d),
            _ => None,
        }
    }

    /// Every field by column name. Empty for an empty row.
    pub fn to_dict(&self) -> BTreeMap<&'static str, FieldValue> {
        S::COLUMNS
            .iter()
            .zip(&self.values)
            .filter_map(|(col, value)| value.clone().map(|v| (col.name, v)))
            .collect()
    }

    /// `(":Column", value)` pairs for binding into the derived fragments.
    pub(crate) fn named_params(&self) -> Vec<(&'static str, &dyn ToSql)> {
        S::fragments()
            .param_names
            .iter()
            .zip(&self.values)
            .map(|(name, value)| {
                let value: &dyn ToSql = value.as_ref().unwrap_or(&NULL);
                (name.as_str(), value)
            })
            .collect()
    }
}

impl<S: DomainRow> Row<S> {
    /// The domain object for a populated row.
    pub fn to_domain(&self) -> Option<S::Domain> {
        if self.empty {
            None
        } else {
            Some(S::to_domain(self))
        }
    }

    pub fn from_domain(source: &S::Source) -> Self {
        S::from_domain(source)
    }
}

impl<S: RowSchema> Default for Row<S> {
    fn default() -> Self {
        Self::empty()
    }
}
