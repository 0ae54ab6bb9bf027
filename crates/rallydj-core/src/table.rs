//! Row-oriented in-memory table over JSON cells.
//!
//! Feed documents are irregular: keys come and go between records and values
//! can be scalars, lists or nested objects. A [`Table`] keeps an ordered column
//! list (first-seen order) and one `Vec<Value>` per row aligned to it. Missing
//! cells are `Value::Null`.
//!
//! The reshape operations the feeds need (explode, normalize, join, sort,
//! dedup) are explicit methods here rather than implicit library behaviour.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::ShapeError;
use crate::sort_key::compare_rows;

/// One JSON object, keyed by column name, in insertion order.
pub type Record = Map<String, Value>;

/// Build a record from `(column, value)` pairs.
pub fn record<const N: usize>(pairs: [(&str, Value); N]) -> Record {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Flatten nested objects into dotted keys (`{"team": {"bib": 1}}` becomes
/// `{"team.bib": 1}`). Lists and scalars are kept as they are.
pub fn normalize_record(record: &Record) -> Record {
    let mut out = Record::new();
    flatten_into(&mut out, "", record);
    out
}

fn flatten_into(out: &mut Record, prefix: &str, obj: &Record) {
    for (key, value) in obj {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) => flatten_into(out, &name, inner),
            other => {
                out.insert(name, other.clone());
            }
        }
    }
}

/// Split a fetched document into records.
///
/// - an array yields one record per object element (null elements are skipped)
/// - an object with a `list` array yields the records of that array
/// - any other object is a single record
/// - `null` yields nothing
pub fn document_records(doc: &Value) -> Result<Vec<Record>, ShapeError> {
    match doc {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => {
            let mut records = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Object(obj) => records.push(obj.clone()),
                    Value::Null => {}
                    other => {
                        return Err(ShapeError::malformed(
                            "<document>",
                            format!("expected an object, found {other}"),
                        ));
                    }
                }
            }
            Ok(records)
        }
        Value::Object(obj) => match obj.get("list") {
            Some(list @ Value::Array(_)) => document_records(list),
            _ => Ok(vec![obj.clone()]),
        },
        other => Err(ShapeError::malformed(
            "<document>",
            format!("expected an array or object, found {other}"),
        )),
    }
}

/// A borrowed view of one table row.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    columns: &'a [String],
    cells: &'a [Value],
}

impl<'a> RowView<'a> {
    /// Cell for `column`, or `None` when the table has no such column.
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.cells[i])
    }

    pub fn get_str(&self, column: &str) -> Option<&'a str> {
        self.get(column).and_then(Value::as_str)
    }

    /// Cell for `column`, `Value::Null` when absent.
    pub fn value(&self, column: &str) -> Value {
        self.get(column).cloned().unwrap_or(Value::Null)
    }

    pub fn cells(&self) -> &'a [Value] {
        self.cells
    }

    pub fn to_record(&self) -> Record {
        self.columns
            .iter()
            .cloned()
            .zip(self.cells.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty table with a fixed column set.
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for c in columns {
            table.ensure_column(&c.into());
        }
        table
    }

    /// Build a table from records; columns are the union of keys in first-seen order.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Record>,
    {
        let mut table = Self::default();
        for r in records {
            table.push_record(r);
        }
        table
    }

    /// Build a table from a fetched document (see [`document_records`]).
    pub fn from_document(doc: &Value) -> Result<Self, ShapeError> {
        Ok(Self::from_records(document_records(doc)?))
    }

    pub(crate) fn from_parts(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    /// Append a record, adding any columns it introduces.
    pub fn push_record(&mut self, record: Record) {
        let mut row = vec![Value::Null; self.columns.len()];
        for (key, value) in record {
            match self.column_index(&key) {
                Some(i) => row[i] = value,
                None => {
                    self.ensure_column(&key);
                    row.push(value);
                }
            }
        }
        self.rows.push(row);
    }

    fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(i) = self.column_index(name) {
            return i;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(Value::Null);
        }
        self.columns.len() - 1
    }

    // ── Shape ──

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, ShapeError> {
        self.column_index(name)
            .ok_or_else(|| ShapeError::missing(name))
    }

    // ── Access ──

    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(|cells| RowView {
            columns: &self.columns,
            cells,
        })
    }

    pub fn row(&self, index: usize) -> Option<RowView<'_>> {
        self.rows.get(index).map(|cells| RowView {
            columns: &self.columns,
            cells,
        })
    }

    /// All cells of one column, top to bottom.
    pub fn column_values(&self, name: &str) -> Result<Vec<&Value>, ShapeError> {
        let i = self.require_column(name)?;
        Ok(self.rows.iter().map(|r| &r[i]).collect())
    }

    pub fn to_records(&self) -> Vec<Record> {
        self.rows().map(|r| r.to_record()).collect()
    }

    // ── Column operations ──

    /// Set `name` to a value computed per row, replacing the column if it exists.
    pub fn add_column<F>(&mut self, name: &str, mut f: F)
    where
        F: FnMut(RowView<'_>) -> Value,
    {
        let values: Vec<Value> = self.rows().map(&mut f).collect();
        let i = self.ensure_column(name);
        for (row, v) in self.rows.iter_mut().zip(values) {
            row[i] = v;
        }
    }

    /// Remove the named columns; names the table does not have are ignored.
    pub fn drop_columns<S: AsRef<str>>(&mut self, names: &[S]) {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&i| !names.iter().any(|n| n.as_ref() == self.columns[i]))
            .collect();
        if keep.len() == self.columns.len() {
            return;
        }
        self.columns = keep.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.rows {
            *row = keep.iter().map(|&i| std::mem::take(&mut row[i])).collect();
        }
    }

    /// Project onto the named columns in the given order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table, ShapeError> {
        let indices = names
            .iter()
            .map(|n| self.require_column(n.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let columns = names.iter().map(|n| n.as_ref().to_string()).collect();
        let rows = self
            .rows
            .iter()
            .map(|r| indices.iter().map(|&i| r[i].clone()).collect())
            .collect();
        Ok(Self::from_parts(columns, rows))
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<(), ShapeError> {
        self.require_column(from)?;
        if from == to {
            return Ok(());
        }
        self.drop_columns(&[to]);
        let i = self.require_column(from)?;
        self.columns[i] = to.to_string();
        Ok(())
    }

    // ── Row operations ──

    pub fn retain_rows<F>(&mut self, mut f: F)
    where
        F: FnMut(RowView<'_>) -> bool,
    {
        let columns = &self.columns;
        self.rows.retain(|cells| f(RowView { columns, cells }));
    }

    /// Stable sort on the given key columns (see [`crate::sort_key`] for the cell order).
    pub fn sort_by<S: AsRef<str>>(&mut self, keys: &[S]) -> Result<(), ShapeError> {
        let positions = keys
            .iter()
            .map(|k| self.require_column(k.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.rows.sort_by(|a, b| compare_rows(a, b, &positions));
        Ok(())
    }

    /// Remove rows identical in every column, keeping the first occurrence.
    pub fn dedup_rows(&mut self) {
        let mut seen = HashSet::new();
        self.rows
            .retain(|row| seen.insert(serde_json::to_string(row).unwrap_or_default()));
    }

    /// Keep the first row for each distinct value of `key`.
    pub fn dedup_by(&mut self, key: &str) -> Result<(), ShapeError> {
        let i = self.require_column(key)?;
        let mut seen = HashSet::new();
        self.rows.retain(|row| seen.insert(row[i].to_string()));
        Ok(())
    }

    /// Stack tables vertically; columns are unioned in first-seen order.
    pub fn concat<I>(tables: I) -> Table
    where
        I: IntoIterator<Item = Table>,
    {
        let mut out = Table::default();
        for table in tables {
            let positions: Vec<usize> = table
                .columns
                .iter()
                .map(|c| out.ensure_column(c))
                .collect();
            let width = out.columns.len();
            for cells in table.rows {
                let mut row = vec![Value::Null; width];
                for (value, &i) in cells.into_iter().zip(&positions) {
                    row[i] = value;
                }
                out.rows.push(row);
            }
        }
        out
    }

    // ── Reshape ──

    /// Explode a list column into one row per item, the item replacing the list
    /// in that column. Null or empty lists and null items contribute no rows; a
    /// non-list cell is kept as a single item.
    pub fn explode(&self, column: &str) -> Result<Table, ShapeError> {
        let i = self.require_column(column)?;
        let mut rows = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            match &row[i] {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items.iter().filter(|v| !v.is_null()) {
                        let mut out = row.clone();
                        out[i] = item.clone();
                        rows.push(out);
                    }
                }
                _ => rows.push(row.clone()),
            }
        }
        Ok(Self::from_parts(self.columns.clone(), rows))
    }

    /// Explode a list-of-objects column into one row per nested object.
    ///
    /// Each output row holds the `carry` columns of its parent followed by the
    /// object's own keys, normalized into dotted columns. Carried values win
    /// over an object key of the same name. Null or empty lists and null items
    /// contribute no rows.
    pub fn explode_records(&self, column: &str, carry: &[&str]) -> Result<Table, ShapeError> {
        let list = self.require_column(column)?;
        let carried = carry
            .iter()
            .map(|c| self.require_column(c))
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = Table::with_columns(carry.iter().copied());
        for row in &self.rows {
            let items = match &row[list] {
                Value::Null => continue,
                Value::Array(items) => items,
                other => {
                    return Err(ShapeError::malformed(
                        column,
                        format!("expected a list, found {other}"),
                    ));
                }
            };
            for item in items {
                let obj = match item {
                    Value::Null => continue,
                    Value::Object(obj) => obj,
                    other => {
                        return Err(ShapeError::malformed(
                            column,
                            format!("expected an object, found {other}"),
                        ));
                    }
                };
                let mut rec: Record = carry
                    .iter()
                    .zip(&carried)
                    .map(|(name, &i)| (name.to_string(), row[i].clone()))
                    .collect();
                for (k, v) in normalize_record(obj) {
                    rec.entry(k).or_insert(v);
                }
                out.push_record(rec);
            }
        }
        Ok(out)
    }

    /// Normalize every row, flattening object cells into dotted columns.
    pub fn normalized(&self) -> Table {
        Table::from_records(self.rows().map(|r| normalize_record(&r.to_record())))
    }

    /// Inner join on every `(left, right)` column pair in `on` being equal.
    ///
    /// Left row order is kept; a left row matching several right rows yields one
    /// row per match. A null key cell never matches. A key column with the same
    /// name on both sides appears once; other clashing names get `_x` / `_y`
    /// suffixes.
    pub fn inner_join(&self, right: &Table, on: &[(&str, &str)]) -> Result<Table, ShapeError> {
        let left_keys = on
            .iter()
            .map(|(l, _)| self.require_column(l))
            .collect::<Result<Vec<_>, _>>()?;
        let right_keys = on
            .iter()
            .map(|(_, r)| right.require_column(r))
            .collect::<Result<Vec<_>, _>>()?;
        let merged: Vec<&str> = on.iter().filter(|(l, r)| l == r).map(|(l, _)| *l).collect();

        let mut columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                if right.has_column(c) && !merged.contains(&c.as_str()) {
                    format!("{c}_x")
                } else {
                    c.clone()
                }
            })
            .collect();
        let right_keep: Vec<usize> = (0..right.columns.len())
            .filter(|&i| !merged.contains(&right.columns[i].as_str()))
            .collect();
        for &i in &right_keep {
            let c = &right.columns[i];
            columns.push(if self.has_column(c) {
                format!("{c}_y")
            } else {
                c.clone()
            });
        }

        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (n, row) in right.rows.iter().enumerate() {
            if let Some(key) = join_key(row, &right_keys) {
                index.entry(key).or_default().push(n);
            }
        }

        let mut rows = Vec::new();
        for left in &self.rows {
            let Some(matches) = join_key(left, &left_keys).and_then(|k| index.get(&k)) else {
                continue;
            };
            for &n in matches {
                let mut row = left.clone();
                row.extend(right_keep.iter().map(|&i| right.rows[n][i].clone()));
                rows.push(row);
            }
        }
        Ok(Self::from_parts(columns, rows))
    }
}

fn join_key(row: &[Value], positions: &[usize]) -> Option<String> {
    let cells: Vec<&Value> = positions.iter().map(|&i| &row[i]).collect();
    if cells.iter().any(|c| c.is_null()) {
        return None;
    }
    serde_json::to_string(&cells).ok()
}
