//! Locale-label merging.
//!
//! Feed rows carry their translations as an embedded list of label entries,
//! e.g. `categoryLangs: [{locale: "en", variable: "A", text: "Auto"}, ...]`.
//! [`merge_labels`] widens those lists into one column per locale and joins
//! them back onto the rows by a key column.
//!
//! The join is an inner join: a row whose key has no matching `variable` is
//! dropped from the output. Callers that need every row must check the row
//! count themselves.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde_json::Value;
use tracing::debug;

use crate::records::parse_label_entries;
use crate::{ShapeError, Table};

/// Join key used by most feeds.
pub const DEFAULT_LABEL_KEY: &str = "shortLabel";

/// Column produced by the pivot and removed after the join.
const VARIABLE: &str = "variable";

/// Label entries pivoted to one row per `variable`, one column per locale.
#[derive(Debug, Clone, Default)]
pub struct WideLabels {
    locales: Vec<String>,
    rows: HashMap<String, HashMap<String, Option<String>>>,
    order: Vec<String>,
}

impl WideLabels {
    /// Distinct locales, sorted.
    pub fn locales(&self) -> &[String] {
        &self.locales
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Text for `variable` in `locale`; `None` when either is unknown or the text is null.
    pub fn text(&self, variable: &str, locale: &str) -> Option<&str> {
        self.rows.get(variable)?.get(locale)?.as_deref()
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.rows.contains_key(variable)
    }

    /// The pivot as a table: `variable` then one column per locale.
    pub fn to_table(&self) -> Table {
        let mut columns = vec![VARIABLE.to_string()];
        columns.extend(self.locales.iter().cloned());
        let rows = self
            .order
            .iter()
            .map(|variable| {
                let mut row = vec![Value::String(variable.clone())];
                row.extend(self.locales.iter().map(|l| self.cell(variable, l)));
                row
            })
            .collect();
        Table::from_parts(columns, rows)
    }

    fn cell(&self, variable: &str, locale: &str) -> Value {
        self.text(variable, locale)
            .map(|t| Value::String(t.to_string()))
            .unwrap_or(Value::Null)
    }
}

/// Pivot the label lists of `cells` into a [`WideLabels`].
///
/// A repeated `(variable, locale)` pair is an error, even with identical text.
pub fn pivot_labels<'a, I>(cells: I, column: &str) -> Result<WideLabels, ShapeError>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut wide = WideLabels::default();
    let mut locales = BTreeSet::new();

    for cell in cells {
        for entry in parse_label_entries(cell, column)? {
            let (Some(variable), Some(locale)) = (entry.variable, entry.locale) else {
                return Err(ShapeError::malformed(
                    column,
                    "label entry without variable or locale",
                ));
            };
            let by_locale = wide.rows.entry(variable.clone()).or_insert_with(|| {
                wide.order.push(variable.clone());
                HashMap::new()
            });
            if by_locale.contains_key(&locale) {
                return Err(ShapeError::DuplicateLabelKey { variable, locale });
            }
            by_locale.insert(locale.clone(), entry.text);
            locales.insert(locale);
        }
    }

    wide.locales = locales.into_iter().collect();
    Ok(wide)
}

/// Widen the label lists in `list_column` into per-locale columns and inner-join
/// them onto `table` where `join_key == variable`.
///
/// The output keeps the parent columns (minus `list_column` and any `variable`
/// column) followed by the locale columns in sorted order. A parent column named
/// like a locale is replaced by the label column. Keys are matched by exact
/// string equality; rows with a non-string or unmatched key are excluded.
pub fn merge_labels(table: &Table, list_column: &str, join_key: &str) -> Result<Table, ShapeError> {
    let list_idx = table.require_column(list_column)?;
    let key_idx = table.require_column(join_key)?;

    let wide = pivot_labels(table.rows().map(|r| &r.cells()[list_idx]), list_column)?;

    let kept: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            *c != list_column && *c != VARIABLE && !wide.locales.iter().any(|l| l == *c)
        })
        .map(|(i, _)| i)
        .collect();

    let mut columns: Vec<String> = kept.iter().map(|&i| table.columns()[i].clone()).collect();
    columns.extend(wide.locales.iter().cloned());

    let mut rows = Vec::with_capacity(table.num_rows());
    let mut dropped = 0usize;
    for row in table.rows() {
        let cells = row.cells();
        let Some(key) = cells[key_idx].as_str().filter(|k| wide.contains(k)) else {
            dropped += 1;
            continue;
        };
        let mut out: Vec<Value> = kept.iter().map(|&i| cells[i].clone()).collect();
        out.extend(wide.locales.iter().map(|l| wide.cell(key, l)));
        rows.push(out);
    }

    if dropped > 0 {
        debug!(
            list_column,
            join_key,
            dropped,
            "rows without a matching label excluded"
        );
    }
    Ok(Table::from_parts(columns, rows))
}

/// Locale columns added by a merge, in output order.
pub fn label_columns(before: &[String], after: &Table) -> Vec<String> {
    let old: HashSet<&str> = before.iter().map(String::as_str).collect();
    after
        .columns()
        .iter()
        .filter(|c| !old.contains(c.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn categories() -> Table {
        Table::from_document(&json!([
            {
                "reference": 2, "shortLabel": "M",
                "categoryLangs": [
                    {"locale": "en", "variable": "M", "text": "Moto"},
                    {"locale": "fr", "variable": "M", "text": "Moto FR"},
                ],
            },
            {
                "reference": 1, "shortLabel": "A",
                "categoryLangs": [
                    {"locale": "fr", "variable": "A", "text": "Auto FR"},
                    {"locale": "en", "variable": "A", "text": "Auto"},
                    {"locale": "es", "variable": "A", "text": "Coche"},
                ],
            },
        ]))
        .unwrap()
    }

    #[test]
    fn every_key_matched_keeps_every_row() {
        let t = categories();
        let merged = merge_labels(&t, "categoryLangs", DEFAULT_LABEL_KEY).unwrap();
        assert_eq!(merged.num_rows(), t.num_rows());
        assert_eq!(merged.columns(), ["reference", "shortLabel", "en", "es", "fr"]);
        let first = merged.row(0).unwrap();
        assert_eq!(first.value("en"), json!("Moto"));
        assert_eq!(first.value("es"), Value::Null);
        assert_eq!(merged.row(1).unwrap().value("es"), json!("Coche"));
    }

    #[test]
    fn unmatched_keys_are_excluded() {
        let t = Table::from_document(&json!([
            {"shortLabel": "A", "langs": [{"locale": "en", "variable": "A", "text": "Auto"}]},
            {"shortLabel": "Q", "langs": []},
            {"shortLabel": "Z", "langs": null},
            {"shortLabel": 7, "langs": null},
        ]))
        .unwrap();
        let merged = merge_labels(&t, "langs", "shortLabel").unwrap();
        assert_eq!(merged.num_rows(), t.num_rows() - 3);
        assert_eq!(merged.row(0).unwrap().value("shortLabel"), json!("A"));
    }

    #[test]
    fn labels_from_other_rows_still_match() {
        // One row lists the labels for its neighbour as well.
        let t = Table::from_document(&json!([
            {"shortLabel": "A", "langs": [
                {"locale": "en", "variable": "A", "text": "Auto"},
                {"locale": "en", "variable": "B", "text": "Bike"},
            ]},
            {"shortLabel": "B", "langs": null},
        ]))
        .unwrap();
        let merged = merge_labels(&t, "langs", "shortLabel").unwrap();
        assert_eq!(merged.num_rows(), 2);
        assert_eq!(merged.row(1).unwrap().value("en"), json!("Bike"));
    }

    #[test]
    fn duplicate_variable_locale_errors() {
        let t = Table::from_document(&json!([
            {"shortLabel": "A", "langs": [{"locale": "en", "variable": "A", "text": "Auto"}]},
            {"shortLabel": "A2", "langs": [{"locale": "en", "variable": "A", "text": "Auto"}]},
        ]))
        .unwrap();
        let err = merge_labels(&t, "langs", "shortLabel").unwrap_err();
        assert!(matches!(
            err,
            ShapeError::DuplicateLabelKey { variable, locale } if variable == "A" && locale == "en"
        ));
    }

    #[test]
    fn missing_list_column_errors() {
        let t = categories();
        let err = merge_labels(&t, "nope", DEFAULT_LABEL_KEY).unwrap_err();
        assert!(matches!(err, ShapeError::MissingColumn { column } if column == "nope"));
    }

    #[test]
    fn partial_entry_is_malformed() {
        let t = Table::from_document(&json!([
            {"shortLabel": "A", "langs": [{"locale": "en", "text": "Auto"}]},
        ]))
        .unwrap();
        let err = merge_labels(&t, "langs", "shortLabel").unwrap_err();
        assert!(matches!(err, ShapeError::MalformedRecord { .. }));
    }

    #[test]
    fn variable_as_join_key_is_dropped() {
        let mut t = Table::from_document(&json!([
            {"code": "01000", "langs": [{"locale": "en", "variable": "stage.name.01000", "text": "Bisha"}]},
        ]))
        .unwrap();
        t.add_column("variable", |r| {
            json!(format!("stage.name.{}", r.get_str("code").unwrap_or_default()))
        });
        let merged = merge_labels(&t, "langs", "variable").unwrap();
        assert_eq!(merged.columns(), ["code", "en"]);
        assert_eq!(label_columns(t.columns(), &merged), ["en"]);
    }

    #[test]
    fn pivot_table_shape() {
        let t = categories();
        let wide = pivot_labels(t.column_values("categoryLangs").unwrap(), "categoryLangs").unwrap();
        assert_eq!(wide.len(), 2);
        assert_eq!(wide.locales(), ["en", "es", "fr"]);
        let table = wide.to_table();
        assert_eq!(table.columns(), ["variable", "en", "es", "fr"]);
        assert_eq!(wide.text("A", "fr"), Some("Auto FR"));
    }
}
