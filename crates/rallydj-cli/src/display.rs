//! Terminal output for feed tables.
//!
//! Three views: an Arrow pretty-printed grid, one vertical card per row with
//! type-aware formatting, or the rows as a JSON array.

use arrow::array::{Array, BooleanArray, Float64Array};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use arrow::util::pretty::pretty_format_batches;
use clap::ValueEnum;
use rallydj_core::Table;

/// Columns tried in order for a card's heading.
const TITLE_COLUMNS: &[&str] = &["code", "shortLabel", "bib", "checkpoint", "type", "en"];

const MAX_TEXT: usize = 80;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum View {
    #[default]
    Table,
    Card,
    Json,
}

pub fn print_table(name: &str, table: &Table, view: View) -> anyhow::Result<()> {
    match view {
        View::Table => {
            println!("=== {name} ({} rows) ===", table.num_rows());
            let batch = table.to_record_batch()?;
            println!("{}", pretty_format_batches(&[batch])?);
            println!();
        }
        View::Card => {
            let batch = table.to_record_batch()?;
            for row in 0..batch.num_rows() {
                print_card(name, &batch, row)?;
            }
        }
        View::Json => {
            println!("{}", serde_json::to_string_pretty(&table.to_records())?);
        }
    }
    Ok(())
}

/// Print one row as a vertical card. Null cells are skipped.
fn print_card(name: &str, batch: &RecordBatch, row: usize) -> anyhow::Result<()> {
    match card_title(batch, row)? {
        Some(title) => println!("=== {name} #{} {title} ===", row + 1),
        None => println!("=== {name} #{} ===", row + 1),
    }
    let schema = batch.schema();
    for (i, field) in schema.fields().iter().enumerate() {
        let col = batch.column(i);
        if col.is_null(row) {
            continue;
        }
        println!("  {:<26} {}", field.name(), format_cell(col.as_ref(), row)?);
    }
    println!();
    Ok(())
}

fn card_title(batch: &RecordBatch, row: usize) -> anyhow::Result<Option<String>> {
    for &col_name in TITLE_COLUMNS {
        let Some(col) = batch.column_by_name(col_name) else {
            continue;
        };
        if !col.is_null(row) {
            return Ok(Some(format_cell(col.as_ref(), row)?));
        }
    }
    Ok(None)
}

fn format_cell(col: &dyn Array, row: usize) -> anyhow::Result<String> {
    match col.data_type() {
        DataType::Boolean => {
            if let Some(arr) = col.as_any().downcast_ref::<BooleanArray>() {
                return Ok(if arr.value(row) { "yes" } else { "no" }.to_string());
            }
        }
        DataType::Float64 => {
            if let Some(arr) = col.as_any().downcast_ref::<Float64Array>() {
                let v = arr.value(row);
                return Ok(if v.fract() == 0.0 {
                    format!("{v:.0}")
                } else {
                    format!("{v:.2}")
                });
            }
        }
        _ => {}
    }
    let options = FormatOptions::default();
    let text = ArrayFormatter::try_new(col, &options)?.value(row).to_string();
    Ok(truncate(&text))
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_TEXT {
        return text.to_string();
    }
    let short: String = text.chars().take(MAX_TEXT - 3).collect();
    format!("{short}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn batch() -> RecordBatch {
        Table::from_document(&json!([
            {"code": "01100", "powerStage": true, "length": 412.5, "km": 12.0},
            {"code": null, "powerStage": false, "length": 3, "km": 1.25},
        ]))
        .unwrap()
        .to_record_batch()
        .unwrap()
    }

    #[test]
    fn cells_are_formatted_by_type() {
        let b = batch();
        let cell = |name: &str, row| format_cell(b.column_by_name(name).unwrap().as_ref(), row).unwrap();
        assert_eq!(cell("powerStage", 0), "yes");
        assert_eq!(cell("powerStage", 1), "no");
        assert_eq!(cell("length", 0), "412.50");
        assert_eq!(cell("length", 1), "3");
        assert_eq!(cell("code", 0), "01100");
    }

    #[test]
    fn title_falls_through_null_columns() {
        let b = batch();
        assert_eq!(card_title(&b, 0).unwrap().as_deref(), Some("01100"));
        assert_eq!(card_title(&b, 1).unwrap(), None);
    }

    #[test]
    fn long_text_truncated() {
        let long = "x".repeat(100);
        let short = truncate(&long);
        assert_eq!(short.chars().count(), MAX_TEXT);
        assert!(short.ends_with("..."));
        assert_eq!(truncate("dunes"), "dunes");
    }
}
