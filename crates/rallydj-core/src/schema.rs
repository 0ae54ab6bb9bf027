//! Arrow export for feed tables.
//!
//! Column types are inferred from the non-null cells of each column:
//!
//! | cells                      | Arrow type |
//! |----------------------------|------------|
//! | all booleans               | `Boolean`  |
//! | all integers               | `Int64`    |
//! | all numbers (some floats)  | `Float64`  |
//! | all strings, or all null   | `Utf8`     |
//! | anything else              | `Utf8` holding compact JSON |
//!
//! Every field is nullable.

use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use serde_json::Value;

use crate::{ShapeError, Table};

/// Infer the Arrow type for a column from its cells.
pub fn infer_data_type<'a, I>(cells: I) -> DataType
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut seen: Option<DataType> = None;
    for cell in cells {
        let kind = match cell {
            Value::Null => continue,
            Value::Bool(_) => DataType::Boolean,
            Value::Number(n) if n.is_i64() => DataType::Int64,
            Value::Number(_) => DataType::Float64,
            _ => DataType::Utf8,
        };
        seen = Some(match (seen, kind) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(DataType::Int64), DataType::Float64) | (Some(DataType::Float64), DataType::Int64) => {
                DataType::Float64
            }
            _ => return DataType::Utf8,
        });
    }
    seen.unwrap_or(DataType::Utf8)
}

impl Table {
    /// Arrow schema matching [`Table::to_record_batch`].
    pub fn arrow_schema(&self) -> Schema {
        let fields: Vec<Field> = self
            .columns()
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let dt = infer_data_type(self.rows().map(|r| &r.cells()[i]));
                Field::new(name, dt, true)
            })
            .collect();
        Schema::new(fields)
    }

    /// Convert the table into a single Arrow `RecordBatch`.
    pub fn to_record_batch(&self) -> Result<RecordBatch, ShapeError> {
        let schema = Arc::new(self.arrow_schema());
        let columns: Vec<ArrayRef> = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let cells = self.rows().map(|r| &r.cells()[i]);
                build_array(field.data_type(), cells)
            })
            .collect();
        let options = RecordBatchOptions::new().with_row_count(Some(self.num_rows()));
        Ok(RecordBatch::try_new_with_options(schema, columns, &options)?)
    }
}

fn build_array<'a, I>(data_type: &DataType, cells: I) -> ArrayRef
where
    I: Iterator<Item = &'a Value>,
{
    match data_type {
        DataType::Boolean => Arc::new(BooleanArray::from(
            cells.map(Value::as_bool).collect::<Vec<_>>(),
        )),
        DataType::Int64 => Arc::new(Int64Array::from(
            cells.map(Value::as_i64).collect::<Vec<_>>(),
        )),
        DataType::Float64 => Arc::new(Float64Array::from(
            cells.map(Value::as_f64).collect::<Vec<_>>(),
        )),
        _ => Arc::new(StringArray::from(
            cells.map(cell_text).collect::<Vec<Option<String>>>(),
        )),
    }
}

fn cell_text(cell: &Value) -> Option<String> {
    match cell {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
