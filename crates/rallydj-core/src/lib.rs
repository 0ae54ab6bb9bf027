pub mod error;
pub mod flatten;
pub mod labels;
pub mod records;
pub mod schema;
pub mod sort_key;
pub mod table;

pub use error::ShapeError;
pub use flatten::{CompetitorTables, GroundTables, flatten_competitors, flatten_grounds};
pub use labels::{DEFAULT_LABEL_KEY, WideLabels, label_columns, merge_labels, pivot_labels};
pub use records::{Ground, GroundSection, LabelEntry};
pub use sort_key::compare_values;
pub use table::{Record, RowView, Table, document_records, normalize_record, record};
