use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, Float64Array, Int64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Date32Type, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use log::info;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

use crate::data::aggregate::ChannelTable;
use crate::data::model::{Column, ColumnKind, Table, Value, VideoTable};
use crate::error::ExportError;
use crate::summary::StatsTable;

// ---------------------------------------------------------------------------
// Tables → Arrow
// ---------------------------------------------------------------------------

/// A table that can be written out row-wise (JSON, CSV) or column-wise (Arrow).
pub trait Exportable {
    type Row: Serialize;

    fn export_rows(&self) -> &[Self::Row];
    fn to_batch(&self) -> Result<RecordBatch, ArrowError>;
}

/// Build a record batch with one Arrow column per schema column.
pub fn table_batch<T: Table>(table: &T) -> Result<RecordBatch, ArrowError> {
    let mut fields = Vec::new();
    let mut arrays: Vec<ArrayRef> = Vec::new();

    for &column in <T::Column as Column>::ALL {
        let values = table.column_values(column);
        let (data_type, array): (DataType, ArrayRef) = match column.kind() {
            ColumnKind::Identifier | ColumnKind::Categorical => (
                DataType::Utf8,
                Arc::new(
                    values
                        .iter()
                        .map(|v| match v {
                            Value::Text(s) => Some(s.as_str()),
                            _ => None,
                        })
                        .collect::<StringArray>(),
                ),
            ),
            ColumnKind::Integer => (
                DataType::Int64,
                Arc::new(
                    values
                        .iter()
                        .map(|v| match v {
                            Value::Integer(i) => Some(*i),
                            _ => None,
                        })
                        .collect::<Int64Array>(),
                ),
            ),
            ColumnKind::Float => (
                DataType::Float64,
                Arc::new(values.iter().map(Value::as_f64).collect::<Float64Array>()),
            ),
            ColumnKind::Date => (
                DataType::Date32,
                Arc::new(
                    values
                        .iter()
                        .map(|v| match v {
                            Value::Date(d) => Some(Date32Type::from_naive_date(*d)),
                            _ => None,
                        })
                        .collect::<Date32Array>(),
                ),
            ),
        };
        fields.push(Field::new(column.name(), data_type, true));
        arrays.push(array);
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
}

impl Exportable for VideoTable {
    type Row = crate::data::model::VideoRecord;

    fn export_rows(&self) -> &[Self::Row] {
        self.rows()
    }

    fn to_batch(&self) -> Result<RecordBatch, ArrowError> {
        table_batch(self)
    }
}

impl Exportable for ChannelTable {
    type Row = crate::data::aggregate::ChannelAggregate;

    fn export_rows(&self) -> &[Self::Row] {
        self.rows()
    }

    fn to_batch(&self) -> Result<RecordBatch, ArrowError> {
        table_batch(self)
    }
}

impl Exportable for StatsTable {
    type Row = crate::summary::StatsRow;

    fn export_rows(&self) -> &[Self::Row] {
        self.rows()
    }

    fn to_batch(&self) -> Result<RecordBatch, ArrowError> {
        let rows = self.rows();
        let stat = |f: fn(&Self::Row) -> Option<f64>| -> ArrayRef {
            Arc::new(rows.iter().map(f).collect::<Float64Array>())
        };

        let schema = Schema::new(vec![
            Field::new("column", DataType::Utf8, false),
            Field::new("label", DataType::Utf8, false),
            Field::new("count", DataType::UInt64, false),
            Field::new("mean", DataType::Float64, true),
            Field::new("std", DataType::Float64, true),
            Field::new("min", DataType::Float64, true),
            Field::new("median", DataType::Float64, true),
            Field::new("max", DataType::Float64, true),
        ]);
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.column))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.label.as_str()))),
            Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.count as u64))),
            stat(|r| r.mean),
            stat(|r| r.std),
            stat(|r| r.min),
            stat(|r| r.median),
            stat(|r| r.max),
        ];
        RecordBatch::try_new(Arc::new(schema), columns)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Render a table as a boxed text table.
pub fn pretty<E: Exportable>(table: &E) -> Result<String, ArrowError> {
    let batch = table.to_batch()?;
    Ok(pretty_format_batches(&[batch])?.to_string())
}

/// Write a table to `path`.  Dispatch by extension.
///
/// Supported formats:
/// * `.json`    – array of row objects
/// * `.csv`     – header row plus one line per row
/// * `.parquet` – one column per field
pub fn write_table<E: Exportable>(table: &E, path: &Path) -> Result<(), ExportError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let create = || {
        File::create(path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })
    };

    match ext.as_str() {
        "json" => serde_json::to_writer_pretty(create()?, table.export_rows())?,
        "csv" => {
            let mut writer = csv::Writer::from_writer(create()?);
            for row in table.export_rows() {
                writer.serialize(row)?;
            }
            writer.flush().map_err(|source| ExportError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }
        "parquet" | "pq" => {
            let batch = table.to_batch()?;
            let mut writer = ArrowWriter::try_new(create()?, batch.schema(), None)?;
            writer.write(&batch)?;
            writer.close()?;
        }
        other => return Err(ExportError::UnsupportedFormat(other.to_string())),
    }

    info!(
        "wrote {} rows to {}",
        table.export_rows().len(),
        path.display()
    );
    Ok(())
}
