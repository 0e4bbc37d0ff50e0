use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{
    DataType, Date32Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{info, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Column, ColumnKind, Value, VideoColumn, VideoRecord, VideoTable};
use crate::error::LoadError;

type Result<T> = std::result::Result<T, LoadError>;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a video table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row naming the columns (extra columns are ignored)
/// * `.json`    – `[{ "video_id": "...", "channel": "...", ... }, ...]`
/// * `.parquet` – one column per field; text may be dictionary-encoded, dates
///   may be `Date32`, `Date64`, timestamps or text
pub fn load_file(path: &Path) -> Result<VideoTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    };

    warn_duplicate_ids(&table);
    info!(
        "loaded {} videos from {} channels ({})",
        table.len(),
        table.channels().len(),
        path.display()
    );
    Ok(table)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn warn_duplicate_ids(table: &VideoTable) {
    let mut seen = HashSet::with_capacity(table.len());
    let duplicates = table
        .iter()
        .filter(|r| !seen.insert(r.video_id.as_str()))
        .count();
    if duplicates > 0 {
        warn!("{duplicates} rows repeat an earlier video_id");
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one video per row.
/// Empty cells are read as missing values.
pub fn load_csv(path: &Path) -> Result<VideoTable> {
    read_csv(open(path)?)
}

/// Same as [`load_csv`] over any reader.
pub fn read_csv<R: std::io::Read>(input: R) -> Result<VideoTable> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader.headers()?.clone();

    let mut positions = BTreeMap::new();
    for &column in VideoColumn::ALL {
        let idx = headers
            .iter()
            .position(|h| h.trim() == column.name())
            .ok_or_else(|| LoadError::MissingColumn(column.name().to_string()))?;
        positions.insert(column, idx);
    }

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let row = build_record(i + 1, |column| {
            let cell = positions
                .get(&column)
                .and_then(|&idx| record.get(idx))
                .unwrap_or("")
                .trim();
            if cell.is_empty() {
                Value::Null
            } else {
                Value::Text(cell.to_string())
            }
        })?;
        rows.push(row);
    }

    Ok(VideoTable::new(rows))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`).
/// An empty array is an empty table: with no objects there are no keys to
/// check, unlike a CSV whose header row is always present.
///
/// ```json
/// [
///   { "video_id": "2kyS6SvSYSE", "channel": "CaseyNeistat", "views": 748374, ... },
///   ...
/// ]
/// ```
pub fn load_json(path: &Path) -> Result<VideoTable> {
    let records: Vec<serde_json::Map<String, JsonValue>> =
        serde_json::from_reader(BufReader::new(open(path)?))?;

    let mut rows = Vec::with_capacity(records.len());
    for (i, obj) in records.iter().enumerate() {
        if let Some(missing) = VideoColumn::ALL.iter().find(|c| !obj.contains_key(c.name())) {
            return Err(LoadError::MissingColumn(missing.name().to_string()));
        }
        let row = build_record(i + 1, |column| {
            obj.get(column.name())
                .map(json_to_value)
                .unwrap_or(Value::Null)
        })?;
        rows.push(row);
    }

    Ok(VideoTable::new(rows))
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) if s.trim().is_empty() => Value::Null,
        JsonValue::String(s) => Value::Text(s.trim().to_string()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Text(n.to_string())
            }
        }
        JsonValue::Null => Value::Null,
        other => Value::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one column per video field.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`), and with our own exports.
pub fn load_parquet(path: &Path) -> Result<VideoTable> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(open(path)?)?;

    let schema = builder.schema().clone();
    let mut positions = BTreeMap::new();
    for &column in VideoColumn::ALL {
        let idx = schema
            .index_of(column.name())
            .map_err(|_| LoadError::MissingColumn(column.name().to_string()))?;
        positions.insert(column, idx);
    }

    let reader = builder.build()?;
    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;
        let mut columns = BTreeMap::new();
        for (&column, &idx) in &positions {
            columns.insert(column, decode_column(batch.column(idx))?);
        }
        for r in 0..batch.num_rows() {
            let row_no = rows.len() + 1;
            let row = build_record(row_no, |column| match columns.get(&column) {
                Some(col) => extract_value(col, r),
                None => Value::Null,
            })?;
            rows.push(row);
        }
    }

    Ok(VideoTable::new(rows))
}

/// Unpack storage types Pandas and Polars use for categories and datetimes:
/// dictionary arrays become their value type, timestamps and `Date64` become
/// `Date32` (time of day dropped).
fn decode_column(col: &ArrayRef) -> Result<ArrayRef> {
    match col.data_type() {
        DataType::Dictionary(_, values) => decode_column(&cast(col, values)?),
        DataType::Timestamp(_, _) | DataType::Date64 => Ok(cast(col, &DataType::Date32)?),
        _ => Ok(Arc::clone(col)),
    }
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    match col.data_type() {
        DataType::Utf8 => Value::Text(col.as_string::<i32>().value(row).trim().to_string()),
        DataType::LargeUtf8 => Value::Text(col.as_string::<i64>().value(row).trim().to_string()),
        DataType::Int8 => Value::Integer(col.as_primitive::<Int8Type>().value(row) as i64),
        DataType::Int16 => Value::Integer(col.as_primitive::<Int16Type>().value(row) as i64),
        DataType::Int32 => Value::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::UInt8 => Value::Integer(col.as_primitive::<UInt8Type>().value(row) as i64),
        DataType::UInt16 => Value::Integer(col.as_primitive::<UInt16Type>().value(row) as i64),
        DataType::Int64 => Value::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::UInt32 => Value::Integer(col.as_primitive::<UInt32Type>().value(row) as i64),
        DataType::UInt64 => {
            Value::from_count(Some(col.as_primitive::<UInt64Type>().value(row)))
        }
        DataType::Float32 => Value::Float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => Value::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Date32 => col
            .as_primitive::<Date32Type>()
            .value_as_date(row)
            .map(Value::Date)
            .unwrap_or(Value::Null),
        other => Value::Text(format!("<unsupported {other:?}>")),
    }
}

// ---------------------------------------------------------------------------
// Row coercion
// ---------------------------------------------------------------------------

/// Build one typed row from raw cells. `row` is the 1-based data row number.
fn build_record(row: usize, cell: impl Fn(VideoColumn) -> Value) -> Result<VideoRecord> {
    let text = |c: VideoColumn| coerce_text(row, c, cell(c));
    let count = |c: VideoColumn| coerce_count(row, c, cell(c));
    let date = |c: VideoColumn| coerce_date(row, c, cell(c));

    let channel_category = text(VideoColumn::ChannelCategory)?
        .parse()
        .map_err(|reason| invalid(row, VideoColumn::ChannelCategory, reason))?;

    Ok(VideoRecord {
        video_id: text(VideoColumn::VideoId)?,
        channel: text(VideoColumn::Channel)?,
        channel_category,
        video_category: text(VideoColumn::VideoCategory)?,
        subscribers: count(VideoColumn::Subscribers)?,
        views: count(VideoColumn::Views)?,
        likes: count(VideoColumn::Likes)?,
        dislikes: count(VideoColumn::Dislikes)?,
        comment_count: count(VideoColumn::CommentCount)?,
        tags_in_title: count(VideoColumn::TagsInTitle)?,
        tags_count: count(VideoColumn::TagsCount)?,
        days_in_trending: count(VideoColumn::DaysInTrending)?,
        days_to_trending: count(VideoColumn::DaysToTrending)?,
        publish_date: date(VideoColumn::PublishDate)?,
        last_trending_date: date(VideoColumn::LastTrendingDate)?,
    })
}

fn invalid(row: usize, column: VideoColumn, reason: impl Into<String>) -> LoadError {
    LoadError::InvalidValue {
        row,
        column: column.name().to_string(),
        reason: reason.into(),
    }
}

fn coerce_text(row: usize, column: VideoColumn, value: Value) -> Result<String> {
    debug_assert!(matches!(
        column.kind(),
        ColumnKind::Identifier | ColumnKind::Categorical
    ));
    match value {
        Value::Text(s) => Ok(s),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Date(d) => Ok(d.to_string()),
        Value::Null => Err(invalid(row, column, "missing value")),
    }
}

/// Non-negative integer, or `None` when the cell is empty.
fn coerce_count(row: usize, column: VideoColumn, value: Value) -> Result<Option<u64>> {
    let as_count = |f: f64| -> Option<u64> {
        (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then(|| f as u64)
    };
    match value {
        Value::Null => Ok(None),
        Value::Integer(i) => u64::try_from(i)
            .map(Some)
            .map_err(|_| invalid(row, column, format!("{i} is negative"))),
        Value::Float(f) if f.is_nan() => Ok(None),
        Value::Float(f) => as_count(f)
            .map(Some)
            .ok_or_else(|| invalid(row, column, format!("{f} is not a non-negative integer"))),
        Value::Text(s) => {
            if let Ok(n) = s.parse::<u64>() {
                return Ok(Some(n));
            }
            match s.parse::<f64>() {
                Ok(f) if f.is_nan() => Ok(None),
                Ok(f) => as_count(f).map(Some).ok_or_else(|| {
                    invalid(row, column, format!("'{s}' is not a non-negative integer"))
                }),
                Err(_) => Err(invalid(row, column, format!("'{s}' is not a number"))),
            }
        }
        Value::Date(d) => Err(invalid(row, column, format!("{d} is not a number"))),
    }
}

fn coerce_date(row: usize, column: VideoColumn, value: Value) -> Result<NaiveDate> {
    match value {
        Value::Date(d) => Ok(d),
        Value::Text(s) => {
            parse_date(&s).ok_or_else(|| invalid(row, column, format!("'{s}' is not a date")))
        }
        Value::Null => Err(invalid(row, column, "missing value")),
        other => Err(invalid(row, column, format!("{other} is not a date"))),
    }
}

/// Parse a calendar date, discarding any time-of-day.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `MM/DD/YYYY`, `YYYY-MM-DD HH:MM:SS`,
/// RFC 3339 timestamps and the trending export's `YY.DD.MM`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let s = text.trim();
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%y.%d.%m"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "video_id,channel,channel_category,video_category,subscribers,views,likes,dislikes,comment_count,tags_in_title,tags_count,days_in_trending,days_to_trending,publish_date,last_trending_date";

    fn csv_text(rows: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text
    }

    #[test]
    fn reads_typed_rows() {
        let text = csv_text(&["a1,Casey,YT,People & Blogs,1200.0,748374,57527,2966,15954,1,11,7,1,2017-11-13,2017-11-20"]);
        let table = read_csv(text.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        let row = &table.rows()[0];
        assert_eq!(row.channel, "Casey");
        assert_eq!(row.subscribers, Some(1200));
        assert_eq!(row.publish_date, NaiveDate::from_ymd_opt(2017, 11, 13).unwrap());
    }

    #[test]
    fn empty_numeric_cell_is_missing() {
        let text = csv_text(&["a1,Casey,YT,Comedy,,10,,1,1,1,1,1,1,2017-11-13,2017-11-20"]);
        let row = read_csv(text.as_bytes()).unwrap().into_rows().remove(0);
        assert_eq!(row.subscribers, None);
        assert_eq!(row.likes, None);
        assert_eq!(row.views, Some(10));
    }

    #[test]
    fn missing_column_is_reported() {
        let text = "video_id,channel\na1,Casey";
        match read_csv(text.as_bytes()) {
            Err(LoadError::MissingColumn(c)) => assert_eq!(c, "channel_category"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn bad_cells_name_row_and_column() {
        let text = csv_text(&[
            "a1,Casey,YT,Comedy,1,1,1,1,1,1,1,1,1,2017-11-13,2017-11-20",
            "a2,Casey,YT,Comedy,1,-5,1,1,1,1,1,1,1,2017-11-13,2017-11-20",
        ]);
        match read_csv(text.as_bytes()) {
            Err(LoadError::InvalidValue { row, column, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(column, "views");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unknown_channel_category_fails() {
        let text = csv_text(&["a1,Casey,ZZ,Comedy,1,1,1,1,1,1,1,1,1,2017-11-13,2017-11-20"]);
        assert!(matches!(
            read_csv(text.as_bytes()),
            Err(LoadError::InvalidValue { .. })
        ));
    }

    #[test]
    fn parquet_with_dictionary_categories_and_timestamps() {
        use arrow::array::{
            DictionaryArray, Int16Array, Int64Array, StringArray, TimestampNanosecondArray,
        };
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let nanos = |y, m, d| {
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap()
                .and_utc()
                .timestamp_nanos_opt()
                .unwrap()
        };
        let text = |values: [&str; 2]| -> ArrayRef {
            Arc::new(values.into_iter().collect::<DictionaryArray<Int32Type>>())
        };

        let mut fields = Vec::new();
        let mut arrays: Vec<ArrayRef> = Vec::new();
        for &column in VideoColumn::ALL {
            let array: ArrayRef = match column {
                VideoColumn::VideoId => Arc::new(StringArray::from(vec!["a1", "a2"])),
                VideoColumn::Channel => text(["Casey", "Casey"]),
                VideoColumn::ChannelCategory => text(["YT", "yt"]),
                VideoColumn::VideoCategory => text(["Comedy", "Music"]),
                VideoColumn::TagsInTitle => Arc::new(Int16Array::from(vec![1, 2])),
                VideoColumn::PublishDate => {
                    Arc::new(TimestampNanosecondArray::from(vec![nanos(2017, 11, 13), nanos(2017, 11, 14)]))
                }
                VideoColumn::LastTrendingDate => {
                    Arc::new(TimestampNanosecondArray::from(vec![nanos(2017, 11, 20), nanos(2017, 11, 21)]))
                }
                _ => Arc::new(Int64Array::from(vec![Some(10), None])),
            };
            fields.push(Field::new(column.name(), array.data_type().clone(), true));
            arrays.push(array);
        }
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pandas.parquet");
        let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_parquet(&path).unwrap();
        assert_eq!(table.len(), 2);
        let (first, second) = (&table.rows()[0], &table.rows()[1]);
        assert_eq!(first.channel, "Casey");
        assert_eq!(second.video_category, "Music");
        assert_eq!(second.channel_category, crate::data::model::ChannelCategory::Youtuber);
        assert_eq!(first.tags_in_title, Some(1));
        assert_eq!(second.views, None);
        assert_eq!(first.publish_date, NaiveDate::from_ymd_opt(2017, 11, 13).unwrap());
        assert_eq!(second.last_trending_date, NaiveDate::from_ymd_opt(2017, 11, 21).unwrap());
    }

    #[test]
    fn empty_json_array_is_an_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("videos.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(load_json(&path).unwrap().is_empty());

        std::fs::write(&path, r#"[{"video_id": "a1"}]"#).unwrap();
        assert!(matches!(load_json(&path), Err(LoadError::MissingColumn(_))));
    }

    #[test]
    fn date_formats() {
        let expected = NaiveDate::from_ymd_opt(2017, 11, 14);
        assert_eq!(parse_date("2017-11-14"), expected);
        assert_eq!(parse_date("2017/11/14"), expected);
        assert_eq!(parse_date("11/14/2017"), expected);
        assert_eq!(parse_date("2017-11-14 08:30:00"), expected);
        assert_eq!(parse_date("2017-11-14T08:30:00.000Z"), expected);
        assert_eq!(parse_date("17.14.11"), expected);
        assert_eq!(parse_date("yesterday"), None);
    }
}
