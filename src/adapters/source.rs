//! Decoders for platform exports: parquet files as produced by the ad
//! platforms, and CSV as a plain-text fallback.

use crate::domain::model::{Platform, RawTable, Record};
use crate::utils::error::Result;
use bytes::Bytes;
use chrono::DateTime;
use parquet::basic::{LogicalType, TimeUnit};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Parquet,
    Csv,
}

impl SourceFormat {
    /// Preferred first.
    pub const ALL: [SourceFormat; 2] = [SourceFormat::Parquet, SourceFormat::Csv];

    pub fn extension(&self) -> &'static str {
        match self {
            SourceFormat::Parquet => "parquet",
            SourceFormat::Csv => "csv",
        }
    }

    pub fn file_name(&self, platform: Platform) -> String {
        format!("{}.{}", platform.file_stem(), self.extension())
    }

    pub fn decode(&self, platform: Platform, data: Vec<u8>) -> Result<RawTable> {
        match self {
            SourceFormat::Parquet => read_parquet_table(platform, data),
            SourceFormat::Csv => read_csv_table(platform, &data),
        }
    }
}

pub fn read_parquet_table(platform: Platform, data: Vec<u8>) -> Result<RawTable> {
    let reader = SerializedFileReader::new(Bytes::from(data))?;
    let schema = reader.metadata().file_metadata().schema_descr();

    let columns: Vec<String> = schema
        .root_schema()
        .get_fields()
        .iter()
        .map(|field| field.name().to_string())
        .collect();

    // INT64 timestamps carrying only a logical type are read back as plain longs
    let timestamp_units: HashMap<String, TimeUnit> = schema
        .columns()
        .iter()
        .filter_map(|column| match column.logical_type() {
            Some(LogicalType::Timestamp { unit, .. }) => Some((column.name().to_string(), unit)),
            _ => None,
        })
        .collect();

    let mut records = Vec::new();
    for row in reader.get_row_iter(None)? {
        let row = row?;
        let data: HashMap<String, Value> = row
            .get_column_iter()
            .map(|(name, field)| {
                let value = match (timestamp_units.get(name), field) {
                    (Some(unit), Field::Long(raw)) => timestamp_value(*raw, unit),
                    _ => field_to_value(field),
                };
                (name.clone(), value)
            })
            .collect();
        records.push(Record { data });
    }

    tracing::debug!(
        "Decoded {} parquet rows with {} columns for {}",
        records.len(),
        columns.len(),
        platform
    );
    Ok(RawTable::new(platform, columns, records))
}

fn timestamp_value(raw: i64, unit: &TimeUnit) -> Value {
    let datetime = match unit {
        TimeUnit::MILLIS(_) => DateTime::from_timestamp_millis(raw),
        TimeUnit::MICROS(_) => DateTime::from_timestamp_micros(raw),
        TimeUnit::NANOS(_) => Some(DateTime::from_timestamp_nanos(raw)),
    };
    datetime
        .map(|dt| Value::String(dt.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string()))
        .unwrap_or(Value::Null)
}

/// Parquet cell to JSON. Dates and timestamps become ISO strings.
pub fn field_to_value(field: &Field) -> Value {
    match field {
        Field::Null => Value::Null,
        Field::Bool(v) => Value::Bool(*v),
        Field::Byte(v) => Value::from(*v),
        Field::Short(v) => Value::from(*v),
        Field::Int(v) => Value::from(*v),
        Field::Long(v) => Value::from(*v),
        Field::UByte(v) => Value::from(*v),
        Field::UShort(v) => Value::from(*v),
        Field::UInt(v) => Value::from(*v),
        Field::ULong(v) => Value::from(*v),
        Field::Float(v) => float_value(*v as f64),
        Field::Double(v) => float_value(*v),
        Field::Str(v) => Value::String(v.clone()),
        Field::Date(days) => DateTime::from_timestamp(*days as i64 * 86_400, 0)
            .map(|dt| Value::String(dt.date_naive().format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        Field::TimestampMillis(ms) => DateTime::from_timestamp_millis(*ms)
            .map(|dt| Value::String(dt.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(Value::Null),
        Field::TimestampMicros(us) => DateTime::from_timestamp_micros(*us)
            .map(|dt| Value::String(dt.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(Value::Null),
        other => Value::String(other.to_string()),
    }
}

fn float_value(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Cells are kept as text; empty cells become null like a missing value.
pub fn read_csv_table(platform: Platform, data: &[u8]) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new().flexible(false).from_reader(data);
    let columns: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let data = columns
            .iter()
            .zip(row.iter())
            .map(|(column, cell)| {
                let value = if cell.is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                };
                (column.clone(), value)
            })
            .collect();
        records.push(Record { data });
    }

    Ok(RawTable::new(platform, columns, records))
}
