use crate::core::values::{render_cell, to_count, to_date, to_text};
use crate::domain::model::{MetaFlight, Platform, PlatformRecord, PreparedData, RawTable};
use crate::utils::error::{EtlError, Result};
use serde_json::Value;

/// Columns every platform contributes to the unified dataset, in output order.
pub const UNIFIED_COLUMNS: [&str; 7] = [
    "campaign_id",
    "date",
    "impressions",
    "clicks",
    "video_completions",
    "device_type",
    "advertiser_name",
];

pub const META_START_COLUMN: &str = "Startdatum";
pub const META_END_COLUMN: &str = "Endedatum";

/// Cleans the four platform exports and merges them into one dataset.
///
/// `tables` may arrive in any order but must hold exactly one table per platform.
pub fn clean_and_prepare(tables: Vec<RawTable>) -> Result<PreparedData> {
    let mut by_platform: Vec<Option<RawTable>> = vec![None, None, None, None];
    for table in tables {
        let slot = &mut by_platform[platform_index(table.platform)];
        if slot.is_some() {
            return Err(EtlError::processing(format!(
                "received {} data twice",
                table.platform
            )));
        }
        *slot = Some(table);
    }

    let mut cleaned = Vec::with_capacity(Platform::ALL.len());
    for (platform, table) in Platform::ALL.into_iter().zip(by_platform) {
        let table = table.ok_or_else(|| EtlError::MissingInputError {
            platform: platform.label().to_string(),
            candidates: format!("{0}.parquet, {0}.csv", platform.file_stem()),
        })?;
        cleaned.push(clean_table(table)?);
    }

    let mut platform_records = Vec::new();
    for table in &cleaned {
        platform_records.extend(project(table)?);
    }

    let cleaned_meta = cleaned.swap_remove(0);
    tracing::debug!(
        "Prepared {} unified rows ({} Meta rows kept)",
        platform_records.len(),
        cleaned_meta.len()
    );

    Ok(PreparedData {
        platform_records,
        cleaned_meta,
    })
}

fn platform_index(platform: Platform) -> usize {
    match platform {
        Platform::Meta => 0,
        Platform::Snapchat => 1,
        Platform::TikTok => 2,
        Platform::YouTube => 3,
    }
}

fn clean_table(mut table: RawTable) -> Result<RawTable> {
    let platform = table.platform;

    // 平台特有的欄位調整需在去重前完成
    match platform {
        Platform::Snapchat => table.derive_column("date_start", "date")?,
        Platform::YouTube => {
            table.rename_column("account_name=advertiser_name", "advertiser_name");
            table.rename_column("line_item_id", "campaign_id");
        }
        Platform::Meta | Platform::TikTok => {}
    }

    let removed = table.drop_duplicates()?;
    if removed > 0 {
        tracing::info!("🧹 {}: dropped {} duplicate rows", platform, removed);
    }

    match platform {
        Platform::TikTok => {
            if !table.drop_column("device_type (#1)") {
                tracing::debug!("TikTok export has no 'device_type (#1)' column");
            }
        }
        Platform::Snapchat => table.rename_column("video_views_p100", "video_completions"),
        Platform::Meta | Platform::YouTube => {}
    }

    normalize_dates(&mut table, "date")?;
    table.set_constant("source", Value::String(platform.label().to_string()));
    Ok(table)
}

/// Rewrites a date column as ISO `YYYY-MM-DD` strings.
fn normalize_dates(table: &mut RawTable, column: &str) -> Result<()> {
    table.require_columns(&[column])?;
    let label = table.platform.label();
    for record in table.records.iter_mut() {
        let date = to_date(record.data.get(column), label, column)?;
        record
            .data
            .insert(column.to_string(), Value::String(date.format("%Y-%m-%d").to_string()));
    }
    Ok(())
}

fn project(table: &RawTable) -> Result<Vec<PlatformRecord>> {
    table.require_columns(&UNIFIED_COLUMNS)?;
    let label = table.platform.label();

    table
        .records
        .iter()
        .map(|record| {
            Ok(PlatformRecord {
                campaign_id: to_text(record.get("campaign_id")),
                date: to_date(record.get("date"), label, "date")?,
                impressions: to_count(record.get("impressions"), label, "impressions")?,
                clicks: to_count(record.get("clicks"), label, "clicks")?,
                video_completions: to_count(
                    record.get("video_completions"),
                    label,
                    "video_completions",
                )?,
                device_type: to_text(record.get("device_type")),
                advertiser_name: to_text(record.get("advertiser_name")),
                source: table.platform,
            })
        })
        .collect()
}

/// Flight rows of the cleaned Meta table, used for the calendar-week split.
pub fn meta_flights(meta: &RawTable) -> Result<Vec<MetaFlight>> {
    meta.require_columns(&["campaign_id", META_START_COLUMN, META_END_COLUMN, "impressions"])?;
    let label = meta.platform.label();

    meta.records
        .iter()
        .map(|record| {
            Ok(MetaFlight {
                campaign_id: to_text(record.get("campaign_id")),
                start_date: to_date(record.get(META_START_COLUMN), label, META_START_COLUMN)?,
                end_date: to_date(record.get(META_END_COLUMN), label, META_END_COLUMN)?,
                impressions: to_count(record.get("impressions"), label, "impressions")?,
            })
        })
        .collect()
}

pub fn platform_data_csv(records: &[PlatformRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if records.is_empty() {
        let mut header: Vec<&str> = UNIFIED_COLUMNS.to_vec();
        header.push("source");
        writer.write_record(&header)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    finish_csv(writer)
}

/// Every column of the table in its original order.
pub fn table_csv(table: &RawTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for record in &table.records {
        writer.write_record(table.columns.iter().map(|c| render_cell(record.get(c))))?;
    }
    finish_csv(writer)
}

pub(crate) fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}
