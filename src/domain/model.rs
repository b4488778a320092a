use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Platform {
    Meta,
    Snapchat,
    TikTok,
    YouTube,
}

impl Platform {
    /// Order in which exports are loaded and concatenated.
    pub const ALL: [Platform; 4] = [
        Platform::Meta,
        Platform::Snapchat,
        Platform::TikTok,
        Platform::YouTube,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Platform::Meta => "Meta",
            Platform::Snapchat => "Snapchat",
            Platform::TikTok => "TikTok",
            Platform::YouTube => "YouTube",
        }
    }

    pub fn file_stem(&self) -> &'static str {
        match self {
            Platform::Meta => "meta",
            Platform::Snapchat => "snapchat",
            Platform::TikTok => "tiktok",
            Platform::YouTube => "youtube",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Platform::Meta => "#0866FF",
            Platform::YouTube => "#F26522",
            Platform::TikTok => "#444444",
            Platform::Snapchat => "#c48a47",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.data.get(column)
    }
}

/// One platform export as loaded from disk: ordered columns plus rows.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub platform: Platform,
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl RawTable {
    pub fn new(platform: Platform, columns: Vec<String>, records: Vec<Record>) -> Self {
        Self {
            platform,
            columns,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn require_columns(&self, columns: &[&str]) -> Result<()> {
        match columns.iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(EtlError::missing_column(self.platform.label(), *missing)),
            None => Ok(()),
        }
    }

    /// Renames `from` to `to`, replacing an existing `to` column. No-op when `from` is absent.
    pub fn rename_column(&mut self, from: &str, to: &str) {
        if from == to || !self.has_column(from) {
            return;
        }
        self.drop_column(to);
        for column in self.columns.iter_mut() {
            if column == from {
                *column = to.to_string();
            }
        }
        for record in self.records.iter_mut() {
            if let Some(value) = record.data.remove(from) {
                record.data.insert(to.to_string(), value);
            }
        }
    }

    /// Returns whether the column existed.
    pub fn drop_column(&mut self, column: &str) -> bool {
        let before = self.columns.len();
        self.columns.retain(|c| c != column);
        if self.columns.len() == before {
            return false;
        }
        for record in self.records.iter_mut() {
            record.data.remove(column);
        }
        true
    }

    /// Copies `source` into `target`, overwriting any existing `target` values.
    pub fn derive_column(&mut self, source: &str, target: &str) -> Result<()> {
        self.require_columns(&[source])?;
        if !self.has_column(target) {
            self.columns.push(target.to_string());
        }
        for record in self.records.iter_mut() {
            let value = record
                .data
                .get(source)
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            record.data.insert(target.to_string(), value);
        }
        Ok(())
    }

    pub fn set_constant(&mut self, column: &str, value: serde_json::Value) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
        for record in self.records.iter_mut() {
            record.data.insert(column.to_string(), value.clone());
        }
    }

    /// Keeps the first occurrence of every fully identical row. Returns the number removed.
    pub fn drop_duplicates(&mut self) -> Result<usize> {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(self.records.len());
        let before = self.records.len();

        for record in self.records.drain(..) {
            let row: Vec<&serde_json::Value> = self
                .columns
                .iter()
                .map(|c| record.data.get(c).unwrap_or(&serde_json::Value::Null))
                .collect();
            let key = serde_json::to_string(&row)?;
            if seen.insert(key) {
                kept.push(record);
            }
        }

        self.records = kept;
        Ok(before - self.records.len())
    }
}

/// Unified row across all platforms, as written to `platform_data.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformRecord {
    pub campaign_id: String,
    pub date: NaiveDate,
    pub impressions: u64,
    pub clicks: u64,
    pub video_completions: u64,
    pub device_type: String,
    pub advertiser_name: String,
    pub source: Platform,
}

/// Meta row with its flight dates, input to the calendar-week split.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaFlight {
    pub campaign_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub impressions: u64,
}

#[derive(Debug, Clone)]
pub struct PreparedData {
    pub platform_records: Vec<PlatformRecord>,
    pub cleaned_meta: RawTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactTarget {
    /// Intermediate datasets next to the inputs.
    Data,
    /// Reports served by the download endpoint.
    Output,
}

#[derive(Debug, Clone)]
pub struct ReportArtifact {
    pub file_name: String,
    pub target: ArtifactTarget,
    pub content: Vec<u8>,
}

impl ReportArtifact {
    pub fn data(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            target: ArtifactTarget::Data,
            content,
        }
    }

    pub fn output(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            target: ArtifactTarget::Output,
            content,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub platform_record_count: usize,
    pub campaign_count: usize,
    pub artifacts: Vec<ReportArtifact>,
}
