use crate::adapters::source::SourceFormat;
use crate::core::bundle::bundle_reports;
use crate::core::cleaning::{clean_and_prepare, meta_flights, platform_data_csv, table_csv};
use crate::core::platform_analysis::PlatformAnalysis;
use crate::core::weekly::WeeklyAnalysis;
use crate::core::{ConfigProvider, Pipeline, RawTable, Storage, TransformResult};
use crate::domain::model::{ArtifactTarget, Platform, ReportArtifact};
use crate::utils::error::{EtlError, Result};

pub const PLATFORM_DATA_CSV: &str = "platform_data.csv";
pub const CLEANED_META_CSV: &str = "cleaned_meta.csv";

/// Reads the four platform exports from `data`, writes the intermediate
/// datasets back to `data` and every report to `output`.
pub struct AnalyticsPipeline<S: Storage, C: ConfigProvider> {
    data: S,
    output: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> AnalyticsPipeline<S, C> {
    pub fn new(data: S, output: S, config: C) -> Self {
        Self {
            data,
            output,
            config,
        }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    async fn load_platform(&self, platform: Platform) -> Result<RawTable> {
        for format in SourceFormat::ALL {
            let file_name = format.file_name(platform);
            if self.data.exists(&file_name).await {
                tracing::debug!("Reading {} from {}", file_name, self.data.location());
                let bytes = self.data.read_file(&file_name).await?;
                return format.decode(platform, bytes);
            }
        }

        Err(EtlError::MissingInputError {
            platform: platform.label().to_string(),
            candidates: SourceFormat::ALL
                .iter()
                .map(|f| f.file_name(platform))
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for AnalyticsPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<RawTable>> {
        let mut tables = Vec::with_capacity(Platform::ALL.len());
        for platform in Platform::ALL {
            let table = self.load_platform(platform).await?;
            tracing::debug!("{}: {} rows, {} columns", platform, table.len(), table.columns.len());
            tables.push(table);
        }
        Ok(tables)
    }

    async fn transform(&self, data: Vec<RawTable>) -> Result<TransformResult> {
        tracing::info!("🔧 Cleaning and preparing data...");
        let prepared = clean_and_prepare(data)?;
        let mut artifacts = vec![
            ReportArtifact::data(PLATFORM_DATA_CSV, platform_data_csv(&prepared.platform_records)?),
            ReportArtifact::data(CLEANED_META_CSV, table_csv(&prepared.cleaned_meta)?),
        ];

        tracing::info!("📊 Analyzing platform performance...");
        let analysis = PlatformAnalysis::from_records(&prepared.platform_records);
        artifacts.extend(analysis.render_charts()?);

        tracing::info!("📅 Calculating weekly impressions...");
        let flights = meta_flights(&prepared.cleaned_meta)?;
        let weekly = WeeklyAnalysis::compute(
            &flights,
            self.config.first_week_start(),
            self.config.week_count(),
        );
        artifacts.extend(weekly.render()?);

        Ok(TransformResult {
            platform_record_count: prepared.platform_records.len(),
            campaign_count: weekly.campaigns.len(),
            artifacts,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        for artifact in &result.artifacts {
            let storage = match artifact.target {
                ArtifactTarget::Data => &self.data,
                ArtifactTarget::Output => &self.output,
            };
            tracing::debug!(
                "Writing {} ({} bytes) to {}",
                artifact.file_name,
                artifact.content.len(),
                storage.location()
            );
            storage.write_file(&artifact.file_name, &artifact.content).await?;
        }

        if let Some(bundle_name) = self.config.bundle_filename() {
            let reports = result
                .artifacts
                .iter()
                .filter(|a| a.target == ArtifactTarget::Output);
            let archive = bundle_reports(reports)?;
            tracing::debug!("Writing report bundle {} ({} bytes)", bundle_name, archive.len());
            self.output.write_file(bundle_name, &archive).await?;
        }

        Ok(self.output.location())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform_analysis::{CTR_CHART, IMPRESSIONS_CHART};
    use crate::core::weekly::WEEKLY_CSV;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        name: &'static str,
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn put(&self, path: &str, data: &str) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.as_bytes().to_vec());
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }

        async fn file_names(&self) -> Vec<String> {
            let files = self.files.lock().await;
            let mut names: Vec<String> = files.keys().cloned().collect();
            names.sort();
            names
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn exists(&self, path: &str) -> bool {
            self.files.lock().await.contains_key(path)
        }

        fn location(&self) -> String {
            self.name.to_string()
        }
    }

    struct MockConfig {
        bundle: Option<String>,
    }

    impl ConfigProvider for MockConfig {
        fn data_dir(&self) -> &str {
            "data"
        }

        fn output_dir(&self) -> &str {
            "output"
        }

        fn first_week_start(&self) -> NaiveDate {
            NaiveDate::from_ymd_opt(2016, 12, 26).unwrap()
        }

        fn week_count(&self) -> usize {
            53
        }

        fn bundle_filename(&self) -> Option<&str> {
            self.bundle.as_deref()
        }
    }

    const META_CSV: &str = "\
campaign_id,date,impressions,clicks,video_completions,device_type,advertiser_name,Startdatum,Endedatum
100,2017-01-02,700,7,70,Desktop,Acme,2017-01-02,2017-01-08
100,2017-01-02,700,7,70,Desktop,Acme,2017-01-02,2017-01-08
200,2017-01-10,1400,14,140,Smartphone,Acme,2017-01-09,2017-01-22
";
    const SNAPCHAT_CSV: &str = "\
campaign_id,date_start,impressions,clicks,video_views_p100,device_type,advertiser_name
s1,2017-02-01,500,5,50,Smartphone,Acme
";
    const TIKTOK_CSV: &str = "\
campaign_id,date,impressions,clicks,video_completions,device_type,device_type (#1),advertiser_name
t1,2017-03-01,300,3,30,Tablet,TABLET,Acme
";
    const YOUTUBE_CSV: &str = "\
line_item_id,date,impressions,clicks,video_completions,device_type,account_name=advertiser_name
77,2017-04-01,200,2,20,SmartTV,Acme
";

    async fn seeded_data() -> MockStorage {
        let data = MockStorage::new("data");
        data.put("meta.csv", META_CSV).await;
        data.put("snapchat.csv", SNAPCHAT_CSV).await;
        data.put("tiktok.csv", TIKTOK_CSV).await;
        data.put("youtube.csv", YOUTUBE_CSV).await;
        data
    }

    fn pipeline(
        data: MockStorage,
        output: MockStorage,
        bundle: Option<&str>,
    ) -> AnalyticsPipeline<MockStorage, MockConfig> {
        AnalyticsPipeline::new(
            data,
            output,
            MockConfig {
                bundle: bundle.map(str::to_string),
            },
        )
    }

    #[tokio::test]
    async fn test_extract_reads_every_platform_in_order() {
        let pipeline = pipeline(seeded_data().await, MockStorage::new("output"), None);
        let tables = pipeline.extract().await.unwrap();
        let platforms: Vec<Platform> = tables.iter().map(|t| t.platform).collect();
        assert_eq!(platforms, Platform::ALL.to_vec());
        assert_eq!(tables[0].len(), 3);
    }

    #[tokio::test]
    async fn test_extract_prefers_parquet_over_csv() {
        let data = seeded_data().await;
        data.put("tiktok.parquet", "definitely not parquet").await;
        let pipeline = pipeline(data, MockStorage::new("output"), None);

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, EtlError::ParquetError(_)));
    }

    #[tokio::test]
    async fn test_extract_missing_export() {
        let data = MockStorage::new("data");
        data.put("meta.csv", META_CSV).await;
        let pipeline = pipeline(data, MockStorage::new("output"), None);

        let err = pipeline.extract().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "No input file for Snapchat (looked for snapchat.parquet, snapchat.csv)"
        );
    }

    #[tokio::test]
    async fn test_transform_builds_all_artifacts() {
        let pipeline = pipeline(seeded_data().await, MockStorage::new("output"), None);
        let tables = pipeline.extract().await.unwrap();
        let result = pipeline.transform(tables).await.unwrap();

        // duplicate Meta row removed
        assert_eq!(result.platform_record_count, 5);
        assert_eq!(result.campaign_count, 2);

        let data_files: Vec<&str> = result
            .artifacts
            .iter()
            .filter(|a| a.target == ArtifactTarget::Data)
            .map(|a| a.file_name.as_str())
            .collect();
        assert_eq!(data_files, vec![PLATFORM_DATA_CSV, CLEANED_META_CSV]);

        let outputs = result
            .artifacts
            .iter()
            .filter(|a| a.target == ArtifactTarget::Output)
            .count();
        assert_eq!(outputs, 8);

        let weekly = result
            .artifacts
            .iter()
            .find(|a| a.file_name == WEEKLY_CSV)
            .unwrap();
        let weekly = String::from_utf8(weekly.content.clone()).unwrap();
        let rows: Vec<&str> = weekly.lines().collect();
        assert!(rows[1].starts_with("100,2017-01-02,2017-01-08,700,7,0,700,0,"));
        assert!(rows[1].ends_with(",1"));
        assert!(rows[2].starts_with("200,2017-01-09,2017-01-22,1400,14,0,0,700,700,"));
        assert!(rows[2].ends_with(",2"));
    }

    #[tokio::test]
    async fn test_load_writes_to_both_storages_and_bundles() {
        let data = seeded_data().await;
        let output = MockStorage::new("output");
        let pipeline = pipeline(data.clone(), output.clone(), Some("media_reports.zip"));

        let tables = pipeline.extract().await.unwrap();
        let result = pipeline.transform(tables).await.unwrap();
        let location = pipeline.load(result).await.unwrap();
        assert_eq!(location, "output");

        assert!(data.get_file(PLATFORM_DATA_CSV).await.is_some());
        assert!(data.get_file(CLEANED_META_CSV).await.is_some());

        let names = output.file_names().await;
        assert_eq!(names.len(), 9);
        assert!(names.contains(&IMPRESSIONS_CHART.to_string()));
        assert!(names.contains(&CTR_CHART.to_string()));

        let bundle = output.get_file("media_reports.zip").await.unwrap();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(bundle)).unwrap();
        assert_eq!(archive.len(), 8);
    }

    #[tokio::test]
    async fn test_load_without_bundle() {
        let output = MockStorage::new("output");
        let pipeline = pipeline(seeded_data().await, output.clone(), None);

        let tables = pipeline.extract().await.unwrap();
        let result = pipeline.transform(tables).await.unwrap();
        pipeline.load(result).await.unwrap();

        let names = output.file_names().await;
        assert_eq!(names.len(), 8);
        assert!(!names.iter().any(|n| n.ends_with(".zip")));
    }
}
