use crate::domain::model::{RawTable, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
    /// Human readable location, used in logs and as the pipeline's reported output path.
    fn location(&self) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn data_dir(&self) -> &str;
    fn output_dir(&self) -> &str;
    fn first_week_start(&self) -> NaiveDate;
    fn week_count(&self) -> usize;
    fn bundle_filename(&self) -> Option<&str>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<RawTable>>;
    async fn transform(&self, data: Vec<RawTable>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
