use crate::core::weekly::{DEFAULT_FIRST_WEEK, DEFAULT_WEEK_COUNT};
use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_bind_address, validate_file_name, validate_path, validate_range, Validate,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_BUNDLE_FILENAME: &str = "media_reports.zip";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub paths: PathsConfig,
    pub calendar: CalendarConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "media-analytics".to_string(),
            description: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: String,
    pub output_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            output_dir: "./output".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Monday of CW0, written as a quoted `"YYYY-MM-DD"` string.
    pub first_week_start: NaiveDate,
    pub week_count: usize,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        let (y, m, d) = DEFAULT_FIRST_WEEK;
        Self {
            first_week_start: NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default(),
            week_count: DEFAULT_WEEK_COUNT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub bundle: bool,
    pub bundle_filename: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            bundle: true,
            bundle_filename: DEFAULT_BUNDLE_FILENAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            json_logs: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})，未定義的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn data_dir(&self) -> &str {
        &self.paths.data_dir
    }

    fn output_dir(&self) -> &str {
        &self.paths.output_dir
    }

    fn first_week_start(&self) -> NaiveDate {
        self.calendar.first_week_start
    }

    fn week_count(&self) -> usize {
        self.calendar.week_count
    }

    fn bundle_filename(&self) -> Option<&str> {
        self.output
            .bundle
            .then_some(self.output.bundle_filename.as_str())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_path("paths.data_dir", &self.paths.data_dir)?;
        validate_path("paths.output_dir", &self.paths.output_dir)?;
        validate_range("calendar.week_count", self.calendar.week_count, 1, 520)?;
        validate_bind_address("server.bind", &self.server.bind)?;
        if self.output.bundle {
            validate_file_name("output.bundle_filename", &self.output.bundle_filename)?;
        }
        Ok(())
    }
}
