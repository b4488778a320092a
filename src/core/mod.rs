pub mod bundle;
pub mod charts;
pub mod cleaning;
pub mod etl;
pub mod platform_analysis;
pub mod values;
pub mod weekly;

pub use crate::domain::model::{RawTable, Record, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
