pub mod analytics_pipeline;
