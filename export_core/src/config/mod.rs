//! Service configuration

pub mod settings;

pub use settings::{AppConfig, CorsConfig, ExportConfig, LoggingConfig, ServerConfig};
