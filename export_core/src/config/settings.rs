use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::exports::{DEFAULT_CHUNK_SIZE, DEFAULT_DOWNLOAD_ROUTE, SPREADSHEET_CONTENT_TYPE};

const RESERVED_ROUTES: &[&str] = &["/", "/health", "/ready", "/metrics"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub exports: ExportConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub dir: PathBuf,
    pub route: String,
    pub content_type: String,
    pub chunk_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub permissive: bool,
    pub max_age_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub log_requests: bool,
    pub log_headers: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            exports: ExportConfig::default(),
            cors: CorsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout_seconds: 30,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./exports"),
            route: DEFAULT_DOWNLOAD_ROUTE.to_string(),
            content_type: SPREADSHEET_CONTENT_TYPE.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            permissive: false,
            max_age_seconds: 3600,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_requests: true,
            log_headers: false,
        }
    }
}

impl CorsConfig {
    /// True when `permissive` is set or `"*"` appears among the origins.
    pub fn allows_any_origin(&self) -> bool {
        self.permissive || self.allowed_origins.iter().any(|origin| origin.trim() == "*")
    }
}

impl AppConfig {
    /// Defaults, then `config.toml` when present, then `APP_` environment
    /// variables (`APP_EXPORTS__DIR`, `APP_SERVER__PORT`, ...).
    pub fn load() -> Result<Self, ConfigError> {
        let file = Path::new("config.toml");
        Self::load_with_file(file.exists().then_some(file))
    }

    pub fn load_with_file(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("cors.allowed_origins")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port cannot be 0".to_string()));
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.exports.dir.as_os_str().is_empty() {
            return Err(ConfigError::Message(
                "Export directory cannot be empty".to_string(),
            ));
        }

        let route = &self.exports.route;
        if !route.starts_with('/') || route.contains('?') || route.contains('#') {
            return Err(ConfigError::Message(format!(
                "Export route must be an absolute path without query: {}",
                route
            )));
        }

        if RESERVED_ROUTES.contains(&route.as_str()) {
            return Err(ConfigError::Message(format!(
                "Export route conflicts with a built-in route: {}",
                route
            )));
        }

        if self.exports.content_type.parse::<mime::Mime>().is_err() {
            return Err(ConfigError::Message(format!(
                "Invalid export content type: {}",
                self.exports.content_type
            )));
        }

        if self.exports.chunk_size == 0 {
            return Err(ConfigError::Message(
                "Export chunk size must be greater than 0".to_string(),
            ));
        }

        if self.cors.allows_any_origin() {
            tracing::warn!("Permissive CORS enabled - any origin may fetch exports");
        }

        Ok(())
    }

    /// Export directory as an absolute path, resolved against the working
    /// directory when configured relative.
    pub fn export_dir(&self) -> Result<PathBuf, std::io::Error> {
        if self.exports.dir.is_absolute() {
            Ok(self.exports.dir.clone())
        } else {
            Ok(std::env::current_dir()?.join(&self.exports.dir))
        }
    }

    pub fn create_directories(&self) -> Result<(), std::io::Error> {
        std::fs::create_dir_all(self.export_dir()?)?;
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
