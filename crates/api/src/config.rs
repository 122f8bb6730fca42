use domain::models::EntryPolicy;
use domain::services::CodeGenerator;
use persistence::db::{INVITEE_NAME_MAX_LEN, INVITE_CODE_MAX_LEN, LEDGER_CODE_MAX_LEN};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub codes: CodesConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Upper bound on request bodies. Uploaded images arrive base64-encoded.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

/// Where invites and ledger events are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    File,
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Postgres => "postgres",
            StorageBackend::File => "file",
            StorageBackend::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,

    /// JSON document used by the `file` backend.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            data_file: default_data_file(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Emit Strict-Transport-Security. Only enable behind TLS termination.
    #[serde(default)]
    pub hsts_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,

    #[serde(default = "default_max_code_length")]
    pub max_code_length: usize,

    #[serde(default = "default_checkins_page_size")]
    pub checkins_page_size: i64,

    /// Uploads wider or taller than this many pixels are rejected before
    /// their pixel data is decoded.
    #[serde(default = "default_max_image_dimension")]
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_name_length: default_max_name_length(),
            max_code_length: default_max_code_length(),
            checkins_page_size: default_checkins_page_size(),
            max_image_dimension: default_max_image_dimension(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodesConfig {
    #[serde(default = "default_code_prefix")]
    pub prefix: String,

    #[serde(default = "default_suffix_length")]
    pub suffix_length: usize,

    /// `single_entry` (default) or `unlimited`.
    #[serde(default)]
    pub entry_policy: EntryPolicy,
}

impl Default for CodesConfig {
    fn default() -> Self {
        Self {
            prefix: default_code_prefix(),
            suffix_length: default_suffix_length(),
            entry_policy: EntryPolicy::default(),
        }
    }
}

impl CodesConfig {
    pub fn generator(&self) -> Result<CodeGenerator, domain::CheckinError> {
        CodeGenerator::new(&self.prefix, self.suffix_length)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// Directory where rendered barcode PNGs are written.
    #[serde(default = "default_artifacts_dir")]
    pub dir: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: default_artifacts_dir(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_body_size() -> usize {
    10 * 1024 * 1024
}
fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_storage_backend() -> StorageBackend {
    StorageBackend::File
}
fn default_data_file() -> PathBuf {
    PathBuf::from("data/checkin.json")
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_max_name_length() -> usize {
    100
}
fn default_max_code_length() -> usize {
    256
}
fn default_checkins_page_size() -> i64 {
    50
}
fn default_max_image_dimension() -> u32 {
    4096
}
fn default_code_prefix() -> String {
    "ARD".to_string()
}
fn default_suffix_length() -> usize {
    10
}
fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("data/artifacts")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with CHECKIN__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("CHECKIN")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("security.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30
            max_body_size = 10485760

            [database]
            url = ""

            [storage]
            backend = "memory"

            [logging]
            level = "info"
            format = "json"

            [codes]
            prefix = "ARD"
            suffix_length = 10
            entry_policy = "single_entry"
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        // Skip validation so tests can inspect partial configs
        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "CHECKIN__DATABASE__URL must be set when storage.backend = postgres".to_string(),
            ));
        }

        if self.storage.backend == StorageBackend::File
            && self.storage.data_file.as_os_str().is_empty()
        {
            return Err(ConfigValidationError::MissingRequired(
                "storage.data_file must be set when storage.backend = file".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.socket_addr().is_err() {
            return Err(ConfigValidationError::InvalidValue(format!(
                "server.host '{}' is not a valid IP address",
                self.server.host
            )));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        let generator = self
            .codes
            .generator()
            .map_err(|e| ConfigValidationError::InvalidValue(format!("codes: {}", e)))?;

        if generator.code_length() > INVITE_CODE_MAX_LEN {
            return Err(ConfigValidationError::InvalidValue(format!(
                "codes: prefix and suffix produce {}-character codes, at most {} are stored",
                generator.code_length(),
                INVITE_CODE_MAX_LEN
            )));
        }

        if self.limits.max_name_length == 0
            || self.limits.max_code_length == 0
            || self.limits.max_image_dimension == 0
        {
            return Err(ConfigValidationError::InvalidValue(
                "limits must be greater than 0".to_string(),
            ));
        }

        if self.limits.max_name_length > INVITEE_NAME_MAX_LEN {
            return Err(ConfigValidationError::InvalidValue(format!(
                "limits.max_name_length cannot exceed {}",
                INVITEE_NAME_MAX_LEN
            )));
        }

        if self.limits.max_code_length > LEDGER_CODE_MAX_LEN {
            return Err(ConfigValidationError::InvalidValue(format!(
                "limits.max_code_length cannot exceed {}",
                LEDGER_CODE_MAX_LEN
            )));
        }

        if !(1..=500).contains(&self.limits.checkins_page_size) {
            return Err(ConfigValidationError::InvalidValue(
                "limits.checkins_page_size must be between 1 and 500".to_string(),
            ));
        }

        if self.artifacts.dir.as_os_str().is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "artifacts.dir must be set".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
