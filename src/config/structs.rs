use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::labels::LabelSchema;

/// Default configuration file, looked up in the working directory.
pub const CONFIG_FILE: &str = "control-metrics.toml";
/// Environment variable prefix, e.g. `QC__METRICS__BASE_LABELS=org,host`.
pub const ENV_PREFIX: &str = "QC";

/// 静态配置（从 TOML 加载，启动时使用）
///
/// - metrics: 基础标签名
/// - logging: 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StaticConfig {
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > control-metrics.toml > 默认值
    /// Falls back to defaults when the sources cannot be read.
    pub fn load() -> Self {
        match Self::load_from(CONFIG_FILE) {
            Ok(config) => {
                if Path::new(CONFIG_FILE).exists() {
                    eprintln!("[INFO] Configuration loaded from: {}", CONFIG_FILE);
                }
                config
            }
            Err(e) => {
                eprintln!("[ERROR] Failed to load config: {}", e);
                Self::default()
            }
        }
    }

    /// Load from an optional TOML file at `path`, overridden by `QC__*`
    /// environment variables.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        use config::{Config, Environment, File, FileFormat};

        let path = path.as_ref().to_string_lossy().into_owned();
        let settings = Config::builder()
            .add_source(File::new(&path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("metrics.base_labels")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize::<StaticConfig>()?)
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 指标配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsConfig {
    /// Base label names shared by every family, in order.
    #[serde(default = "default_base_labels")]
    pub base_labels: Vec<String>,
}

impl MetricsConfig {
    /// Validate the configured names into a schema.
    pub fn schema(&self) -> Result<LabelSchema> {
        LabelSchema::new(self.base_labels.iter().cloned())
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_file")]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_base_labels() -> Vec<String> {
    vec!["org".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_file() -> Option<String> {
    None
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            base_labels: default_base_labels(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: default_log_file(),
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}
