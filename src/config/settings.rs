// 应用程序设置和配置
// 定义配置结构体和加载逻辑

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::HarnessError;
use crate::plugins::PluginConfigEntry;

/// 默认配置文件名（不含扩展名）
pub const DEFAULT_CONFIG_NAME: &str = "runner";

/// 环境变量前缀
pub const ENV_PREFIX: &str = "RUNNER";

/// 应用程序配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 插件配置列表，按顺序加载
    #[serde(default)]
    pub plugins: Vec<PluginConfigEntry>,
    /// 插件 path 的解析基准目录，缺省为配置文件所在目录
    #[serde(default)]
    pub config_dir: Option<PathBuf>,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
    pub environment: EnvironmentConfig,
}

/// 报告输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// 是否使用 ANSI 颜色
    pub color: bool,
    /// getResults 时是否输出报告
    pub print: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            color: true,
            print: true,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file_enabled: bool,
    pub file_directory: Option<String>,
    pub file_prefix: Option<String>,
}

/// 环境配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub name: String,
    pub debug: bool,
    pub version: String,
}

impl AppConfig {
    /// 从环境变量和默认配置文件加载配置
    pub fn load() -> Result<Self, ConfigError> {
        let path = Path::new("runner.toml");
        if path.exists() {
            Self::load_from(path)
        } else {
            Self::build(None)
        }
    }

    /// 从指定配置文件加载配置
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut app_config = Self::build(Some(path))?;

        // path 插件相对于配置文件目录解析
        if app_config.config_dir.is_none() {
            app_config.config_dir = path.parent().map(Path::to_path_buf);
        }

        Ok(app_config)
    }

    fn build(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::builder();

        // 1. 加载默认配置
        config = config.add_source(Config::try_from(&AppConfig::default())?);

        // 2. 加载配置文件
        if let Some(file) = file {
            config = config.add_source(File::from(file));
        }

        // 3. 加载环境变量（优先级最高）
        config = config.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

        let config = config.build()?;
        let mut app_config: AppConfig = config.try_deserialize()?;

        app_config.environment.version = env!("CARGO_PKG_VERSION").to_string();

        Ok(app_config)
    }

    /// 验证配置
    pub fn validate(&self) -> Result<(), HarnessError> {
        use crate::config::ConfigValidator;

        match ConfigValidator::validate_all(self) {
            Ok(()) => Ok(()),
            Err(errors) => {
                let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                Err(HarnessError::configuration(format!(
                    "配置验证失败: {}",
                    error_messages.join("; ")
                )))
            }
        }
    }

    /// 插件 path 的解析基准目录
    pub fn base_dir(&self) -> PathBuf {
        self.config_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn is_development(&self) -> bool {
        self.environment.name == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment.name == "production"
    }

    pub fn is_test(&self) -> bool {
        self.environment.name == "test"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            plugins: Vec::new(),
            config_dir: None,
            report: ReportConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "full".to_string(),
                file_enabled: false,
                file_directory: None,
                file_prefix: None,
            },
            environment: EnvironmentConfig {
                name: "development".to_string(),
                debug: true,
                version: "0.1.0".to_string(),
            },
        }
    }
}
