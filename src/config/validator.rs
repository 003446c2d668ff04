// 配置验证器
// 提供详细的配置验证逻辑

use crate::config::{AppConfig, EnvironmentConfig, LoggingConfig};
use crate::errors::HarnessError;
use crate::plugins::PluginConfigEntry;

/// 支持的日志级别
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// 支持的日志格式
const LOG_FORMATS: [&str; 4] = ["json", "pretty", "compact", "full"];

/// 配置验证器
pub struct ConfigValidator;

impl ConfigValidator {
    /// 验证完整配置
    pub fn validate_all(config: &AppConfig) -> Result<(), Vec<HarnessError>> {
        let mut errors = Vec::new();

        for (index, entry) in config.plugins.iter().enumerate() {
            if let Err(e) = Self::validate_plugin(index, entry) {
                errors.push(e);
            }
        }

        if let Err(e) = Self::validate_logging(&config.logging) {
            errors.push(e);
        }

        if let Err(e) = Self::validate_environment(&config.environment) {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// 验证单个插件配置
    pub fn validate_plugin(index: usize, entry: &PluginConfigEntry) -> Result<(), HarnessError> {
        let field = format!("plugins[{}]", index);

        if entry.name.as_deref().is_some_and(str::is_empty) {
            return Err(HarnessError::validation(field, "插件名称不能为空字符串"));
        }

        if entry.inline.is_some() {
            return Ok(());
        }

        match (non_empty(&entry.path), non_empty(&entry.package)) {
            (Some(_), Some(_)) => Err(HarnessError::validation(
                field,
                "插件配置不能同时指定 path 和 package",
            )),
            (None, None) => Err(HarnessError::validation(
                field,
                "插件配置必须指定 path、package 或内联定义",
            )),
            _ => Ok(()),
        }
    }

    /// 验证日志配置
    pub fn validate_logging(config: &LoggingConfig) -> Result<(), HarnessError> {
        if !LOG_LEVELS.contains(&config.level.to_lowercase().as_str()) {
            return Err(HarnessError::validation(
                "logging.level",
                format!("无效的日志级别: {}", config.level),
            ));
        }

        if !LOG_FORMATS.contains(&config.format.as_str()) {
            return Err(HarnessError::validation(
                "logging.format",
                format!("无效的日志格式: {}", config.format),
            ));
        }

        if config.file_enabled && non_empty(&config.file_directory).is_none() {
            return Err(HarnessError::validation(
                "logging.file_directory",
                "启用文件日志时必须指定日志目录",
            ));
        }

        Ok(())
    }

    /// 验证环境配置
    pub fn validate_environment(config: &EnvironmentConfig) -> Result<(), HarnessError> {
        match config.name.as_str() {
            "development" | "production" | "test" => Ok(()),
            other => Err(HarnessError::validation(
                "environment.name",
                format!("未知的环境名称: {}", other),
            )),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
