// 统一错误类型定义

use runner_plugins_common::CommonError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 插件管理统一错误类型
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[serde(tag = "error_type", content = "details")]
pub enum HarnessError {
    /// 配置错误
    #[error("配置错误: {message}")]
    Configuration { message: String },

    /// 验证错误
    #[error("验证错误: {field} - {message}")]
    Validation { field: String, message: String },

    /// 资源未找到
    #[error("资源未找到: {resource}")]
    NotFound { resource: String },

    /// 结果已上报后仍尝试写入断言
    #[error("Cannot add new tests results, since they were already reported. (plugin: {plugin})")]
    ResultsAlreadyReported { plugin: String },

    /// IO 错误
    #[error("IO 错误: {message}")]
    Io { message: String },

    /// 内部错误
    #[error("内部错误: {message}")]
    Internal { message: String },
}

impl HarnessError {
    /// 获取错误代码
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::ResultsAlreadyReported { .. } => "RESULTS_ALREADY_REPORTED",
            Self::Io { .. } => "IO_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// 是否为致命错误（插件列表无法加载）
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Internal { .. })
    }

    /// 是否应该记录错误日志
    pub fn should_log(&self) -> bool {
        !matches!(self, Self::Validation { .. } | Self::NotFound { .. })
    }

    /// 创建配置错误
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// 创建验证错误
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// 创建资源未找到错误
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// 创建结果已上报错误
    pub fn results_already_reported(plugin: impl Into<String>) -> Self {
        Self::ResultsAlreadyReported {
            plugin: plugin.into(),
        }
    }

    /// 创建 IO 错误
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// 从 CommonError 转换
impl From<CommonError> for HarnessError {
    fn from(err: CommonError) -> Self {
        match err.code.as_str() {
            "VALIDATION_ERROR" => Self::validation("general", err.message),
            "CONFIGURATION_ERROR" => Self::configuration(err.message),
            _ => Self::internal(err.to_string()),
        }
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for HarnessError {
    fn from(err: config::ConfigError) -> Self {
        Self::configuration(format!("配置加载错误: {}", err))
    }
}

/// 从 std::io::Error 转换
impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found("文件或目录"),
            _ => Self::io(err.to_string()),
        }
    }
}

/// 从 serde_json::Error 转换
impl From<serde_json::Error> for HarnessError {
    fn from(err: serde_json::Error) -> Self {
        Self::validation("json", format!("JSON 解析错误: {}", err))
    }
}

/// 从 regex::Error 转换
impl From<regex::Error> for HarnessError {
    fn from(err: regex::Error) -> Self {
        Self::validation("pattern", format!("路径模式无效: {}", err))
    }
}
