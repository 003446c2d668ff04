// 配置加载器
// 处理配置文件加载和环境变量解析

use crate::config::AppConfig;
use crate::errors::HarnessError;
use dotenvy::dotenv;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

/// 全局配置实例
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 初始化全局配置
    pub fn init(path: Option<&Path>) -> Result<&'static AppConfig, HarnessError> {
        // 加载 .env 文件
        if let Err(e) = dotenv() {
            warn!("无法加载 .env 文件: {}", e);
        }

        let config = match path {
            Some(path) => AppConfig::load_from(path)?,
            None => AppConfig::load()?,
        };

        config.validate()?;

        CONFIG
            .set(config)
            .map_err(|_| HarnessError::internal("配置已经初始化"))?;

        let config = Self::get()?;

        info!("配置加载成功");
        info!("环境: {}", config.environment.name);
        info!("版本: {}", config.environment.version);
        info!("插件数量: {}", config.plugins.len());

        Ok(config)
    }

    /// 获取全局配置
    pub fn get() -> Result<&'static AppConfig, HarnessError> {
        CONFIG
            .get()
            .ok_or_else(|| HarnessError::internal("配置未初始化，请先调用 ConfigLoader::init()"))
    }

    /// 打印配置摘要
    pub fn print_summary(config: &AppConfig) {
        println!("=== Runner Plugins 配置摘要 ===");
        println!("环境: {}", config.environment.name);
        println!("版本: {}", config.environment.version);
        println!("调试模式: {}", config.environment.debug);
        println!("插件目录: {}", config.base_dir().display());
        for (i, entry) in config.plugins.iter().enumerate() {
            println!("插件 #{}: {}", i, entry.describe());
        }
        println!("报告颜色: {}", config.report.color);
        println!("日志级别: {}", config.logging.level);
        println!("================================");
    }
}
