// 插件配置检查工具
// 加载运行器配置，初始化日志，逐项检查插件来源能否解析

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use runner_plugins::config::ConfigLoader;
use runner_plugins::logging::LoggingSetup;
use runner_plugins::plugins::PluginLoader;

fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);

    let config = ConfigLoader::init(config_path.as_deref()).context("加载配置失败")?;
    let _guard = LoggingSetup::init(&config.logging)?;

    tracing::info!("启动 runner-plugins-check v{}", config.environment.version);
    ConfigLoader::print_summary(config);

    let loader = PluginLoader::new(config.base_dir());
    let mut unresolved = 0;

    for (index, entry) in config.plugins.iter().enumerate() {
        if entry.package.is_some() && entry.path.is_none() {
            tracing::info!("插件 #{} 为包引用，需由运行器注册: {}", index, entry.describe());
            continue;
        }

        match loader.can_resolve(entry) {
            Ok(()) => tracing::info!("插件 #{} 可以解析: {}", index, entry.describe()),
            Err(e) => {
                tracing::error!("插件 #{} 无法解析: {}", index, e);
                unresolved += 1;
            }
        }
    }

    if unresolved > 0 {
        bail!("{} 个插件配置无法解析", unresolved);
    }

    tracing::info!("全部 {} 个插件配置检查通过", config.plugins.len());
    Ok(())
}
