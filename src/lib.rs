// Runner Plugins Library
// 测试运行器插件生命周期与调度管理

pub mod config;
pub mod errors;
pub mod logging;
pub mod plugins;

pub use plugins::{PluginLoader, PluginManager};
