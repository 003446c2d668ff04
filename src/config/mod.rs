// 运行器配置模块
// 插件列表、报告、日志与环境配置的加载和验证

pub mod settings;
pub mod loader;
pub mod validator;

#[cfg(test)]
mod tests;

pub use settings::*;
pub use loader::*;
pub use validator::*;
