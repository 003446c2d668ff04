// Runner Plugins Common Package
// 插件结果报告的通用类型定义

pub mod types;
pub mod errors;

pub use types::*;
pub use errors::*;
