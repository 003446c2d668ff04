// 错误处理模块
// 配置、加载与结果上报的统一错误类型

pub mod types;


pub use types::*;
