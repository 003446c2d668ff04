// 插件系统模块
// 插件加载、隔离调用、扇出调度和结果汇总

pub mod plugin_interface;
pub mod completion;
pub mod assertions;
pub mod report;
pub mod plugin_registry;
pub mod plugin_loader;
pub mod lifecycle;
pub mod plugin_manager;

pub use plugin_interface::*;
pub use completion::*;
pub use assertions::*;
pub use report::*;
pub use plugin_registry::*;
pub use plugin_loader::*;
pub use lifecycle::*;
pub use plugin_manager::*;
