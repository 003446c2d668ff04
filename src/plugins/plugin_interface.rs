// 插件接口规范
// 定义插件钩子集合、钩子返回约定和插件配置

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::errors::HarnessError;
use crate::plugins::completion::{DeferredValue, PromiseConvention};
use crate::plugins::plugin_registry::PluginContext;

/// 插件钩子
/// 固定的钩子集合，插件可以实现其中任意多个
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Hook {
    /// 运行开始前
    Setup,
    /// 框架就绪后、测试开始前
    OnPrepare,
    /// 运行结束后
    Teardown,
    /// 结果上报后
    PostResults,
    /// 每个测试结束后
    PostTest,
    /// 页面加载后
    OnPageLoad,
    /// 页面稳定后
    OnPageStable,
    /// 等待页面异步任务
    WaitForPromise,
    /// 页面就绪条件检查
    WaitForCondition,
}

impl Hook {
    /// 全部钩子
    pub const ALL: [Hook; 9] = [
        Hook::Setup,
        Hook::OnPrepare,
        Hook::Teardown,
        Hook::PostResults,
        Hook::PostTest,
        Hook::OnPageLoad,
        Hook::OnPageStable,
        Hook::WaitForPromise,
        Hook::WaitForCondition,
    ];

    /// 钩子在插件接口中的名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::Setup => "setup",
            Hook::OnPrepare => "onPrepare",
            Hook::Teardown => "teardown",
            Hook::PostResults => "postResults",
            Hook::PostTest => "postTest",
            Hook::OnPageLoad => "onPageLoad",
            Hook::OnPageStable => "onPageStable",
            Hook::WaitForPromise => "waitForPromise",
            Hook::WaitForCondition => "waitForCondition",
        }
    }

    /// 该钩子合并结果所使用的完成约定
    pub fn convention(&self) -> PromiseConvention {
        match self {
            Hook::Setup | Hook::OnPrepare | Hook::Teardown | Hook::PostResults | Hook::PostTest => {
                PromiseConvention::Task
            }
            Hook::OnPageLoad | Hook::OnPageStable | Hook::WaitForPromise | Hook::WaitForCondition => {
                PromiseConvention::Deferred
            }
        }
    }

    /// 钩子失败时的替代返回值
    ///
    /// `waitForCondition` 失败时视为条件已满足。
    pub fn default_fail_value(&self) -> Value {
        match self {
            Hook::WaitForCondition => Value::Bool(true),
            _ => Value::Null,
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 插件接口
/// 所有插件必须实现此接口；钩子是否存在由 `provides` 在每次调用前检查
pub trait Plugin: Send + Sync {
    /// 插件自带的名称，优先级最高
    fn name(&self) -> Option<&str> {
        None
    }

    /// 是否跳过 Angular 稳定性等待
    fn skip_angular_stability(&self) -> bool {
        false
    }

    /// 是否实现了指定钩子
    fn provides(&self, hook: Hook) -> bool;

    /// 同步调用钩子
    ///
    /// 返回 `Err` 或 panic 均视为钩子失败，由调用隔离层处理。
    fn invoke(&self, hook: Hook, ctx: &PluginContext, args: &[Value]) -> HookReturn;
}

/// 钩子调用结果
pub type HookReturn = Result<HookOutput, HookError>;

/// 钩子返回值
/// 支持同步值和两种异步完成约定
pub enum HookOutput {
    /// 同步返回值
    Ready(Value),
    /// 惰性异步任务，在被轮询时执行
    Task(BoxFuture<'static, Result<Value, HookError>>),
    /// 由插件在任意位置完成的延迟值
    Deferred(DeferredValue<Value>),
}

impl HookOutput {
    /// 无返回值
    pub fn none() -> Self {
        HookOutput::Ready(Value::Null)
    }

    /// 包装异步任务
    pub fn task<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, HookError>> + Send + 'static,
    {
        HookOutput::Task(future.boxed())
    }
}

impl From<Value> for HookOutput {
    fn from(value: Value) -> Self {
        HookOutput::Ready(value)
    }
}

impl From<DeferredValue<Value>> for HookOutput {
    fn from(value: DeferredValue<Value>) -> Self {
        HookOutput::Deferred(value)
    }
}

impl fmt::Debug for HookOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookOutput::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            HookOutput::Task(_) => f.write_str("Task(..)"),
            HookOutput::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// 钩子失败原因
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HookError {
    /// 错误消息
    pub message: String,
    /// 堆栈信息
    pub stack_trace: Option<String>,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack_trace: None,
        }
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    /// 从 panic 负载提取错误消息
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        if let Some(msg) = payload.downcast_ref::<&'static str>() {
            return Self::new(*msg);
        }
        if let Some(msg) = payload.downcast_ref::<String>() {
            return Self::new(msg.clone());
        }
        if let Some(err) = payload.downcast_ref::<HookError>() {
            return err.clone();
        }
        Self::new("non-string panic payload")
    }

    /// 用于失败消息的描述，消息为空时退回到调试表示
    pub fn describe(&self) -> String {
        if self.message.is_empty() {
            format!("{:?}", self)
        } else {
            self.message.clone()
        }
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<HarnessError> for HookError {
    fn from(err: HarnessError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<anyhow::Error> for HookError {
    fn from(err: anyhow::Error) -> Self {
        let backtrace = err.backtrace();
        let stack_trace = match backtrace.status() {
            std::backtrace::BacktraceStatus::Captured => Some(backtrace.to_string()),
            _ => {
                let causes: Vec<String> = err.chain().skip(1).map(|c| c.to_string()).collect();
                (!causes.is_empty()).then(|| format!("caused by: {}", causes.join("\ncaused by: ")))
            }
        };
        Self {
            message: err.to_string(),
            stack_trace,
        }
    }
}

/// 插件配置项
/// `inline`、`path`、`package` 三选一，`inline` 只能通过代码提供
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct PluginConfigEntry {
    /// 显式名称
    #[serde(default)]
    pub name: Option<String>,
    /// 插件文件路径模式，相对于配置目录
    #[serde(default)]
    pub path: Option<String>,
    /// 插件包名
    #[serde(default)]
    pub package: Option<String>,
    /// 传给插件的自定义参数
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    /// 内联插件定义
    #[serde(skip)]
    pub inline: Option<Arc<dyn Plugin>>,
}

impl PluginConfigEntry {
    pub fn inline(plugin: Arc<dyn Plugin>) -> Self {
        Self {
            inline: Some(plugin),
            ..Default::default()
        }
    }

    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn package(package: impl Into<String>) -> Self {
        Self {
            package: Some(package.into()),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    /// 配置来源的简短描述
    pub fn describe(&self) -> String {
        let source = if self.inline.is_some() {
            "inline".to_string()
        } else if let Some(path) = &self.path {
            format!("path={}", path)
        } else if let Some(package) = &self.package {
            format!("package={}", package)
        } else {
            "<无来源>".to_string()
        };

        match &self.name {
            Some(name) => format!("{} ({})", name, source),
            None => source,
        }
    }
}

impl fmt::Debug for PluginConfigEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginConfigEntry")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("package", &self.package)
            .field("parameters", &self.parameters)
            .field("inline", &self.inline.is_some())
            .finish()
    }
}

/// 钩子处理函数
pub type HookHandler = dyn Fn(&PluginContext, &[Value]) -> HookReturn + Send + Sync;

/// 由闭包组成的插件
/// 用于内联插件定义
#[derive(Clone, Default)]
pub struct InlinePlugin {
    name: Option<String>,
    skip_angular_stability: bool,
    handlers: HashMap<Hook, Arc<HookHandler>>,
}

impl InlinePlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn skipping_angular_stability(mut self, skip: bool) -> Self {
        self.skip_angular_stability = skip;
        self
    }

    /// 注册钩子处理函数
    pub fn on<F>(mut self, hook: Hook, handler: F) -> Self
    where
        F: Fn(&PluginContext, &[Value]) -> HookReturn + Send + Sync + 'static,
    {
        self.handlers.insert(hook, Arc::new(handler));
        self
    }

    pub fn into_arc(self) -> Arc<dyn Plugin> {
        Arc::new(self)
    }
}

impl Plugin for InlinePlugin {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn skip_angular_stability(&self) -> bool {
        self.skip_angular_stability
    }

    fn provides(&self, hook: Hook) -> bool {
        self.handlers.contains_key(&hook)
    }

    fn invoke(&self, hook: Hook, ctx: &PluginContext, args: &[Value]) -> HookReturn {
        match self.handlers.get(&hook) {
            Some(handler) => handler(ctx, args),
            None => Err(HookError::new(format!("{} is not implemented", hook))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_names() {
        assert_eq!(Hook::Setup.to_string(), "setup");
        assert_eq!(Hook::WaitForCondition.as_str(), "waitForCondition");
        assert_eq!(serde_json::to_string(&Hook::OnPageLoad).unwrap(), "\"onPageLoad\"");
    }

    #[test]
    fn test_hook_conventions_and_fail_values() {
        let task_hooks: Vec<Hook> = Hook::ALL
            .iter()
            .copied()
            .filter(|h| h.convention() == PromiseConvention::Task)
            .collect();
        assert_eq!(
            task_hooks,
            vec![Hook::Setup, Hook::OnPrepare, Hook::Teardown, Hook::PostResults, Hook::PostTest]
        );

        assert_eq!(Hook::WaitForCondition.default_fail_value(), Value::Bool(true));
        assert_eq!(Hook::WaitForPromise.default_fail_value(), Value::Null);
    }

    #[test]
    fn test_hook_error_from_panic_payload() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(HookError::from_panic(payload).message, "boom");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(HookError::from_panic(payload).message, "bang");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42_u32);
        assert_eq!(HookError::from_panic(payload).message, "non-string panic payload");
    }

    #[test]
    fn test_hook_error_from_anyhow_keeps_causes() {
        let err = anyhow::anyhow!("socket closed").context("page load failed");
        let hook_error = HookError::from(err);
        assert_eq!(hook_error.message, "page load failed");
        assert!(hook_error.stack_trace.is_some());
    }

    #[test]
    fn test_hook_error_describe_empty_message() {
        let err = HookError::new("");
        assert!(err.describe().contains("HookError"));
    }

    #[test]
    fn test_inline_plugin_presence() {
        let plugin = InlinePlugin::new()
            .named("timeline")
            .on(Hook::Setup, |_, _| Ok(HookOutput::none()));

        assert_eq!(plugin.name(), Some("timeline"));
        assert!(plugin.provides(Hook::Setup));
        assert!(!plugin.provides(Hook::Teardown));
        assert!(!plugin.skip_angular_stability());
    }

    #[test]
    fn test_config_entry_describe() {
        let entry = PluginConfigEntry::package("console-plugin").with_name("console");
        assert_eq!(entry.describe(), "console (package=console-plugin)");

        let entry = PluginConfigEntry::inline(InlinePlugin::new().into_arc());
        assert_eq!(entry.describe(), "inline");
    }

    #[test]
    fn test_config_entry_deserialize() {
        let entry: PluginConfigEntry = serde_json::from_str(
            r#"{"path": "plugins/*.js", "parameters": {"failOnWarning": true}}"#,
        )
        .unwrap();

        assert_eq!(entry.path.as_deref(), Some("plugins/*.js"));
        assert!(entry.package.is_none());
        assert!(entry.inline.is_none());
        assert_eq!(entry.parameters["failOnWarning"], Value::Bool(true));
    }
}
