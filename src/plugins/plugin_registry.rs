// 插件注册表
// 保存按顺序加载的插件实例、实例身份以及提供给插件的结果上报能力

use std::fmt;
use std::sync::Arc;

use runner_plugins_common::{AssertionInfo, AssertionResult, SpecResult};
use tracing::{debug, error, warn};

use crate::errors::HarnessError;
use crate::plugins::assertions::AssertionStore;
use crate::plugins::plugin_interface::{Hook, Plugin, PluginConfigEntry};

/// 未提供消息时的失败描述
pub const DEFAULT_FAILURE_MESSAGE: &str = "Failure reported by plugin";

/// 插件上下文
/// 插件上报结果的唯一通道，绑定插件名称和共享断言存储
#[derive(Clone)]
pub struct PluginContext {
    name: Arc<str>,
    store: Arc<AssertionStore>,
}

impl PluginContext {
    pub(crate) fn new(name: impl Into<Arc<str>>, store: Arc<AssertionStore>) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    /// 插件名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 结果是否已经上报
    pub fn results_reported(&self) -> bool {
        self.store.is_reported()
    }

    /// 上报一条失败断言
    ///
    /// 结果上报之后调用返回 `ResultsAlreadyReported`。
    pub fn add_failure(&self, message: &str, info: AssertionInfo) -> Result<(), HarnessError> {
        let message = if message.is_empty() {
            DEFAULT_FAILURE_MESSAGE
        } else {
            message
        };
        let assertion = AssertionResult::fail(message, info.stack_trace.clone());
        self.add_assertion(&info, assertion)
    }

    /// 上报一条通过断言
    pub fn add_success(&self, info: AssertionInfo) -> Result<(), HarnessError> {
        self.add_assertion(&info, AssertionResult::pass())
    }

    /// 输出警告，不影响结果，任何时候都可调用
    pub fn add_warning(&self, message: &str, info: AssertionInfo) {
        match non_empty(&info.spec_name) {
            Some(spec_name) => warn!("Warning in {}: {}", spec_name, message),
            None => warn!("Warning from \"{}\" plugin: {}", self.name, message),
        }
    }

    fn add_assertion(&self, info: &AssertionInfo, assertion: AssertionResult) -> Result<(), HarnessError> {
        if self.try_add_assertion(info, assertion) {
            Ok(())
        } else {
            error!(plugin = %self.name, "结果已上报，拒绝写入新的断言");
            Err(HarnessError::results_already_reported(self.name.as_ref()))
        }
    }

    /// 写入断言；结果已上报时返回 false
    pub(crate) fn try_add_assertion(&self, info: &AssertionInfo, assertion: AssertionResult) -> bool {
        let spec_name = self.spec_name(info);
        debug!(plugin = %self.name, spec = %spec_name, passed = assertion.passed, "记录断言");
        self.store.try_record(&spec_name, assertion)
    }

    /// 结果上报后发生的钩子失败：立即输出一次性报告，不写入存储
    pub(crate) fn report_runtime_failure(&self, message: String, stack_trace: Option<String>) {
        let runtime = self.runtime_spec(message, stack_trace);
        self.store.renderer().print(std::slice::from_ref(&runtime));
    }

    /// 一次性 "<插件名> Runtime" 报告，只含一条失败断言
    pub fn runtime_spec(&self, message: impl Into<String>, stack_trace: Option<String>) -> SpecResult {
        SpecResult {
            description: format!("{} Runtime", self.name),
            assertions: vec![AssertionResult::fail(message, stack_trace)],
        }
    }

    fn spec_name(&self, info: &AssertionInfo) -> String {
        match non_empty(&info.spec_name) {
            Some(spec_name) => spec_name.to_string(),
            None => format!("{} Plugin Tests", self.name),
        }
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext").field("name", &self.name).finish()
    }
}

/// 插件实例
/// 包装外部提供的插件，附加身份、配置和上报能力，不修改原插件对象
#[derive(Clone)]
pub struct PluginInstance {
    index: usize,
    name: String,
    config: Arc<PluginConfigEntry>,
    plugin: Arc<dyn Plugin>,
    context: PluginContext,
}

impl PluginInstance {
    /// 为插件分配名称、保存配置并创建上报能力
    pub fn annotate(
        plugin: Arc<dyn Plugin>,
        config: Arc<PluginConfigEntry>,
        index: usize,
        store: Arc<AssertionStore>,
    ) -> Self {
        let name = Self::resolve_name(plugin.as_ref(), &config, index);
        let context = PluginContext::new(name.as_str(), store);

        Self {
            index,
            name,
            config,
            plugin,
            context,
        }
    }

    /// 名称解析顺序：插件自带名称、配置名称、path、package、"Plugin #<序号>"
    pub fn resolve_name(plugin: &dyn Plugin, config: &PluginConfigEntry, index: usize) -> String {
        plugin
            .name()
            .filter(|name| !name.is_empty())
            .or_else(|| non_empty(&config.name))
            .or_else(|| non_empty(&config.path))
            .or_else(|| non_empty(&config.package))
            .map(str::to_string)
            .unwrap_or_else(|| format!("Plugin #{}", index))
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &PluginConfigEntry {
        &self.config
    }

    pub fn plugin(&self) -> &Arc<dyn Plugin> {
        &self.plugin
    }

    pub fn context(&self) -> &PluginContext {
        &self.context
    }

    pub fn provides(&self, hook: Hook) -> bool {
        self.plugin.provides(hook)
    }

    pub fn skip_angular_stability(&self) -> bool {
        self.plugin.skip_angular_stability()
    }
}

impl fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginInstance")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("config", &self.config)
            .finish()
    }
}

/// 插件注册表
/// 按注册顺序保存插件实例，运行期间不增删
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    instances: Vec<PluginInstance>,
}

impl PluginRegistry {
    pub fn new(instances: Vec<PluginInstance>) -> Self {
        Self { instances }
    }

    pub fn instances(&self) -> &[PluginInstance] {
        &self.instances
    }

    /// 按注册顺序返回实现了指定钩子的实例
    pub fn providers(&self, hook: Hook) -> impl Iterator<Item = &PluginInstance> {
        self.instances.iter().filter(move |instance| instance.provides(hook))
    }

    /// 任一插件要求跳过时返回 true
    pub fn skip_angular_stability(&self) -> bool {
        self.instances.iter().any(PluginInstance::skip_angular_stability)
    }

    pub fn get(&self, name: &str) -> Option<&PluginInstance> {
        self.instances.iter().find(|instance| instance.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.instances.iter().map(PluginInstance::name).collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
