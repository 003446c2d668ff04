// 插件管理器
// 持有插件注册表和断言存储，向运行器提供各个钩子的扇出调用点和结果汇总

use std::sync::Arc;

use runner_plugins_common::PluginResults;
use serde_json::Value;
use tracing::{debug, info, Instrument, Span};

use crate::config::AppConfig;
use crate::errors::HarnessError;
use crate::log_with_run;
use crate::logging::RunContext;
use crate::plugins::assertions::AssertionStore;
use crate::plugins::completion::{combine, Completion, PromiseConvention};
use crate::plugins::lifecycle::invoke_hook;
use crate::plugins::plugin_interface::{Hook, PluginConfigEntry};
use crate::plugins::plugin_loader::PluginLoader;
use crate::plugins::plugin_registry::{PluginInstance, PluginRegistry};
use crate::plugins::report::ReportRenderer;

/// 插件管理器
pub struct PluginManager {
    registry: PluginRegistry,
    store: Arc<AssertionStore>,
    print_report: bool,
    run: RunContext,
    span: Span,
}

impl PluginManager {
    /// 按配置顺序加载插件并创建管理器
    pub fn new(entries: &[PluginConfigEntry], loader: &PluginLoader) -> Result<Self, HarnessError> {
        Self::with_store(entries, loader, Arc::new(AssertionStore::default()), true)
    }

    /// 根据应用配置创建管理器，报告颜色与输出开关取自 `report` 配置
    pub fn from_config(config: &AppConfig, loader: &PluginLoader) -> Result<Self, HarnessError> {
        let store = Arc::new(AssertionStore::new(ReportRenderer::new(config.report.color)));
        Self::with_store(&config.plugins, loader, store, config.report.print)
    }

    fn with_store(
        entries: &[PluginConfigEntry],
        loader: &PluginLoader,
        store: Arc<AssertionStore>,
        print_report: bool,
    ) -> Result<Self, HarnessError> {
        let instances = loader.load(entries, store.clone())?;
        Ok(Self::from_instances(instances, store, print_report))
    }

    fn from_instances(instances: Vec<PluginInstance>, store: Arc<AssertionStore>, print_report: bool) -> Self {
        let run = RunContext::new(instances.len());
        let span = run.span();
        let registry = PluginRegistry::new(instances);

        span.in_scope(|| {
            info!("插件管理器已创建: {:?}", registry.names());
            debug!("运行上下文: {:?}", run.to_log_fields());
        });

        Self {
            registry,
            store,
            print_report,
            run,
            span,
        }
    }

    /// 以钩子默认约定和默认失败值调度
    pub fn dispatch(&self, hook: Hook, args: &[Value]) -> Completion<Vec<Value>> {
        self.dispatch_with(hook, hook.convention(), None, args)
    }

    /// 扇出调用所有实现了该钩子的插件
    ///
    /// 每个插件钩子的同步部分在返回前执行；结果顺序与注册顺序一致，与完成顺序无关。
    /// 单个插件失败时对应位置为 `fail_value`，合并结果本身永远成功。
    pub fn dispatch_with(
        &self,
        hook: Hook,
        convention: PromiseConvention,
        fail_value: Option<Value>,
        args: &[Value],
    ) -> Completion<Vec<Value>> {
        let fail_value = fail_value.unwrap_or_else(|| hook.default_fail_value());
        let span = tracing::debug_span!(parent: &self.span, "dispatch", hook = %hook);

        let pending: Vec<Completion<Value>> = span.in_scope(|| {
            self.registry
                .providers(hook)
                .map(|instance| invoke_hook(instance, hook, args, fail_value.clone()))
                .collect()
        });

        let count = pending.len();
        let combined = combine(pending, convention, move || vec![fail_value; count]);
        Completion::new(combined.instrument(span))
    }

    pub fn setup(&self, args: Vec<Value>) -> Completion<Vec<Value>> {
        self.dispatch(Hook::Setup, &args)
    }

    pub fn on_prepare(&self, args: Vec<Value>) -> Completion<Vec<Value>> {
        self.dispatch(Hook::OnPrepare, &args)
    }

    pub fn teardown(&self, args: Vec<Value>) -> Completion<Vec<Value>> {
        self.dispatch(Hook::Teardown, &args)
    }

    pub fn post_results(&self, args: Vec<Value>) -> Completion<Vec<Value>> {
        self.dispatch(Hook::PostResults, &args)
    }

    pub fn post_test(&self, args: Vec<Value>) -> Completion<Vec<Value>> {
        self.dispatch(Hook::PostTest, &args)
    }

    pub fn on_page_load(&self, args: Vec<Value>) -> Completion<Vec<Value>> {
        self.dispatch(Hook::OnPageLoad, &args)
    }

    pub fn on_page_stable(&self, args: Vec<Value>) -> Completion<Vec<Value>> {
        self.dispatch(Hook::OnPageStable, &args)
    }

    pub fn wait_for_promise(&self, args: Vec<Value>) -> Completion<Vec<Value>> {
        self.dispatch(Hook::WaitForPromise, &args)
    }

    /// 失败插件对应位置为 `true`
    pub fn wait_for_condition(&self, args: Vec<Value>) -> Completion<Vec<Value>> {
        self.dispatch(Hook::WaitForCondition, &args)
    }

    /// 汇总结果并关闭写入
    ///
    /// 之后的 `add_failure`/`add_success` 返回错误，钩子失败改为立即输出 Runtime 报告。
    /// 重复调用会再次输出报告，状态保持已上报。
    pub fn get_results(&self) -> PluginResults {
        let results = self.store.publish();

        let _entered = self.span.enter();
        log_with_run!(
            info,
            self.run,
            failed = results.failed_count,
            specs = results.spec_results.len(),
            "插件结果已上报"
        );

        if self.print_report {
            self.store.renderer().print(&results.spec_results);
        }

        results
    }

    /// 任一插件要求跳过 Angular 稳定性等待时返回 true
    pub fn skip_angular_stability(&self) -> bool {
        self.registry.skip_angular_stability()
    }

    pub fn results_reported(&self) -> bool {
        self.store.is_reported()
    }

    pub fn plugin_count(&self) -> usize {
        self.registry.len()
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.registry.names()
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn run_context(&self) -> &RunContext {
        &self.run
    }
}
