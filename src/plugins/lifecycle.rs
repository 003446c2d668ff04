// 插件钩子隔离调用
// 调用单个插件的单个钩子，捕获同步与异步失败并转换为结果记录，调用方永远得到成功结果

use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use runner_plugins_common::{AssertionInfo, AssertionResult};
use serde_json::Value;
use tracing::{debug, warn};

use crate::plugins::completion::{self, Completion};
use crate::plugins::plugin_interface::{Hook, HookError, HookOutput};
use crate::plugins::plugin_registry::{PluginContext, PluginInstance};

/// 隔离调用插件钩子
///
/// 钩子的同步部分在本函数返回前执行。失败（返回 `Err`、panic、异步结果失败）在结果上报前记录为
/// 该插件的失败断言，上报后立即输出 "<插件名> Runtime" 报告；两种情况下都以 `fail_value` 完成。
pub fn invoke_hook(
    instance: &PluginInstance,
    hook: Hook,
    args: &[Value],
    fail_value: Value,
) -> Completion<Value> {
    debug!(plugin = %instance.name(), hook = %hook, "调用插件钩子");

    let plugin = instance.plugin();
    let ctx = instance.context();

    let started = panic::catch_unwind(AssertUnwindSafe(|| plugin.invoke(hook, ctx, args)));
    let output = match started {
        Ok(Ok(output)) => output,
        Ok(Err(cause)) => {
            record_failure(ctx, hook, cause);
            return Completion::ready(fail_value);
        }
        Err(payload) => {
            record_failure(ctx, hook, HookError::from_panic(payload));
            return Completion::ready(fail_value);
        }
    };

    if let HookOutput::Ready(value) = output {
        return Completion::ready(value);
    }

    let pending = completion::normalize(output);
    let ctx = ctx.clone();
    Completion::new(async move {
        match AssertUnwindSafe(pending).catch_unwind().await {
            Ok(Ok(value)) => value,
            Ok(Err(cause)) => {
                record_failure(&ctx, hook, cause);
                fail_value
            }
            Err(payload) => {
                record_failure(&ctx, hook, HookError::from_panic(payload));
                fail_value
            }
        }
    })
}

/// 钩子失败的统一消息格式
pub fn failure_message(hook: Hook, cause: &HookError) -> String {
    format!("Failure during {}: {}", hook, cause.describe())
}

fn record_failure(ctx: &PluginContext, hook: Hook, cause: HookError) {
    let message = failure_message(hook, &cause);
    warn!(plugin = %ctx.name(), hook = %hook, "插件钩子失败: {}", cause.describe());

    let info = AssertionInfo {
        spec_name: None,
        stack_trace: cause.stack_trace.clone(),
    };
    let assertion = AssertionResult::fail(message.as_str(), cause.stack_trace);

    // 检查与写入是原子的；写入被拒绝说明结果已经上报
    if !ctx.try_add_assertion(&info, assertion) {
        ctx.report_runtime_failure(message, info.stack_trace);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::plugins::assertions::AssertionStore;
    use crate::plugins::completion::deferred;
    use crate::plugins::plugin_interface::{InlinePlugin, PluginConfigEntry};

    fn instance(plugin: InlinePlugin, store: &Arc<AssertionStore>) -> PluginInstance {
        PluginInstance::annotate(
            plugin.named("A").into_arc(),
            Arc::new(PluginConfigEntry::default()),
            0,
            store.clone(),
        )
    }

    fn single_failure(store: &AssertionStore) -> String {
        let results = store.snapshot();
        assert_eq!(results.failed_count, 1);
        assert_eq!(results.spec_results[0].description, "A Plugin Tests");
        results.spec_results[0].assertions[0]
            .error_msg
            .clone()
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_success_returns_hook_value() {
        let store = Arc::new(AssertionStore::default());
        let a = instance(
            InlinePlugin::new().on(Hook::PostTest, |_, args| Ok(HookOutput::Ready(args[0].clone()))),
            &store,
        );

        let value = invoke_hook(&a, Hook::PostTest, &[Value::from("spec-1")], Value::Null).await;
        assert_eq!(value, Value::from("spec-1"));
        assert!(store.snapshot().spec_results.is_empty());
    }

    #[tokio::test]
    async fn test_sync_error_and_async_rejection_look_the_same() {
        let sync_store = Arc::new(AssertionStore::default());
        let sync_plugin = instance(
            InlinePlugin::new().on(Hook::Setup, |_, _| Err(HookError::new("boom"))),
            &sync_store,
        );
        let async_store = Arc::new(AssertionStore::default());
        let async_plugin = instance(
            InlinePlugin::new().on(Hook::Setup, |_, _| {
                Ok(HookOutput::task(async { Err(HookError::new("boom")) }))
            }),
            &async_store,
        );

        let sync_value = invoke_hook(&sync_plugin, Hook::Setup, &[], Value::Null).await;
        let async_value = invoke_hook(&async_plugin, Hook::Setup, &[], Value::Null).await;

        assert_eq!(sync_value, Value::Null);
        assert_eq!(async_value, Value::Null);
        assert_eq!(single_failure(&sync_store), "Failure during setup: boom");
        assert_eq!(single_failure(&async_store), "Failure during setup: boom");
    }

    #[tokio::test]
    async fn test_panics_are_isolated() {
        let store = Arc::new(AssertionStore::default());
        let a = instance(
            InlinePlugin::new().on(Hook::Teardown, |_, _| panic!("kaboom")),
            &store,
        );
        let value = invoke_hook(&a, Hook::Teardown, &[], Value::from("fallback")).await;
        assert_eq!(value, Value::from("fallback"));
        assert_eq!(single_failure(&store), "Failure during teardown: kaboom");

        let store = Arc::new(AssertionStore::default());
        let a = instance(
            InlinePlugin::new().on(Hook::Teardown, |_, _| {
                Ok(HookOutput::task(async { panic!("late kaboom") }))
            }),
            &store,
        );
        invoke_hook(&a, Hook::Teardown, &[], Value::Null).await;
        assert_eq!(single_failure(&store), "Failure during teardown: late kaboom");
    }

    #[tokio::test]
    async fn test_deferred_rejection_and_drop() {
        let store = Arc::new(AssertionStore::default());
        let a = instance(
            InlinePlugin::new().on(Hook::WaitForPromise, |_, _| {
                let (resolver, value) = deferred();
                drop(resolver);
                Ok(HookOutput::Deferred(value))
            }),
            &store,
        );

        let value = invoke_hook(&a, Hook::WaitForPromise, &[], Value::Null).await;
        assert_eq!(value, Value::Null);
        assert!(single_failure(&store).starts_with("Failure during waitForPromise: deferred value"));
    }

    #[tokio::test]
    async fn test_stack_trace_is_attached() {
        let store = Arc::new(AssertionStore::default());
        let a = instance(
            InlinePlugin::new().on(Hook::Setup, |_, _| {
                Err(HookError::new("boom").with_stack_trace("at setup (a.js:1)"))
            }),
            &store,
        );

        invoke_hook(&a, Hook::Setup, &[], Value::Null).await;
        let results = store.snapshot();
        assert_eq!(
            results.spec_results[0].assertions[0].stack_trace.as_deref(),
            Some("at setup (a.js:1)")
        );
    }

    #[tokio::test]
    async fn test_failure_after_report_is_not_stored() {
        let store = Arc::new(AssertionStore::default());
        let a = instance(
            InlinePlugin::new().on(Hook::PostResults, |_, _| Err(HookError::new("too late"))),
            &store,
        );
        store.publish();

        let value = invoke_hook(&a, Hook::PostResults, &[], Value::Null).await;
        assert_eq!(value, Value::Null);
        assert!(store.snapshot().spec_results.is_empty());
    }

    #[tokio::test]
    async fn test_runtime_report_after_results_reported() {
        use crate::plugins::report::ReportRenderer;

        let store = Arc::new(AssertionStore::new(ReportRenderer::new(false)));
        let a = instance(
            InlinePlugin::new().on(Hook::PostResults, |_, _| Err(HookError::new("late"))),
            &store,
        );
        store.publish();
        invoke_hook(&a, Hook::PostResults, &[], Value::Null).await;

        let message = failure_message(Hook::PostResults, &HookError::new("late"));
        let runtime = a.context().runtime_spec(message, None);
        assert_eq!(runtime.description, "A Runtime");
        assert_eq!(runtime.assertions.len(), 1);
        assert!(!runtime.passed());

        let lines = store.renderer().render(std::slice::from_ref(&runtime));
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["\tFail: A Runtime", "\t\tFailure during postResults: late"]);
        assert!(store.snapshot().spec_results.is_empty());
    }

    #[test]
    fn test_runtime_spec_keeps_stack_trace() {
        let store = Arc::new(AssertionStore::default());
        let a = instance(InlinePlugin::new(), &store);

        let runtime = a.context().runtime_spec("Failure during teardown: x", Some("at t (a.js:2)".to_string()));
        assert_eq!(runtime.assertions[0].stack_trace.as_deref(), Some("at t (a.js:2)"));
        assert_eq!(runtime.failed_count(), 1);
    }

    #[test]
    fn test_failure_message_shape() {
        let cause = HookError::new("boom");
        assert_eq!(failure_message(Hook::OnPageLoad, &cause), "Failure during onPageLoad: boom");
    }
}
