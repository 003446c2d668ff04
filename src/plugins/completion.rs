// 异步完成约定
// 将插件返回的两种异步约定统一为 Completion，并提供合并操作

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::plugins::plugin_interface::{HookError, HookOutput};

/// 异步完成约定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseConvention {
    /// 惰性任务，被等待时才推进
    Task,
    /// 延迟值，由后台任务推进并兑现
    Deferred,
}

/// 统一的内部异步结果类型
#[must_use = "Completion 需要被等待才能得到结果"]
pub struct Completion<T> {
    inner: BoxFuture<'static, T>,
}

impl<T: Send + 'static> Completion<T> {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            inner: future.boxed(),
        }
    }

    /// 已完成的结果
    pub fn ready(value: T) -> Self {
        Self::new(future::ready(value))
    }
}

impl<T> Future for Completion<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        self.inner.as_mut().poll(cx)
    }
}

/// 创建一对延迟值：兑现端和等待端
pub fn deferred<T>() -> (Deferred<T>, DeferredValue<T>) {
    let (tx, rx) = oneshot::channel();
    (Deferred { tx }, DeferredValue { rx })
}

/// 延迟值的兑现端
pub struct Deferred<T> {
    tx: oneshot::Sender<Result<T, HookError>>,
}

impl<T> Deferred<T> {
    /// 以成功值兑现
    pub fn fulfill(self, value: T) {
        // 等待端已丢弃时无人关心结果
        let _ = self.tx.send(Ok(value));
    }

    /// 以失败原因拒绝
    pub fn reject(self, cause: impl Into<HookError>) {
        let _ = self.tx.send(Err(cause.into()));
    }

    /// 等待端是否已被丢弃
    pub fn is_canceled(&self) -> bool {
        self.tx.is_canceled()
    }
}

/// 延迟值的等待端
/// 兑现端未完成就被丢弃时得到失败结果
pub struct DeferredValue<T> {
    rx: oneshot::Receiver<Result<T, HookError>>,
}

impl<T> Future for DeferredValue<T> {
    type Output = Result<T, HookError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.rx.poll_unpin(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(HookError::new(
                "deferred value was dropped without being settled",
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// 将钩子返回值统一为 Completion
pub fn normalize(output: HookOutput) -> Completion<Result<Value, HookError>> {
    match output {
        HookOutput::Ready(value) => Completion::ready(Ok(value)),
        HookOutput::Task(task) => Completion { inner: task },
        HookOutput::Deferred(value) => Completion::new(value),
    }
}

/// 合并多个 Completion，结果顺序与输入顺序一致
///
/// `Deferred` 约定下合并任务立即在当前 tokio 运行时上推进；没有运行时时退化为惰性合并。
/// 后台任务意外终止时使用 `on_cancel` 提供的结果。
pub fn combine<T, C>(
    items: Vec<Completion<T>>,
    convention: PromiseConvention,
    on_cancel: C,
) -> Completion<Vec<T>>
where
    T: Send + 'static,
    C: FnOnce() -> Vec<T> + Send + 'static,
{
    let joined = future::join_all(items);

    match (convention, tokio::runtime::Handle::try_current()) {
        (PromiseConvention::Deferred, Ok(handle)) => {
            let (resolver, value) = deferred();
            handle.spawn(async move {
                let results = joined.await;
                if resolver.is_canceled() {
                    debug!("合并结果无人等待，丢弃");
                    return;
                }
                resolver.fulfill(results);
            });
            Completion::new(async move {
                match value.await {
                    Ok(results) => results,
                    Err(e) => {
                        warn!("合并任务未完成: {}", e);
                        on_cancel()
                    }
                }
            })
        }
        _ => Completion::new(joined),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_deferred_fulfill() {
        let (resolver, value) = deferred::<u32>();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            resolver.fulfill(7);
        });
        assert_eq!(value.await, Ok(7));
    }

    #[tokio::test]
    async fn test_deferred_dropped_is_failure() {
        let (resolver, value) = deferred::<u32>();
        drop(resolver);
        let err = value.await.unwrap_err();
        assert!(err.message.contains("dropped"));
    }

    #[test]
    fn test_deferred_reports_dropped_waiter() {
        let (resolver, value) = deferred::<u32>();
        assert!(!resolver.is_canceled());
        drop(value);
        assert!(resolver.is_canceled());
    }

    #[tokio::test]
    async fn test_normalize_all_conventions() {
        let ready = normalize(HookOutput::Ready(Value::from(1))).await;
        assert_eq!(ready, Ok(Value::from(1)));

        let task = normalize(HookOutput::task(async { Ok(Value::from(2)) })).await;
        assert_eq!(task, Ok(Value::from(2)));

        let (resolver, value) = deferred();
        resolver.reject("rejected");
        let rejected = normalize(HookOutput::Deferred(value)).await;
        assert_eq!(rejected.unwrap_err().message, "rejected");
    }

    #[tokio::test]
    async fn test_combine_keeps_input_order() {
        let slow = Completion::new(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            "slow"
        });
        let fast = Completion::ready("fast");

        let results = combine(vec![slow, fast], PromiseConvention::Task, Vec::new).await;
        assert_eq!(results, vec!["slow", "fast"]);
    }

    #[tokio::test]
    async fn test_deferred_combine_runs_without_being_awaited() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let item = Completion::new(async move {
            flag.store(true, Ordering::SeqCst);
        });

        let combined = combine(vec![item], PromiseConvention::Deferred, Vec::new);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(combined.await.len(), 1);
    }

    #[tokio::test]
    async fn test_task_combine_is_lazy() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let item = Completion::new(async move {
            flag.store(true, Ordering::SeqCst);
        });

        let combined = combine(vec![item], PromiseConvention::Task, Vec::new);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!ran.load(Ordering::SeqCst));
        combined.await;
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_deferred_combine_without_runtime_falls_back() {
        let combined = combine(
            vec![Completion::ready(1), Completion::ready(2)],
            PromiseConvention::Deferred,
            Vec::new,
        );
        assert_eq!(futures::executor::block_on(combined), vec![1, 2]);
    }
}
