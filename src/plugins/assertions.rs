// 断言存储
// 按 spec 名称汇总插件上报的断言，并维护一次性的结果发布状态

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use runner_plugins_common::{AssertionResult, PluginResults, SpecResult};

use crate::plugins::report::ReportRenderer;

/// 结果发布状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportState {
    /// 收集中，可以写入断言
    Collecting,
    /// 已发布，不再接受断言
    Reported,
}

/// 断言存储
///
/// 状态检查与写入在同一把锁内完成，发布与写入之间不存在竞争窗口。
pub struct AssertionStore {
    inner: Mutex<StoreInner>,
    renderer: ReportRenderer,
}

struct StoreInner {
    state: ReportState,
    specs: Vec<SpecResult>,
    index: HashMap<String, usize>,
}

impl AssertionStore {
    pub fn new(renderer: ReportRenderer) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                state: ReportState::Collecting,
                specs: Vec::new(),
                index: HashMap::new(),
            }),
            renderer,
        }
    }

    // 锁内不执行插件代码，中毒时数据仍然一致
    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 写入一条断言；结果已发布时返回 false 且不做任何修改
    pub fn try_record(&self, spec_name: &str, assertion: AssertionResult) -> bool {
        let mut inner = self.lock();
        if inner.state == ReportState::Reported {
            return false;
        }

        let position = match inner.index.get(spec_name) {
            Some(&position) => position,
            None => {
                let position = inner.specs.len();
                inner.specs.push(SpecResult {
                    description: spec_name.to_string(),
                    assertions: Vec::new(),
                });
                inner.index.insert(spec_name.to_string(), position);
                position
            }
        };
        inner.specs[position].assertions.push(assertion);
        true
    }

    /// 当前状态
    pub fn state(&self) -> ReportState {
        self.lock().state
    }

    pub fn is_reported(&self) -> bool {
        self.state() == ReportState::Reported
    }

    /// 展平为报告并切换到已发布状态
    pub fn publish(&self) -> PluginResults {
        let mut inner = self.lock();
        inner.state = ReportState::Reported;
        PluginResults::from_specs(inner.specs.clone())
    }

    /// 当前内容的快照，不改变状态
    pub fn snapshot(&self) -> PluginResults {
        PluginResults::from_specs(self.lock().specs.clone())
    }

    pub fn renderer(&self) -> &ReportRenderer {
        &self.renderer
    }
}

impl Default for AssertionStore {
    fn default() -> Self {
        Self::new(ReportRenderer::default())
    }
}
