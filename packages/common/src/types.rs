// 插件结果报告类型定义

use serde::{Deserialize, Serialize};

/// 单条断言结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResult {
    /// 是否通过
    pub passed: bool,
    /// 错误消息（仅失败断言）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    /// 堆栈信息（仅失败断言）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

impl AssertionResult {
    /// 通过的断言
    pub fn pass() -> Self {
        Self {
            passed: true,
            error_msg: None,
            stack_trace: None,
        }
    }

    /// 失败的断言
    pub fn fail(error_msg: impl Into<String>, stack_trace: Option<String>) -> Self {
        Self {
            passed: false,
            error_msg: Some(error_msg.into()),
            stack_trace,
        }
    }
}

/// 一个 spec 的全部断言
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpecResult {
    /// spec 名称
    pub description: String,
    /// 按记录顺序排列的断言
    pub assertions: Vec<AssertionResult>,
}

impl SpecResult {
    /// 所有断言都通过时为 true（空 spec 视为通过）
    pub fn passed(&self) -> bool {
        self.assertions.iter().all(|a| a.passed)
    }

    /// 失败断言数
    pub fn failed_count(&self) -> usize {
        self.assertions.iter().filter(|a| !a.passed).count()
    }
}

/// 插件结果汇总报告
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PluginResults {
    /// 所有 spec 中失败断言的总数
    pub failed_count: usize,
    /// 按首次写入顺序排列的 spec 结果
    pub spec_results: Vec<SpecResult>,
}

impl PluginResults {
    /// 由 spec 列表构建报告并统计失败数
    pub fn from_specs(spec_results: Vec<SpecResult>) -> Self {
        let failed_count = spec_results.iter().map(SpecResult::failed_count).sum();
        Self {
            failed_count,
            spec_results,
        }
    }
}

/// 插件上报断言时附带的信息
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssertionInfo {
    /// 断言归属的 spec，缺省为 "<插件名> Plugin Tests"
    #[serde(default)]
    pub spec_name: Option<String>,
    /// 诊断用堆栈信息
    #[serde(default)]
    pub stack_trace: Option<String>,
}

impl AssertionInfo {
    pub fn spec(spec_name: impl Into<String>) -> Self {
        Self {
            spec_name: Some(spec_name.into()),
            stack_trace: None,
        }
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }
}
