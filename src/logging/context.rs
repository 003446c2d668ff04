// 日志上下文管理
// 一次插件运行的身份与计时信息

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::Span;
use uuid::Uuid;

/// 运行上下文
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub plugin_count: usize,
}

impl RunContext {
    /// 创建新的运行上下文
    pub fn new(plugin_count: usize) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            plugin_count,
        }
    }

    /// 本次运行的根 span，所有钩子调度都在其中记录
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "plugin_run",
            run_id = %self.run_id,
            plugins = self.plugin_count,
        )
    }

    /// 获取持续时间
    pub fn duration(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }

    /// 转换为日志字段
    pub fn to_log_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("run_id", self.run_id.clone()),
            ("started_at", self.started_at.to_rfc3339()),
            ("plugin_count", self.plugin_count.to_string()),
        ]
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(0)
    }
}

/// 日志上下文宏
#[macro_export]
macro_rules! log_with_run {
    ($level:ident, $context:expr, $($arg:tt)*) => {
        tracing::$level!(
            run_id = %$context.run_id,
            elapsed_ms = $context.duration().num_milliseconds(),
            $($arg)*
        );
    };
}
