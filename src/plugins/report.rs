// 插件结果报告渲染

use runner_plugins_common::{AssertionResult, SpecResult};
use tracing::{error, info};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const NORMAL_COLOR: &str = "\x1b[39m";

/// 报告行级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    Info,
    Error,
}

/// 报告中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub level: ReportLevel,
    pub text: String,
}

/// 报告渲染器
#[derive(Debug, Clone)]
pub struct ReportRenderer {
    color: bool,
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self { color: true }
    }
}

impl ReportRenderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// 渲染 spec 列表
    ///
    /// 每个 spec 一行 Pass/Fail；失败 spec 下列出每条失败断言的消息和堆栈，缩进两个制表符。
    pub fn render(&self, specs: &[SpecResult]) -> Vec<ReportLine> {
        let mut lines = Vec::new();

        for spec in specs {
            let passed = spec.passed();
            lines.push(ReportLine {
                level: ReportLevel::Info,
                text: self.status_line(&spec.description, passed),
            });

            if passed {
                continue;
            }

            for assertion in spec.assertions.iter().filter(|a| !a.passed) {
                lines.extend(Self::failure_lines(assertion));
            }
        }

        lines
    }

    /// 渲染并输出到日志
    pub fn print(&self, specs: &[SpecResult]) {
        for line in self.render(specs) {
            match line.level {
                ReportLevel::Info => info!(target: "runner_plugins::report", "{}", line.text),
                ReportLevel::Error => error!(target: "runner_plugins::report", "{}", line.text),
            }
        }
    }

    fn status_line(&self, description: &str, passed: bool) -> String {
        let label = if passed { "Pass: " } else { "Fail: " };
        if self.color {
            let color = if passed { GREEN } else { RED };
            format!("{}\t{}{}{}", color, label, description, NORMAL_COLOR)
        } else {
            format!("\t{}{}", label, description)
        }
    }

    fn failure_lines(assertion: &AssertionResult) -> Vec<ReportLine> {
        let mut lines = vec![ReportLine {
            level: ReportLevel::Error,
            text: format!("\t\t{}", assertion.error_msg.as_deref().unwrap_or_default()),
        }];

        if let Some(stack_trace) = &assertion.stack_trace {
            lines.push(ReportLine {
                level: ReportLevel::Error,
                text: format!("\t\t{}", stack_trace.replace('\n', "\n\t\t")),
            });
        }

        lines
    }
}
