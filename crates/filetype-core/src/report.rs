//! 工作流执行报告：记录“本次注册/清理中哪些步骤失败了”。
//!
//! 说明：
//! - 工作流对外总是“成功完成”，单步失败只写日志并记录在此报告中
//! - 报告可序列化为 JSON，便于命令行输出或上层审计
//!
//! 作者：文件类型关联项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::fmt;

use serde::Serialize;

use crate::error::RegistryError;
use crate::regpath::RegPath;

/// 工作流类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Workflow {
    /// 注册 ProgID 与扩展名关联。
    Register,
    /// 清理 ProgID 与扩展名关联。
    Remove,
}

/// 单步操作类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    ReadKey,
    CreateKey,
    SetValue,
    DeleteKey,
    DeleteValue,
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepAction::ReadKey => "read key",
            StepAction::CreateKey => "create key",
            StepAction::SetValue => "set value",
            StepAction::DeleteKey => "delete key",
            StepAction::DeleteValue => "delete value",
        })
    }
}

/// 一次失败的步骤。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub action: StepAction,
    /// 含根键名的完整路径。
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_name: Option<String>,
    /// 错误描述（来自存储层）。
    pub message: String,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.path)?;
        if let Some(name) = &self.value_name {
            write!(f, " [{name}]")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// 工作流执行报告。
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub workflow: Workflow,
    pub prog_id: String,
    /// 实际执行的存储操作次数（读+写）。
    pub steps_attempted: usize,
    pub failures: Vec<StepFailure>,
}

impl WorkflowReport {
    pub fn new(workflow: Workflow, prog_id: &str) -> Self {
        Self {
            workflow,
            prog_id: prog_id.to_string(),
            steps_attempted: 0,
            failures: Vec::new(),
        }
    }

    /// 所有步骤均成功。
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[StepFailure] {
        &self.failures
    }

    pub(crate) fn attempt(&mut self) {
        self.steps_attempted += 1;
    }

    pub(crate) fn record(
        &mut self,
        action: StepAction,
        path: &RegPath,
        value_name: Option<&str>,
        err: &RegistryError,
    ) -> &StepFailure {
        self.failures.push(StepFailure {
            action,
            path: path.to_string(),
            value_name: value_name.map(str::to_string),
            message: err.to_string(),
        });
        &self.failures[self.failures.len() - 1]
    }
}
