//! 流水线过程事件：供 CLI / Web 前端展示阶段进度

use serde::Serialize;

use crate::core::PipelineStatus;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// 进入某阶段
    StageStarted { status: PipelineStatus },
    /// 第 attempt 次校验未通过（attempt 从 1 开始）
    ValidationFailed { attempt: u32, errors: Vec<String> },
    /// 运行结束
    Finished { success: bool },
}
