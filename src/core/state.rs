//! 流水线状态：封闭的阶段枚举 + 贯穿所有智能体的 PipelineState
//!
//! 状态只由编排器与智能体推进；进入 SUCCESS / FAILED 后任何修改都会被忽略。

use std::fmt;

use serde::Serialize;

use crate::schema::{Blueprint, Persona};

/// 流水线阶段（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStatus {
    Planning,
    MappingRoles,
    Crafting,
    CheckingMemory,
    Optimizing,
    Validating,
    Refining,
    Linking,
    FinalModeration,
    Success,
    Failed,
}

impl PipelineStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStatus::Success | PipelineStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStatus::Planning => "PLANNING",
            PipelineStatus::MappingRoles => "MAPPING_ROLES",
            PipelineStatus::Crafting => "CRAFTING",
            PipelineStatus::CheckingMemory => "CHECKING_MEMORY",
            PipelineStatus::Optimizing => "OPTIMIZING",
            PipelineStatus::Validating => "VALIDATING",
            PipelineStatus::Refining => "REFINING",
            PipelineStatus::Linking => "LINKING",
            PipelineStatus::FinalModeration => "FINAL_MODERATION",
            PipelineStatus::Success => "SUCCESS",
            PipelineStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单次运行的全部数据；由发起运行的编排循环独占
#[derive(Debug, Clone, Serialize)]
pub struct PipelineState {
    initial_prompt: String,
    status: PipelineStatus,
    pub(crate) planned_tasks: Vec<String>,
    pub(crate) persona_blueprints: Vec<Blueprint>,
    pub(crate) generated_personas: Vec<Persona>,
    pub(crate) feedback_notes: Option<String>,
    pub(crate) validation_errors: Vec<String>,
}

impl PipelineState {
    pub fn new(initial_prompt: impl Into<String>) -> Self {
        Self {
            initial_prompt: initial_prompt.into(),
            status: PipelineStatus::Planning,
            planned_tasks: Vec::new(),
            persona_blueprints: Vec::new(),
            generated_personas: Vec::new(),
            feedback_notes: None,
            validation_errors: Vec::new(),
        }
    }

    pub fn initial_prompt(&self) -> &str {
        &self.initial_prompt
    }

    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn planned_tasks(&self) -> &[String] {
        &self.planned_tasks
    }

    pub fn persona_blueprints(&self) -> &[Blueprint] {
        &self.persona_blueprints
    }

    pub fn generated_personas(&self) -> &[Persona] {
        &self.generated_personas
    }

    pub fn feedback_notes(&self) -> Option<&str> {
        self.feedback_notes.as_deref()
    }

    pub fn validation_errors(&self) -> &[String] {
        &self.validation_errors
    }

    /// 推进到下一阶段；终态下忽略并返回 false
    pub(crate) fn advance(&mut self, next: PipelineStatus) -> bool {
        if self.is_terminal() {
            tracing::warn!(
                "ignoring transition {} -> {} on terminal pipeline state",
                self.status,
                next
            );
            return false;
        }
        self.status = next;
        true
    }

    /// 标记失败并记录原因；终态下忽略
    pub(crate) fn fail(&mut self, reason: impl Into<String>) -> bool {
        if self.is_terminal() {
            tracing::warn!("ignoring failure on terminal pipeline state ({})", self.status);
            return false;
        }
        self.status = PipelineStatus::Failed;
        self.feedback_notes = Some(reason.into());
        true
    }
}

/// 一次运行的最终结果：成功返回人设列表，失败只返回原因（不暴露部分结果）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Success { personas: Vec<Persona> },
    Failed { reason: String },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Success { .. })
    }

    pub fn personas(&self) -> Option<&[Persona]> {
        match self {
            PipelineOutcome::Success { personas } => Some(personas),
            PipelineOutcome::Failed { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            PipelineOutcome::Success { .. } => None,
            PipelineOutcome::Failed { reason } => Some(reason),
        }
    }
}

impl From<PipelineState> for PipelineOutcome {
    fn from(state: PipelineState) -> Self {
        match state.status {
            PipelineStatus::Success => PipelineOutcome::Success {
                personas: state.generated_personas,
            },
            _ => PipelineOutcome::Failed {
                reason: state
                    .feedback_notes
                    .unwrap_or_else(|| "Unknown error.".to_string()),
            },
        }
    }
}
