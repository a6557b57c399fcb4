//! 流水线错误类型
//!
//! 所有智能体以 `Result<_, AgentError>` 报告硬失败；编排器将 Err 转为 FAILED 并把
//! `Display` 文本记入 `feedback_notes`，作为对调用方可见的失败原因。

use thiserror::Error;

use crate::schema::SchemaError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// 网关返回错误哨兵（error 键 / Error: 前缀 / 超时）
    #[error("{agent} failed: LLM call failed or returned an error. Details: {detail}")]
    Gateway { agent: &'static str, detail: String },

    #[error("{agent} failed: {source}")]
    Schema {
        agent: &'static str,
        #[source]
        source: SchemaError,
    },

    /// Crafter 单个蓝图失败，整阶段失败
    #[error("CrafterAgent failed for role '{role}': {detail}")]
    CraftFailed { role: String, detail: String },

    /// 前置条件不满足（上游契约被破坏）
    #[error("{agent} failed: {what}")]
    EmptyInput { agent: &'static str, what: &'static str },

    #[error("Validation failed and max retries were reached ({retries} retries). Last errors: {errors:?}")]
    RetriesExhausted { retries: u32, errors: Vec<String> },

    #[error("Pipeline entered an unknown state: {0}")]
    UnknownState(String),

    #[error("Pipeline cancelled")]
    Cancelled,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl AgentError {
    pub fn gateway(agent: &'static str, detail: impl Into<String>) -> Self {
        Self::Gateway {
            agent,
            detail: detail.into(),
        }
    }

    pub fn schema(agent: &'static str, source: SchemaError) -> Self {
        Self::Schema { agent, source }
    }
}

impl From<rusqlite::Error> for AgentError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_exhausted_mentions_max_retries() {
        let err = AgentError::RetriesExhausted {
            retries: 2,
            errors: vec!["missing moderator".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("max retries"));
        assert!(msg.contains("missing moderator"));
    }

    #[test]
    fn test_craft_failed_names_role() {
        let err = AgentError::CraftFailed {
            role: "Support Specialist".to_string(),
            detail: "timeout".to_string(),
        };
        assert!(err.to_string().contains("'Support Specialist'"));
    }

    #[test]
    fn test_schema_error_display() {
        let err = AgentError::schema("PlannerAgent", SchemaError::MissingList("tasks"));
        assert_eq!(
            err.to_string(),
            "PlannerAgent failed: LLM output did not contain a valid 'tasks' list"
        );
    }
}
