//! 智能体：每个阶段一次结构化模型请求 + 严格校验
//!
//! 普通阶段签名为 `async fn(&mut PipelineState, gateway) -> Result<PipelineStatus, AgentError>`，
//! 返回下一阶段；Validator 只返回结论，重试逻辑由编排器负责。

pub mod crafter;
pub mod feedback_loop;
pub mod formatter;
pub mod linker;
pub mod memory_checker;
pub mod moderation;
pub mod optimizer;
pub mod planner;
pub mod prompts;
pub mod role_mapper;
pub mod validator;

pub use crafter::run_crafter;
pub use feedback_loop::run_feedback_loop;
pub use formatter::format_characters;
pub use linker::run_linker;
pub use memory_checker::{check_redundancy, run_memory_checker, RedundancyAdvice};
pub use moderation::run_final_moderation;
pub use optimizer::run_optimizer;
pub use planner::run_planner;
pub use role_mapper::run_role_mapper;
pub use validator::run_validator;

use serde_json::Value;

use crate::core::AgentError;
use crate::llm::{structured_error, ModelGateway};

/// 发起结构化请求；`error` 键转为 `AgentError::Gateway`
pub(crate) async fn request_structured(
    gateway: &dyn ModelGateway,
    agent: &'static str,
    prompt: &str,
) -> Result<Value, AgentError> {
    let response = gateway.generate_structured(prompt).await;
    match structured_error(&response) {
        Some(detail) => {
            tracing::debug!("[{}] LLM response was: {}", agent, response);
            Err(AgentError::gateway(agent, detail))
        }
        None => Ok(response),
    }
}
