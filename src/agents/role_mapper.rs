//! RoleMapper：把任务列表映射为人设蓝图（角色 + 描述）
//!
//! 重试时同样只基于 planned_tasks 构建 prompt，不读取 feedback_notes。

use crate::agents::prompts::{fill_template, format_task_list, ROLE_MAPPER_PROMPT};
use crate::agents::request_structured;
use crate::core::{AgentError, PipelineState, PipelineStatus};
use crate::llm::ModelGateway;
use crate::schema::{decode_list, Blueprint};

const AGENT: &str = "RoleMapperAgent";

pub async fn run_role_mapper(
    state: &mut PipelineState,
    gateway: &dyn ModelGateway,
) -> Result<PipelineStatus, AgentError> {
    tracing::info!("[{}] Mapping tasks to persona roles...", AGENT);

    if state.planned_tasks().is_empty() {
        return Err(AgentError::EmptyInput {
            agent: AGENT,
            what: "No tasks were provided from the PlannerAgent.",
        });
    }

    let prompt = fill_template(
        ROLE_MAPPER_PROMPT,
        &[("task_list", format_task_list(state.planned_tasks()).as_str())],
    );
    let response = request_structured(gateway, AGENT, &prompt).await?;

    let blueprints: Vec<Blueprint> = decode_list(&response, "persona_blueprints").map_err(|e| {
        tracing::debug!("[{}] LLM response was: {}", AGENT, response);
        AgentError::schema(AGENT, e)
    })?;

    tracing::info!("[{}] Successfully defined {} persona roles.", AGENT, blueprints.len());
    for bp in &blueprints {
        tracing::debug!("  - Role: {} -> {}", bp.role, bp.description);
    }
    state.persona_blueprints = blueprints;
    Ok(PipelineStatus::Crafting)
}
