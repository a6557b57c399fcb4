//! Planner：把用户目标拆解为子任务列表

use crate::agents::prompts::{fill_template, PLANNER_PROMPT};
use crate::agents::request_structured;
use crate::core::{AgentError, PipelineState, PipelineStatus};
use crate::llm::ModelGateway;
use crate::schema::decode_tasks;

const AGENT: &str = "PlannerAgent";

pub async fn run_planner(
    state: &mut PipelineState,
    gateway: &dyn ModelGateway,
) -> Result<PipelineStatus, AgentError> {
    tracing::info!("[{}] Decomposing user goal into sub-tasks...", AGENT);

    let prompt = fill_template(PLANNER_PROMPT, &[("user_goal", state.initial_prompt())]);
    let response = request_structured(gateway, AGENT, &prompt).await?;

    let tasks = decode_tasks(&response).map_err(|e| {
        tracing::debug!("[{}] LLM response was: {}", AGENT, response);
        AgentError::schema(AGENT, e)
    })?;

    tracing::info!("[{}] Successfully planned {} tasks.", AGENT, tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        tracing::debug!("  - Task {}: {}", i + 1, task);
    }
    state.planned_tasks = tasks;
    Ok(PipelineStatus::MappingRoles)
}
