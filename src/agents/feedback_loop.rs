//! FeedbackLoop：根据校验错误生成一句给 RoleMapper 的改进指令

use crate::agents::prompts::{fill_template, FEEDBACK_PROMPT};
use crate::core::{AgentError, PipelineState, PipelineStatus};
use crate::llm::{is_error_text, ModelGateway};
use crate::schema::personas_to_json;

const AGENT: &str = "FeedbackLoopAgent";

pub async fn run_feedback_loop(
    state: &mut PipelineState,
    gateway: &dyn ModelGateway,
) -> Result<PipelineStatus, AgentError> {
    tracing::info!("[{}] Generating refinement instructions...", AGENT);

    if state.validation_errors().is_empty() {
        return Err(AgentError::EmptyInput {
            agent: AGENT,
            what: "called without validation errors",
        });
    }

    let error_list = state
        .validation_errors()
        .iter()
        .map(|e| format!("- {}", e))
        .collect::<Vec<_>>()
        .join("\n");
    let persona_list_json = personas_to_json(state.generated_personas(), false);
    let prompt = fill_template(
        FEEDBACK_PROMPT,
        &[
            ("user_goal", state.initial_prompt()),
            ("persona_list_json", persona_list_json.as_str()),
            ("error_list", error_list.as_str()),
        ],
    );

    // 网关失败时返回的错误文本同样作为反馈记录，不中断流水线
    let feedback = gateway.generate_text(&prompt).await;
    if is_error_text(&feedback) {
        tracing::warn!("[{}] LLM call failed, recording error text as feedback: {}", AGENT, feedback);
    } else {
        tracing::info!("[{}] Generated feedback: '{}'", AGENT, feedback.trim());
    }

    state.feedback_notes = Some(feedback.trim().to_string());
    Ok(PipelineStatus::Refining)
}
