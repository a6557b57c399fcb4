//! Validator：判断人设团队能否覆盖全部任务
//!
//! 只返回 [`ValidationVerdict`]，不推进状态；重试与反馈由编排器处理。

use crate::agents::prompts::{fill_template, format_task_list, VALIDATOR_PROMPT};
use crate::core::PipelineState;
use crate::llm::{structured_error, ModelGateway};
use crate::schema::{personas_to_json, ValidationVerdict};

const AGENT: &str = "ValidatorAgent";

pub async fn run_validator(state: &PipelineState, gateway: &dyn ModelGateway) -> ValidationVerdict {
    tracing::info!("[{}] Validating persona team against tasks...", AGENT);

    if state.planned_tasks().is_empty() || state.generated_personas().is_empty() {
        return ValidationVerdict::invalid("Missing tasks or personas for validation.");
    }

    let task_list = format_task_list(state.planned_tasks());
    let persona_list_json = personas_to_json(state.generated_personas(), false);
    let prompt = fill_template(
        VALIDATOR_PROMPT,
        &[("task_list", task_list.as_str()), ("persona_list_json", persona_list_json.as_str())],
    );
    let response = gateway.generate_structured(&prompt).await;
    if let Some(detail) = structured_error(&response) {
        tracing::warn!("[{}] LLM call failed: {}", AGENT, detail);
        return ValidationVerdict::invalid(format!("Validator LLM call failed: {}", detail));
    }

    let verdict = ValidationVerdict::from_response(&response);
    if verdict.is_valid {
        tracing::info!("[{}] Validation successful. The persona team is complete.", AGENT);
    } else {
        tracing::warn!("[{}] Validation failed. Errors: {:?}", AGENT, verdict.errors);
    }
    verdict
}
