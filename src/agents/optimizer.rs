//! Optimizer：合并冗余人设，整体替换 generated_personas

use crate::agents::prompts::{fill_template, OPTIMIZER_PROMPT};
use crate::agents::request_structured;
use crate::core::{AgentError, PipelineState, PipelineStatus};
use crate::llm::ModelGateway;
use crate::schema::{decode_list, persona_schema_json, personas_to_json, Persona, SchemaError};

const AGENT: &str = "OptimizerAgent";
const FIELD: &str = "optimized_personas";

pub async fn run_optimizer(
    state: &mut PipelineState,
    gateway: &dyn ModelGateway,
) -> Result<PipelineStatus, AgentError> {
    tracing::info!("[{}] Optimizing persona list...", AGENT);

    let original_count = state.generated_personas().len();
    if original_count == 0 {
        tracing::warn!("[{}] No personas to optimize. Skipping.", AGENT);
        return Ok(PipelineStatus::Validating);
    }

    let persona_list_json = personas_to_json(state.generated_personas(), true);
    let prompt = fill_template(
        OPTIMIZER_PROMPT,
        &[
            ("persona_schema", persona_schema_json()),
            ("persona_list_json", persona_list_json.as_str()),
        ],
    );
    let response = request_structured(gateway, AGENT, &prompt).await?;

    let optimized: Vec<Persona> = decode_list(&response, FIELD).map_err(|e| {
        tracing::debug!("[{}] LLM response was: {}", AGENT, response);
        AgentError::schema(AGENT, e)
    })?;
    if optimized.is_empty() {
        return Err(AgentError::schema(AGENT, SchemaError::EmptyList(FIELD)));
    }

    let new_count = optimized.len();
    tracing::info!(
        "[{}] Optimization complete. Persona count: {} -> {}",
        AGENT,
        original_count,
        new_count
    );
    if new_count < original_count {
        tracing::info!("[{}] Successfully merged redundant personas.", AGENT);
    } else {
        tracing::info!("[{}] No merges were necessary.", AGENT);
    }

    state.generated_personas = optimized;
    Ok(PipelineStatus::Validating)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::prompts::OPTIMIZER_MARKER;
    use crate::llm::ScriptedGateway;
    use crate::schema::persona::fixtures::persona_json;
    use serde_json::json;

    fn with_personas(names: &[&str]) -> PipelineState {
        let mut state = PipelineState::new("goal");
        state.generated_personas = names
            .iter()
            .map(|n| serde_json::from_value(persona_json(n, "Helper")).unwrap())
            .collect();
        state
    }

    #[tokio::test]
    async fn test_merge_replaces_list() {
        let gw = ScriptedGateway::new().json(
            OPTIMIZER_MARKER,
            json!({"optimized_personas": [persona_json("Merged", "Helper"), persona_json("C", "Helper")]}),
        );
        let mut state = with_personas(&["A", "B", "C"]);
        assert_eq!(run_optimizer(&mut state, &gw).await.unwrap(), PipelineStatus::Validating);
        assert_eq!(state.generated_personas().len(), 2);
        assert_eq!(state.generated_personas()[0].persona_name, "Merged");
    }

    #[tokio::test]
    async fn test_empty_input_skips_gateway() {
        let gw = ScriptedGateway::new();
        let mut state = with_personas(&[]);
        assert_eq!(run_optimizer(&mut state, &gw).await.unwrap(), PipelineStatus::Validating);
        assert_eq!(gw.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_schema_violation_keeps_original_list() {
        let gw = ScriptedGateway::new().json(
            OPTIMIZER_MARKER,
            json!({"optimized_personas": [{"persona_name": "half a persona"}]}),
        );
        let mut state = with_personas(&["A", "B"]);
        assert!(run_optimizer(&mut state, &gw).await.is_err());
        assert_eq!(state.generated_personas().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_result_is_hard_failure() {
        let gw = ScriptedGateway::new().json(OPTIMIZER_MARKER, json!({"optimized_personas": []}));
        let mut state = with_personas(&["A"]);
        let err = run_optimizer(&mut state, &gw).await.unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
