//! Linker：为团队生成互动手册并追加到对应人设
//!
//! 回复结构不对或网关失败时只告警，人设保持无规则，照常进入 FINAL_MODERATION。

use crate::agents::prompts::{fill_template, LINKER_PROMPT};
use crate::core::{AgentError, PipelineState, PipelineStatus};
use crate::llm::{structured_error, ModelGateway};
use crate::schema::{personas_to_json, InteractionPlaybook, Persona};

const AGENT: &str = "LinkerAgent";

pub async fn run_linker(
    state: &mut PipelineState,
    gateway: &dyn ModelGateway,
) -> Result<PipelineStatus, AgentError> {
    tracing::info!("[{}] Defining interaction rules for the persona team...", AGENT);

    if state.generated_personas().is_empty() {
        return Err(AgentError::EmptyInput {
            agent: AGENT,
            what: "No personas were provided to link.",
        });
    }

    let persona_list_json = personas_to_json(state.generated_personas(), false);
    let prompt = fill_template(LINKER_PROMPT, &[("persona_list_json", persona_list_json.as_str())]);
    let response = gateway.generate_structured(&prompt).await;

    if let Some(detail) = structured_error(&response) {
        tracing::warn!("[{}] LLM call failed, proceeding without interaction rules: {}", AGENT, detail);
        return Ok(PipelineStatus::FinalModeration);
    }

    match InteractionPlaybook::from_response(&response) {
        Some(playbook) => {
            let applied = apply_playbook(&mut state.generated_personas, playbook);
            tracing::info!("[{}] Applied interaction rules to {} personas.", AGENT, applied);
        }
        None => {
            tracing::warn!(
                "[{}] LLM response did not contain a valid 'interaction_playbook'. Proceeding without interaction rules.",
                AGENT
            );
            tracing::debug!("[{}] LLM response was: {}", AGENT, response);
        }
    }
    Ok(PipelineStatus::FinalModeration)
}

/// 按名字追加规则，返回命中的条目数；未匹配的名字忽略
fn apply_playbook(personas: &mut [Persona], playbook: InteractionPlaybook) -> usize {
    let mut applied = 0;
    for entry in playbook.entries {
        match personas.iter_mut().find(|p| p.persona_name == entry.persona_name) {
            Some(persona) => {
                persona.append_rules(entry.rules);
                applied += 1;
            }
            None => tracing::debug!("[{}] No persona named '{}'", AGENT, entry.persona_name),
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::prompts::LINKER_MARKER;
    use crate::llm::ScriptedGateway;
    use crate::schema::persona::fixtures::persona_json;
    use serde_json::json;

    fn linked_state() -> PipelineState {
        let mut state = PipelineState::new("goal");
        let mut hype: Persona = serde_json::from_value(persona_json("Hype", "Hype Creator")).unwrap();
        hype.interaction_rules = vec!["existing rule".to_string()];
        state.generated_personas = vec![
            hype,
            serde_json::from_value(persona_json("Support", "Support Specialist")).unwrap(),
        ];
        state
    }

    #[tokio::test]
    async fn test_rules_appended_by_name() {
        let gw = ScriptedGateway::new().json(
            LINKER_MARKER,
            json!({"interaction_playbook": [
                {"persona_name": "Hype", "rules": ["hand off FAQs to Support"]},
                {"persona_name": "Ghost", "rules": ["never applied"]}
            ]}),
        );
        let mut state = linked_state();
        assert_eq!(run_linker(&mut state, &gw).await.unwrap(), PipelineStatus::FinalModeration);
        assert_eq!(
            state.generated_personas()[0].interaction_rules,
            ["existing rule", "hand off FAQs to Support"]
        );
        assert!(state.generated_personas()[1].interaction_rules.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_response_is_soft_failure() {
        let gw = ScriptedGateway::new().json(LINKER_MARKER, json!({"playbook": "oops"}));
        let mut state = linked_state();
        assert_eq!(run_linker(&mut state, &gw).await.unwrap(), PipelineStatus::FinalModeration);
        assert!(state.generated_personas()[1].interaction_rules.is_empty());
    }

    #[tokio::test]
    async fn test_prompt_omits_existing_rules() {
        let gw = ScriptedGateway::new().json(LINKER_MARKER, json!({"interaction_playbook": []}));
        let mut state = linked_state();
        run_linker(&mut state, &gw).await.unwrap();
        assert!(!gw.prompts_containing(LINKER_MARKER)[0].contains("existing rule"));
    }

    #[tokio::test]
    async fn test_empty_personas_is_hard_failure() {
        let gw = ScriptedGateway::new();
        let mut state = PipelineState::new("goal");
        assert!(matches!(
            run_linker(&mut state, &gw).await,
            Err(AgentError::EmptyInput { .. })
        ));
    }
}
