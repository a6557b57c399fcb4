//! MemoryChecker：诊断性地检查人设之间是否功能重叠
//!
//! 结论只写日志，从不修改状态、从不失败；无论结果如何都进入 OPTIMIZING。

use crate::agents::prompts::{fill_template, MEMORY_CHECKER_PROMPT};
use crate::core::{AgentError, PipelineState, PipelineStatus};
use crate::llm::{is_error_text, ModelGateway};
use crate::schema::{personas_to_json, Persona};

const AGENT: &str = "MemoryCheckerAgent";

/// 冗余检查结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedundancyAdvice {
    /// 少于两个人设，无需检查
    Skipped,
    Distinct(String),
    Overlap(String),
    /// 网关失败，结论缺失
    Unavailable(String),
}

pub async fn check_redundancy(personas: &[Persona], gateway: &dyn ModelGateway) -> RedundancyAdvice {
    if personas.len() < 2 {
        return RedundancyAdvice::Skipped;
    }

    let prompt = fill_template(
        MEMORY_CHECKER_PROMPT,
        &[("persona_list_json", personas_to_json(personas, false).as_str())],
    );
    let answer = gateway.generate_text(&prompt).await;
    if is_error_text(&answer) {
        return RedundancyAdvice::Unavailable(answer);
    }

    let answer = answer.trim().to_string();
    if answer.to_uppercase().contains("YES") {
        RedundancyAdvice::Overlap(answer)
    } else {
        RedundancyAdvice::Distinct(answer)
    }
}

pub async fn run_memory_checker(
    state: &mut PipelineState,
    gateway: &dyn ModelGateway,
) -> Result<PipelineStatus, AgentError> {
    tracing::info!("[{}] Analyzing personas for redundancy...", AGENT);

    match check_redundancy(state.generated_personas(), gateway).await {
        RedundancyAdvice::Skipped => {
            tracing::info!("[{}] Fewer than two personas, skipping redundancy check.", AGENT)
        }
        RedundancyAdvice::Distinct(reason) => {
            tracing::info!("[{}] No significant redundancy found. Reason: {}", AGENT, reason)
        }
        RedundancyAdvice::Overlap(reason) => tracing::info!(
            "[{}] Potential redundancy detected; the optimizer will consider merging. Reason: {}",
            AGENT,
            reason
        ),
        RedundancyAdvice::Unavailable(detail) => {
            tracing::warn!("[{}] Redundancy check unavailable: {}", AGENT, detail)
        }
    }

    Ok(PipelineStatus::Optimizing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::prompts::MEMORY_CHECKER_MARKER;
    use crate::llm::ScriptedGateway;
    use crate::schema::persona::fixtures::persona_json;

    fn personas(n: usize) -> Vec<Persona> {
        (0..n)
            .map(|i| serde_json::from_value(persona_json(&format!("Bot {i}"), "Helper")).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_single_persona_skips_gateway() {
        let gw = ScriptedGateway::new();
        assert_eq!(check_redundancy(&personas(1), &gw).await, RedundancyAdvice::Skipped);
        assert_eq!(gw.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_yes_answer_is_overlap_case_insensitive() {
        let gw = ScriptedGateway::new().text(MEMORY_CHECKER_MARKER, "yes - both answer FAQs");
        assert!(matches!(
            check_redundancy(&personas(2), &gw).await,
            RedundancyAdvice::Overlap(_)
        ));
    }

    #[tokio::test]
    async fn test_never_alters_state_even_on_failure() {
        let gw = ScriptedGateway::new().failure(MEMORY_CHECKER_MARKER, "boom");
        let mut state = PipelineState::new("goal");
        state.generated_personas = personas(3);
        let before = state.generated_personas().to_vec();
        let next = run_memory_checker(&mut state, &gw).await.unwrap();
        assert_eq!(next, PipelineStatus::Optimizing);
        assert_eq!(state.generated_personas(), before.as_slice());
    }
}
