//! Crafter：把每个蓝图扩展为完整人设
//!
//! 每个蓝图一个并发请求（JoinSet 扇出），全部成功后按蓝图下标重组；任一请求失败时
//! 中止下标更大的在途请求，整个阶段失败并报告下标最小的失败蓝图，已成功的结果一并丢弃。

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tokio::task::JoinSet;

use crate::agents::prompts::{fill_template, CRAFTER_PROMPT};
use crate::core::{AgentError, PipelineState, PipelineStatus};
use crate::llm::{structured_error, ModelGateway};
use crate::schema::{persona_schema_json, Blueprint, Persona};

const AGENT: &str = "CrafterAgent";

pub async fn run_crafter(
    state: &mut PipelineState,
    gateway: Arc<dyn ModelGateway>,
) -> Result<PipelineStatus, AgentError> {
    let blueprints = state.persona_blueprints().to_vec();
    tracing::info!("[{}] Crafting {} full persona profiles...", AGENT, blueprints.len());

    if blueprints.is_empty() {
        return Err(AgentError::EmptyInput {
            agent: AGENT,
            what: "No persona blueprints were provided.",
        });
    }

    let personas = craft_all(blueprints, gateway).await?;
    tracing::info!(
        "[{}] Successfully crafted all {} persona profiles.",
        AGENT,
        personas.len()
    );
    state.generated_personas = personas;
    Ok(PipelineStatus::CheckingMemory)
}

async fn craft_all(
    blueprints: Vec<Blueprint>,
    gateway: Arc<dyn ModelGateway>,
) -> Result<Vec<Persona>, AgentError> {
    let total = blueprints.len();
    let mut join_set = JoinSet::new();
    let roles: Vec<String> = blueprints.iter().map(|bp| bp.role.clone()).collect();
    let mut handles = Vec::with_capacity(total);
    let mut task_index = HashMap::with_capacity(total);

    // SCATTER：每个蓝图一个任务，只读自己的蓝图、只写自己的结果槽
    for (index, blueprint) in blueprints.into_iter().enumerate() {
        let gateway = Arc::clone(&gateway);
        let handle = join_set.spawn(async move { (index, craft_one(gateway.as_ref(), blueprint).await) });
        task_index.insert(handle.id(), index);
        handles.push(handle);
    }

    // GATHER：按下标落位；报告下标最小的失败，与完成顺序无关。
    // 失败于 i 时中止 i 之后的任务，i 之前的任务继续等待（它们可能失败得更早）。
    let mut slots: Vec<Option<Persona>> = vec![None; total];
    let mut first_failure: Option<(usize, AgentError)> = None;
    while let Some(joined) = join_set.join_next().await {
        let (index, failure) = match joined {
            Ok((index, Ok(persona))) => {
                tracing::info!("  - Successfully crafted persona: '{}'", persona.persona_name);
                slots[index] = Some(persona);
                continue;
            }
            Ok((index, Err(e))) => (index, e),
            Err(e) if e.is_cancelled() => continue,
            Err(e) => {
                let index = task_index.get(&e.id()).copied().unwrap_or(total);
                let failure = AgentError::CraftFailed {
                    role: roles.get(index).cloned().unwrap_or_default(),
                    detail: format!("crafting task panicked: {}", e),
                };
                (index, failure)
            }
        };

        if first_failure.as_ref().map_or(true, |(lowest, _)| index < *lowest) {
            tracing::warn!("[{}] {}", AGENT, failure);
            for handle in handles.iter().skip(index + 1) {
                handle.abort();
            }
            first_failure = Some((index, failure));
        }
    }

    match first_failure {
        Some((_, failure)) => Err(failure),
        None => Ok(slots.into_iter().flatten().collect()),
    }
}

async fn craft_one(gateway: &dyn ModelGateway, blueprint: Blueprint) -> Result<Persona, AgentError> {
    let prompt = fill_template(
        CRAFTER_PROMPT,
        &[
            ("role", blueprint.role.as_str()),
            ("description", blueprint.description.as_str()),
            ("persona_schema", persona_schema_json()),
        ],
    );

    let response = gateway.generate_structured(&prompt).await;
    if let Some(detail) = structured_error(&response) {
        return Err(AgentError::CraftFailed {
            role: blueprint.role,
            detail: format!("LLM call failed or returned an error. Details: {}", detail),
        });
    }

    Persona::deserialize(&response).map_err(|e| {
        tracing::debug!("[{}] LLM response was: {}", AGENT, response);
        AgentError::CraftFailed {
            role: blueprint.role,
            detail: format!(
                "The LLM output did not match the required schema. Details: {}",
                e
            ),
        }
    })
}
