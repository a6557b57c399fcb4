//! 流水线编排器：主控循环
//!
//! 按 `PipelineStatus` 逐阶段调用智能体直到终态，负责 VALIDATING → REFINING → MAPPING_ROLES
//! 的有界重试（最多 max_retries + 1 次完整校验），并把阶段进度发到可选的事件通道。
//! 每次运行独占一个 PipelineState，阶段之间严格串行。

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::agents::{
    run_crafter, run_feedback_loop, run_final_moderation, run_linker, run_memory_checker,
    run_optimizer, run_planner, run_role_mapper, run_validator,
};
use crate::config::AppConfig;
use crate::core::builder::create_gateway_from_config;
use crate::core::{AgentError, PipelineEvent, PipelineOutcome, PipelineState, PipelineStatus};
use crate::llm::ModelGateway;

pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// 流水线运行器：持有网关与运行参数，可重复 `run`
pub struct PipelineRunner {
    gateway: Arc<dyn ModelGateway>,
    max_retries: u32,
    event_tx: Option<mpsc::UnboundedSender<PipelineEvent>>,
    cancel_token: CancellationToken,
}

impl PipelineRunner {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self {
            gateway,
            max_retries: DEFAULT_MAX_RETRIES,
            event_tx: None,
            cancel_token: CancellationToken::new(),
        }
    }

    /// 按配置构建网关，并读取 [pipeline].max_retries
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(create_gateway_from_config(cfg)).with_max_retries(cfg.pipeline.max_retries)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// 阶段进度事件（接收端关闭后静默丢弃）
    pub fn with_event_tx(mut self, tx: mpsc::UnboundedSender<PipelineEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 调用方取消：阶段之间检查，并与在途的网关调用竞争
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// 运行到终态，只返回人设列表或失败原因
    pub async fn run(&self, goal: &str) -> PipelineOutcome {
        PipelineOutcome::from(self.run_to_terminal(goal).await)
    }

    /// 运行到终态并返回完整状态（诊断用）
    pub async fn run_to_terminal(&self, goal: &str) -> PipelineState {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("pipeline", %run_id);
        self.drive(PipelineState::new(goal)).instrument(span).await
    }

    async fn drive(&self, mut state: PipelineState) -> PipelineState {
        tracing::info!(
            "Starting persona generation pipeline for goal: '{}' (max_retries = {})",
            state.initial_prompt(),
            self.max_retries
        );
        let mut retry_count = 0u32;

        while !state.is_terminal() {
            let stage = state.status();
            tracing::info!("[Orchestrator] Current state: {}", stage);
            self.emit(PipelineEvent::StageStarted { status: stage });

            let result = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => Err(AgentError::Cancelled),
                result = self.step(&mut state, &mut retry_count) => result,
            };

            match result {
                Ok(next) => {
                    state.advance(next);
                }
                Err(e) => {
                    tracing::error!("[Orchestrator] Stage {} failed: {}", stage, e);
                    state.fail(e.to_string());
                }
            }
        }

        let success = state.status() == PipelineStatus::Success;
        if success {
            tracing::info!(
                "Pipeline finished successfully with {} personas.",
                state.generated_personas().len()
            );
        } else {
            tracing::warn!(
                "Pipeline failed: {}",
                state.feedback_notes().unwrap_or("Unknown error.")
            );
        }
        self.emit(PipelineEvent::Finished { success });
        state
    }

    /// 执行当前阶段，返回下一阶段
    async fn step(
        &self,
        state: &mut PipelineState,
        retry_count: &mut u32,
    ) -> Result<PipelineStatus, AgentError> {
        let gateway = self.gateway.as_ref();
        match state.status() {
            PipelineStatus::Planning => run_planner(state, gateway).await,
            PipelineStatus::MappingRoles => run_role_mapper(state, gateway).await,
            PipelineStatus::Crafting => run_crafter(state, Arc::clone(&self.gateway)).await,
            PipelineStatus::CheckingMemory => run_memory_checker(state, gateway).await,
            PipelineStatus::Optimizing => run_optimizer(state, gateway).await,
            PipelineStatus::Validating => self.validate(state, retry_count).await,
            PipelineStatus::Refining => {
                tracing::info!(
                    "[Orchestrator] Refining, looping back to role mapping. Feedback: {}",
                    state.feedback_notes().unwrap_or("(none)")
                );
                Ok(PipelineStatus::MappingRoles)
            }
            PipelineStatus::Linking => run_linker(state, gateway).await,
            PipelineStatus::FinalModeration => Ok(run_final_moderation(state)),
            terminal @ (PipelineStatus::Success | PipelineStatus::Failed) => {
                Err(AgentError::UnknownState(terminal.to_string()))
            }
        }
    }

    async fn validate(
        &self,
        state: &mut PipelineState,
        retry_count: &mut u32,
    ) -> Result<PipelineStatus, AgentError> {
        let verdict = run_validator(state, self.gateway.as_ref()).await;
        if verdict.is_valid {
            return Ok(PipelineStatus::Linking);
        }

        self.emit(PipelineEvent::ValidationFailed {
            attempt: *retry_count + 1,
            errors: verdict.errors.clone(),
        });
        state.validation_errors = verdict.errors;

        if *retry_count < self.max_retries {
            *retry_count += 1;
            tracing::warn!(
                "[Orchestrator] Validation failed. Retrying... (Attempt {}/{})",
                retry_count,
                self.max_retries
            );
            run_feedback_loop(state, self.gateway.as_ref()).await
        } else {
            Err(AgentError::RetriesExhausted {
                retries: self.max_retries,
                errors: state.validation_errors.clone(),
            })
        }
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

/// 便捷入口：用给定网关跑一次流水线
pub async fn run_pipeline(
    gateway: Arc<dyn ModelGateway>,
    goal: &str,
    max_retries: u32,
) -> PipelineOutcome {
    PipelineRunner::new(gateway)
        .with_max_retries(max_retries)
        .run(goal)
        .await
}
