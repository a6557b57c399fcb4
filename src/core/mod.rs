//! 核心编排层：错误类型、流水线状态、过程事件、组件构建与主控循环

pub mod builder;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod state;

pub use builder::{create_gateway_from_config, create_llm_from_config};
pub use error::AgentError;
pub use events::PipelineEvent;
pub use orchestrator::{run_pipeline, PipelineRunner, DEFAULT_MAX_RETRIES};
pub use state::{PipelineOutcome, PipelineState, PipelineStatus};
