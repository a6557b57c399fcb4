//! Persona Factory - 多智能体人设生成流水线
//!
//! 模块划分：
//! - **agents**: 各阶段智能体（Planner、RoleMapper、Crafter、MemoryChecker、Optimizer、
//!   Validator、FeedbackLoop、Linker、FinalModeration）、Formatter 与 prompt 模板
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、流水线状态机、过程事件、主控循环
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）及 ModelGateway
//! - **observability**: tracing 初始化
//! - **schema**: 人设、蓝图与各阶段回复的严格解码
//! - **store**: 运行记录持久化（SQLite）

pub mod agents;
pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod schema;
pub mod store;

pub use crate::core::{run_pipeline, PipelineOutcome, PipelineRunner};
