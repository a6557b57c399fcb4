//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock），以及流水线使用的 Model Gateway

pub mod deepseek;
pub mod gateway;
pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

pub use deepseek::{create_deepseek_client, DEEPSEEK_CHAT};
pub use gateway::{
    extract_json, is_error_text, structured_error, LlmGateway, ModelGateway,
    DEFAULT_STRUCTURED_TEMPERATURE, DEFAULT_TEXT_TEMPERATURE, ERROR_MARKER,
};
pub use message::{Message, Role};
pub use mock::{MockLlmClient, ScriptedGateway, ScriptedReply};
pub use openai::OpenAiClient;
pub use traits::LlmClient;
