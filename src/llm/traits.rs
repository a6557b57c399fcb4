//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 LlmClient：complete（非流式）。

use async_trait::async_trait;

use crate::llm::Message;

/// LLM 客户端 trait：给定消息序列返回模型文本
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成（后端默认采样参数）
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;

    /// 指定采样温度；不支持温度的后端忽略该参数
    async fn complete_with_temperature(
        &self,
        messages: &[Message],
        temperature: f32,
    ) -> Result<String, String> {
        let _ = temperature;
        self.complete(messages).await
    }
}
