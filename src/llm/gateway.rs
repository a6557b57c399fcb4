//! Model Gateway：流水线核心与 LLM 之间的唯一边界
//!
//! 约定（调用方必须遵守）：
//! - `generate_text` 永不报错：失败时返回以 [`ERROR_MARKER`] 开头的字符串；
//! - `generate_structured` 永不报错：失败时返回含 `error` 键的 JSON 对象。
//!
//! 各智能体通过 [`is_error_text`] / [`structured_error`] 把哨兵值转换为 `AgentError`。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llm::{LlmClient, Message};

/// 文本调用失败时返回值的前缀
pub const ERROR_MARKER: &str = "Error:";

const TEXT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const JSON_SYSTEM_PROMPT: &str = "You are a helpful assistant designed to output JSON. \
Respond ONLY with valid JSON based on the user's request.";

/// 流水线消费的模型能力：自由文本与结构化 JSON 两种调用
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// 自由文本；失败时返回 `Error: ...`
    async fn generate_text(&self, prompt: &str) -> String;

    /// JSON 对象；失败时返回 `{"error": ...}`
    async fn generate_structured(&self, prompt: &str) -> Value;
}

/// 文本回复是否为网关错误哨兵
pub fn is_error_text(text: &str) -> bool {
    text.trim_start().starts_with(ERROR_MARKER)
}

/// 结构化回复中的错误信息（存在 `error` 键即视为失败）
pub fn structured_error(value: &Value) -> Option<String> {
    match value.get("error")? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// 从模型输出中提取 JSON 文本：```json 代码块优先，其次最外层 `{...}`
pub fn extract_json(output: &str) -> Option<&str> {
    let trimmed = output.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

/// 自由文本调用的默认采样温度
pub const DEFAULT_TEXT_TEMPERATURE: f32 = 0.7;
/// 结构化调用的默认采样温度（调低以稳定 JSON 输出）
pub const DEFAULT_STRUCTURED_TEMPERATURE: f32 = 0.3;

/// 基于任意 LlmClient 的网关实现：每次调用独立超时，错误折叠为约定的哨兵值
pub struct LlmGateway {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
    text_temperature: f32,
    structured_temperature: f32,
}

impl LlmGateway {
    pub fn new(llm: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self {
            llm,
            timeout,
            text_temperature: DEFAULT_TEXT_TEMPERATURE,
            structured_temperature: DEFAULT_STRUCTURED_TEMPERATURE,
        }
    }

    /// 分别设置文本与结构化调用的采样温度
    pub fn with_temperatures(mut self, text: f32, structured: f32) -> Self {
        self.text_temperature = text;
        self.structured_temperature = structured;
        self
    }

    async fn call(&self, system: &str, prompt: &str, temperature: f32) -> Result<String, String> {
        let messages = [Message::system(system), Message::user(prompt)];
        let request = self.llm.complete_with_temperature(&messages, temperature);
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(format!("LLM request timed out after {:?}", self.timeout)),
        }
    }
}

#[async_trait]
impl ModelGateway for LlmGateway {
    async fn generate_text(&self, prompt: &str) -> String {
        tracing::debug!("sending text prompt ({} chars)", prompt.len());
        match self.call(TEXT_SYSTEM_PROMPT, prompt, self.text_temperature).await {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                tracing::error!("Failed to get text response from LLM: {}", e);
                format!("{} Could not process the request. Details: {}", ERROR_MARKER, e)
            }
        }
    }

    async fn generate_structured(&self, prompt: &str) -> Value {
        tracing::debug!("sending JSON prompt ({} chars)", prompt.len());
        let content = match self.call(JSON_SYSTEM_PROMPT, prompt, self.structured_temperature).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!("Failed to get JSON response from LLM: {}", e);
                return json!({ "error": format!("Failed to get JSON response from LLM: {}", e) });
            }
        };

        let parsed = extract_json(&content)
            .ok_or_else(|| "no JSON object found".to_string())
            .and_then(|raw| serde_json::from_str::<Value>(raw).map_err(|e| e.to_string()));

        match parsed {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => json!({ "error": "LLM returned JSON that is not an object", "content": content }),
            Err(e) => {
                tracing::error!("LLM returned invalid JSON: {}", e);
                json!({ "error": "LLM returned invalid JSON", "content": content })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLlm(Result<String, String>);

    #[async_trait]
    impl LlmClient for FixedLlm {
        async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
            self.0.clone()
        }
    }

    struct SlowLlm;

    #[async_trait]
    impl LlmClient for SlowLlm {
        async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("{}".to_string())
        }
    }

    /// 记录每次调用的温度
    #[derive(Default)]
    struct RecordingLlm {
        temperatures: std::sync::Mutex<Vec<f32>>,
    }

    #[async_trait]
    impl LlmClient for RecordingLlm {
        async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
            Err("temperature not passed".to_string())
        }

        async fn complete_with_temperature(
            &self,
            _messages: &[Message],
            temperature: f32,
        ) -> Result<String, String> {
            self.temperatures.lock().unwrap().push(temperature);
            Ok("{\"ok\": true}".to_string())
        }
    }

    fn gateway(reply: Result<&str, &str>) -> LlmGateway {
        let reply = reply.map(String::from).map_err(String::from);
        LlmGateway::new(Arc::new(FixedLlm(reply)), Duration::from_secs(5))
    }

    #[test]
    fn test_extract_json_from_fence() {
        let out = "Here you go:\n```json\n{\"tasks\": [\"a\"]}\n```";
        assert_eq!(extract_json(out), Some("{\"tasks\": [\"a\"]}"));
    }

    #[test]
    fn test_extract_json_bare_object() {
        assert_eq!(extract_json("noise {\"a\": 1} noise"), Some("{\"a\": 1}"));
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn test_structured_error_detection() {
        assert_eq!(structured_error(&json!({"error": "boom"})), Some("boom".to_string()));
        assert_eq!(structured_error(&json!({"tasks": []})), None);
    }

    #[tokio::test]
    async fn test_structured_parses_object() {
        let value = gateway(Ok("```json\n{\"is_valid\": true}\n```"))
            .generate_structured("p")
            .await;
        assert_eq!(value["is_valid"], json!(true));
    }

    #[tokio::test]
    async fn test_structured_invalid_json_yields_error_key() {
        let value = gateway(Ok("{not json}")).generate_structured("p").await;
        assert!(structured_error(&value).is_some());
        assert_eq!(value["content"], json!("{not json}"));
    }

    #[tokio::test]
    async fn test_structured_non_object_yields_error_key() {
        let value = gateway(Ok("```json\n[1, 2]\n```")).generate_structured("p").await;
        assert!(structured_error(&value).is_some());
    }

    #[tokio::test]
    async fn test_text_failure_has_error_marker() {
        let text = gateway(Err("connection refused")).generate_text("p").await;
        assert!(is_error_text(&text));
        assert!(text.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_timeout_is_gateway_failure() {
        let gw = LlmGateway::new(Arc::new(SlowLlm), Duration::from_millis(50));
        let value = gw.generate_structured("p").await;
        let err = structured_error(&value).unwrap();
        assert!(err.contains("timed out"));
    }

    #[tokio::test]
    async fn test_text_and_structured_calls_use_their_own_temperature() {
        let llm = Arc::new(RecordingLlm::default());
        let gw = LlmGateway::new(llm.clone(), Duration::from_secs(5));
        gw.generate_text("p").await;
        gw.generate_structured("p").await;
        let custom = LlmGateway::new(llm.clone(), Duration::from_secs(5)).with_temperatures(0.9, 0.1);
        custom.generate_structured("p").await;

        assert_eq!(
            *llm.temperatures.lock().unwrap(),
            [DEFAULT_TEXT_TEMPERATURE, DEFAULT_STRUCTURED_TEMPERATURE, 0.1]
        );
    }
}
