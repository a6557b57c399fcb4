//! 组件构建：按配置与环境变量选择 LLM 后端并包装为 ModelGateway

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::llm::{create_deepseek_client, LlmClient, LlmGateway, MockLlmClient, ModelGateway, OpenAiClient};

/// 根据配置与环境变量选择 LLM 后端（DeepSeek / OpenAI 兼容 / Mock）
///
/// provider = "mock" 时总是使用 Mock；否则有 API Key 才使用真实后端。
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    if provider == "mock" {
        tracing::info!("Using Mock LLM (provider = mock)");
        return Arc::new(MockLlmClient);
    }

    // 有 DeepSeek Key 或（配置为 deepseek 且仅有 OpenAI Key 时也走 DeepSeek 兼容端点）
    let use_deepseek = std::env::var("DEEPSEEK_API_KEY").is_ok()
        || (provider == "deepseek" && std::env::var("OPENAI_API_KEY").is_ok());
    let use_openai = std::env::var("OPENAI_API_KEY").is_ok() && provider != "deepseek";

    if use_deepseek {
        let model = cfg
            .llm
            .deepseek
            .model
            .clone()
            .unwrap_or_else(|| cfg.llm.model.clone());
        tracing::info!("Using DeepSeek LLM ({})", model);
        Arc::new(create_deepseek_client(Some(&model)))
    } else if use_openai {
        let model = cfg
            .llm
            .openai
            .model
            .clone()
            .unwrap_or_else(|| "gpt-4o-mini".to_string());
        tracing::info!("Using OpenAI LLM ({})", model);
        Arc::new(OpenAiClient::new(
            cfg.llm.base_url.as_deref(),
            &model,
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
        ))
    } else {
        tracing::warn!("No API key set or provider unknown, using Mock LLM");
        Arc::new(MockLlmClient)
    }
}

/// LLM 客户端 + [llm.timeouts].request 超时 + [llm.temperature] → ModelGateway
pub fn create_gateway_from_config(cfg: &AppConfig) -> Arc<dyn ModelGateway> {
    let timeout = Duration::from_secs(cfg.llm.timeouts.request.max(1));
    let temperature = &cfg.llm.temperature;
    Arc::new(
        LlmGateway::new(create_llm_from_config(cfg), timeout)
            .with_temperatures(temperature.text, temperature.structured),
    )
}
