//! Mock 实现（无需 API）
//!
//! - [`MockLlmClient`]：按 prompt 中的阶段标记返回固定的演示数据，离线跑通整条流水线；
//! - [`ScriptedGateway`]：测试替身，按标记子串路由到预置回复，可设延迟并统计调用次数。

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agents::prompts::{
    CRAFTER_MARKER, CRAFTER_ROLE_PREFIX, FEEDBACK_MARKER, LINKER_MARKER, MEMORY_CHECKER_MARKER,
    OPTIMIZER_LIST_HEADER, OPTIMIZER_MARKER, PLANNER_MARKER, ROLE_MAPPER_MARKER,
    VALIDATOR_MARKER,
};
use crate::llm::{LlmClient, Message, ModelGateway, Role, ERROR_MARKER};

/// 演示用客户端：识别阶段后返回一支两人团队
#[derive(Debug, Default)]
pub struct MockLlmClient;

impl MockLlmClient {
    fn respond(prompt: &str) -> String {
        if prompt.contains(PLANNER_MARKER) {
            json!({ "tasks": [
                "Generate hype and excitement around the launch.",
                "Answer frequently asked questions about the product.",
                "Moderate the chat and keep the community positive."
            ]})
            .to_string()
        } else if prompt.contains(ROLE_MAPPER_MARKER) {
            json!({ "persona_blueprints": [
                { "role": "Hype Creator", "description": "Builds buzz with announcements and memes." },
                { "role": "Support Specialist", "description": "Answers factual questions and moderates the chat." }
            ]})
            .to_string()
        } else if prompt.contains(CRAFTER_MARKER) {
            let role = prompt
                .split(CRAFTER_ROLE_PREFIX)
                .nth(1)
                .and_then(|rest| rest.split('"').next())
                .unwrap_or("Generalist");
            demo_persona(role).to_string()
        } else if prompt.contains(MEMORY_CHECKER_MARKER) {
            "NO - The personas have distinct and complementary roles.".to_string()
        } else if prompt.contains(OPTIMIZER_MARKER) {
            let personas = prompt
                .split(OPTIMIZER_LIST_HEADER)
                .nth(1)
                .and_then(|rest| serde_json::from_str::<Value>(rest.trim()).ok())
                .unwrap_or_else(|| json!([]));
            json!({ "optimized_personas": personas }).to_string()
        } else if prompt.contains(VALIDATOR_MARKER) {
            json!({ "is_valid": true, "errors": [] }).to_string()
        } else if prompt.contains(FEEDBACK_MARKER) {
            "Refine the persona roles so every planned task has a clear owner.".to_string()
        } else if prompt.contains(LINKER_MARKER) {
            json!({ "interaction_playbook": [
                { "persona_name": "Hype Creator Bot", "rules": [
                    "If a user asks a detailed question, handoff to 'Support Specialist Bot'."
                ]},
                { "persona_name": "Support Specialist Bot", "rules": [
                    "Can follow up announcements from 'Hype Creator Bot' with key facts."
                ]}
            ]})
            .to_string()
        } else {
            format!("Echo from Mock: {}", prompt)
        }
    }
}

fn demo_persona(role: &str) -> Value {
    json!({
        "persona_name": format!("{role} Bot"),
        "tagline": format!("Your friendly {role}"),
        "role": role,
        "expertise": ["community engagement", "product knowledge", "clear communication"],
        "signature_voice": {
            "tone": "warm, upbeat, concise",
            "style": "short sentences, asks follow-up questions",
            "language_habits": ["avoids jargon", "uses the product name often"]
        },
        "allow_emojis": true,
        "key_traits": ["helpful", "reliable", "curious"],
        "knowledge_boundaries": {
            "will_defer_on": ["legal questions", "refunds"],
            "refusal_message": "That's outside my lane, let me point you to the right teammate."
        },
        "examples": [
            { "user": "What is this about?", "assistant": format!("I'm the {role} here, happy to help!") },
            { "user": "Can you help me?", "assistant": "Absolutely, tell me a bit more." }
        ]
    })
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        Ok(Self::respond(last_user))
    }
}

/// 预置回复
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Json(Value),
    Text(String),
    /// 网关层失败（结构化调用得到 error 键，文本调用得到 Error: 前缀）
    Failure(String),
}

#[derive(Debug)]
struct Route {
    marker: String,
    replies: VecDeque<(ScriptedReply, Duration)>,
    last: Option<(ScriptedReply, Duration)>,
    calls: usize,
}

/// 测试用网关：首个 marker 命中的路由给出回复；回复用尽后重复最后一条
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    routes: Mutex<Vec<Route>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条回复到 marker 对应的路由（不存在则新建）
    pub fn reply(self, marker: &str, reply: ScriptedReply) -> Self {
        self.reply_after(marker, reply, Duration::ZERO)
    }

    /// 同 [`reply`](Self::reply)，但在返回前等待 delay
    pub fn reply_after(self, marker: &str, reply: ScriptedReply, delay: Duration) -> Self {
        if let Ok(mut routes) = self.routes.lock() {
            match routes.iter_mut().find(|r| r.marker == marker) {
                Some(route) => route.replies.push_back((reply, delay)),
                None => routes.push(Route {
                    marker: marker.to_string(),
                    replies: VecDeque::from([(reply, delay)]),
                    last: None,
                    calls: 0,
                }),
            }
        }
        self
    }

    pub fn json(self, marker: &str, value: Value) -> Self {
        self.reply(marker, ScriptedReply::Json(value))
    }

    pub fn text(self, marker: &str, text: &str) -> Self {
        self.reply(marker, ScriptedReply::Text(text.to_string()))
    }

    pub fn failure(self, marker: &str, detail: &str) -> Self {
        self.reply(marker, ScriptedReply::Failure(detail.to_string()))
    }

    /// marker 路由被调用的次数
    pub fn calls(&self, marker: &str) -> usize {
        self.routes
            .lock()
            .map(|routes| {
                routes
                    .iter()
                    .find(|r| r.marker == marker)
                    .map_or(0, |r| r.calls)
            })
            .unwrap_or(0)
    }

    /// 网关收到的调用总数
    pub fn total_calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// 包含 needle 的全部 prompt（按调用顺序）
    pub fn prompts_containing(&self, needle: &str) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.iter().filter(|s| s.contains(needle)).cloned().collect())
            .unwrap_or_default()
    }

    async fn next_reply(&self, prompt: &str) -> Option<ScriptedReply> {
        let picked = {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }
            let mut routes = self.routes.lock().ok()?;
            let route = routes.iter_mut().find(|r| prompt.contains(&r.marker))?;
            route.calls += 1;
            match route.replies.pop_front() {
                Some(next) => {
                    route.last = Some(next.clone());
                    Some(next)
                }
                None => route.last.clone(),
            }
        };
        let (reply, delay) = picked?;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Some(reply)
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn generate_text(&self, prompt: &str) -> String {
        match self.next_reply(prompt).await {
            Some(ScriptedReply::Text(text)) => text,
            Some(ScriptedReply::Json(value)) => value.to_string(),
            Some(ScriptedReply::Failure(detail)) => format!("{} {}", ERROR_MARKER, detail),
            None => format!("{} no scripted reply", ERROR_MARKER),
        }
    }

    async fn generate_structured(&self, prompt: &str) -> Value {
        match self.next_reply(prompt).await {
            Some(ScriptedReply::Json(value)) => value,
            Some(ScriptedReply::Text(text)) => serde_json::from_str(&text)
                .unwrap_or_else(|_| json!({ "error": "LLM returned invalid JSON", "content": text })),
            Some(ScriptedReply::Failure(detail)) => json!({ "error": detail }),
            None => json!({ "error": "no scripted reply" }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::structured_error;

    #[tokio::test]
    async fn test_scripted_routes_and_repeats_last() {
        let gw = ScriptedGateway::new()
            .json("planner", json!({"n": 1}))
            .json("planner", json!({"n": 2}));
        assert_eq!(gw.generate_structured("the planner").await["n"], 1);
        assert_eq!(gw.generate_structured("the planner").await["n"], 2);
        assert_eq!(gw.generate_structured("the planner").await["n"], 2);
        assert_eq!(gw.calls("planner"), 3);
    }

    #[tokio::test]
    async fn test_scripted_unmatched_is_failure() {
        let gw = ScriptedGateway::new();
        assert!(structured_error(&gw.generate_structured("x").await).is_some());
        assert!(crate::llm::is_error_text(&gw.generate_text("x").await));
        assert_eq!(gw.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_client_crafts_for_requested_role() {
        let prompt = format!("{CRAFTER_MARKER}\n{CRAFTER_ROLE_PREFIX}Hype Creator\"");
        let out = MockLlmClient
            .complete(&[Message::user(prompt)])
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["role"], "Hype Creator");
        assert_eq!(value["persona_name"], "Hype Creator Bot");
    }
}
