//! 人设档案：Crafter 产出、Optimizer 重写、Linker 追加互动规则

use std::sync::OnceLock;

use schemars::JsonSchema;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 语气描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SignatureVoice {
    pub tone: String,
    pub style: String,
    #[serde(default)]
    pub language_habits: Vec<String>,
}

/// 知识边界：需要转交的话题与拒答话术
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KnowledgeBoundaries {
    #[serde(default)]
    pub will_defer_on: Vec<String>,
    pub refusal_message: String,
}

/// 示例对话
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExampleInteraction {
    pub user: String,
    pub assistant: String,
}

/// 完整人设。除 `interaction_rules` 外创建后不可变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Persona {
    pub persona_name: String,
    pub tagline: String,
    pub role: String,
    pub expertise: Vec<String>,
    pub signature_voice: SignatureVoice,
    #[serde(deserialize_with = "lenient_bool")]
    #[schemars(with = "bool")]
    pub allow_emojis: bool,
    pub key_traits: Vec<String>,
    pub knowledge_boundaries: KnowledgeBoundaries,
    pub examples: Vec<ExampleInteraction>,
    /// 由 Linker 追加；模型输出中缺省为空
    #[serde(default)]
    pub interaction_rules: Vec<String>,
}

impl Persona {
    /// 追加互动规则（不替换已有规则）
    pub fn append_rules(&mut self, rules: impl IntoIterator<Item = String>) {
        self.interaction_rules.extend(rules);
    }
}

/// 模型常把布尔写成 "true"/"false" 字符串，宽松接受
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolLike {
        Bool(bool),
        Text(String),
    }

    match BoolLike::deserialize(deserializer)? {
        BoolLike::Bool(b) => Ok(b),
        BoolLike::Text(s) => {
            bool_from_text(&s).ok_or_else(|| D::Error::custom(format!("invalid boolean value {s:?}")))
        }
    }
}

/// 模型常把布尔值写成字符串："true"/"yes" 与 "false"/"no"（忽略大小写与首尾空白）
pub(crate) fn bool_from_text(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}

/// Persona 的 JSON Schema（嵌入 Crafter / Optimizer 的 prompt）
pub fn persona_schema_json() -> &'static str {
    static SCHEMA: OnceLock<String> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        let schema = schemars::schema_for!(Persona);
        serde_json::to_string_pretty(&schema).unwrap_or_default()
    })
}

/// 人设列表序列化为美化 JSON；`include_rules=false` 时去掉 interaction_rules
pub fn personas_to_json(personas: &[Persona], include_rules: bool) -> String {
    let values: Vec<Value> = personas
        .iter()
        .filter_map(|p| serde_json::to_value(p).ok())
        .map(|mut v| {
            if !include_rules {
                if let Some(obj) = v.as_object_mut() {
                    obj.remove("interaction_rules");
                }
            }
            v
        })
        .collect();
    serde_json::to_string_pretty(&values).unwrap_or_else(|_| "[]".to_string())
}

/// 一个 Character 对应一个发送账号，容纳多个人设
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub character_name: String,
    pub telegram_user: String,
    pub personas: Vec<Persona>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{json, Value};

    /// 符合 Persona schema 的最小 JSON
    pub fn persona_json(name: &str, role: &str) -> Value {
        json!({
            "persona_name": name,
            "tagline": format!("{name} at your service"),
            "role": role,
            "expertise": ["sneakers", "drops"],
            "signature_voice": {
                "tone": "energetic",
                "style": "short sentences",
                "language_habits": ["uses slang"]
            },
            "allow_emojis": true,
            "key_traits": ["bold"],
            "knowledge_boundaries": {
                "will_defer_on": ["refunds"],
                "refusal_message": "Not my lane!"
            },
            "examples": [
                { "user": "When is the drop?", "assistant": "Friday, 10am!" }
            ]
        })
    }
}
