//! 各阶段模型回复的解码：统一的「字段存在 + 列表类型 + 逐项 schema」校验
//!
//! 任一项解码失败即整体失败，不接受部分结果。

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::persona::bool_from_text;

/// 回复结构不符合预期
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("LLM output did not contain a valid '{0}' list")]
    MissingList(&'static str),

    #[error("LLM returned an empty '{0}' list")]
    EmptyList(&'static str),

    #[error("entry {index} of '{field}' does not match the required schema: {detail}")]
    InvalidEntry {
        field: &'static str,
        index: usize,
        detail: String,
    },
}

/// 取出 `field` 对应的 JSON 数组
pub fn take_list<'a>(value: &'a Value, field: &'static str) -> Result<&'a [Value], SchemaError> {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or(SchemaError::MissingList(field))
}

/// 解码单个对象
pub fn decode_entry<T: DeserializeOwned>(
    value: &Value,
    field: &'static str,
    index: usize,
) -> Result<T, SchemaError> {
    T::deserialize(value).map_err(|e| SchemaError::InvalidEntry {
        field,
        index,
        detail: e.to_string(),
    })
}

/// 解码 `field` 下的对象列表，全部成功才返回
pub fn decode_list<T: DeserializeOwned>(
    value: &Value,
    field: &'static str,
) -> Result<Vec<T>, SchemaError> {
    take_list(value, field)?
        .iter()
        .enumerate()
        .map(|(i, item)| decode_entry(item, field, i))
        .collect()
}

/// 解码 Planner 的 `tasks`：元素统一转为字符串
pub fn decode_tasks(value: &Value) -> Result<Vec<String>, SchemaError> {
    Ok(take_list(value, "tasks")?.iter().map(value_to_string).collect())
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

const MALFORMED_VERDICT: &str = "LLM response was malformed.";
const EMPTY_REJECTION: &str = "Validator rejected the persona team without giving a reason.";

/// Validator 的结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationVerdict {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationVerdict {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            errors: vec![error.into()],
        }
    }

    /// 宽松解读：缺字段时 is_valid=false 并给出合成错误；从不报错
    pub fn from_response(value: &Value) -> Self {
        let is_valid = match value.get("is_valid") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => bool_from_text(s).unwrap_or(false),
            _ => false,
        };
        let mut errors: Vec<String> = match value.get("errors").and_then(Value::as_array) {
            Some(items) => items.iter().map(value_to_string).collect(),
            None if is_valid => Vec::new(),
            None => vec![MALFORMED_VERDICT.to_string()],
        };
        if !is_valid && errors.is_empty() {
            errors.push(EMPTY_REJECTION.to_string());
        }
        Self { is_valid, errors }
    }
}

/// Linker 的互动规则条目
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaybookEntry {
    pub persona_name: String,
    pub rules: Vec<String>,
}

/// Linker 产出的团队协作手册
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InteractionPlaybook {
    pub entries: Vec<PlaybookEntry>,
}

impl InteractionPlaybook {
    /// 仅当 `interaction_playbook` 为列表时返回；结构不对的条目被跳过
    pub fn from_response(value: &Value) -> Option<Self> {
        let items = take_list(value, "interaction_playbook").ok()?;
        let entries = items
            .iter()
            .filter_map(|item| PlaybookEntry::deserialize(item).ok())
            .collect();
        Some(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Blueprint;
    use serde_json::json;

    #[test]
    fn test_decode_tasks_coerces_to_string() {
        let tasks = decode_tasks(&json!({"tasks": ["hype", 42, true]})).unwrap();
        assert_eq!(tasks, vec!["hype", "42", "true"]);
    }

    #[test]
    fn test_decode_tasks_missing_or_wrong_type() {
        assert_eq!(decode_tasks(&json!({})), Err(SchemaError::MissingList("tasks")));
        assert_eq!(
            decode_tasks(&json!({"tasks": "hype"})),
            Err(SchemaError::MissingList("tasks"))
        );
    }

    #[test]
    fn test_decode_list_is_all_or_nothing() {
        let value = json!({"persona_blueprints": [
            {"role": "Hype Creator", "description": "buzz"},
            {"role": "Support Specialist"}
        ]});
        let err = decode_list::<Blueprint>(&value, "persona_blueprints").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidEntry { index: 1, .. }));
    }

    #[test]
    fn test_verdict_defaults_when_malformed() {
        let verdict = ValidationVerdict::from_response(&json!({"error": "boom"}));
        assert!(!verdict.is_valid);
        assert_eq!(verdict.errors, vec![MALFORMED_VERDICT.to_string()]);
    }

    #[test]
    fn test_verdict_accepts_textual_booleans() {
        let verdict = ValidationVerdict::from_response(&json!({"is_valid": "true", "errors": []}));
        assert!(verdict.is_valid);
        assert!(verdict.errors.is_empty());

        let verdict = ValidationVerdict::from_response(&json!({"is_valid": " False ", "errors": ["gap"]}));
        assert!(!verdict.is_valid);
        assert_eq!(verdict.errors, ["gap"]);

        let verdict = ValidationVerdict::from_response(&json!({"is_valid": "maybe", "errors": []}));
        assert!(!verdict.is_valid);
    }

    #[test]
    fn test_verdict_rejection_always_has_reason() {
        let verdict = ValidationVerdict::from_response(&json!({"is_valid": false, "errors": []}));
        assert_eq!(verdict.errors.len(), 1);
    }

    #[test]
    fn test_verdict_valid() {
        let verdict = ValidationVerdict::from_response(&json!({"is_valid": true}));
        assert_eq!(verdict, ValidationVerdict::valid());
    }

    #[test]
    fn test_playbook_skips_bad_entries() {
        let playbook = InteractionPlaybook::from_response(&json!({"interaction_playbook": [
            {"persona_name": "Hype Bot", "rules": ["post memes"]},
            {"persona_name": "Broken", "rules": "not a list"},
            "garbage"
        ]}))
        .unwrap();
        assert_eq!(playbook.entries.len(), 1);
        assert!(InteractionPlaybook::from_response(&json!({"interaction_playbook": {}})).is_none());
    }
}
