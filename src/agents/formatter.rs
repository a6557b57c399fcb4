//! Formatter（非 AI）：把最终人设归入一个 Character，供下游发送账号使用

use crate::config::FormatterSection;
use crate::schema::{Character, Persona};

pub fn format_characters(personas: &[Persona], config: &FormatterSection) -> Vec<Character> {
    if personas.is_empty() {
        tracing::warn!("[Formatter] No personas to format.");
        return Vec::new();
    }

    tracing::info!(
        "[Formatter] Grouping {} personas under '{}'.",
        personas.len(),
        config.character_name
    );
    vec![Character {
        character_name: config.character_name.clone(),
        telegram_user: config.telegram_user.clone(),
        personas: personas.to_vec(),
    }]
}
