//! 结构化类型：蓝图、人设、校验结论、互动手册，以及模型回复的严格解码

pub mod blueprint;
pub mod persona;
pub mod responses;

pub use blueprint::Blueprint;
pub use persona::{
    persona_schema_json, personas_to_json, Character, ExampleInteraction, KnowledgeBoundaries,
    Persona, SignatureVoice,
};
pub use responses::{
    decode_entry, decode_list, decode_tasks, take_list, InteractionPlaybook, PlaybookEntry,
    SchemaError, ValidationVerdict,
};
