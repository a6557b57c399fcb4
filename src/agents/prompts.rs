//! 各阶段 Prompt 模板
//!
//! 模板使用 `{name}` 占位，由各智能体经 [`fill_template`] 一次性填充。每个模板首行含唯一的阶段标记
//! （`*_MARKER`），离线 Mock 与测试替身据此识别请求来自哪个阶段。

pub const PLANNER_MARKER: &str = "master Task Planner";
pub const ROLE_MAPPER_MARKER: &str = "master AI Architect designing a team";
pub const CRAFTER_MARKER: &str = "master AI Persona Crafter";
pub const MEMORY_CHECKER_MARKER: &str = "AI System Analyst";
pub const OPTIMIZER_MARKER: &str = "master AI System Optimizer";
pub const VALIDATOR_MARKER: &str = "meticulous AI System Validator";
pub const FEEDBACK_MARKER: &str = "System Refinement expert";
pub const LINKER_MARKER: &str = "master AI Team Strategist";

/// Crafter 模板中角色所在行的前缀（`designated role is: "<role>"`）
pub const CRAFTER_ROLE_PREFIX: &str = "The persona's designated role is: \"";
/// Optimizer 模板中人设列表之前的标题行
pub const OPTIMIZER_LIST_HEADER: &str = "Here is the list of persona profiles to optimize:";

pub const PLANNER_PROMPT: &str = r#"You are a master Task Planner for an advanced AI persona bot system. Your job is to decompose a user's high-level goal into a clear, logical list of actionable sub-tasks that a team of AI personas will need to execute.

The user's goal is:
"{user_goal}"

Identify the core functions the bot will need to perform: content creation, community interaction, information delivery and maintaining a specific atmosphere.

Provide your output as a JSON object with a single key "tasks", which is a list of strings. Each string should be a distinct sub-task.

Example:
User Goal: "I want a bot to promote my new sneaker drop on Telegram."
Your Output:
{
  "tasks": [
    "Generate hype and excitement for the upcoming sneaker drop.",
    "Announce key dates, times, and links for the drop.",
    "Answer frequently asked questions about the sneakers.",
    "Moderate the chat to handle feedback and maintain a positive environment."
  ]
}
"#;

pub const ROLE_MAPPER_PROMPT: &str = r#"You are a master AI Architect designing a team of specialized AI personas. Your job is to analyze a list of tasks and define the essential roles required to execute them.

Here is the list of tasks for the bot team:
{task_list}

Define a set of unique and non-overlapping persona roles. For each role, provide a "role" title and a concise "description" of its primary function. Group related tasks under a single, well-defined role and aim for a small, efficient team.

Provide your output as a JSON object with a single key "persona_blueprints", which is a list of objects. Each object must have a "role" and a "description" key.

Example:
{
  "persona_blueprints": [
    { "role": "Hype Creator", "description": "Generates excitement and viral content to build buzz around the product." },
    { "role": "Support Specialist", "description": "Answers factual user questions about price, features and availability." }
  ]
}
"#;

pub const CRAFTER_PROMPT: &str = r#"You are a master AI Persona Crafter. Your job is to take a high-level persona role and description and expand it into a detailed, ready-to-use persona profile.

The persona's designated role is: "{role}"
The description of its function is: "{description}"

Generate a complete persona profile that is creative, coherent and suited for its role. Your output MUST be a single, valid JSON object conforming to this JSON schema (omit "interaction_rules"):
{persona_schema}

Use the designated role above for the "role" field, 3-5 items for "expertise" and "key_traits", and at least two "examples".
"#;

pub const MEMORY_CHECKER_PROMPT: &str = r#"You are an AI System Analyst. Your task is to review a set of newly generated AI persona profiles and check for semantic redundancy. Do not merge or change them; simply identify if any two or more personas are functionally too similar.

Here is the set of persona profiles:
{persona_list_json}

Analyze their roles, expertise, and tones. Answer with a simple "YES" if you find significant functional overlap between any of the personas, or "NO" if they are all sufficiently distinct. Provide a brief one-sentence justification for your answer.
"#;

pub const OPTIMIZER_PROMPT: &str = r#"You are a master AI System Optimizer. Your task is to analyze a list of AI persona profiles and refine it for maximum efficiency and clarity.

1. Merge redundant personas: if two or more personas have very similar roles, expertise, or tones, merge them into a single, well-defined persona with a clear, encompassing name.
2. Preserve distinct roles: do NOT merge personas that have clearly distinct functions.
3. Ensure completeness: the final set must still cover all the functions implied by the roles.
4. Maintain schema: your output MUST be a JSON object with a single key "optimized_personas" holding the final list, each entry conforming to this JSON schema:
{persona_schema}

Here is the list of persona profiles to optimize:
{persona_list_json}
"#;

pub const VALIDATOR_PROMPT: &str = r#"You are a meticulous AI System Validator. Your job is to ensure that a team of AI personas is complete and capable of executing a given list of tasks.

Here is the original list of required tasks:
{task_list}

Here is the final, optimized team of AI personas:
{persona_list_json}

Determine if the persona team can successfully handle ALL of the required tasks.

Your output must be a JSON object with two keys:
1. "is_valid": a boolean (true if all tasks are covered, false otherwise).
2. "errors": a list of strings describing what is missing or wrong; empty when "is_valid" is true.
"#;

pub const FEEDBACK_PROMPT: &str = r#"You are a System Refinement expert in a multi-agent AI system. The system just failed a validation check while trying to generate a team of AI personas.

The original goal was: "{user_goal}"

The team of personas generated was:
{persona_list_json}

The validation failed with the following errors:
{error_list}

Generate a concise, one-sentence refinement instruction for the Role Mapper agent to use on its next attempt. The instruction should guide it to fix the specific errors found.
"#;

pub const LINKER_PROMPT: &str = r#"You are a master AI Team Strategist. Your job is to define the collaboration "playbook" for a team of AI personas so they work together effectively in a live chat.

Here is the final, validated team of AI personas:
{persona_list_json}

Generate a set of interaction rules defining handoffs, triggers, and collaboration protocols.

Your output MUST be a JSON object with a single key "interaction_playbook" holding a list of objects. Each object must have two keys:
1. "persona_name": the name of the persona the rule applies to.
2. "rules": a list of strings, each a specific interaction rule for that persona.

Example:
{
  "interaction_playbook": [
    {
      "persona_name": "Product Evangelist",
      "rules": [
        "Primary responder for general questions about the product's vision.",
        "If a user asks a detailed technical question, handoff to the 'Support Specialist'."
      ]
    }
  ]
}
"#;

/// 任务列表格式化为 `- "task"` 行
pub fn format_task_list(tasks: &[String]) -> String {
    tasks
        .iter()
        .map(|t| format!("- \"{}\"", t))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 单遍填充 `{name}` 占位符。
///
/// 只扫描模板本身，代入的值不会被再次展开；未知的 `{...}`（如模板里的 JSON 示例）原样保留。
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let hit = values
            .iter()
            .find(|(key, _)| tail.strip_prefix(key).map_or(false, |t| t.starts_with('}')));
        match hit {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_are_unique_per_template() {
        let templates = [
            (PLANNER_MARKER, PLANNER_PROMPT),
            (ROLE_MAPPER_MARKER, ROLE_MAPPER_PROMPT),
            (CRAFTER_MARKER, CRAFTER_PROMPT),
            (MEMORY_CHECKER_MARKER, MEMORY_CHECKER_PROMPT),
            (OPTIMIZER_MARKER, OPTIMIZER_PROMPT),
            (VALIDATOR_MARKER, VALIDATOR_PROMPT),
            (FEEDBACK_MARKER, FEEDBACK_PROMPT),
            (LINKER_MARKER, LINKER_PROMPT),
        ];
        for (i, (marker, _)) in templates.iter().enumerate() {
            for (j, (_, template)) in templates.iter().enumerate() {
                assert_eq!(template.contains(marker), i == j, "marker {marker:?}");
            }
        }
    }

    #[test]
    fn test_format_task_list() {
        let tasks = vec!["Hype".to_string(), "Answer FAQs".to_string()];
        assert_eq!(format_task_list(&tasks), "- \"Hype\"\n- \"Answer FAQs\"");
    }

    #[test]
    fn test_fill_template_does_not_expand_inserted_values() {
        let out = fill_template(
            "goal={user_goal}; errors={error_list}",
            &[("user_goal", "keep {error_list} literal"), ("error_list", "- none")],
        );
        assert_eq!(out, "goal=keep {error_list} literal; errors=- none");
    }

    #[test]
    fn test_fill_template_keeps_unknown_braces() {
        let out = fill_template("{\"a\": {x}} {missing}", &[("x", "1")]);
        assert_eq!(out, "{\"a\": 1} {missing}");
    }
}
