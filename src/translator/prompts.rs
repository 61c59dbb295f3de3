//! Translator 使用的提示词模板

use crate::store::AgentDescriptor;

/// translate：意图 + 文档 → 调用规格
pub fn call_spec_system_prompt(documentation: &str) -> String {
    format!(
        r#"Act as an API integration expert.

Based on the User Intent and the provided Target API Documentation, generate a valid JSON object describing the API call to be made.

Target API Documentation:
"""
{documentation}
"""

Output Format (JSON Only):
{{
    "reasoning": "Explain WHY you chose this endpoint and payload in 1 sentence. Start with 'I detected...'",
    "endpoint": "/path/to/resource",
    "method": "POST",
    "body": {{ "...payload fields...": "..." }}
}}

Rules:
1. Output MUST be valid JSON only.
2. Do NOT include markdown code blocks.
3. Do NOT include any explanation or extra text outside the JSON.
4. If the user intent is missing information required by the API, use reasonable defaults or best guesses based on the intent (e.g. if "tomorrow", calculate the date).
5. Ensure data types match the documentation (e.g. integers for numbers)."#
    )
}

/// decompose：Agent 列表 → 有序任务数组
pub fn decompose_system_prompt(agents: &[AgentDescriptor]) -> String {
    let agent_list: Vec<serde_json::Value> = agents
        .iter()
        .map(|a| {
            serde_json::json!({
                "name": a.name,
                "description": a.description,
                "url": a.base_url,
            })
        })
        .collect();
    let agent_json =
        serde_json::to_string_pretty(&agent_list).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"Act as a Strategic Orchestrator.

Available Agents:
{agent_json}

Task:
1. Analyze the intent. Is it a single action or multiple actions?
2. Use the previous conversation to resolve references such as "it" or "the same time".
3. Break it down into clear sub-tasks, in the order they must run.
4. For EACH sub-task, select the best agent by its exact name.

Output Format (JSON Array):
[
    {{
        "agentName": "Name of agent",
        "subIntent": "Specific instruction for this agent",
        "reasoning": "Why this agent for this part"
    }}
]

Only return the JSON Array. Return [] if no agent fits."#
    )
}

pub const SUMMARY_SYSTEM_PROMPT: &str = "Act as a helpful AI assistant.
Task: Write a friendly, natural language summary of the result for the user.
- Confirm if the action was successful.
- Mention key details (like time, IDs, etc.) if resolved.
- If it failed, explain why kindly.
- Keep it short (1-2 sentences).";

pub fn user_intent(intent: &str) -> String {
    format!("User Intent: \"{}\"", intent)
}

pub fn summary_user_prompt(intent: &str, response: &serde_json::Value) -> String {
    format!(
        "User Intent: \"{}\"\nSystem Response: {}",
        intent, response
    )
}
