//! Translator 输出解析
//!
//! LLM 常在 JSON 外包裹 ```json 代码块或多余文字；先剥离代码块，再从每个 `{` / `[` 起点尝试解析，取第一个形态符合的值。

use serde::Deserialize;
use serde_json::Value;

use super::{CallSpec, Task};
use crate::core::RelayError;

/// 未返回 method 时的默认值
pub const DEFAULT_METHOD: &str = "POST";

const ALLOWED_METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

const MISSING_REASONING: &str = "No reasoning provided.";

/// 剥离 Markdown 代码块，返回其中内容（无代码块时原样返回）
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.find("```") {
        Some(start) => {
            let rest = &trimmed[start + 3..];
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.find("```")
                .map(|end| rest[..end].trim())
                .unwrap_or_else(|| rest.trim())
        }
        None => trimmed,
    }
}

/// 依次尝试每个 `{` / `[` 起点，产出能解析出的 JSON 值（忽略其后的多余文字）
///
/// 前缀文字里的 `[1]` 之类片段也会被产出，由调用方按期望的形态挑选。
pub fn json_candidates(text: &str) -> impl Iterator<Item = Value> + '_ {
    let s = strip_code_fences(text);
    s.char_indices()
        .filter(|&(_, c)| c == '{' || c == '[')
        .filter_map(move |(start, _)| {
            serde_json::Deserializer::from_str(&s[start..])
                .into_iter::<Value>()
                .next()
                .and_then(Result::ok)
        })
}

fn no_json(text: &str) -> RelayError {
    RelayError::TranslationFailure(format!("no JSON in output: {}", text.trim()))
}

#[derive(Debug, Deserialize)]
struct RawCallSpec {
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default, alias = "path")]
    endpoint: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    body: Option<Value>,
}

/// 解析 translate 输出为 CallSpec：method 缺省为 POST，endpoint 必填
pub fn parse_call_spec(text: &str) -> Result<CallSpec, RelayError> {
    let value = json_candidates(text)
        .find(Value::is_object)
        .ok_or_else(|| no_json(text))?;
    let raw: RawCallSpec = serde_json::from_value(value)
        .map_err(|e| RelayError::TranslationFailure(e.to_string()))?;

    let endpoint = raw
        .endpoint
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| RelayError::TranslationFailure("missing endpoint".to_string()))?;
    let endpoint = if endpoint.starts_with('/') {
        endpoint
    } else {
        format!("/{}", endpoint)
    };

    let method = raw
        .method
        .map(|m| m.trim().to_uppercase())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_METHOD.to_string());
    if !ALLOWED_METHODS.contains(&method.as_str()) {
        return Err(RelayError::TranslationFailure(format!(
            "unsupported HTTP method: {}",
            method
        )));
    }

    let reasoning = raw
        .reasoning
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| MISSING_REASONING.to_string());

    Ok(CallSpec {
        method,
        endpoint,
        body: raw.body.unwrap_or(Value::Null),
        reasoning,
    })
}

/// 取出任务数组：数组本身、`{"tasks": [...]}` 或单个任务对象
fn task_list(value: &Value) -> Option<Value> {
    let all_objects = |items: &Vec<Value>| items.iter().all(Value::is_object);
    match value {
        Value::Array(items) if all_objects(items) => Some(value.clone()),
        Value::Object(map) => match map.get("tasks") {
            Some(Value::Array(items)) if all_objects(items) => Some(Value::Array(items.clone())),
            _ if map.contains_key("agentName") => Some(Value::Array(vec![value.clone()])),
            _ => None,
        },
        _ => None,
    }
}

/// 解析 decompose 输出：接受数组、`{"tasks": [...]}` 或单个任务对象，其他形态视为空计划
pub fn parse_tasks(text: &str) -> Result<Vec<Task>, RelayError> {
    let mut parsed_any = false;
    let tasks = json_candidates(text).find_map(|value| {
        parsed_any = true;
        task_list(&value)
    });
    match tasks {
        Some(tasks) => {
            serde_json::from_value(tasks).map_err(|e| RelayError::TranslationFailure(e.to_string()))
        }
        None if parsed_any => Ok(Vec::new()),
        None => Err(no_json(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call_spec_defaults_method() {
        let spec = parse_call_spec(
            r#"{"reasoning": "I detected a booking", "endpoint": "/bookings/create", "body": {"service_code": "HCUT"}}"#,
        )
        .unwrap();
        assert_eq!(spec.method, "POST");
        assert_eq!(spec.endpoint, "/bookings/create");
        assert_eq!(spec.body["service_code"], "HCUT");
    }

    #[test]
    fn test_parse_call_spec_strips_fences_and_normalizes() {
        let text = "Sure!\n```json\n{\"endpoint\": \"books/search\", \"method\": \"get\"}\n```";
        let spec = parse_call_spec(text).unwrap();
        assert_eq!(spec.method, "GET");
        assert_eq!(spec.endpoint, "/books/search");
        assert_eq!(spec.body, Value::Null);
        assert_eq!(spec.reasoning, MISSING_REASONING);
    }

    #[test]
    fn test_parse_call_spec_rejects_malformed() {
        assert!(matches!(
            parse_call_spec("I cannot help with that"),
            Err(RelayError::TranslationFailure(_))
        ));
        assert!(matches!(
            parse_call_spec(r#"{"method": "POST"}"#),
            Err(RelayError::TranslationFailure(_))
        ));
        assert!(matches!(
            parse_call_spec(r#"{"endpoint": "/x", "method": "FETCH"}"#),
            Err(RelayError::TranslationFailure(_))
        ));
    }

    #[test]
    fn test_parse_tasks_shapes() {
        let array = r#"[{"agentName": "SalonBot", "subIntent": "book", "reasoning": "salon"}]"#;
        assert_eq!(parse_tasks(array).unwrap().len(), 1);

        let wrapped = r#"{"tasks": [{"agentName": "A", "subIntent": "x"}, {"agentName": "B", "subIntent": "y"}]}"#;
        let tasks = parse_tasks(wrapped).unwrap();
        assert_eq!(tasks[1].agent_name, "B");
        assert_eq!(tasks[1].reasoning, "");

        let single = r#"{"agentName": "LibraryBot", "subIntent": "find a book"}"#;
        assert_eq!(parse_tasks(single).unwrap()[0].agent_name, "LibraryBot");

        assert!(parse_tasks(r#"{"result": "nothing"}"#).unwrap().is_empty());
    }

    #[test]
    fn test_json_candidates_skip_invalid_starts() {
        let found: Vec<Value> = json_candidates("prefix [1, 2] suffix {oops").collect();
        assert_eq!(found, vec![serde_json::json!([1, 2])]);
        assert_eq!(json_candidates("no json here").count(), 0);
    }

    #[test]
    fn test_parse_tasks_after_bracketed_prose() {
        let text = r#"see [1]: {"tasks": [{"agentName": "SalonBot", "subIntent": "book"}]} thanks"#;
        let tasks = parse_tasks(text).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].agent_name, "SalonBot");

        let text = r#"Plan [v2]: [{"agentName": "A", "subIntent": "x"}, {"agentName": "B", "subIntent": "y"}]"#;
        assert_eq!(parse_tasks(text).unwrap().len(), 2);

        assert!(matches!(parse_tasks("nothing to do"), Err(RelayError::TranslationFailure(_))));
        assert!(parse_tasks("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_call_spec_after_bracketed_prose() {
        let text = r#"Per docs [2] use {"endpoint": "/loans", "method": "post", "body": {"isbn": "1"}}"#;
        let spec = parse_call_spec(text).unwrap();
        assert_eq!(spec.endpoint, "/loans");
        assert_eq!(spec.body["isbn"], "1");
    }
}
