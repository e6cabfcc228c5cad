//! ABOUTME: The lineage event data model and the type-sniffing value serializer
//! ABOUTME: used to flatten LLM response shapes before they're written to disk

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifies the agent that produced an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRef {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Placement of an event within a workflow run's execution tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRef {
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<i64>,
    pub execution_path: Vec<String>,
}

/// The request side of an LLM interaction, as recorded for lineage.
///
/// Field names follow spec.md's data model (`system`/`user`) rather than the
/// `system_message`/`user_message` naming used by the Python grounding
/// source's event JSON — spec.md is the binding wire contract here, and
/// nothing downstream (including lineage replay in this same workspace)
/// depends on the Python file's exact key spelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmInputRef {
    pub system: String,
    pub user: String,
    pub formatted_request: String,
}

/// A single recorded LLM interaction, written as one JSON file per event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub agent: AgentRef,
    pub workflow: WorkflowRef,
    pub llm_input: LlmInputRef,
    pub llm_output: Value,
    pub metrics: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Metadata derived from a run's context for placing an event in the
/// execution tree, mirroring `_extract_lineage_metadata`.
pub struct LineageMetadata {
    pub event_id: String,
    pub parent_id: Option<String>,
    pub step: Option<i64>,
    pub execution_path: Vec<String>,
}

/// Derives `(event_id, parent_id, step, execution_path)` from a run's
/// context, following the same precedence chain as the Python original:
/// an explicit `agent_execution_id` wins over a freshly generated id; a
/// `parent_id` is only recorded if it names a *different* run than `self`.
pub fn extract_lineage_metadata(context: &Value, self_run_id: &str) -> LineageMetadata {
    let event_id = context
        .get("agent_execution_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let candidate_parent = context
        .get("parent_id")
        .and_then(Value::as_str)
        .or_else(|| context.get("parent_run_id").and_then(Value::as_str))
        .or_else(|| context.get("workflow_run_id").and_then(Value::as_str));
    let parent_id = candidate_parent
        .filter(|p| *p != self_run_id)
        .map(str::to_string);

    let step = context
        .get("step")
        .and_then(Value::as_i64)
        .or_else(|| context.get("sequence").and_then(Value::as_i64));

    let execution_path = context
        .get("execution_path")
        .and_then(Value::as_array)
        .or_else(|| {
            context
                .get("lineage_metadata")
                .and_then(|m| m.get("execution_path"))
                .and_then(Value::as_array)
        })
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    LineageMetadata {
        event_id,
        parent_id,
        step,
        execution_path,
    }
}

/// Appends `"<agent_type>:<event_id[:8]>"` to an inherited execution path,
/// matching `_extract_lineage_metadata`'s trailing-segment convention.
pub fn append_execution_path(mut path: Vec<String>, agent_type: &str, event_id: &str) -> Vec<String> {
    let short_id: String = event_id.chars().take(8).collect();
    path.push(format!("{agent_type}:{short_id}"));
    path
}

/// Flattens a raw LLM response/usage-shaped value into a plain JSON map
/// before it is written to a lineage event, mirroring `_serialize_value`'s
/// shape dispatch. Values that are already plain JSON (the common case,
/// since this crate never holds Python's richer runtime types) pass through
/// unchanged except for the LLM-response and usage shapes called out below.
pub fn serialize_llm_output(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(flat) = flatten_completion_shape(map) {
                return flat;
            }
            if let Some(flat) = flatten_usage_shape(map) {
                return flat;
            }
            if let Some(flat) = flatten_stream_delta_shape(map) {
                return flat;
            }
            Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serialize_llm_output(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(serialize_llm_output).collect()),
        other => other.clone(),
    }
}

/// Matches the `{choices: [{message: {content}}], finish_reason, model, usage}`
/// completion-response shape and extracts it into a flat dict.
fn flatten_completion_shape(map: &Map<String, Value>) -> Option<Value> {
    let choices = map.get("choices")?.as_array()?;
    let first = choices.first()?;
    let message = first.get("message")?;
    let content = message.get("content")?.clone();
    let finish_reason = first
        .get("finish_reason")
        .cloned()
        .unwrap_or(Value::Null);
    let mut out = Map::new();
    out.insert("content".into(), content);
    out.insert("finish_reason".into(), finish_reason);
    if let Some(model) = map.get("model") {
        out.insert("model".into(), model.clone());
    }
    if let Some(usage) = map.get("usage") {
        out.insert("usage".into(), usage.clone());
    }
    Some(Value::Object(out))
}

/// Matches a streaming delta chunk shape (`{choices: [{delta: {content}}]}`).
fn flatten_stream_delta_shape(map: &Map<String, Value>) -> Option<Value> {
    let choices = map.get("choices")?.as_array()?;
    let first = choices.first()?;
    let delta = first.get("delta")?;
    let content = delta.get("content")?.clone();
    let mut out = Map::new();
    out.insert("content".into(), content);
    Some(Value::Object(out))
}

/// Matches a `Usage`-named object (`prompt_tokens`/`completion_tokens`/`total_tokens`,
/// or the Anthropic-style `input_tokens`/`output_tokens`).
fn flatten_usage_shape(map: &Map<String, Value>) -> Option<Value> {
    if let (Some(p), Some(c)) = (map.get("prompt_tokens"), map.get("completion_tokens")) {
        let total = map
            .get("total_tokens")
            .cloned()
            .unwrap_or_else(|| Value::from(p.as_u64().unwrap_or(0) + c.as_u64().unwrap_or(0)));
        let mut out = Map::new();
        out.insert("prompt_tokens".into(), p.clone());
        out.insert("completion_tokens".into(), c.clone());
        out.insert("total_tokens".into(), total);
        return Some(Value::Object(out));
    }
    if let (Some(i), Some(o)) = (map.get("input_tokens"), map.get("output_tokens")) {
        let total = Value::from(i.as_u64().unwrap_or(0) + o.as_u64().unwrap_or(0));
        let mut out = Map::new();
        out.insert("prompt_tokens".into(), i.clone());
        out.insert("completion_tokens".into(), o.clone());
        out.insert("total_tokens".into(), total);
        return Some(Value::Object(out));
    }
    None
}
