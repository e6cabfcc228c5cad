//! ABOUTME: Run-id resolution for lineage events, following the same
//! ABOUTME: priority chain as `_extract_run_id` in the grounding source

use serde_json::Value;

const PATHS: &[&[&str]] = &[
    &["system", "runid"],
    &["workflow_run_id"],
    &["runtime", "workflow_run_id"],
    &["runtime", "run_id"],
    &["runtime", "workflow", "id"],
];

/// Resolves a run id from context, walking the priority chain
/// `system.runid` → `workflow_run_id` → `runtime.workflow_run_id` →
/// `runtime.run_id` → `runtime.workflow.id`, falling back to a fresh UUID
/// if none of those are present.
pub fn extract_run_id(context: &Value) -> String {
    for path in PATHS {
        let mut cursor = context;
        let mut found = true;
        for segment in *path {
            match cursor.get(segment) {
                Some(next) => cursor = next,
                None => {
                    found = false;
                    break;
                }
            }
        }
        if found {
            if let Some(s) = cursor.as_str() {
                return s.to_string();
            }
        }
    }
    uuid::Uuid::new_v4().to_string()
}
