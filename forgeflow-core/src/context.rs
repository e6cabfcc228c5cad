//! ABOUTME: Hierarchical context/config model: dotted-path lookup, bound views, deep merge
//! ABOUTME: backs both the workflow Context and the on-disk Config tree

use serde_json::Value;

/// Root-level keys that belong to the "system namespace." Everything else
/// at the root of an override is a *runtime value* and gets copied into
/// every agent's own config sub-map during `deep_merge`, unless the agent
/// already defines that key itself.
const SYSTEM_NAMESPACES: [&str; 5] = ["providers", "llm_config", "project", "backup", "logging"];

/// A read-only, dotted-path view bound to some subtree of a larger
/// `Value`. `get_node(prefix)` on either `Context` or `ConfigNode` returns
/// one of these; all subsequent `get` calls on it are relative to `prefix`.
#[derive(Debug, Clone)]
pub struct ConfigNode {
    value: Value,
}

impl ConfigNode {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Resolves a dotted path rooted at this node. A segment equal to `*`
    /// matches the first available child (by key order for objects, by
    /// index for arrays) and continues downward from there.
    pub fn get(&self, path: &str) -> Option<&Value> {
        resolve_path(&self.value, path)
    }

    /// Returns a bound view rooted at `prefix`, or `None` if the path
    /// doesn't resolve to a value.
    pub fn get_node(&self, prefix: &str) -> Option<ConfigNode> {
        resolve_path(&self.value, prefix).map(|v| ConfigNode::new(v.clone()))
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }
}

/// The workflow context: a hierarchical string-keyed map threaded through
/// an entire run. Mutated in place only by the Orchestrator between team
/// boundaries — teams and agents receive a context and must not mutate the
/// caller's copy directly (see the "mutable context" design note).
#[derive(Debug, Clone, Default)]
pub struct Context {
    value: Value,
}

impl Context {
    pub fn new() -> Self {
        Self {
            value: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn from_value(value: Value) -> Self {
        Self { value }
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        resolve_path(&self.value, path)
    }

    pub fn get_node(&self, prefix: &str) -> Option<ConfigNode> {
        resolve_path(&self.value, prefix).map(|v| ConfigNode::new(v.clone()))
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Sets a dotted path to `new_value`, creating intermediate objects as
    /// needed. Used for the handful of well-known keys the Orchestrator
    /// stamps directly (`system.runid`, `workflow_run_id`, ...).
    pub fn set(&mut self, path: &str, new_value: Value) {
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        set_path(&mut self.value, &segments, new_value);
    }

    /// Overlays `overlay` onto this context using the same rules as
    /// `deep_merge`, in place. This is how the Orchestrator folds a team
    /// result's `data` (and optional `input_data`) back into the running
    /// context before invoking the next team.
    pub fn merge_overlay(&mut self, overlay: &Value) {
        merge_objects(&mut self.value, overlay);
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

fn resolve_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        if segment.is_empty() {
            continue;
        }
        current = if segment == "*" {
            match current {
                Value::Object(map) => map.values().next()?,
                Value::Array(arr) => arr.first()?,
                _ => return None,
            }
        } else {
            match current {
                Value::Object(map) => map.get(segment)?,
                _ => return None,
            }
        };
    }
    Some(current)
}

fn set_path(root: &mut Value, segments: &[&str], new_value: Value) {
    if !root.is_object() {
        *root = Value::Object(serde_json::Map::new());
    }
    let map = root.as_object_mut().expect("just ensured object");
    match segments {
        [] => {}
        [last] => {
            map.insert((*last).to_string(), new_value);
        }
        [head, rest @ ..] => {
            let child = map
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            set_path(child, rest, new_value);
        }
    }
}

/// Deep-merges `override_value` onto a clone of `base`, following the rules
/// in the data model: maps merge recursively, sequences are replaced
/// wholesale, an explicit `null` in the override deletes the key, and
/// root-level keys outside the system namespaces are copied into every
/// agent's own config sub-map under `llm_config.agents.*` unless the agent
/// already defines that key.
pub fn deep_merge(base: &Value, override_value: &Value) -> Value {
    let mut result = base.clone();
    propagate_runtime_values(&mut result, override_value);
    merge_objects(&mut result, override_value);
    result
}

fn propagate_runtime_values(result: &mut Value, override_value: &Value) {
    let (Value::Object(result_map), Value::Object(override_map)) = (&mut *result, override_value)
    else {
        return;
    };
    if !result_map.contains_key("llm_config") && !override_map.contains_key("llm_config") {
        return;
    }
    let runtime_keys: Vec<&String> = override_map
        .keys()
        .filter(|k| !SYSTEM_NAMESPACES.contains(&k.as_str()))
        .collect();
    if runtime_keys.is_empty() {
        return;
    }
    let Some(Value::Object(llm_config)) = result_map.get_mut("llm_config") else {
        return;
    };
    let Some(Value::Object(agents)) = llm_config.get_mut("agents") else {
        return;
    };
    for agent_config in agents.values_mut() {
        let Value::Object(agent_map) = agent_config else {
            continue;
        };
        for key in &runtime_keys {
            if !agent_map.contains_key(*key) {
                agent_map.insert((*key).clone(), override_map[*key].clone());
            }
        }
    }
}

/// Merges `override_value` into `result` in place: objects merge key by
/// key, `null` deletes, everything else (including arrays) is replaced
/// wholesale by the override's value.
fn merge_objects(result: &mut Value, override_value: &Value) {
    let Value::Object(override_map) = override_value else {
        *result = override_value.clone();
        return;
    };
    if !result.is_object() {
        *result = Value::Object(serde_json::Map::new());
    }
    let result_map = result.as_object_mut().expect("just ensured object");
    for (key, value) in override_map {
        if value.is_null() {
            result_map.remove(key);
            continue;
        }
        match result_map.get_mut(key) {
            Some(existing) if existing.is_object() && value.is_object() => {
                merge_objects(existing, value);
            }
            _ => {
                result_map.insert(key.clone(), value.clone());
            }
        }
    }
}
