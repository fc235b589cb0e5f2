//! Field-name normalization for result and memory-bank records.
//!
//! Datasets written by different runners name the same concept differently
//! (`game_id` vs `episode_id`, `success` vs `is_success`). All known variants
//! live in the tables below; supporting a new convention means adding a name
//! to a list, never touching the pipeline.

use crate::models::{Insight, MemoryItem, MemoryRef, RunInfo, Step, TaskResult};
use serde_json::{Map, Value};

/// A canonical field and the on-disk names it may appear under, in
/// priority order.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub variants: &'static [&'static str],
}

pub const TASK_ID: Field = Field {
    name: "task_id",
    variants: &["task_id", "game_id", "episode_id", "id"],
};

/// Task id of a memory-bank line; `id` there names the memory, not the task.
pub const SOURCE_TASK_ID: Field = Field {
    name: "task_id",
    variants: &["task_id", "game_id", "episode_id"],
};

pub const SUCCESS: Field = Field {
    name: "success",
    variants: &["success", "is_success", "won", "passed"],
};

pub const STEPS: Field = Field {
    name: "steps",
    variants: &["steps", "num_steps", "step_count"],
};

pub const TASK_TYPE: Field = Field {
    name: "task_type",
    variants: &["task_type", "task_name", "type"],
};

pub const GOAL: Field = Field {
    name: "goal",
    variants: &["goal", "task", "instruction"],
};

pub const SCORE: Field = Field {
    name: "score",
    variants: &["score", "reward"],
};

pub const USED_MEMORIES: Field = Field {
    name: "used_memories",
    variants: &["used_memories", "retrieved_memories"],
};

pub const MEMORY_ID: Field = Field {
    name: "memory_id",
    variants: &["memory_id", "id"],
};

pub const INSIGHTS: Field = Field {
    name: "memory_items",
    variants: &["memory_items", "items"],
};

pub const SUMMARY_TOTAL: Field = Field {
    name: "total",
    variants: &["total_games", "total_episodes", "total"],
};

const STEP_ACTION: Field = Field {
    name: "action",
    variants: &["action", "act"],
};

const STEP_OBSERVATION: Field = Field {
    name: "observation",
    variants: &["observation", "obs"],
};

const STEP_REASONING: Field = Field {
    name: "reasoning",
    variants: &["thought", "reasoning", "think"],
};

/// Look up the first non-null variant of a field.
pub fn lookup<'a>(obj: &'a Map<String, Value>, field: &Field) -> Option<&'a Value> {
    field
        .variants
        .iter()
        .filter_map(|name| obj.get(*name))
        .find(|v| !v.is_null())
}

/// Normalize one entry of a result file's `results` array.
///
/// Returns the canonical name of the first required field that could not be
/// mapped.
pub fn normalize_result(value: &Value) -> Result<TaskResult, &'static str> {
    let obj = value.as_object().ok_or(TASK_ID.name)?;

    let task_id = lookup(obj, &TASK_ID)
        .and_then(as_string)
        .filter(|id| !id.trim().is_empty())
        .ok_or(TASK_ID.name)?;
    let success = lookup(obj, &SUCCESS).and_then(as_bool).ok_or(SUCCESS.name)?;

    let trajectory = read_trajectory(obj);
    let steps = match lookup(obj, &STEPS).and_then(as_u32) {
        Some(n) => Some(n),
        None if !trajectory.is_empty() => u32::try_from(trajectory.len()).ok(),
        None => None,
    };

    let used_memories = match lookup(obj, &USED_MEMORIES).and_then(Value::as_array) {
        Some(refs) => refs
            .iter()
            .map(normalize_reference)
            .collect::<Option<Vec<_>>>()
            .ok_or(MEMORY_ID.name)?,
        None => Vec::new(),
    };

    Ok(TaskResult {
        task_id,
        task_type: lookup(obj, &TASK_TYPE).and_then(as_string),
        success,
        steps,
        goal: lookup(obj, &GOAL).and_then(as_string),
        score: lookup(obj, &SCORE).and_then(Value::as_f64),
        trajectory,
        used_memories,
    })
}

/// Normalize one memory-bank line.
pub fn normalize_memory(value: &Value) -> Result<MemoryItem, &'static str> {
    let obj = value.as_object().ok_or(TASK_ID.name)?;

    let task_id = lookup(obj, &SOURCE_TASK_ID)
        .and_then(as_string)
        .filter(|id| !id.trim().is_empty())
        .ok_or(SOURCE_TASK_ID.name)?;
    let memory_id = lookup(obj, &MEMORY_ID)
        .and_then(as_string)
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| task_id.clone());

    let insights = lookup(obj, &INSIGHTS)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(normalize_insight).collect())
        .unwrap_or_default();

    let tags = obj
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| tags.iter().filter_map(as_string).collect())
        .unwrap_or_default();

    Ok(MemoryItem {
        memory_id,
        task_id,
        task_type: lookup(obj, &TASK_TYPE).and_then(as_string),
        query: obj.get("query").and_then(as_string),
        is_success: lookup(obj, &SUCCESS).and_then(as_bool),
        insights,
        trajectory: read_trajectory(obj),
        tags,
        metadata: obj.get("metadata").filter(|v| !v.is_null()).cloned(),
    })
}

/// Extract run information from a result document.
pub fn read_run_info(doc: &Map<String, Value>, source_file: &str, result_count: usize) -> RunInfo {
    let config = doc.get("config");
    let memory = config.and_then(|c| c.get("memory"));

    RunInfo {
        source_file: source_file.to_string(),
        model: doc.get("model").and_then(as_string),
        timestamp: doc.get("timestamp").and_then(as_string),
        temperature: config
            .and_then(|c| c.get("llm"))
            .and_then(|llm| llm.get("temperature"))
            .and_then(Value::as_f64),
        memory_mode: memory.and_then(|m| m.get("mode")).and_then(as_string),
        top_k: memory.and_then(|m| m.get("top_k")).and_then(Value::as_u64),
        similarity_threshold: memory
            .and_then(|m| m.get("similarity_threshold"))
            .and_then(Value::as_f64),
        recorded_total: doc
            .get("summary")
            .and_then(Value::as_object)
            .and_then(|s| lookup(s, &SUMMARY_TOTAL))
            .and_then(Value::as_u64)
            .and_then(|n| usize::try_from(n).ok()),
        result_count,
    }
}

fn normalize_reference(value: &Value) -> Option<MemoryRef> {
    match value {
        Value::String(id) if !id.is_empty() => Some(MemoryRef {
            memory_id: id.clone(),
            query: None,
            similarity: None,
        }),
        Value::Object(obj) => Some(MemoryRef {
            memory_id: lookup(obj, &MEMORY_ID)
                .and_then(as_string)
                .filter(|id| !id.is_empty())?,
            query: obj.get("query").and_then(as_string),
            similarity: obj.get("similarity").and_then(Value::as_f64),
        }),
        _ => None,
    }
}

fn normalize_insight(value: &Value) -> Option<Insight> {
    match value {
        Value::String(content) => Some(Insight {
            content: content.clone(),
            ..Insight::default()
        }),
        Value::Object(obj) => {
            let text = |key: &str| obj.get(key).and_then(as_string).unwrap_or_default();
            let count = |key: &str| obj.get(key).and_then(Value::as_u64).unwrap_or(0);
            Some(Insight {
                title: text("title"),
                description: text("description"),
                content: text("content"),
                reference_count: count("reference_count"),
                reference_success_count: count("reference_success_count"),
            })
        }
        _ => None,
    }
}

/// Read a trajectory from a `trajectory` array of step objects, or from the
/// parallel `actions` / `observations` / `thoughts` arrays.
fn read_trajectory(obj: &Map<String, Value>) -> Vec<Step> {
    if let Some(steps) = obj.get("trajectory").and_then(Value::as_array) {
        return steps
            .iter()
            .filter_map(Value::as_object)
            .map(|step| Step {
                action: lookup(step, &STEP_ACTION).and_then(as_string).unwrap_or_default(),
                observation: lookup(step, &STEP_OBSERVATION)
                    .and_then(as_string)
                    .unwrap_or_default(),
                reasoning: lookup(step, &STEP_REASONING)
                    .and_then(as_string)
                    .filter(|r| !r.is_empty()),
            })
            .collect();
    }

    let column = |key: &str| -> Vec<String> {
        obj.get(key)
            .and_then(Value::as_array)
            .map(|values| values.iter().map(|v| as_string(v).unwrap_or_default()).collect())
            .unwrap_or_default()
    };
    let actions = column("actions");
    let observations = column("observations");
    let thoughts = column("thoughts");

    let len = actions.len().max(observations.len()).max(thoughts.len());
    (0..len)
        .map(|i| Step {
            action: actions.get(i).cloned().unwrap_or_default(),
            observation: observations.get(i).cloned().unwrap_or_default(),
            reasoning: thoughts.get(i).filter(|t| !t.is_empty()).cloned(),
        })
        .collect()
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_with_canonical_fields() {
        let value = json!({
            "task_id": "t1",
            "task_type": "pick_and_place",
            "success": true,
            "steps": 3,
            "goal": "put a mug in the coffeemachine",
            "trajectory": [
                {"action": "go to countertop 1", "observation": "You see a mug 1.", "thought": "Find the mug."},
                {"action": "take mug 1", "observation": "You pick up the mug 1."}
            ],
            "used_memories": [{"memory_id": "m-1", "query": "mug", "similarity": 0.91}]
        });

        let task = normalize_result(&value).unwrap();
        assert_eq!(task.task_id, "t1");
        assert!(task.success);
        assert_eq!(task.steps, Some(3));
        assert_eq!(task.trajectory.len(), 2);
        assert_eq!(task.trajectory[0].reasoning.as_deref(), Some("Find the mug."));
        assert_eq!(task.trajectory[1].reasoning, None);
        assert_eq!(task.used_memories[0].memory_id, "m-1");
        assert_eq!(task.used_memories[0].similarity, Some(0.91));
    }

    #[test]
    fn test_result_with_variant_fields() {
        let value = json!({
            "episode_id": "ep-7",
            "task_name": "boil",
            "is_success": 0,
            "actions": ["look", "open fridge", "take egg"],
            "observations": ["A kitchen.", "The fridge is open."],
            "thoughts": ["", "Eggs are cold."],
            "retrieved_memories": ["m-2"],
            "reward": 12.5
        });

        let task = normalize_result(&value).unwrap();
        assert_eq!(task.task_id, "ep-7");
        assert_eq!(task.task_type.as_deref(), Some("boil"));
        assert!(!task.success);
        assert_eq!(task.score, Some(12.5));
        // No explicit step field: the trajectory length is used.
        assert_eq!(task.steps, Some(3));
        assert_eq!(task.trajectory[2].observation, "");
        assert_eq!(task.trajectory[0].reasoning, None);
        assert_eq!(task.trajectory[1].reasoning.as_deref(), Some("Eggs are cold."));
        assert_eq!(task.used_memories[0].memory_id, "m-2");
    }

    #[test]
    fn test_result_without_steps_has_none() {
        let task = normalize_result(&json!({"game_id": "g", "success": true})).unwrap();
        assert_eq!(task.steps, None);
        assert!(task.trajectory.is_empty());
        assert!(task.used_memories.is_empty());
    }

    #[test]
    fn test_result_unrecognized_schema() {
        assert_eq!(normalize_result(&json!({"success": true})), Err("task_id"));
        assert_eq!(normalize_result(&json!({"task_id": "", "success": true})), Err("task_id"));
        assert_eq!(normalize_result(&json!({"task_id": "t", "outcome": "win"})), Err("success"));
        assert_eq!(
            normalize_result(&json!({"task_id": "t", "success": true, "used_memories": [{"query": "q"}]})),
            Err("memory_id")
        );
        assert_eq!(normalize_result(&json!("not an object")), Err("task_id"));
    }

    #[test]
    fn test_memory_line() {
        let value = json!({
            "memory_id": "m-1",
            "task_id": "t1",
            "task_type": "pick_and_place",
            "query": "put a mug in the coffeemachine",
            "is_success": true,
            "memory_items": [
                {"title": "Check countertops", "description": "Mugs are usually on countertops",
                 "content": "go to countertop 1", "reference_count": 4, "reference_success_count": 3},
                "plain insight"
            ],
            "tags": ["kitchen"]
        });

        let item = normalize_memory(&value).unwrap();
        assert_eq!(item.memory_id, "m-1");
        assert_eq!(item.task_id, "t1");
        assert_eq!(item.is_success, Some(true));
        assert_eq!(item.insights.len(), 2);
        assert_eq!(item.insights[0].reference_count, 4);
        assert_eq!(item.insights[1].content, "plain insight");
        assert_eq!(item.tags, vec!["kitchen"]);
    }

    #[test]
    fn test_memory_id_falls_back_to_task_id() {
        let item = normalize_memory(&json!({"task_id": "t9", "memory_items": []})).unwrap();
        assert_eq!(item.memory_id, "t9");
    }

    #[test]
    fn test_memory_without_task_id() {
        assert_eq!(normalize_memory(&json!({"memory_id": "m-1"})), Err("task_id"));
    }

    #[test]
    fn test_run_info() {
        let doc = json!({
            "model": "qwen2.5-7b",
            "timestamp": "2025-01-02T03:04:05",
            "config": {
                "llm": {"temperature": 0.2},
                "memory": {"mode": "retrieve", "top_k": 3, "similarity_threshold": 0.5}
            },
            "summary": {"total_episodes": 10}
        });

        let info = read_run_info(doc.as_object().unwrap(), "run_results.json", 9);
        assert_eq!(info.model.as_deref(), Some("qwen2.5-7b"));
        assert_eq!(info.temperature, Some(0.2));
        assert_eq!(info.memory_mode.as_deref(), Some("retrieve"));
        assert_eq!(info.top_k, Some(3));
        assert_eq!(info.recorded_total, Some(10));
        assert_eq!(info.result_count, 9);
    }
}
