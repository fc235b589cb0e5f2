//! Joining task results with the memory bank.

use crate::models::{MemoryBank, RetrievedMemory, TaskResult, TaskView};

/// Build one task view per result, in result order.
///
/// Retrieval references are resolved by memory id and the item is copied
/// into the view. A reference with no matching item stays in the view as
/// `Unresolved` with its raw id. Memories extracted from the task itself are
/// listed separately.
pub fn join(results: &[TaskResult], bank: &MemoryBank) -> Vec<TaskView> {
    results.iter().map(|result| join_task(result, bank)).collect()
}

/// Join a single task result.
pub fn join_task(result: &TaskResult, bank: &MemoryBank) -> TaskView {
    let retrieved = result
        .used_memories
        .iter()
        .map(|reference| match bank.get(&reference.memory_id) {
            Some(item) => RetrievedMemory::Resolved {
                reference: reference.clone(),
                item: item.clone(),
            },
            None => RetrievedMemory::Unresolved {
                reference: reference.clone(),
            },
        })
        .collect();

    let extracted = bank.extracted_from(&result.task_id).cloned().collect();

    TaskView {
        task: result.clone(),
        retrieved,
        extracted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MemoryItem, MemoryRef};

    fn memory(memory_id: &str, task_id: &str) -> MemoryItem {
        MemoryItem {
            memory_id: memory_id.to_string(),
            task_id: task_id.to_string(),
            task_type: None,
            query: Some(format!("query for {task_id}")),
            is_success: Some(true),
            insights: Vec::new(),
            trajectory: Vec::new(),
            tags: Vec::new(),
            metadata: None,
        }
    }

    fn task(task_id: &str, refs: &[&str]) -> TaskResult {
        TaskResult {
            task_id: task_id.to_string(),
            task_type: None,
            success: true,
            steps: Some(1),
            goal: None,
            score: None,
            trajectory: Vec::new(),
            used_memories: refs
                .iter()
                .map(|id| MemoryRef {
                    memory_id: id.to_string(),
                    query: None,
                    similarity: Some(0.5),
                })
                .collect(),
        }
    }

    fn bank() -> MemoryBank {
        MemoryBank::new(vec![
            memory("m-1", "t1"),
            memory("m-2", "t2"),
            memory("m-3", "t1"),
        ])
    }

    #[test]
    fn test_unresolved_reference_is_kept() {
        let views = join(&[task("t9", &["m-2", "m-404"])], &bank());
        let view = &views[0];

        assert_eq!(view.retrieved.len(), 2);
        match &view.retrieved[0] {
            RetrievedMemory::Resolved { reference, item } => {
                assert_eq!(reference.memory_id, "m-2");
                assert_eq!(item.memory_id, "m-2");
                assert_eq!(item.task_id, "t2");
            }
            other => panic!("expected a resolved reference, got {other:?}"),
        }
        match &view.retrieved[1] {
            RetrievedMemory::Unresolved { reference } => {
                assert_eq!(reference.memory_id, "m-404");
                assert_eq!(reference.similarity, Some(0.5));
            }
            other => panic!("expected an unresolved reference, got {other:?}"),
        }

        let unresolved: Vec<_> = view.unresolved().map(|r| r.memory_id.as_str()).collect();
        assert_eq!(unresolved, vec!["m-404"]);
    }

    #[test]
    fn test_extracted_and_retrieved_are_separate() {
        let views = join(&[task("t1", &["m-2"])], &bank());
        let view = &views[0];

        let extracted: Vec<_> = view.extracted.iter().map(|m| m.memory_id.as_str()).collect();
        assert_eq!(extracted, vec!["m-1", "m-3"]);
        assert_eq!(view.retrieved.len(), 1);
        assert!(view.retrieved[0].is_resolved());
    }

    #[test]
    fn test_join_preserves_order() {
        let results = vec![task("t3", &[]), task("t1", &[]), task("t2", &["m-1"])];
        let views = join(&results, &bank());

        let ids: Vec<_> = views.iter().map(|v| v.task.task_id.as_str()).collect();
        assert_eq!(ids, vec!["t3", "t1", "t2"]);
        assert!(views[0].extracted.is_empty());
        assert!(views[0].retrieved.is_empty());
    }

    #[test]
    fn test_join_with_empty_bank() {
        let views = join(&[task("t1", &["m-1"])], &MemoryBank::default());
        assert_eq!(views[0].unresolved().count(), 1);
        assert!(views[0].extracted.is_empty());
    }
}
