//! Change detection between two task snapshots.
//!
//! Only a fixed set of fields is compared. A change confined to any other
//! field (`completedAt`, a related file's description, ...) is reported as
//! "unchanged" unless `updatedAt` moved as well.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use tracing::debug;

use crate::{Task, TaskId, TaskSnapshot};

/// Scalar fields compared by [`has_changed`], in wire naming.
pub const COMPARED_FIELDS: [&str; 7] = [
    "name",
    "description",
    "status",
    "notes",
    "implementationGuide",
    "verificationCriteria",
    "summary",
];

/// First difference found between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeReason {
    /// The number of tasks differs.
    LengthChanged { old: usize, new: usize },
    /// A task in the old snapshot is absent from the new one.
    TaskRemoved(TaskId),
    /// A task in the new snapshot is absent from the old one.
    TaskAdded(TaskId),
    /// One of [`COMPARED_FIELDS`] differs.
    FieldChanged { id: TaskId, field: &'static str },
    /// The resolved dependency id sets differ.
    DependenciesChanged(TaskId),
    /// The `(path, type)` sequence of related files differs.
    RelatedFilesChanged(TaskId),
    /// Nothing else differs but `updatedAt` does.
    UpdatedAtChanged(TaskId),
}

impl fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeReason::LengthChanged { old, new } => {
                write!(f, "task count changed from {} to {}", old, new)
            }
            ChangeReason::TaskRemoved(id) => write!(f, "task removed: {}", id),
            ChangeReason::TaskAdded(id) => write!(f, "new task found: {}", id),
            ChangeReason::FieldChanged { id, field } => {
                write!(f, "task {} changed field: {}", id, field)
            }
            ChangeReason::DependenciesChanged(id) => {
                write!(f, "task {} changed field: dependencies", id)
            }
            ChangeReason::RelatedFilesChanged(id) => {
                write!(f, "task {} changed field: relatedFiles", id)
            }
            ChangeReason::UpdatedAtChanged(id) => {
                write!(f, "task {} changed field: updatedAt (fallback)", id)
            }
        }
    }
}

/// Decide whether `new` differs meaningfully from `old`.
pub fn has_changed(old: &TaskSnapshot, new: &TaskSnapshot) -> bool {
    detect_change(old, new).is_some()
}

/// Like [`has_changed`], returning the first reason found.
pub fn detect_change(old: &TaskSnapshot, new: &TaskSnapshot) -> Option<ChangeReason> {
    let reason = find_change(old, new);
    if let Some(reason) = &reason {
        debug!(%reason, "snapshot changed");
    }
    reason
}

fn find_change(old: &TaskSnapshot, new: &TaskSnapshot) -> Option<ChangeReason> {
    if old.len() != new.len() {
        return Some(ChangeReason::LengthChanged {
            old: old.len(),
            new: new.len(),
        });
    }

    let old_by_id: HashMap<&str, &Task> = old.by_id();
    let new_ids: HashSet<&str> = new.tasks.iter().map(|t| t.id.as_str()).collect();

    if let Some(removed) = old.tasks.iter().find(|t| !new_ids.contains(t.id.as_str())) {
        return Some(ChangeReason::TaskRemoved(removed.id.clone()));
    }

    for new_task in &new.tasks {
        let Some(old_task) = old_by_id.get(new_task.id.as_str()) else {
            return Some(ChangeReason::TaskAdded(new_task.id.clone()));
        };
        if let Some(reason) = compare_task(old_task, new_task) {
            return Some(reason);
        }
    }

    None
}

fn compare_task(old: &Task, new: &Task) -> Option<ChangeReason> {
    let id = &new.id;

    for ((field, a), (_, b)) in scalar_fields(old).into_iter().zip(scalar_fields(new)) {
        // Option equality: two absent values are equal, absent vs present is not.
        if a != b {
            return Some(ChangeReason::FieldChanged {
                id: id.clone(),
                field,
            });
        }
    }

    if dependency_set(old) != dependency_set(new) {
        return Some(ChangeReason::DependenciesChanged(id.clone()));
    }

    if !related_files_match(old, new) {
        return Some(ChangeReason::RelatedFilesChanged(id.clone()));
    }

    let old_updated = old.updated_at.as_ref().map(|t| t.as_str());
    let new_updated = new.updated_at.as_ref().map(|t| t.as_str());
    if old_updated != new_updated {
        return Some(ChangeReason::UpdatedAtChanged(id.clone()));
    }

    None
}

/// The compared scalar fields of a task, paired with their wire names.
fn scalar_fields(task: &Task) -> [(&'static str, Option<&str>); 7] {
    [
        (COMPARED_FIELDS[0], task.name.as_deref()),
        (COMPARED_FIELDS[1], task.description.as_deref()),
        (COMPARED_FIELDS[2], Some(task.status.as_str())),
        (COMPARED_FIELDS[3], task.notes.as_deref()),
        (COMPARED_FIELDS[4], task.implementation_guide.as_deref()),
        (COMPARED_FIELDS[5], task.verification_criteria.as_deref()),
        (COMPARED_FIELDS[6], task.summary.as_deref()),
    ]
}

/// Deduplicated, order-insensitive dependency ids.
fn dependency_set(task: &Task) -> BTreeSet<&str> {
    task.dependency_ids().map(TaskId::as_str).collect()
}

/// Related files compared in order by `(path, type)`.
fn related_files_match(old: &Task, new: &Task) -> bool {
    old.related_files.len() == new.related_files.len()
        && old
            .related_files
            .iter()
            .zip(&new.related_files)
            .all(|(a, b)| a.path == b.path && a.kind == b.kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DependencyRef, RelatedFile, TaskStatus, Timestamp};

    fn snapshot_a() -> TaskSnapshot {
        TaskSnapshot::new(vec![
            Task::new("1", "one"),
            Task::new("2", "two").with_dependency("1"),
        ])
    }

    fn file(path: &str, kind: &str) -> RelatedFile {
        RelatedFile {
            path: path.into(),
            kind: kind.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_identical_snapshots_unchanged() {
        assert!(!has_changed(&snapshot_a(), &snapshot_a()));
        assert!(!has_changed(&TaskSnapshot::default(), &TaskSnapshot::default()));
    }

    #[test]
    fn test_task_order_is_irrelevant() {
        let mut reordered = snapshot_a();
        reordered.tasks.reverse();
        assert!(!has_changed(&snapshot_a(), &reordered));
    }

    #[test]
    fn test_status_change_detected() {
        let mut b = snapshot_a();
        b.tasks[1].status = TaskStatus::Completed;
        assert_eq!(
            detect_change(&snapshot_a(), &b),
            Some(ChangeReason::FieldChanged {
                id: TaskId::from("2"),
                field: "status"
            })
        );
    }

    #[test]
    fn test_length_change_detected() {
        let mut b = snapshot_a();
        b.tasks.push(Task::new("3", "three"));
        assert_eq!(
            detect_change(&snapshot_a(), &b),
            Some(ChangeReason::LengthChanged { old: 2, new: 3 })
        );
    }

    #[test]
    fn test_replaced_id_detected_as_removal() {
        let mut b = snapshot_a();
        b.tasks[0].id = TaskId::from("9");
        assert_eq!(
            detect_change(&snapshot_a(), &b),
            Some(ChangeReason::TaskRemoved(TaskId::from("1")))
        );
    }

    #[test]
    fn test_absent_values_compare_equal() {
        let mut a = snapshot_a();
        a.tasks[0].notes = None;
        let b = a.clone();
        assert!(!has_changed(&a, &b));

        let mut c = a.clone();
        c.tasks[0].notes = Some(String::new());
        assert_eq!(
            detect_change(&a, &c),
            Some(ChangeReason::FieldChanged {
                id: TaskId::from("1"),
                field: "notes"
            })
        );
    }

    #[test]
    fn test_null_and_missing_fields_are_both_absent() {
        let a: TaskSnapshot =
            serde_json::from_str(r#"{"tasks":[{"id":"1","summary":null}]}"#).unwrap();
        let b: TaskSnapshot = serde_json::from_str(r#"{"tasks":[{"id":"1"}]}"#).unwrap();
        assert!(!has_changed(&a, &b));
    }

    #[test]
    fn test_dependencies_order_insensitive_and_unwrapped() {
        let mut a = snapshot_a();
        a.tasks[1].dependencies = vec!["1".into(), "x".into()];
        let mut b = snapshot_a();
        b.tasks[1].dependencies = vec![
            DependencyRef::Wrapped {
                task_id: TaskId::from("x"),
            },
            "1".into(),
            "1".into(),
        ];
        assert!(!has_changed(&a, &b));

        b.tasks[1].dependencies = vec!["1".into()];
        assert_eq!(
            detect_change(&a, &b),
            Some(ChangeReason::DependenciesChanged(TaskId::from("2")))
        );
    }

    #[test]
    fn test_related_files_order_sensitive() {
        let mut a = snapshot_a();
        a.tasks[0].related_files = vec![file("a.rs", "TO_MODIFY"), file("b.rs", "REFERENCE")];
        let mut b = a.clone();
        b.tasks[0].related_files.reverse();
        assert_eq!(
            detect_change(&a, &b),
            Some(ChangeReason::RelatedFilesChanged(TaskId::from("1")))
        );

        let mut c = a.clone();
        c.tasks[0].related_files[1].kind = "CREATE".into();
        assert!(has_changed(&a, &c));
    }

    #[test]
    fn test_updated_at_fallback() {
        let mut a = snapshot_a();
        a.tasks[0].updated_at = Some(Timestamp::new("2025-01-01T00:00:00Z"));
        let mut b = a.clone();
        b.tasks[0].updated_at = Some(Timestamp::new("2025-01-02T00:00:00Z"));
        assert_eq!(
            detect_change(&a, &b),
            Some(ChangeReason::UpdatedAtChanged(TaskId::from("1")))
        );
    }

    #[test]
    fn test_compared_field_list_is_exact() {
        assert_eq!(
            COMPARED_FIELDS,
            [
                "name",
                "description",
                "status",
                "notes",
                "implementationGuide",
                "verificationCriteria",
                "summary",
            ]
        );
    }

    #[test]
    fn test_uncompared_fields_are_ignored() {
        let mut a = snapshot_a();
        a.tasks[0].related_files = vec![file("a.rs", "TO_MODIFY")];
        let mut b = a.clone();
        b.tasks[0].completed_at = Some(Timestamp::new("2025-01-02T00:00:00Z"));
        b.tasks[0].created_at = Some(Timestamp::new("2025-01-01T00:00:00Z"));
        b.tasks[0].analysis_result = Some("done".into());
        b.tasks[0].related_files[0].description = Some("edited".into());
        b.tasks[0].related_files[0].line_start = Some(10);
        assert!(!has_changed(&a, &b));
    }
}
