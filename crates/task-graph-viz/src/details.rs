//! Details panel of the selected task.

use task_graph_core::{Task, TaskId, TaskSnapshot, TaskStatus};

/// A prerequisite as shown in the details panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyTag {
    pub id: TaskId,
    /// The dependency's name, or `unknown dependency (<id>)`.
    pub label: String,
    pub known: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTag {
    pub path: String,
    pub kind: String,
    pub description: Option<String>,
}

/// View model of one task. Absent text fields stay `None`; the renderer
/// picks its own placeholder wording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDetails {
    pub id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    pub status_label: &'static str,
    pub status_class: &'static str,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub implementation_guide: Option<String>,
    pub verification_criteria: Option<String>,
    pub notes: Option<String>,
    pub dependencies: Vec<DependencyTag>,
    pub related_files: Vec<FileTag>,
}

fn non_empty(field: &Option<String>) -> Option<String> {
    field.as_ref().filter(|s| !s.is_empty()).cloned()
}

impl TaskDetails {
    pub fn build(task: &Task, snapshot: &TaskSnapshot) -> Self {
        let dependencies = task
            .dependency_ids()
            .map(|id| match snapshot.get(id.as_str()) {
                Some(dep) => DependencyTag {
                    id: id.clone(),
                    label: dep.display_name().to_string(),
                    known: true,
                },
                None => DependencyTag {
                    id: id.clone(),
                    label: format!("unknown dependency ({id})"),
                    known: false,
                },
            })
            .collect();

        let related_files = task
            .related_files
            .iter()
            .map(|f| FileTag {
                path: f.path.clone(),
                kind: f.kind.clone(),
                description: non_empty(&f.description),
            })
            .collect();

        Self {
            id: task.id.clone(),
            name: task.display_name().to_string(),
            status: task.status,
            status_label: task.status.label(),
            status_class: task.status.css_class(),
            summary: non_empty(&task.summary),
            description: non_empty(&task.description),
            implementation_guide: non_empty(&task.implementation_guide),
            verification_criteria: non_empty(&task.verification_criteria),
            notes: non_empty(&task.notes),
            dependencies,
            related_files,
        }
    }
}
