//! Single-task selection.

use task_graph_core::{TaskId, TaskSnapshot};

/// What a selection request did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionChange {
    /// Nothing was selected before.
    Selected(TaskId),
    /// Another task was selected; it is replaced in one step.
    Switched { from: TaskId, to: TaskId },
    /// The selected task was requested again.
    Cleared(TaskId),
}

/// Selection state: at most one task.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    selected: Option<TaskId>,
}

impl SelectionState {
    pub fn selected(&self) -> Option<&TaskId> {
        self.selected.as_ref()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.as_ref().is_some_and(|s| s.as_str() == id)
    }

    /// Check if there's an active selection.
    pub fn has_selection(&self) -> bool {
        self.selected.is_some()
    }

    /// Select `id`, or clear the selection if `id` is already selected.
    pub fn toggle(&mut self, id: TaskId) -> SelectionChange {
        match self.selected.take() {
            Some(current) if current == id => SelectionChange::Cleared(current),
            Some(current) => {
                self.selected = Some(id.clone());
                SelectionChange::Switched { from: current, to: id }
            }
            None => {
                self.selected = Some(id.clone());
                SelectionChange::Selected(id)
            }
        }
    }

    /// Clear the selection state.
    pub fn clear(&mut self) -> Option<TaskId> {
        self.selected.take()
    }

    /// Drop the selection if its task is gone. Returns the cleared id.
    pub fn retain_in(&mut self, snapshot: &TaskSnapshot) -> Option<TaskId> {
        match &self.selected {
            Some(id) if !snapshot.contains(id.as_str()) => self.selected.take(),
            _ => None,
        }
    }
}
