//! Shared fixtures for the dashboard integration tests.

#![allow(dead_code)]

use task_graph_core::{ProgressSummary, Task, TaskId, TaskSnapshot, TaskStatus};
use task_graph_viz::{
    Frame, Minimap, Notification, Placeholder, Renderer, SceneDiff, StyleFrame, TaskDetails, Transform,
};

/// Renderer that keeps everything it is told.
#[derive(Debug, Default)]
pub struct Recorder {
    pub diffs: Vec<SceneDiff>,
    pub frames: usize,
    pub styles: Vec<StyleFrame>,
    pub recenters: Vec<Transform>,
    pub notifications: Vec<Notification>,
    pub placeholders: Vec<Placeholder>,
    pub details: Vec<Option<TaskId>>,
    pub progress: Vec<ProgressSummary>,
    pub analysis: Vec<Option<String>>,
    pub lists: Vec<Vec<TaskId>>,
    pub minimaps: Vec<Option<Minimap>>,
}

impl Renderer for Recorder {
    fn apply_diff(&mut self, diff: &SceneDiff) {
        self.diffs.push(diff.clone());
    }

    fn apply_frame(&mut self, _frame: &Frame) {
        self.frames += 1;
    }

    fn apply_styles(&mut self, styles: &StyleFrame) {
        self.styles.push(styles.clone());
    }

    fn recenter(&mut self, transform: Transform) {
        self.recenters.push(transform);
    }

    fn notify(&mut self, notification: &Notification) {
        self.notifications.push(notification.clone());
    }

    fn placeholder(&mut self, placeholder: Placeholder) {
        self.placeholders.push(placeholder);
    }

    fn show_details(&mut self, details: Option<&TaskDetails>) {
        self.details.push(details.map(|d| d.id.clone()));
    }

    fn show_progress(&mut self, progress: &ProgressSummary) {
        self.progress.push(*progress);
    }

    fn show_analysis(&mut self, analysis: Option<&str>) {
        self.analysis.push(analysis.map(str::to_owned));
    }

    fn show_list(&mut self, tasks: &[&Task]) {
        self.lists.push(tasks.iter().map(|t| t.id.clone()).collect());
    }

    fn show_minimap(&mut self, minimap: Option<&Minimap>) {
        self.minimaps.push(minimap.cloned());
    }
}

/// `1 <- 2`, both pending unless `second` says otherwise.
pub fn pair(second: TaskStatus) -> TaskSnapshot {
    TaskSnapshot::new(vec![
        Task::new("1", "design"),
        Task::new("2", "build").with_status(second).with_dependency("1"),
    ])
}
