//! Settings structures for the dashboard session.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use task_graph_layout::{ForceConfig, StabilizerConfig, Viewport};

/// How overlapping snapshot fetches are resolved.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOrdering {
    /// Whichever response completes last is applied, even if it was issued
    /// earlier than the one already shown.
    #[default]
    LastCompleted,
    /// Responses carry the sequence number of their request; one older than
    /// the last applied response is dropped.
    LatestIssued,
}

impl FetchOrdering {
    pub fn label(self) -> &'static str {
        match self {
            FetchOrdering::LastCompleted => "last completed",
            FetchOrdering::LatestIssued => "latest issued",
        }
    }
}

/// Interaction-related toggles.
#[derive(Debug, Clone)]
pub struct SettingsInteraction {
    pub dragging_enabled: bool,
    pub node_clicking_enabled: bool,
    /// Recenter the view on a node when it gets selected.
    pub center_on_select: bool,
}

impl Default for SettingsInteraction {
    fn default() -> Self {
        Self {
            dragging_enabled: true,
            node_clicking_enabled: true,
            center_on_select: true,
        }
    }
}

/// Everything a [`crate::DashboardSession`] is built from.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub viewport: Viewport,
    pub ordering: FetchOrdering,
    pub forces: ForceConfig,
    pub stabilizer: StabilizerConfig,
    pub interaction: SettingsInteraction,
    /// Lifetime of a transient error notification.
    pub notification_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            ordering: FetchOrdering::default(),
            forces: ForceConfig::default(),
            stabilizer: StabilizerConfig::default(),
            interaction: SettingsInteraction::default(),
            notification_ttl: Duration::from_secs(3),
        }
    }
}
