//! Watch command: a headless live dashboard printing to the terminal.
//!
//! Lines typed on stdin are turned into intents (`select 3`, `filter
//! completed`, `sort name-asc`, ...), so the session can be driven the way
//! a graphical renderer would drive it.

use std::io::BufRead;
use std::sync::Arc;

use anyhow::Result;
use task_graph_client::{HttpEventTransport, HttpSnapshotSource, SnapshotSource};
use task_graph_core::{ProgressSummary, Task, TaskId, TaskStatus};
use task_graph_viz::{
    Dashboard, DashboardSession, FetchOutcome, Frame, Notification, Placeholder, RenderIntent, Renderer,
    SceneDiff, SceneOp, SortOption, StatusFilter, StyleFrame, TaskDetails, Transform,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::Config;

/// Prints structural changes and panels as text.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    last_progress: Option<ProgressSummary>,
    last_list: Vec<TaskId>,
    last_details: Option<TaskDetails>,
}

impl Renderer for TerminalRenderer {
    fn apply_diff(&mut self, diff: &SceneDiff) {
        for op in diff.ops() {
            match op {
                SceneOp::ExitEdge(edge) => println!("  - {} -> {}", edge.source, edge.target),
                SceneOp::ExitNode(id) => println!("  - {}", id),
                SceneOp::EnterNode(enter) => println!(
                    "  + {} {} [{}] at ({:.0}, {:.0})",
                    enter.node.id,
                    enter.node.name,
                    enter.node.status.label(),
                    enter.position.x,
                    enter.position.y
                ),
                SceneOp::EnterEdge(edge) => println!("  + {} -> {}", edge.source, edge.target),
                SceneOp::UpdateNode(node) => println!("  ~ {} {} [{}]", node.id, node.name, node.status.label()),
            }
        }
    }

    fn apply_frame(&mut self, frame: &Frame) {
        trace!(nodes = frame.positions.len(), "frame");
    }

    fn apply_styles(&mut self, styles: &StyleFrame) {
        trace!(nodes = styles.nodes.len(), edges = styles.edges.len(), "styles");
    }

    fn recenter(&mut self, transform: Transform) {
        debug!(x = transform.x, y = transform.y, k = transform.k, "recenter");
    }

    fn notify(&mut self, notification: &Notification) {
        match notification {
            Notification::Transient { message, .. } => eprintln!("⚠️  {}", message),
            Notification::Inline { message } => eprintln!("❌ Failed to load tasks: {}", message),
        }
    }

    fn placeholder(&mut self, placeholder: Placeholder) {
        match placeholder {
            Placeholder::Empty => println!("📭 No tasks"),
            Placeholder::RendererUnavailable => println!("(graph view unavailable)"),
        }
    }

    fn show_details(&mut self, details: Option<&TaskDetails>) {
        if self.last_details.as_ref() == details {
            return;
        }
        self.last_details = details.cloned();
        let Some(details) = details else {
            return;
        };
        println!("📌 {} ({}) [{}]", details.name, details.id, details.status_label);
        if let Some(description) = &details.description {
            println!("   {}", description);
        }
        for dep in &details.dependencies {
            println!("   needs: {}", dep.label);
        }
        for file in &details.related_files {
            println!("   file: {} ({})", file.path, file.kind);
        }
    }

    fn show_progress(&mut self, progress: &ProgressSummary) {
        if self.last_progress.as_ref() == Some(progress) {
            return;
        }
        self.last_progress = Some(*progress);
        println!(
            "📊 {}/{} completed ({:.0}%), {} in progress, {} pending",
            progress.completed,
            progress.total,
            progress.percent(TaskStatus::Completed),
            progress.in_progress,
            progress.pending
        );
    }

    fn show_analysis(&mut self, analysis: Option<&str>) {
        if let Some(analysis) = analysis {
            println!("🧭 {}", analysis);
        }
    }

    fn show_list(&mut self, tasks: &[&Task]) {
        let ids: Vec<TaskId> = tasks.iter().map(|t| t.id.clone()).collect();
        if ids == self.last_list {
            return;
        }
        self.last_list = ids;
        let names: Vec<&str> = tasks.iter().map(|t| t.display_name()).collect();
        println!("📋 {}", names.join(" | "));
    }
}

/// Parse one stdin line into an intent.
pub fn parse_command(line: &str) -> Result<RenderIntent, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let id = || {
        if rest.is_empty() {
            Err(format!("{word} needs a task id"))
        } else {
            Ok(TaskId::from(rest))
        }
    };
    match word {
        "select" => Ok(RenderIntent::Select(id()?)),
        "highlight" => Ok(RenderIntent::Highlight(id()?)),
        "unpin" => Ok(RenderIntent::Unpin(id()?)),
        "filter" => Ok(RenderIntent::SetFilter(rest.parse::<StatusFilter>()?)),
        "search" => Ok(RenderIntent::SetSearch(rest.to_string())),
        "sort" => Ok(RenderIntent::SetSort(rest.parse::<SortOption>()?)),
        "zoom" => {
            let k: f32 = rest.parse().map_err(|_| format!("invalid zoom level: {rest}"))?;
            Ok(RenderIntent::Zoom(Transform::new(0.0, 0.0, k)))
        }
        "reset" => Ok(RenderIntent::ResetView),
        other => Err(format!("unknown command: {other}")),
    }
}

/// Read commands on a plain thread; a blocked stdin read must not hold up
/// runtime shutdown.
fn spawn_command_reader(intents: mpsc::Sender<RenderIntent>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Ok(intent) => {
                    if intents.blocking_send(intent).is_err() {
                        break;
                    }
                }
                Err(e) => eprintln!("{}", e),
            }
        }
    });
}

/// Run the dashboard against `config.base_url`.
///
/// With `once`, a single snapshot is fetched and rendered; a failed fetch
/// is an error.
pub async fn execute(config: &Config, once: bool) -> Result<()> {
    let source = Arc::new(HttpSnapshotSource::new(&config.base_url));
    let mut session = DashboardSession::new(config.session(), TerminalRenderer::default());

    if once {
        let ticket = session.begin_fetch();
        let result = source.fetch().await;
        if session.apply_fetch(ticket, result) == FetchOutcome::Failed {
            anyhow::bail!("Could not load tasks from {}", source.url());
        }
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };
    let (intents, intents_rx) = mpsc::channel(16);
    spawn_command_reader(intents);

    println!("👀 Watching {} (Ctrl-C to stop)", config.base_url);
    let transport = HttpEventTransport::new(&config.base_url);
    Dashboard::new(session, config.driver())
        .run(source, transport, intents_rx, cancel)
        .await;

    ctrl_c.abort();
    Ok(())
}
