//! Text front end for the graph viewer.

use crate::backend::Campaign;
use crate::error::{Result, TarvenError};
use crate::graph::{GraphRenderer, GraphView, MountedGraph, RenderOptions};
use crate::viewer::{CampaignPicker, Notifier};
use async_trait::async_trait;

/// Prints node and edge listings to stdout
#[derive(Debug, Default)]
pub struct TerminalRenderer;

struct TerminalGraph;

impl MountedGraph for TerminalGraph {
    fn destroy(&mut self) {}
}

#[async_trait]
impl GraphRenderer for TerminalRenderer {
    async fn load(&self) -> Result<()> {
        log::debug!("Terminal renderer ready");
        Ok(())
    }

    fn mount(&self, view: &GraphView, _options: &RenderOptions) -> Result<Box<dyn MountedGraph>> {
        println!("{}", render_listing(view));
        Ok(Box::new(TerminalGraph))
    }
}

/// Plain-text listing of a view: nodes with ids, then edges by label.
pub fn render_listing(view: &GraphView) -> String {
    let mut out = format!("Nodes ({})", view.nodes.len());
    for node in &view.nodes {
        out.push_str(&format!("\n  [{}] {}", node.id, node.title));
    }
    out.push_str(&format!("\nEdges ({})", view.edges.len()));
    for edge in &view.edges {
        let name = |id: &str| {
            view.node(id)
                .map(|n| n.label.clone())
                .unwrap_or_else(|| id.to_string())
        };
        out.push_str(&format!(
            "\n  [{}] {} -{}-> {}",
            edge.id,
            name(&edge.from),
            edge.label,
            name(&edge.to)
        ));
    }
    out
}

/// Numbered campaign list; reads the choice from stdin
#[derive(Debug, Default)]
pub struct StdinPicker;

#[async_trait]
impl CampaignPicker for StdinPicker {
    async fn pick(&self, campaigns: &[Campaign]) -> Option<Campaign> {
        println!("Select a campaign:");
        for (idx, campaign) in campaigns.iter().enumerate() {
            println!("  {}. {}  {}", idx + 1, campaign.name, campaign.created_label());
        }
        println!("Number (empty to cancel):");

        let line = match read_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Failed to read selection: {}", e);
                return None;
            }
        };
        parse_choice(&line, campaigns.len()).map(|idx| campaigns[idx].clone())
    }
}

/// One-based choice to index; anything else cancels.
pub fn parse_choice(input: &str, count: usize) -> Option<usize> {
    let choice: usize = input.trim().parse().ok()?;
    (1..=count).contains(&choice).then(|| choice - 1)
}

/// Read one line from stdin without blocking the runtime. `None` at EOF.
pub async fn read_line() -> Result<Option<String>> {
    let line = tokio::task::spawn_blocking(|| -> std::io::Result<Option<String>> {
        let mut line = String::new();
        let read = std::io::stdin().read_line(&mut line)?;
        Ok(if read == 0 { None } else { Some(line) })
    })
    .await
    .map_err(|e| TarvenError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;
    Ok(line)
}

/// Prints notices to stderr
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        eprintln!("! {}", message);
    }
}
