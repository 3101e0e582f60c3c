//! Graph view: subgraph fetch/dedup pipeline, render seam, detail panel.
//!
//! Raw backend subgraphs are deduplicated by identifier and projected into
//! render-ready [`GraphView`]s. Clicks resolve against the current view and
//! feed the [`DetailPanel`].

pub mod canvas;
pub mod format;
pub mod panel;
pub mod pipeline;

pub use canvas::{ClickEvent, ClickTarget, GraphCanvas, GraphRenderer, MountedGraph, RenderOptions};
pub use format::{format_properties, EntityDetails, PropertySheet, PropertyValue, RelationshipDetails};
pub use panel::{DetailPanel, PanelContent, PanelTicket};
pub use pipeline::{dedup_by_id, fetch_subgraph, GraphView, ViewEdge, ViewNode};

use crate::backend::EntityType;

/// Colour for node types the palette does not know.
pub const DEFAULT_NODE_COLOR: &str = "#95a5a6";

/// Node fill colour by entity type name.
pub fn node_color(node_type: &str) -> &'static str {
    match EntityType::parse(node_type) {
        Some(EntityType::Character) => "#e74c3c",
        Some(EntityType::Location) => "#3498db",
        Some(EntityType::Event) => "#9b59b6",
        Some(EntityType::Clue) => "#f39c12",
        Some(EntityType::Item) => "#2ecc71",
        Some(EntityType::Organization) => "#1abc9c",
        Some(EntityType::Skill) => "#e91e63",
        None => DEFAULT_NODE_COLOR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_color_palette() {
        assert_eq!(node_color("Character"), "#e74c3c");
        assert_eq!(node_color("Skill"), "#e91e63");
        assert_eq!(node_color("Vehicle"), DEFAULT_NODE_COLOR);
        assert_eq!(node_color(""), DEFAULT_NODE_COLOR);
    }
}
