use crate::backend::{BackendClient, RawEdge, RawNode, RawSubgraph};
use crate::error::Result;
use crate::graph::node_color;
use std::collections::HashSet;

/// Items carrying a backend-assigned identifier
pub trait Identified {
    fn ident(&self) -> &str;
}

impl Identified for RawNode {
    fn ident(&self) -> &str {
        &self.id
    }
}

impl Identified for RawEdge {
    fn ident(&self) -> &str {
        &self.id
    }
}

/// Drop repeated identifiers, keeping the first occurrence and the original order.
pub fn dedup_by_id<T: Identified>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.ident().to_string()))
        .collect()
}

/// Render-ready node
#[derive(Debug, Clone, PartialEq)]
pub struct ViewNode {
    pub id: String,
    pub label: String,
    /// Hover text, `"type: label"`
    pub title: String,
    pub color: &'static str,
    pub raw: RawNode,
}

impl From<RawNode> for ViewNode {
    fn from(raw: RawNode) -> Self {
        Self {
            id: raw.id.clone(),
            label: raw.label.clone(),
            title: format!("{}: {}", raw.node_type, raw.label),
            color: node_color(&raw.node_type),
            raw,
        }
    }
}

/// Render-ready edge, labelled with its relationship type
#[derive(Debug, Clone, PartialEq)]
pub struct ViewEdge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub label: String,
    pub raw: RawEdge,
}

impl From<RawEdge> for ViewEdge {
    fn from(raw: RawEdge) -> Self {
        Self {
            id: raw.id.clone(),
            from: raw.from_id.clone(),
            to: raw.to_id.clone(),
            label: raw.edge_type.clone(),
            raw,
        }
    }
}

/// Deduplicated node and edge collections for one render
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphView {
    pub nodes: Vec<ViewNode>,
    pub edges: Vec<ViewEdge>,
}

impl GraphView {
    /// Deduplicate nodes and edges independently, then project them.
    pub fn from_raw(data: RawSubgraph) -> Self {
        Self {
            nodes: dedup_by_id(data.nodes).into_iter().map(ViewNode::from).collect(),
            edges: dedup_by_id(data.edges).into_iter().map(ViewEdge::from).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&ViewNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&ViewEdge> {
        self.edges.iter().find(|e| e.id == id)
    }
}

/// Fetch the subgraph around `entity_name` in the active campaign.
///
/// Returns `Ok(None)` when no campaign is active; nothing is sent then.
pub async fn fetch_subgraph(
    client: &BackendClient,
    entity_name: &str,
    depth: u32,
) -> Result<Option<RawSubgraph>> {
    let Some(campaign) = client.session().active() else {
        log::debug!("Subgraph fetch skipped: no active campaign");
        return Ok(None);
    };
    let data = client.subgraph(&campaign.id, entity_name, depth).await?;
    log::debug!(
        "Subgraph for '{}' (depth {}): {} nodes, {} edges",
        entity_name,
        depth,
        data.nodes.len(),
        data.edges.len()
    );
    Ok(Some(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CampaignRef;
    use crate::testing::MockBackend;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawSubgraph {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let data = raw(json!({
            "nodes": [
                {"id": 1, "label": "Arkady", "type": "Character"},
                {"id": 1, "label": "Duplicate", "type": "Clue"},
                {"id": 2, "label": "Mill", "type": "Location"}
            ],
            "edges": []
        }));
        let view = GraphView::from_raw(data);

        assert_eq!(view.nodes.len(), 2);
        assert_eq!(view.nodes[0].id, "1");
        assert_eq!(view.nodes[0].label, "Arkady");
        assert_eq!(view.nodes[1].id, "2");
    }

    #[test]
    fn test_edges_dedup_independently_of_nodes() {
        let data = raw(json!({
            "nodes": [{"id": "x", "label": "A", "type": "Character"}],
            "edges": [
                {"id": "x", "from_id": "x", "to_id": "y", "type": "KNOWS"},
                {"id": "x", "from_id": "y", "to_id": "x", "type": "FEARS"}
            ]
        }));
        let view = GraphView::from_raw(data);

        assert_eq!(view.nodes.len(), 1);
        assert_eq!(view.edges.len(), 1);
        assert_eq!(view.edges[0].label, "KNOWS");
    }

    #[test]
    fn test_projection() {
        let data = raw(json!({
            "nodes": [{"id": "n1", "label": "Lantern", "type": "Item"}],
            "edges": [{"id": "r1", "from_id": "n1", "to_id": "n2", "type": "OWNS", "properties": {"since": 1923}}]
        }));
        let view = GraphView::from_raw(data);

        let node = view.node("n1").unwrap();
        assert_eq!(node.title, "Item: Lantern");
        assert_eq!(node.color, "#2ecc71");

        let edge = view.edge("r1").unwrap();
        assert_eq!((edge.from.as_str(), edge.to.as_str()), ("n1", "n2"));
        assert_eq!(edge.label, "OWNS");
        assert_eq!(edge.raw.properties["since"], 1923);
    }

    #[tokio::test]
    async fn test_fetch_without_campaign_is_none() {
        let backend = MockBackend::start().await;
        let client = backend.client();

        let result = fetch_subgraph(&client, "Arkady", 2).await.unwrap();
        assert!(result.is_none());
        assert_eq!(backend.requests(), 0);
    }

    #[tokio::test]
    async fn test_fetch_and_dedup_from_backend() {
        let backend = MockBackend::start().await;
        let campaign_id = backend.seed_campaign("The Fog");
        backend.seed_entity(&campaign_id, "Character", "Arkady", json!({}));
        backend.seed_entity(&campaign_id, "Location", "Old Mill", json!({}));
        backend.seed_relationship(&campaign_id, "Arkady", "Old Mill", "LOCATED_AT", json!({}));

        let client = backend.client();
        client.session().set_active(CampaignRef::new(campaign_id, None));

        let data = fetch_subgraph(&client, "Arkady", 2).await.unwrap().unwrap();
        assert_eq!(data.nodes.len(), 3);
        assert_eq!(data.edges.len(), 2);

        let view = GraphView::from_raw(data);
        assert_eq!(view.nodes.len(), 2);
        assert_eq!(view.edges.len(), 1);
        assert_eq!(view.nodes[0].label, "Arkady");
    }
}
