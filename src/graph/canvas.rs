//! Render seam between the graph view and a drawing library.

use crate::backend::{RawEdge, RawNode, RawSubgraph};
use crate::error::Result;
use crate::graph::pipeline::GraphView;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeStyle {
    pub shape: &'static str,
    pub size: u32,
    pub font_size: u32,
    pub font_color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeStyle {
    pub font_size: u32,
    pub font_color: &'static str,
    pub font_stroke_width: u32,
    pub color: &'static str,
    pub highlight: &'static str,
    pub arrows: &'static str,
}

/// Fixed visual configuration handed to the renderer on every mount
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderOptions {
    pub nodes: NodeStyle,
    pub edges: EdgeStyle,
    /// Cap on physics stabilisation iterations before the first paint
    pub stabilization_iterations: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            nodes: NodeStyle {
                shape: "dot",
                size: 20,
                font_size: 14,
                font_color: "#fff",
            },
            edges: EdgeStyle {
                font_size: 11,
                font_color: "#aaa",
                font_stroke_width: 0,
                color: "#666",
                highlight: "#fff",
                arrows: "to",
            },
            stabilization_iterations: 100,
        }
    }
}

/// A drawing library able to mount a graph view
#[async_trait]
pub trait GraphRenderer: Send + Sync {
    /// One-time library load. Callers memoize; implementations need not.
    async fn load(&self) -> Result<()>;

    fn mount(&self, view: &GraphView, options: &RenderOptions) -> Result<Box<dyn MountedGraph>>;
}

/// A live graph instance bound to the canvas
pub trait MountedGraph: Send {
    fn destroy(&mut self);
}

/// Selection reported by the renderer for one click
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickEvent {
    pub nodes: Vec<String>,
    pub edges: Vec<String>,
}

impl ClickEvent {
    pub fn node(id: impl Into<String>) -> Self {
        Self {
            nodes: vec![id.into()],
            edges: Vec::new(),
        }
    }

    pub fn edge(id: impl Into<String>) -> Self {
        Self {
            nodes: Vec::new(),
            edges: vec![id.into()],
        }
    }

    pub fn background() -> Self {
        Self::default()
    }
}

/// What a click landed on
#[derive(Debug, Clone, PartialEq)]
pub enum ClickTarget {
    Node(RawNode),
    Edge(RawEdge),
    Background,
}

struct CanvasState {
    mounted: Option<Box<dyn MountedGraph>>,
    view: Option<Arc<GraphView>>,
}

/// The single canvas target: owns at most one mounted graph at a time
pub struct GraphCanvas<R> {
    renderer: R,
    options: RenderOptions,
    state: Mutex<CanvasState>,
}

impl<R: GraphRenderer> GraphCanvas<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            options: RenderOptions::default(),
            state: Mutex::new(CanvasState {
                mounted: None,
                view: None,
            }),
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    fn lock(&self) -> MutexGuard<'_, CanvasState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Destroy the mounted graph, if any.
    pub fn teardown(&self) {
        let mut state = self.lock();
        if let Some(mut mounted) = state.mounted.take() {
            mounted.destroy();
        }
        state.view = None;
    }

    /// Tear down, dedup and project `data`, then mount it.
    pub fn render(&self, data: RawSubgraph) -> Result<Arc<GraphView>> {
        self.teardown();
        let view = Arc::new(GraphView::from_raw(data));
        let mounted = self.renderer.mount(&view, &self.options)?;

        let mut state = self.lock();
        state.mounted = Some(mounted);
        state.view = Some(view.clone());
        log::debug!(
            "Rendered {} nodes, {} edges",
            view.nodes.len(),
            view.edges.len()
        );
        Ok(view)
    }

    pub fn view(&self) -> Option<Arc<GraphView>> {
        self.lock().view.clone()
    }

    /// Resolve a click against the current view. Nodes win over edges.
    pub fn resolve_click(&self, event: &ClickEvent) -> ClickTarget {
        let Some(view) = self.view() else {
            return ClickTarget::Background;
        };
        if let Some(node) = event.nodes.first().and_then(|id| view.node(id)) {
            return ClickTarget::Node(node.raw.clone());
        }
        if let Some(edge) = event.edges.first().and_then(|id| view.edge(id)) {
            return ClickTarget::Edge(edge.raw.clone());
        }
        ClickTarget::Background
    }
}
