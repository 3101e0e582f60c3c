//! Campaign selection and graph-view state machine.
//!
//! `NoCampaign -> Selecting -> Active`; while active the modal opens and
//! closes, and "switch" re-enters selection with the modal still open. The
//! detail panel is orthogonal and owned by [`DetailPanel`].

pub mod terminal;

use crate::backend::{BackendClient, Campaign};
use crate::config::GraphConfig;
use crate::graph::{
    fetch_subgraph, ClickEvent, ClickTarget, DetailPanel, EntityDetails, GraphCanvas,
    GraphRenderer, PanelContent, RelationshipDetails,
};
use crate::session::{CampaignRef, Session};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

pub const NO_CAMPAIGNS_NOTICE: &str = "No campaigns found. Create one first.";
pub const NO_DATA_NOTICE: &str = "No data yet";
pub const NOT_FOUND_NOTICE: &str = "Entity not found";

/// Lets the user pick one campaign from a list
#[async_trait]
pub trait CampaignPicker: Send + Sync {
    /// `None` when the user dismisses the picker.
    async fn pick(&self, campaigns: &[Campaign]) -> Option<Campaign>;
}

/// Surfaces user-visible notices
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerPhase {
    NoCampaign,
    Selecting,
    Active,
}

pub struct GraphViewer<R, P, N> {
    client: Arc<BackendClient>,
    canvas: GraphCanvas<R>,
    panel: DetailPanel,
    picker: P,
    notifier: N,
    depths: GraphConfig,
    library: OnceCell<()>,
    selecting: AtomicBool,
    modal_open: AtomicBool,
    view_generation: AtomicU64,
}

impl<R, P, N> GraphViewer<R, P, N>
where
    R: GraphRenderer,
    P: CampaignPicker,
    N: Notifier,
{
    pub fn new(client: Arc<BackendClient>, renderer: R, picker: P, notifier: N, depths: GraphConfig) -> Self {
        Self {
            client,
            canvas: GraphCanvas::new(renderer),
            panel: DetailPanel::new(),
            picker,
            notifier,
            depths,
            library: OnceCell::new(),
            selecting: AtomicBool::new(false),
            modal_open: AtomicBool::new(false),
            view_generation: AtomicU64::new(0),
        }
    }

    fn session(&self) -> &Arc<Session> {
        self.client.session()
    }

    pub fn phase(&self) -> ViewerPhase {
        if self.selecting.load(Ordering::SeqCst) {
            ViewerPhase::Selecting
        } else if self.session().active().is_some() {
            ViewerPhase::Active
        } else {
            ViewerPhase::NoCampaign
        }
    }

    pub fn is_modal_open(&self) -> bool {
        self.modal_open.load(Ordering::SeqCst)
    }

    pub fn canvas(&self) -> &GraphCanvas<R> {
        &self.canvas
    }

    pub fn panel(&self) -> &DetailPanel {
        &self.panel
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Invalidate every subgraph fetch still in flight and return the new generation.
    fn next_view(&self) -> u64 {
        self.view_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current_view(&self, generation: u64) -> bool {
        self.view_generation.load(Ordering::SeqCst) == generation
    }

    /// Fetch campaigns and let the user pick one. Returns whether a campaign
    /// was activated; on false the previous active campaign is untouched.
    pub async fn select_campaign(&self) -> bool {
        self.selecting.store(true, Ordering::SeqCst);
        let selected = self.run_selection().await;
        self.selecting.store(false, Ordering::SeqCst);
        selected
    }

    async fn run_selection(&self) -> bool {
        let campaigns = match self.client.list_campaigns().await {
            Ok(campaigns) => campaigns,
            Err(e) => {
                log::error!("Failed to fetch campaigns: {}", e);
                self.notifier.notify(&format!("Failed to load campaigns: {}", e));
                return false;
            }
        };
        if campaigns.is_empty() {
            self.notifier.notify(NO_CAMPAIGNS_NOTICE);
            return false;
        }

        match self.picker.pick(&campaigns).await {
            Some(campaign) => {
                self.session()
                    .set_active(CampaignRef::new(campaign.campaign_id, Some(campaign.name)));
                true
            }
            None => {
                log::debug!("Campaign selection dismissed");
                false
            }
        }
    }

    /// Open the graph modal, selecting a campaign first if none is active.
    pub async fn open(&self) -> bool {
        if self.session().active().is_none() && !self.select_campaign().await {
            return false;
        }

        let loaded = self
            .library
            .get_or_try_init(|| self.canvas.renderer().load())
            .await;
        if let Err(e) = loaded {
            log::error!("Failed to load graph renderer: {}", e);
            self.notifier.notify(&format!("Failed to load graph renderer: {}", e));
            return false;
        }

        self.modal_open.store(true, Ordering::SeqCst);
        self.show_full().await;
        true
    }

    pub fn close(&self) {
        self.next_view();
        self.modal_open.store(false, Ordering::SeqCst);
        self.panel.close();
    }

    /// Render the wide default view, seeded from the first listed entity.
    pub async fn show_full(&self) -> bool {
        let Some(campaign) = self.session().active() else {
            return false;
        };
        let generation = self.next_view();
        let listed = self.client.list_entities(&campaign.id).await;
        if !self.is_current_view(generation) {
            log::debug!("Dropping stale entity list for {}", campaign.id);
            return false;
        }
        let entities = match listed {
            Ok(entities) => entities,
            Err(e) => {
                log::error!("Failed to list entities: {}", e);
                self.notifier.notify(&format!("Failed to load graph: {}", e));
                return false;
            }
        };
        let Some(seed) = entities.into_iter().next() else {
            self.notifier.notify(NO_DATA_NOTICE);
            return false;
        };
        self.render_subgraph(&seed.name, self.depths.full_depth, generation)
            .await
    }

    /// Re-centre the view on a typed name at the narrower search depth.
    pub async fn search(&self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let generation = self.next_view();
        self.render_subgraph(name, self.depths.search_depth, generation)
            .await
    }

    /// Pick another campaign without leaving the modal.
    pub async fn switch_campaign(&self) -> bool {
        if !self.select_campaign().await {
            return false;
        }
        self.next_view();
        self.panel.close();
        self.show_full().await
    }

    /// Fetch and mount a subgraph unless a newer view transition happened
    /// while the fetch was in flight.
    async fn render_subgraph(&self, name: &str, depth: u32, generation: u64) -> bool {
        let fetched = fetch_subgraph(&self.client, name, depth).await;
        if !self.is_current_view(generation) {
            log::debug!("Dropping stale subgraph for '{}'", name);
            return false;
        }
        let data = match fetched {
            Ok(Some(data)) => data,
            Ok(None) => return false,
            Err(e) => {
                log::error!("Subgraph fetch for '{}' failed: {}", name, e);
                self.notifier.notify(&format!("Failed to load graph: {}", e));
                return false;
            }
        };
        if data.nodes.is_empty() {
            self.notifier.notify(NOT_FOUND_NOTICE);
            return false;
        }
        match self.canvas.render(data) {
            Ok(_) => true,
            Err(e) => {
                log::error!("Render failed: {}", e);
                self.notifier.notify(&format!("Failed to render graph: {}", e));
                false
            }
        }
    }

    /// Route a canvas click to the detail panel.
    pub async fn click(&self, event: ClickEvent) {
        match self.canvas.resolve_click(&event) {
            ClickTarget::Node(node) => {
                let ticket = self.panel.begin_loading();
                let record = match self.session().active() {
                    Some(campaign) => match self.client.entity(&campaign.id, node.record_id()).await {
                        Ok(record) => record,
                        Err(e) => {
                            log::warn!("Entity fetch for {} failed: {}", node.record_id(), e);
                            None
                        }
                    },
                    None => None,
                };
                let details = EntityDetails::from_node(&node, record.as_ref());
                self.panel.complete(ticket, PanelContent::Entity(details));
            }
            ClickTarget::Edge(edge) => {
                self.panel
                    .show(PanelContent::Relationship(RelationshipDetails::from_edge(&edge)));
            }
            ClickTarget::Background => self.panel.close(),
        }
    }
}
