//! Detail side panel.
//!
//! Every transition bumps a generation counter. A node click takes a
//! [`PanelTicket`] before its follow-up fetch; the result is applied only if
//! no other transition happened in between.

use crate::graph::format::{EntityDetails, RelationshipDetails};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq)]
pub enum PanelContent {
    Loading,
    Entity(EntityDetails),
    Relationship(RelationshipDetails),
}

impl PanelContent {
    pub fn render(&self) -> String {
        match self {
            PanelContent::Loading => "Loading...".to_string(),
            PanelContent::Entity(details) => details.render(),
            PanelContent::Relationship(details) => details.render(),
        }
    }
}

/// Proof of the panel generation a pending result belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelTicket(u64);

#[derive(Debug, Default)]
struct PanelState {
    open: bool,
    generation: u64,
    content: Option<PanelContent>,
}

#[derive(Debug, Default)]
pub struct DetailPanel {
    state: Mutex<PanelState>,
}

impl DetailPanel {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Open the panel in its loading state and hand out a ticket for the result.
    pub fn begin_loading(&self) -> PanelTicket {
        let mut state = self.lock();
        state.generation += 1;
        state.open = true;
        state.content = Some(PanelContent::Loading);
        PanelTicket(state.generation)
    }

    /// Apply a pending result. Returns false if the ticket went stale.
    pub fn complete(&self, ticket: PanelTicket, content: PanelContent) -> bool {
        let mut state = self.lock();
        if !state.open || state.generation != ticket.0 {
            log::debug!(
                "Discarding stale panel result (ticket {}, current {})",
                ticket.0,
                state.generation
            );
            return false;
        }
        state.content = Some(content);
        true
    }

    /// Open the panel with content that needs no fetch.
    pub fn show(&self, content: PanelContent) {
        let mut state = self.lock();
        state.generation += 1;
        state.open = true;
        state.content = Some(content);
    }

    pub fn close(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.open = false;
        state.content = None;
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    pub fn content(&self) -> Option<PanelContent> {
        self.lock().content.clone()
    }
}
