//! Campaign session state.
//!
//! Holds the active campaign pointer plus the runtime copy of the user
//! settings. Every component shares one `Session` through an `Arc`; each
//! field has a single writer method and reads return owned snapshots, so
//! no lock is held across an `.await`.

use crate::error::{Result, TarvenError};
use crate::settings::Settings;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Identity of a campaign as tracked by the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignRef {
    pub id: String,
    pub name: Option<String>,
}

impl CampaignRef {
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
        }
    }
}

#[derive(Debug)]
struct SessionState {
    active: Option<CampaignRef>,
    tools_enabled: bool,
    backend_url: String,
}

/// Process-wide session shared by the dispatcher and the graph viewer
#[derive(Debug)]
pub struct Session {
    state: RwLock<SessionState>,
}

impl Session {
    /// Start a session from persisted settings; no campaign is active yet.
    pub fn new(settings: &Settings) -> Self {
        Self {
            state: RwLock::new(SessionState {
                active: None,
                tools_enabled: settings.tools_enabled,
                backend_url: settings.backend_url.clone(),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn active(&self) -> Option<CampaignRef> {
        self.read().active.clone()
    }

    /// Precondition check repeated at every graph operation boundary.
    pub fn require_active(&self) -> Result<CampaignRef> {
        self.active().ok_or(TarvenError::NoActiveCampaign)
    }

    pub fn set_active(&self, campaign: CampaignRef) {
        log::info!(
            "Active campaign: {} ({})",
            campaign.name.as_deref().unwrap_or("unnamed"),
            campaign.id
        );
        self.write().active = Some(campaign);
    }

    /// Clear the active campaign if it is `id`. Returns whether it was cleared.
    pub fn clear_if_matches(&self, id: &str) -> bool {
        let mut state = self.write();
        match &state.active {
            Some(active) if active.id == id => {
                state.active = None;
                true
            }
            _ => false,
        }
    }

    pub fn tools_enabled(&self) -> bool {
        self.read().tools_enabled
    }

    pub fn backend_url(&self) -> String {
        self.read().backend_url.clone()
    }

    /// Apply freshly saved settings. The active campaign is untouched.
    pub fn apply_settings(&self, settings: &Settings) {
        let mut state = self.write();
        state.backend_url = settings.backend_url.clone();
        state.tools_enabled = settings.tools_enabled;
    }

    pub fn settings(&self) -> Settings {
        let state = self.read();
        Settings {
            backend_url: state.backend_url.clone(),
            tools_enabled: state.tools_enabled,
        }
    }
}
