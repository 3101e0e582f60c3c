//! Startup wiring and the settings save path.
//!
//! settings -> session -> backend client -> dispatcher -> host registration.

use crate::backend::BackendClient;
use crate::config::Config;
use crate::error::Result;
use crate::mcp::{McpServer, OperationRegistry};
use crate::session::Session;
use crate::settings::{Settings, SettingsStore};
use crate::tools::Dispatcher;
use std::sync::Arc;

pub struct Bridge {
    config: Config,
    store: Arc<dyn SettingsStore>,
    session: Arc<Session>,
    client: Arc<BackendClient>,
    dispatcher: Arc<Dispatcher>,
    registry: Arc<OperationRegistry>,
}

impl Bridge {
    /// Load persisted settings and register the campaign tools if enabled.
    pub fn startup(config: Config, store: Arc<dyn SettingsStore>) -> Result<Self> {
        let settings = Settings::load(store.as_ref(), &config.backend.default_url)?;
        log::info!(
            "Backend {} (tools {})",
            settings.backend_url,
            if settings.tools_enabled { "enabled" } else { "disabled" }
        );

        let session = Arc::new(Session::new(&settings));
        let client = Arc::new(BackendClient::new(session.clone(), config.request_timeout())?);
        let dispatcher = Arc::new(Dispatcher::new(client.clone()));
        let registry = Arc::new(OperationRegistry::new());
        dispatcher.apply_configuration(Some(registry.as_ref()));

        Ok(Self {
            config,
            store,
            session,
            client,
            dispatcher,
            registry,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn client(&self) -> &Arc<BackendClient> {
        &self.client
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    /// Persist new settings, apply them to the session, and re-run tool registration.
    pub fn save_settings(&self, url_input: &str, tools_enabled: bool) -> Result<Settings> {
        let settings = Settings::from_input(url_input, tools_enabled, &self.config.backend.default_url);
        settings.save(self.store.as_ref())?;
        self.session.apply_settings(&settings);
        self.dispatcher.apply_configuration(Some(self.registry.as_ref()));
        log::info!("Settings saved");
        Ok(settings)
    }

    pub fn mcp_server(&self) -> McpServer {
        McpServer::new(self.registry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CampaignRef;
    use crate::settings::{FileSettingsStore, MemorySettingsStore, BACKEND_URL_KEY, ENABLE_TOOLS_KEY};
    use tempfile::TempDir;

    #[test]
    fn test_startup_defaults() {
        let bridge = Bridge::startup(Config::default(), Arc::new(MemorySettingsStore::default())).unwrap();
        assert_eq!(bridge.session().backend_url(), "http://localhost:8001");
        assert!(bridge.session().tools_enabled());
        assert!(bridge.session().active().is_none());
        assert_eq!(bridge.registry().len(), 4);
    }

    #[test]
    fn test_startup_with_tools_disabled() {
        let store = Arc::new(MemorySettingsStore::default());
        store.set(ENABLE_TOOLS_KEY, "false").unwrap();
        store.set(BACKEND_URL_KEY, "http://graph:9000").unwrap();

        let bridge = Bridge::startup(Config::default(), store).unwrap();
        assert_eq!(bridge.session().backend_url(), "http://graph:9000");
        assert!(bridge.registry().is_empty());
    }

    #[test]
    fn test_save_settings_reconfigures() {
        let store = Arc::new(MemorySettingsStore::default());
        let bridge = Bridge::startup(Config::default(), store.clone()).unwrap();
        bridge
            .session()
            .set_active(CampaignRef::new("camp-1", None));

        let saved = bridge.save_settings("  http://graph:9000/ ", false).unwrap();
        assert_eq!(saved.backend_url, "http://graph:9000/");
        assert!(bridge.registry().is_empty());
        assert_eq!(store.get(ENABLE_TOOLS_KEY).unwrap().as_deref(), Some("false"));
        assert_eq!(bridge.client().endpoint("/campaigns"), "http://graph:9000/api/campaigns");
        assert_eq!(bridge.session().active().unwrap().id, "camp-1");

        let saved = bridge.save_settings("   ", true).unwrap();
        assert_eq!(saved.backend_url, "http://localhost:8001");
        assert_eq!(bridge.registry().len(), 4);
        assert_eq!(
            store.get(BACKEND_URL_KEY).unwrap().as_deref(),
            Some("http://localhost:8001")
        );
    }

    #[test]
    fn test_settings_survive_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("settings.toml");

        let bridge = Bridge::startup(Config::default(), Arc::new(FileSettingsStore::new(&path))).unwrap();
        bridge.save_settings("http://graph:9000", false).unwrap();
        bridge.session().set_active(CampaignRef::new("camp-1", None));
        drop(bridge);

        let bridge = Bridge::startup(Config::default(), Arc::new(FileSettingsStore::new(&path))).unwrap();
        assert_eq!(bridge.session().backend_url(), "http://graph:9000");
        assert!(!bridge.session().tools_enabled());
        assert!(bridge.session().active().is_none());
    }
}
