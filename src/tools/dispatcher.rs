use crate::backend::BackendClient;
use crate::error::Result;
use crate::session::Session;
use crate::tools::definitions::*;
use crate::tools::handlers;
use crate::tools::registry::{Operation, ToolHost};
use futures_util::FutureExt;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;

/// Remote operation dispatcher
///
/// Each public operation method is a closed boundary: whatever happens
/// inside, the caller gets an envelope string back.
pub struct Dispatcher {
    client: Arc<BackendClient>,
}

impl Dispatcher {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }

    pub fn session(&self) -> &Arc<Session> {
        self.client.session()
    }

    pub fn client(&self) -> &Arc<BackendClient> {
        &self.client
    }

    pub async fn create_campaign(&self, arguments: Value) -> String {
        envelope(CREATE_CAMPAIGN, handlers::create_campaign(&self.client, arguments).await)
    }

    pub async fn delete_campaign(&self, arguments: Value) -> String {
        envelope(DELETE_CAMPAIGN, handlers::delete_campaign(&self.client, arguments).await)
    }

    pub async fn store_entities(&self, arguments: Value) -> String {
        envelope(STORE_ENTITIES, handlers::store_entities(&self.client, arguments).await)
    }

    pub async fn query(&self, arguments: Value) -> String {
        envelope(QUERY, handlers::query(&self.client, arguments).await)
    }

    fn operation<F, Fut>(
        self: &Arc<Self>,
        name: &str,
        description: &str,
        schema: Value,
        run: F,
    ) -> Operation
    where
        F: Fn(Arc<Self>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = String> + Send + 'static,
    {
        let dispatcher = Arc::clone(self);
        Operation::new(name, description, schema, move |arguments| {
            run(dispatcher.clone(), arguments).boxed()
        })
    }

    /// The four operations, bound to this dispatcher.
    pub fn operations(self: &Arc<Self>) -> Vec<Operation> {
        vec![
            self.operation(
                CREATE_CAMPAIGN,
                CREATE_CAMPAIGN_DESCRIPTION,
                create_campaign_schema(),
                |d, args| async move { d.create_campaign(args).await },
            ),
            self.operation(
                DELETE_CAMPAIGN,
                DELETE_CAMPAIGN_DESCRIPTION,
                delete_campaign_schema(),
                |d, args| async move { d.delete_campaign(args).await },
            ),
            self.operation(
                STORE_ENTITIES,
                STORE_ENTITIES_DESCRIPTION,
                store_entities_schema(),
                |d, args| async move { d.store_entities(args).await },
            ),
            self.operation(
                QUERY,
                QUERY_DESCRIPTION,
                query_schema(),
                |d, args| async move { d.query(args).await },
            ),
        ]
    }

    /// Bring the host's registrations in line with the session's tools flag.
    ///
    /// Unregisters all four names, then registers them again only when tools
    /// are enabled. Returns how many operations are registered afterwards.
    pub fn apply_configuration(self: &Arc<Self>, host: Option<&dyn ToolHost>) -> usize {
        let Some(host) = host else {
            log::warn!("Tool host registration API not available; campaign tools not exposed");
            return 0;
        };

        for name in OPERATION_NAMES {
            host.unregister_operation(name);
        }

        if !self.session().tools_enabled() {
            log::info!("Campaign tools disabled");
            return 0;
        }

        let operations = self.operations();
        let count = operations.len();
        for operation in operations {
            host.register_operation(operation);
        }
        log::info!("Registered {} campaign tools", count);
        count
    }
}

fn envelope(operation: &str, result: Result<Value>) -> String {
    match result {
        Ok(body) => body.to_string(),
        Err(err) => {
            log::warn!("{} failed: {}", operation, err);
            json!({"success": false, "error": err.to_string()}).to_string()
        }
    }
}
