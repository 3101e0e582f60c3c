use futures_util::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Future produced by an operation handler; resolves to the envelope string.
pub type OperationFuture = BoxFuture<'static, String>;

pub type OperationHandler = Arc<dyn Fn(Value) -> OperationFuture + Send + Sync>;

/// A named, schema-described operation exposed to a host
#[derive(Clone)]
pub struct Operation {
    pub name: String,
    pub description: String,
    /// JSON Schema of the operation's arguments
    pub schema: Value,
    pub handler: OperationHandler,
}

impl Operation {
    pub fn new<F>(name: &str, description: &str, schema: Value, handler: F) -> Self
    where
        F: Fn(Value) -> OperationFuture + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            schema,
            handler: Arc::new(handler),
        }
    }

    /// Run the handler. Never fails: errors are already in the envelope.
    pub async fn call(&self, arguments: Value) -> String {
        (self.handler)(arguments).await
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Registration interface a host application provides
pub trait ToolHost: Send + Sync {
    /// Register an operation, replacing any previous one with the same name.
    fn register_operation(&self, operation: Operation);

    /// Remove an operation by name. Unknown names are ignored.
    fn unregister_operation(&self, name: &str);
}
