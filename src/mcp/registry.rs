use crate::mcp::types::Tool;
use crate::tools::{Operation, ToolHost};
use serde_json::Value;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Operations currently exposed over MCP, in registration order
#[derive(Debug, Default)]
pub struct OperationRegistry {
    operations: RwLock<Vec<Operation>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Operation>> {
        self.operations.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Operation>> {
        self.operations.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.read().iter().map(|op| op.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().iter().any(|op| op.name == name)
    }

    /// Tool definitions for tools/list
    pub fn tool_definitions(&self) -> Vec<Tool> {
        self.read()
            .iter()
            .map(|op| Tool {
                name: op.name.clone(),
                description: op.description.clone(),
                input_schema: op.schema.clone(),
            })
            .collect()
    }

    /// Run a registered operation. `None` if the name is not registered.
    pub async fn invoke(&self, name: &str, arguments: Value) -> Option<String> {
        let operation = self.read().iter().find(|op| op.name == name).cloned()?;
        Some(operation.call(arguments).await)
    }
}

impl ToolHost for OperationRegistry {
    fn register_operation(&self, operation: Operation) {
        let mut operations = self.write();
        match operations.iter_mut().find(|op| op.name == operation.name) {
            Some(existing) => *existing = operation,
            None => operations.push(operation),
        }
    }

    fn unregister_operation(&self, name: &str) {
        self.write().retain(|op| op.name != name);
    }
}
