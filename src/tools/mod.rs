//! Remote operation dispatcher: the four campaign tools, their schemas, and
//! the host registration interface they are exposed through.

pub mod definitions;
pub mod dispatcher;
pub mod handlers;
pub mod registry;

pub use definitions::{CREATE_CAMPAIGN, DELETE_CAMPAIGN, OPERATION_NAMES, QUERY, STORE_ENTITIES};
pub use dispatcher::Dispatcher;
pub use registry::{Operation, OperationFuture, OperationHandler, ToolHost};
