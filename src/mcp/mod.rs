pub mod http;
pub mod registry;
pub mod server;
pub mod types;

pub use http::HttpMcpServer;
pub use registry::OperationRegistry;
pub use server::McpServer;
