pub mod backend;
pub mod bridge;
pub mod config;
pub mod error;
pub mod graph;
pub mod mcp;
pub mod query;
pub mod session;
pub mod settings;
pub mod tools;
pub mod viewer;

#[cfg(test)]
mod testing;

pub use bridge::Bridge;
pub use config::Config;
pub use error::{Result, TarvenError};
pub use session::{CampaignRef, Session};
