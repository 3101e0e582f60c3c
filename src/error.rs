use thiserror::Error;

/// Main error type for Tarven Note
#[derive(Error, Debug)]
pub enum TarvenError {
    /// An operation that needs a campaign ran while none was active
    #[error("No active campaign")]
    NoActiveCampaign,

    /// Missing or malformed operation parameters (raised before any network call)
    #[error("{0}")]
    Validation(String),

    /// Network failure or a response body that is not JSON
    #[error("Transport error: {0}")]
    Transport(String),

    /// Backend answered with a non-2xx status
    #[error("Backend request failed with status {status}")]
    Backend { status: u16 },

    /// Delete targeted a campaign the backend does not know
    #[error("Campaign not found")]
    CampaignNotFound,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    McpProtocol(String),
}

impl From<reqwest::Error> for TarvenError {
    fn from(err: reqwest::Error) -> Self {
        TarvenError::Transport(err.to_string())
    }
}

/// Convenient Result type using TarvenError
pub type Result<T> = std::result::Result<T, TarvenError>;
