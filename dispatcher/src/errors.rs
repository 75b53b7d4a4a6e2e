use routing::RoutingError;
use thiserror::Error;

use crate::config::ValidationError;

/// Result type alias for dispatcher operations
pub type Result<T, E = DispatcherError> = std::result::Result<T, E>;

/// Errors that can occur while running the dispatcher
#[derive(Error, Debug)]
pub enum DispatcherError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid routing rule: {0}")]
    Routing(#[from] RoutingError),

    #[error("Invalid config: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to load config: {0}")]
    ConfigLoad(String),
}
