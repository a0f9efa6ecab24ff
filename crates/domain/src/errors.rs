use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    #[error("Invalid server address: {0}")]
    InvalidServerAddr(String),

    #[error("No in-flight query for hostname: {0}")]
    CancelNoQuery(String),

    #[error("No matching waiter for the query: {0}")]
    CancelNoWaiter(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Transport error on {server}: {message}")]
    Transport { server: String, message: String },

    #[error("Resolver is shut down")]
    Shutdown,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}
