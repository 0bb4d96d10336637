use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("connection: {message}")]
    Connection { message: String },

    #[error("query: {message}")]
    Query { message: String },

    #[error("catalog not found: '{catalog}'")]
    CatalogNotFound { catalog: String },

    #[error("config: {message}")]
    Config { message: String },

    #[error("stream: {message}")]
    Stream { message: String },
}

pub type Result<T> = std::result::Result<T, DriverError>;
