use thiserror::Error;

use crate::commerce::orders::OrderError;
use crate::config::ConfigError;
use crate::fraud::FraudDbError;
use crate::llm::integration::IntegrationError;
use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM integration error: {0}")]
    Integration(#[from] IntegrationError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Fraud database error: {0}")]
    FraudDb(#[from] FraudDbError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("General error: {0}")]
    General(String),
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::General(err.to_string())
    }
}
