use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZeoError {
    #[error("API key not found. Set OPENROUTER_API_KEY, configure ~/.config/zeolite/config.toml, or pass --offline")]
    ApiKeyNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] zeolite_store::StoreError),

    #[error("Failed to open store: {0}")]
    Open(#[from] zeolite_store::FjallError),

    #[error("Invalid input: {0}")]
    Validation(#[from] zeolite_core::ValidationError),

    #[error("Interpreter error: {0}")]
    Interpretation(#[from] zeolite_interpret::InterpretationError),

    #[error("Unsupported schema version: {0}")]
    SchemaVersion(u8),
}
