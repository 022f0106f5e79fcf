use thiserror::Error;

#[derive(Error, Debug)]
pub enum CallqError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Script evaluation error: {0}")]
    ScriptEvaluation(String),

    #[error("Entry point missing: {0}")]
    MissingEntryPoint(String),

    #[error("JavaScript execution error: {0}")]
    JavaScriptExecution(String),

    #[error("Value conversion error: {0}")]
    Conversion(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, CallqError>;
