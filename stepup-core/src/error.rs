use thiserror::Error;

#[derive(Error, Debug)]
pub enum StepUpError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend rejected the request: {detail}")]
    Rejected { detail: String },

    #[error("Unauthorized: primary credential was not accepted")]
    Unauthorized,

    #[error("Trust store error: {0}")]
    Storage(String),

    #[error("Unexpected backend response: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, StepUpError>;
