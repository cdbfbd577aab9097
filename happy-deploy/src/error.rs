//! Error type shared by the GitHub client and the deploy operations.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response {status}")]
    UnexpectedStatus { status: StatusCode, body: String },

    #[error("Could not decode Github response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Github GraphQL query failed: {0}")]
    GraphQl(String),

    #[error("Invalid Github API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Could not write output: {0}")]
    Output(#[from] std::io::Error),
}

impl Error {
    /// Network and HTTP status failures are reported to the operator and
    /// turned into an absent result. Everything else aborts the command.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::UnexpectedStatus { .. })
    }

    /// Response body attached to an unexpected status, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            Error::UnexpectedStatus { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }
}
