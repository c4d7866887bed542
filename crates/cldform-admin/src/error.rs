//! Admin API error types

use thiserror::Error;

/// Failure of a single Admin API call.
///
/// `Transport` and `Api` are the two failure channels of a remote call: the
/// former means no usable response came back, the latter means the response
/// arrived intact but reported an error in its body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdminError {
    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Api(String),

    #[error("invalid cloudinary url: {0}")]
    InvalidUrl(String),

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
}

impl AdminError {
    pub fn is_transport(&self) -> bool {
        matches!(self, AdminError::Transport(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, AdminError::Api(_))
    }
}

impl From<reqwest::Error> for AdminError {
    fn from(e: reqwest::Error) -> Self {
        AdminError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AdminError>;
