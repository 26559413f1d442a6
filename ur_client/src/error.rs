//! UR client error types

use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// Transport failure
    Http(reqwest::Error),
    /// Response body could not be decoded
    Json(serde_json::Error),
    /// Non-success status
    Api { message: String, status: u16 },
    /// Unit code not in `<shisya>_<danchi><shikibetu>` form
    InvalidCode(String),
    /// Invalid endpoint configuration
    Url(url::ParseError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {}", e),
            Error::Json(e) => write!(f, "JSON parse error: {}", e),
            Error::Api { message, status } => {
                write!(f, "UR API error ({}): {}", status, message)
            }
            Error::InvalidCode(code) => write!(f, "Invalid danchi code: {}", code),
            Error::Url(e) => write!(f, "Invalid URL: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::Url(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::Url(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
