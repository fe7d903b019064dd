use std::io;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Couldn't build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Couldn't download {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Got HTTP {status} for {url}")]
    Status { url: String, status: StatusCode },

    #[error("Couldn't decode body of {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    /// Whether another attempt could succeed: network hiccups, throttling and server errors.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Client(_) | Self::Decode { .. } => false,
        }
    }
}
