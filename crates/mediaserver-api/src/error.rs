use std::num::ParseIntError;

use thiserror::Error;

use crate::models::MediaServerType;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("Invalid item filter: {0}")]
    Filter(#[from] FilterError),
    #[error("Unknown media server: {0}")]
    UnknownServer(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Not found")]
    NotFound,
    #[error("Server error: {0}")]
    ServerError(String),
}

/// Failures while rendering an [`ItemFilter`](crate::ItemFilter) for a vendor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("{server} queries require a parent library id")]
    MissingParentId { server: MediaServerType },
    #[error("parent id {value:?} is not numeric: {source}")]
    InvalidParentId {
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("year {value:?} is not numeric: {source}")]
    InvalidYear {
        value: String,
        #[source]
        source: ParseIntError,
    },
}
