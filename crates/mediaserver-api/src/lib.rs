pub mod client;
pub mod error;
pub mod filter;
pub mod meta;
pub mod models;

pub use client::BackendClient;
pub use error::{Error, FilterError};
pub use filter::{ItemFilter, VendorParams};
pub use meta::MetaInfo;
pub use models::{MediaServerType, MediaType};
