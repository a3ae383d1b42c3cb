//! Pure, stateless extraction layer: everything here operates on already
//! fetched page text and makes no network or filesystem calls.

pub mod auth;
pub mod embedded;
pub mod endpoints;
pub mod model;

pub use auth::classify;
pub use embedded::extract_embedded;
pub use endpoints::extract_endpoints;
pub use model::{
    AuthScheme, AuthenticationProfile, DiscoveredEndpoint, EmbeddedData, EndpointSource,
    HttpMethod,
};
