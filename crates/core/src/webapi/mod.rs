//! HTTP transport for the repository web API.

pub mod client;
pub mod schema;

pub use client::WebApiClient;
