// Tag Manager infra layer.
// - `gtm_client.rs` talks to the Tag Manager v2 HTTP API.

#[path = "gtm_client.rs"]
pub mod gtm_client;

pub use gtm_client::GtmApiClient;
