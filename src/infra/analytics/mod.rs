// GA4 infra layer.
// - `ga4_client.rs` talks to the Data API (reports) and Admin API (properties).

#[path = "ga4_client.rs"]
pub mod ga4_client;

pub use ga4_client::Ga4ApiClient;
