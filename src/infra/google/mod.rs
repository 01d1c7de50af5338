// Google REST helpers shared by the GTM and GA4 clients.

pub mod google_api;

pub use google_api::{decode, http_client, send};
