// Google credential providers.
// - `oauth_client.rs` runs the consent flow for end users.
// - `service_account.rs` signs JWTs for unattended installs.
// - `token_file_store.rs` keeps consented tokens on disk.

#[path = "token_file_store.rs"]
pub mod token_file_store;

#[path = "oauth_client.rs"]
pub mod oauth_client;

#[path = "service_account.rs"]
pub mod service_account;

pub use oauth_client::{GoogleOAuthClient, OAuthClientConfig};
pub use service_account::ServiceAccountAuth;
pub use token_file_store::TokenFileStore;
