// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "google/mod.rs"]
pub mod google;

#[path = "google_auth/mod.rs"]
pub mod google_auth;

#[path = "tag_manager/mod.rs"]
pub mod tag_manager;

#[path = "analytics/mod.rs"]
pub mod analytics;

#[path = "reports/mod.rs"]
pub mod reports;
