// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "tooling/mod.rs"]
pub mod tooling;

#[path = "auth/auth_service.rs"]
pub mod auth;

#[path = "tag_manager/mod.rs"]
pub mod tag_manager;

#[path = "analytics/mod.rs"]
pub mod analytics;

#[path = "setup/setup_schema.rs"]
pub mod setup;

#[path = "reports/report_service.rs"]
pub mod reports;

#[path = "prompts/prompts.rs"]
pub mod prompts;
