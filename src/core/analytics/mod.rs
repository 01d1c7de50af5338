// GA4 layer.
// - `analytics_service.rs` is the base `google_analytics` tool and owns the session.
// - `enhanced_service.rs` builds canned reports on top of it.

pub mod analytics_api;
pub mod analytics_help;
pub mod analytics_models;
pub mod analytics_service;
pub mod enhanced_service;
pub mod report_formatting;

pub use analytics_api::AnalyticsApi;
pub use analytics_models::{
    DateRange, DimensionFilter, PropertySummary, ReportRequest, ReportRow, ReportTable,
};
pub use analytics_service::AnalyticsService;
pub use enhanced_service::EnhancedAnalyticsService;
