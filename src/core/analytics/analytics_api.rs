use async_trait::async_trait;

use crate::core::auth::AccessToken;
use crate::core::tooling::ApiError;

use super::analytics_models::{PropertySummary, ReportRequest, ReportTable};

/// GA4 Data + Admin API calls the analytics tools are built on.
#[async_trait]
pub trait AnalyticsApi: Send + Sync {
    async fn run_report(
        &self,
        token: &AccessToken,
        request: &ReportRequest,
    ) -> Result<ReportTable, ApiError>;

    async fn list_properties(&self, token: &AccessToken) -> Result<Vec<PropertySummary>, ApiError>;
}
