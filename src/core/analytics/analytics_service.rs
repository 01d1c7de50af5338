use async_trait::async_trait;
use serde_json::Value;

use crate::core::auth::{AccessToken, ExternalAuth, GoogleSession};
use crate::core::reports::{ReportRunError, ReportSource};
use crate::core::setup::SetupField;
use crate::core::tooling::{
    require, route_call, unknown_operation, ApiError, ArgDefaults, CallRoute, CloudTool, ToolArgs,
    ToolCall, ToolHandler, ToolOutcome,
};

use super::analytics_api::AnalyticsApi;
use super::analytics_help::HELP;
use super::analytics_models::{DimensionFilter, DateRange, OrderBy, ReportRequest, ReportTable};
use super::report_formatting::{format_properties, format_report};

pub const TOOL_NAME: &str = "google_analytics";
pub const SERVICE_LABEL: &str = "Google Analytics";

pub const REQUIRED_SCOPES: &[&str] = &["https://www.googleapis.com/auth/analytics.readonly"];

const DEFAULT_METRICS: &[&str] = &["totalUsers", "sessions", "screenPageViews"];
const DEFAULT_DIMENSIONS: &[&str] = &["date"];

pub fn tool() -> CloudTool {
    CloudTool::op_and_args(
        TOOL_NAME,
        "Read Google Analytics 4 properties and reports. Call with op='help' for usage",
    )
}

pub fn setup_schema() -> Vec<SetupField> {
    vec![SetupField::string_short(
        "GA_DEFAULT_PROPERTY",
        "Google Analytics",
        "Default GA4 property ID (optional, e.g., '123456789')",
    )]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseAnalyticsOperation {
    ListProperties,
    GetReport,
}

impl BaseAnalyticsOperation {
    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "listProperties" => Some(BaseAnalyticsOperation::ListProperties),
            "getReport" => Some(BaseAnalyticsOperation::GetReport),
            _ => None,
        }
    }
}

/// Base GA4 reporting tool. Also owns the Google session the enhanced tool
/// and the scheduled reports reuse.
pub struct AnalyticsService<C: AnalyticsApi, A: ExternalAuth> {
    api: C,
    session: GoogleSession<A>,
    defaults: ArgDefaults,
}

impl<C, A> AnalyticsService<C, A>
where
    C: AnalyticsApi,
    A: ExternalAuth,
{
    pub fn new(api: C, session: GoogleSession<A>) -> Self {
        Self {
            api,
            session,
            defaults: ArgDefaults::default(),
        }
    }

    /// Fills `propertyId` from setup when the model omits it.
    pub fn with_defaults(mut self, defaults: ArgDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn session(&self) -> &GoogleSession<A> {
        &self.session
    }

    pub fn apply_defaults(&self, args: &mut ToolArgs) {
        self.defaults.apply(args);
    }

    pub async fn run_report(
        &self,
        token: &AccessToken,
        request: &ReportRequest,
    ) -> Result<ReportTable, ApiError> {
        tracing::debug!(property = %request.property_id, metrics = ?request.metrics, "Running GA4 report");
        self.api.run_report(token, request).await
    }

    /// Turns an API error into the reply for the model. Rejected tokens are
    /// dropped and the user is asked to authorize again.
    pub async fn api_failure(&self, tool: &str, op: &str, error: ApiError, prefix: &str) -> ToolOutcome {
        if error.is_auth_failure() {
            tracing::warn!(tool, op, status = ?error.status(), "Token rejected, clearing session");
            return self
                .session
                .reauthorization_prompt(SERVICE_LABEL, error.status().unwrap_or_default())
                .await;
        }
        let message = format!("{}{}", prefix, error);
        tracing::error!(tool, op, "{}", message);
        ToolOutcome::failure(message)
    }

    async fn run(
        &self,
        operation: BaseAnalyticsOperation,
        token: &AccessToken,
        args: &ToolArgs,
    ) -> Result<ToolOutcome, ApiError> {
        match operation {
            BaseAnalyticsOperation::ListProperties => {
                let properties = self.api.list_properties(token).await?;
                Ok(ToolOutcome::success(format_properties(&properties)))
            }
            BaseAnalyticsOperation::GetReport => self.get_report(token, args).await,
        }
    }

    async fn get_report(&self, token: &AccessToken, args: &ToolArgs) -> Result<ToolOutcome, ApiError> {
        if let Some(missing) = require(args, &["propertyId"]) {
            return Ok(missing);
        }

        let mut request = ReportRequest::new(
            &args.string("propertyId"),
            DateRange::from_args(args, DateRange::Last30Days),
            args.string_list_or("metrics", DEFAULT_METRICS),
            args.string_list_or("dimensions", DEFAULT_DIMENSIONS),
        )
        .ordered_by(args.value("orderBy").and_then(OrderBy::from_value))
        .limited_to(args.u32("limit"));
        for filter in args.array("filters").iter().filter_map(DimensionFilter::from_value) {
            request = request.filtered_by(filter);
        }

        let table = self.run_report(token, &request).await?;
        Ok(ToolOutcome::success(format_report(&request, &table)))
    }
}

#[async_trait]
impl<C, A> ToolHandler for AnalyticsService<C, A>
where
    C: AnalyticsApi,
    A: ExternalAuth,
{
    fn definition(&self) -> CloudTool {
        tool()
    }

    async fn called_by_model(&self, _call: &ToolCall, model_args: Option<&Value>) -> ToolOutcome {
        let (op, args) = match route_call(model_args) {
            Ok(CallRoute::Help) => return ToolOutcome::success(HELP),
            Ok(CallRoute::Status) => {
                let authenticated = self.session.ensure_token().await.is_some();
                return ToolOutcome::success(
                    self.session
                        .status_text(SERVICE_LABEL, authenticated, true)
                        .await,
                );
            }
            Ok(CallRoute::Operation { op, mut args }) => {
                self.defaults.apply(&mut args);
                (op, args)
            }
            Err(failure) => return failure,
        };

        let Some(token) = self.session.ensure_token().await else {
            return self.session.authorization_prompt().await;
        };

        let Some(operation) = BaseAnalyticsOperation::parse(&op) else {
            return unknown_operation(TOOL_NAME, &op);
        };

        match self.run(operation, &token, &args).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.api_failure(TOOL_NAME, &op, e, "Google Analytics API error: ")
                    .await
            }
        }
    }
}

#[async_trait]
impl<C, A> ReportSource for AnalyticsService<C, A>
where
    C: AnalyticsApi,
    A: ExternalAuth,
{
    async fn render(&self, request: &ReportRequest) -> Result<String, ReportRunError> {
        let token = self
            .session
            .ensure_token()
            .await
            .ok_or(ReportRunError::NotAuthenticated)?;

        match self.run_report(&token, request).await {
            Ok(table) => Ok(format_report(request, &table)),
            Err(e) => {
                if e.is_auth_failure() {
                    self.session.invalidate().await;
                }
                Err(e.into())
            }
        }
    }
}
