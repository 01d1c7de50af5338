use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::auth::{AccessToken, ExternalAuth};
use crate::core::setup::SetupField;
use crate::core::tooling::{
    missing_parameters, require, route_call, unknown_operation, ApiError, CallRoute, CloudTool, ToolArgs, ToolCall,
    ToolHandler, ToolOutcome,
};

use super::analytics_api::AnalyticsApi;
use super::analytics_help::ENHANCED_HELP;
use super::analytics_models::{DateRange, DimensionFilter, OrderBy, ReportRequest};
use super::analytics_service::AnalyticsService;
use super::report_formatting::{format_number, format_report};

pub const TOOL_NAME: &str = "google_analytics_enhanced";

pub fn tool() -> CloudTool {
    CloudTool::op_and_args(
        TOOL_NAME,
        "Enhanced Google Analytics operations for event setup and tracking. Call with op='help' for usage",
    )
}

/// The enhanced tool has nothing of its own to configure.
pub fn setup_schema() -> Vec<SetupField> {
    Vec::new()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsOperation {
    GetEventConfig,
    ListEvents,
    GetEventReport,
    GetConversions,
    GetEcommerceReport,
    GetUserJourney,
    GetFunnelReport,
    CustomQuery,
}

impl AnalyticsOperation {
    pub const ALL: [AnalyticsOperation; 8] = [
        AnalyticsOperation::GetEventConfig,
        AnalyticsOperation::ListEvents,
        AnalyticsOperation::GetEventReport,
        AnalyticsOperation::GetConversions,
        AnalyticsOperation::GetEcommerceReport,
        AnalyticsOperation::GetUserJourney,
        AnalyticsOperation::GetFunnelReport,
        AnalyticsOperation::CustomQuery,
    ];

    pub fn parse(op: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.as_str() == op)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnalyticsOperation::GetEventConfig => "getEventConfig",
            AnalyticsOperation::ListEvents => "listEvents",
            AnalyticsOperation::GetEventReport => "getEventReport",
            AnalyticsOperation::GetConversions => "getConversions",
            AnalyticsOperation::GetEcommerceReport => "getEcommerceReport",
            AnalyticsOperation::GetUserJourney => "getUserJourney",
            AnalyticsOperation::GetFunnelReport => "getFunnelReport",
            AnalyticsOperation::CustomQuery => "customQuery",
        }
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Canned GA4 reports (events, conversions, e-commerce, funnels) on top of
/// the base analytics tool, sharing its session.
pub struct EnhancedAnalyticsService<C: AnalyticsApi, A: ExternalAuth> {
    base: Arc<AnalyticsService<C, A>>,
}

impl<C, A> EnhancedAnalyticsService<C, A>
where
    C: AnalyticsApi,
    A: ExternalAuth,
{
    pub fn new(base: Arc<AnalyticsService<C, A>>) -> Self {
        Self { base }
    }

    async fn run(
        &self,
        operation: AnalyticsOperation,
        token: &AccessToken,
        args: &ToolArgs,
    ) -> Result<ToolOutcome, ApiError> {
        let property = args.string("propertyId");
        match operation {
            AnalyticsOperation::GetEventConfig => {
                if let Some(missing) = require(args, &["propertyId", "eventName"]) {
                    return Ok(missing);
                }
                let event_name = args.string("eventName");
                let request = ReportRequest::new(
                    &property,
                    DateRange::Last7Days,
                    owned(&["eventCount"]),
                    owned(&["eventName"]),
                );
                let table = self.base.run_report(token, &request).await?;
                if table.has_dimension_value(&event_name) {
                    Ok(ToolOutcome::success(format!(
                        "✅ Event '{}' is being tracked.\n\n{}",
                        event_name,
                        format_report(&request, &table)
                    )))
                } else {
                    Ok(ToolOutcome::success(format!(
                        "⚠️ Event '{}' not found in recent data. It may not be tracked yet or has no data in the last 7 days.",
                        event_name
                    )))
                }
            }
            AnalyticsOperation::ListEvents => {
                if let Some(missing) = require(args, &["propertyId"]) {
                    return Ok(missing);
                }
                let request = ReportRequest::new(
                    &property,
                    DateRange::from_args(args, DateRange::Last7Days),
                    owned(&["eventCount", "eventValue"]),
                    owned(&["eventName"]),
                )
                .ordered_by(Some(OrderBy::metric_desc("eventCount")))
                .limited_to(Some(50));
                self.report(token, &request).await
            }
            AnalyticsOperation::GetEventReport => {
                if let Some(missing) = require(args, &["propertyId"]) {
                    return Ok(missing);
                }
                let mut request = ReportRequest::new(
                    &property,
                    DateRange::from_args(args, DateRange::Last30Days),
                    args.string_list_or("metrics", &["eventCount", "eventValue"]),
                    args.string_list_or("dimensions", &["date", "eventName"]),
                )
                .ordered_by(Some(OrderBy::metric_desc("eventCount")));
                let event_name = args.string("eventName");
                if !event_name.is_empty() {
                    request = request.filtered_by(DimensionFilter::exact("eventName", &event_name));
                }
                self.report(token, &request).await
            }
            AnalyticsOperation::GetConversions => {
                if let Some(missing) = require(args, &["propertyId"]) {
                    return Ok(missing);
                }
                let request = ReportRequest::new(
                    &property,
                    DateRange::from_args(args, DateRange::Last30Days),
                    owned(&["conversions", "totalRevenue", "sessions"]),
                    args.string_list_or("dimensions", &["sessionSource", "sessionMedium"]),
                )
                .ordered_by(Some(OrderBy::metric_desc("conversions")))
                .limited_to(Some(20));
                self.report(token, &request).await
            }
            AnalyticsOperation::GetEcommerceReport => {
                if let Some(missing) = require(args, &["propertyId"]) {
                    return Ok(missing);
                }
                let request = ReportRequest::new(
                    &property,
                    DateRange::from_args(args, DateRange::Last30Days),
                    owned(&["itemRevenue", "itemsPurchased", "itemsViewed"]),
                    args.string_list_or("dimensions", &["itemName", "itemCategory"]),
                )
                .ordered_by(Some(OrderBy::metric_desc("itemRevenue")))
                .limited_to(Some(30));
                self.report(token, &request).await
            }
            AnalyticsOperation::GetUserJourney => self.user_journey(token, args).await,
            AnalyticsOperation::GetFunnelReport => self.funnel_report(token, args).await,
            AnalyticsOperation::CustomQuery => self.custom_query(token, args).await,
        }
    }

    async fn report(
        &self,
        token: &AccessToken,
        request: &ReportRequest,
    ) -> Result<ToolOutcome, ApiError> {
        let table = self.base.run_report(token, request).await?;
        Ok(ToolOutcome::success(format_report(request, &table)))
    }

    async fn user_journey(&self, token: &AccessToken, args: &ToolArgs) -> Result<ToolOutcome, ApiError> {
        if let Some(missing) = require(args, &["propertyId"]) {
            return Ok(missing);
        }
        let request = ReportRequest::new(
            &args.string("propertyId"),
            DateRange::from_args(args, DateRange::Last7Days),
            owned(&["screenPageViews", "sessions"]),
            owned(&["pagePath", "pageTitle"]),
        )
        .ordered_by(Some(OrderBy::metric_desc("screenPageViews")))
        .limited_to(Some(100));
        let table = self.base.run_report(token, &request).await?;

        Ok(ToolOutcome::success(format!(
            "🔍 User Journey Analysis\n\nPages visited between '{}' and '{}':\n\n{}\n\nNote: Full path analysis requires custom implementation with GA4 Data API.",
            args.string_or("startPage", "/"),
            args.string("endPage"),
            format_report(&request, &table)
        )))
    }

    /// One report per step, each narrowed to the step's page path.
    async fn funnel_report(&self, token: &AccessToken, args: &ToolArgs) -> Result<ToolOutcome, ApiError> {
        if let Some(missing) = require(args, &["propertyId", "funnelSteps"]) {
            return Ok(missing);
        }
        let property = args.string("propertyId");
        let range = DateRange::from_args(args, DateRange::Last30Days);

        // Every step needs a page before any report runs.
        let mut steps = Vec::new();
        for (index, step) in args.array("funnelSteps").iter().enumerate() {
            let text = |key: &str| {
                step.get(key)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .unwrap_or("")
                    .to_string()
            };
            let page = text("page");
            if !step.is_object() || page.is_empty() {
                let field = format!("funnelSteps[{}].page", index);
                return Ok(missing_parameters(&[field.as_str()]));
            }
            let name = match text("name") {
                name if name.is_empty() => format!("Step {}", index + 1),
                name => name,
            };
            steps.push((name, page));
        }

        let mut output = vec!["📊 Funnel Analysis:\n".to_string()];
        for (index, (name, page)) in steps.iter().enumerate() {
            let position = index + 1;
            let request = ReportRequest::new(
                &property,
                range.clone(),
                owned(&["screenPageViews", "sessions"]),
                owned(&["pagePath"]),
            )
            .filtered_by(DimensionFilter::exact("pagePath", page));
            let table = self.base.run_report(token, &request).await?;

            output.push(format!("\n{}. {} ({})", position, name, page));
            output.push(format!(
                "   Page views: {}, Sessions: {}",
                format_number(table.metric_total("screenPageViews")),
                format_number(table.metric_total("sessions"))
            ));
        }
        output.push(
            "\n\nNote: Full funnel analysis with drop-off rates requires GA4 Funnel Exploration API."
                .to_string(),
        );
        Ok(ToolOutcome::success(output.join("\n")))
    }

    async fn custom_query(&self, token: &AccessToken, args: &ToolArgs) -> Result<ToolOutcome, ApiError> {
        if let Some(missing) = require(args, &["propertyId"]) {
            return Ok(missing);
        }
        let mut request = ReportRequest::new(
            &args.string("propertyId"),
            DateRange::from_args(args, DateRange::Last30Days),
            args.string_list_or("metrics", &["sessions"]),
            args.string_list("dimensions").unwrap_or_default(),
        )
        .ordered_by(args.value("orderBy").and_then(OrderBy::from_value))
        .limited_to(Some(args.u32("limit").unwrap_or(100)));

        let filters = args.array("filters");
        for raw in &filters {
            match DimensionFilter::from_value(raw) {
                Some(filter) => request = request.filtered_by(filter),
                None => tracing::warn!(tool = TOOL_NAME, filter = %raw, "Ignoring unsupported filter"),
            }
        }

        let table = self.base.run_report(token, &request).await?;
        let mut result = format_report(&request, &table);
        if !filters.is_empty() {
            result.push_str(&format!(
                "\n\nNote: Filters applied: {}",
                Value::Array(filters)
            ));
        }
        Ok(ToolOutcome::success(result))
    }
}

#[async_trait]
impl<C, A> ToolHandler for EnhancedAnalyticsService<C, A>
where
    C: AnalyticsApi,
    A: ExternalAuth,
{
    fn definition(&self) -> CloudTool {
        tool()
    }

    async fn called_by_model(&self, call: &ToolCall, model_args: Option<&Value>) -> ToolOutcome {
        let route = match route_call(model_args) {
            Ok(CallRoute::Help) => return ToolOutcome::success(ENHANCED_HELP),
            Ok(route) => route,
            Err(failure) => return failure,
        };

        // Without a token the base tool answers, with its own status or the
        // authorization prompt.
        let Some(token) = self.base.session().ensure_token().await else {
            return self.base.called_by_model(call, model_args).await;
        };

        let (op, mut args) = match route {
            CallRoute::Operation { op, args } => (op, args),
            _ => {
                let user = &self.base.session().identity().user_id;
                return ToolOutcome::success(format!(
                    "Google Analytics Enhanced integration status:\n  Authenticated: ✅ Yes\n  User: {}\n",
                    user
                ));
            }
        };
        self.base.apply_defaults(&mut args);

        let Some(operation) = AnalyticsOperation::parse(&op) else {
            return unknown_operation(TOOL_NAME, &op);
        };

        match self.run(operation, &token, &args).await {
            Ok(outcome) => outcome,
            Err(e) => self.base.api_failure(TOOL_NAME, &op, e, "Error: ").await,
        }
    }
}
