use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::analytics::{
    AnalyticsApi, DimensionFilter, PropertySummary, ReportRequest, ReportRow, ReportTable,
};
use crate::core::auth::AccessToken;
use crate::core::tooling::ApiError;
use crate::infra::google::{decode, http_client, send};

const DATA_API_URL: &str = "https://analyticsdata.googleapis.com/v1beta";
const ADMIN_API_URL: &str = "https://analyticsadmin.googleapis.com/v1beta";

/// Upper bound on account summary pages fetched per listing.
const MAX_SUMMARY_PAGES: usize = 10;

/// GA4 Data API (reports) + Admin API (property listing).
pub struct Ga4ApiClient {
    client: Client,
    data_url: String,
    admin_url: String,
}

impl Ga4ApiClient {
    pub fn new() -> Result<Self, ApiError> {
        Ok(Self {
            client: http_client()?,
            data_url: DATA_API_URL.to_string(),
            admin_url: ADMIN_API_URL.to_string(),
        })
    }
}

/// JSON body for `properties/{id}:runReport`.
pub fn report_body(request: &ReportRequest) -> Value {
    let (start, end) = request.date_range.bounds();
    let mut body = json!({
        "dateRanges": [{"startDate": start, "endDate": end}],
        "metrics": request.metrics.iter().map(|m| json!({"name": m})).collect::<Vec<_>>(),
        "dimensions": request.dimensions.iter().map(|d| json!({"name": d})).collect::<Vec<_>>(),
    });

    if let Some(order) = &request.order_by {
        let order_by = if order.is_metric {
            json!({"metric": {"metricName": order.field}, "desc": order.desc})
        } else {
            json!({"dimension": {"dimensionName": order.field}, "desc": order.desc})
        };
        body["orderBys"] = json!([order_by]);
    }
    if let Some(limit) = request.limit {
        // int64 fields travel as strings in Google's JSON mapping.
        body["limit"] = json!(limit.to_string());
    }

    let expressions: Vec<Value> = request.filters.iter().map(filter_expression).collect();
    match expressions.len() {
        0 => {}
        1 => body["dimensionFilter"] = expressions[0].clone(),
        _ => body["dimensionFilter"] = json!({"andGroup": {"expressions": expressions}}),
    }
    body
}

fn filter_expression(filter: &DimensionFilter) -> Value {
    json!({
        "filter": {
            "fieldName": filter.field,
            "stringFilter": {
                "matchType": filter.match_type.as_api_str(),
                "value": filter.value,
            }
        }
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunReportResponse {
    #[serde(default)]
    dimension_headers: Vec<Header>,
    #[serde(default)]
    metric_headers: Vec<Header>,
    #[serde(default)]
    rows: Vec<Row>,
    #[serde(default)]
    row_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Row {
    #[serde(default)]
    dimension_values: Vec<Cell>,
    #[serde(default)]
    metric_values: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    #[serde(default)]
    value: String,
}

impl From<RunReportResponse> for ReportTable {
    fn from(resp: RunReportResponse) -> Self {
        let rows: Vec<ReportRow> = resp
            .rows
            .into_iter()
            .map(|row| ReportRow {
                dimensions: row.dimension_values.into_iter().map(|c| c.value).collect(),
                metrics: row.metric_values.into_iter().map(|c| c.value).collect(),
            })
            .collect();
        ReportTable {
            dimension_headers: resp.dimension_headers.into_iter().map(|h| h.name).collect(),
            metric_headers: resp.metric_headers.into_iter().map(|h| h.name).collect(),
            row_count: resp.row_count.unwrap_or(rows.len() as u64),
            rows,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountSummaries {
    #[serde(default)]
    account_summaries: Vec<AccountSummary>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountSummary {
    #[serde(default)]
    account: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    property_summaries: Vec<ApiPropertySummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPropertySummary {
    #[serde(default)]
    property: String,
    #[serde(default)]
    display_name: String,
}

fn flatten_summaries(summaries: Vec<AccountSummary>) -> Vec<PropertySummary> {
    summaries
        .into_iter()
        .flat_map(|account| {
            let account_id = account.account.trim_start_matches("accounts/").to_string();
            let account_name = account.display_name;
            account
                .property_summaries
                .into_iter()
                .map(move |p| PropertySummary {
                    account_id: account_id.clone(),
                    account_name: account_name.clone(),
                    property_id: p.property.trim_start_matches("properties/").to_string(),
                    display_name: p.display_name,
                })
        })
        .collect()
}

#[async_trait]
impl AnalyticsApi for Ga4ApiClient {
    async fn run_report(
        &self,
        token: &AccessToken,
        request: &ReportRequest,
    ) -> Result<ReportTable, ApiError> {
        let url = format!("{}/{}:runReport", self.data_url, request.property_resource());
        let resp = send(self.client.post(url).json(&report_body(request)), token).await?;
        let report: RunReportResponse = decode(resp).await?;
        Ok(report.into())
    }

    async fn list_properties(&self, token: &AccessToken) -> Result<Vec<PropertySummary>, ApiError> {
        let url = format!("{}/accountSummaries", self.admin_url);
        let mut properties = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_SUMMARY_PAGES {
            let mut request = self.client.get(&url).query(&[("pageSize", "200")]);
            if let Some(page) = &page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }
            let page: AccountSummaries = decode(send(request, token).await?).await?;
            properties.extend(flatten_summaries(page.account_summaries));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analytics::analytics_models::OrderBy;
    use crate::core::analytics::DateRange;

    #[test]
    fn test_report_body_shape() {
        let request = ReportRequest::new(
            "123",
            DateRange::Last7Days,
            vec!["eventCount".to_string()],
            vec!["eventName".to_string()],
        )
        .ordered_by(Some(OrderBy::metric_desc("eventCount")))
        .limited_to(Some(50));

        let body = report_body(&request);
        assert_eq!(
            body["dateRanges"],
            json!([{"startDate": "7daysAgo", "endDate": "today"}])
        );
        assert_eq!(body["metrics"], json!([{"name": "eventCount"}]));
        assert_eq!(body["dimensions"], json!([{"name": "eventName"}]));
        assert_eq!(
            body["orderBys"],
            json!([{"metric": {"metricName": "eventCount"}, "desc": true}])
        );
        assert_eq!(body["limit"], "50");
        assert!(body.get("dimensionFilter").is_none());
    }

    #[test]
    fn test_filters_become_string_filters() {
        let single = ReportRequest::new("1", DateRange::Today, vec![], vec![])
            .filtered_by(DimensionFilter::exact("pagePath", "/cart"));
        assert_eq!(
            report_body(&single)["dimensionFilter"],
            json!({"filter": {"fieldName": "pagePath", "stringFilter": {"matchType": "EXACT", "value": "/cart"}}})
        );

        let both = single.filtered_by(DimensionFilter::exact("country", "France"));
        let expressions = &report_body(&both)["dimensionFilter"]["andGroup"]["expressions"];
        assert_eq!(expressions.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_response_to_table() {
        let resp: RunReportResponse = serde_json::from_value(json!({
            "dimensionHeaders": [{"name": "date"}],
            "metricHeaders": [{"name": "sessions", "type": "TYPE_INTEGER"}],
            "rows": [{"dimensionValues": [{"value": "20240101"}], "metricValues": [{"value": "12"}]}],
            "rowCount": 1
        }))
        .unwrap();
        let table: ReportTable = resp.into();
        assert_eq!(table.dimension_headers, vec!["date"]);
        assert_eq!(table.rows[0].metrics, vec!["12"]);
        assert_eq!(table.row_count, 1);

        let empty: ReportTable = serde_json::from_value::<RunReportResponse>(json!({"kind": "analyticsData#runReport"}))
            .unwrap()
            .into();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_account_summaries_flatten() {
        let page: AccountSummaries = serde_json::from_value(json!({
            "accountSummaries": [{
                "account": "accounts/42",
                "displayName": "Acme",
                "propertySummaries": [
                    {"property": "properties/1", "displayName": "acme.com"},
                    {"property": "properties/2", "displayName": "shop.acme.com"}
                ]
            }]
        }))
        .unwrap();
        let properties = flatten_summaries(page.account_summaries);
        assert_eq!(properties.len(), 2);
        assert_eq!(properties[1].property_id, "2");
        assert_eq!(properties[1].account_id, "42");
        assert_eq!(properties[1].account_name, "Acme");
    }
}
