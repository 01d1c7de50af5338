use serde_json::Value;

use crate::core::tooling::ToolArgs;

/// Named reporting windows the model may ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateRange {
    Today,
    Yesterday,
    Last7Days,
    Last28Days,
    Last30Days,
    Last90Days,
    Custom { start: String, end: String },
}

impl DateRange {
    /// Unknown names fall back to the last 30 days.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "today" => DateRange::Today,
            "yesterday" => DateRange::Yesterday,
            "last7days" => DateRange::Last7Days,
            "last28days" => DateRange::Last28Days,
            "last90days" => DateRange::Last90Days,
            _ => DateRange::Last30Days,
        }
    }

    /// `startDate` + `endDate` win over `dateRange`, which wins over `default`.
    pub fn from_args(args: &ToolArgs, default: DateRange) -> Self {
        let start = args.string("startDate");
        let end = args.string("endDate");
        if !start.is_empty() && !end.is_empty() {
            return DateRange::Custom { start, end };
        }
        let name = args.string("dateRange");
        if name.is_empty() {
            default
        } else {
            DateRange::parse(&name)
        }
    }

    /// Start and end in the form the Data API accepts.
    pub fn bounds(&self) -> (String, String) {
        let relative = |days: u32| (format!("{}daysAgo", days), "today".to_string());
        match self {
            DateRange::Today => ("today".to_string(), "today".to_string()),
            DateRange::Yesterday => ("yesterday".to_string(), "yesterday".to_string()),
            DateRange::Last7Days => relative(7),
            DateRange::Last28Days => relative(28),
            DateRange::Last30Days => relative(30),
            DateRange::Last90Days => relative(90),
            DateRange::Custom { start, end } => (start.clone(), end.clone()),
        }
    }

    pub fn label(&self) -> String {
        match self {
            DateRange::Today => "today".to_string(),
            DateRange::Yesterday => "yesterday".to_string(),
            DateRange::Last7Days => "last7days".to_string(),
            DateRange::Last28Days => "last28days".to_string(),
            DateRange::Last30Days => "last30days".to_string(),
            DateRange::Last90Days => "last90days".to_string(),
            DateRange::Custom { start, end } => format!("{} to {}", start, end),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub is_metric: bool,
    pub desc: bool,
}

impl OrderBy {
    pub fn metric_desc(name: &str) -> Self {
        Self {
            field: name.to_string(),
            is_metric: true,
            desc: true,
        }
    }

    /// Reads `{"metric": "sessions", "desc": true}` or `{"dimension": "date"}`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let desc = obj.get("desc").and_then(Value::as_bool).unwrap_or(false);
        if let Some(metric) = obj.get("metric").and_then(Value::as_str) {
            return Some(Self {
                field: metric.to_string(),
                is_metric: true,
                desc,
            });
        }
        obj.get("dimension").and_then(Value::as_str).map(|dimension| Self {
            field: dimension.to_string(),
            is_metric: false,
            desc,
        })
    }
}

/// String match types supported by the Data API's `stringFilter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Exact,
    BeginsWith,
    EndsWith,
    Contains,
    FullRegexp,
    PartialRegexp,
}

impl MatchType {
    /// Accepts the API names plus the `EQUALS` spelling models tend to use.
    pub fn parse(operator: &str) -> Option<Self> {
        match operator.trim().to_ascii_uppercase().as_str() {
            "" | "EQUALS" | "EXACT" => Some(MatchType::Exact),
            "BEGINS_WITH" => Some(MatchType::BeginsWith),
            "ENDS_WITH" => Some(MatchType::EndsWith),
            "CONTAINS" => Some(MatchType::Contains),
            "FULL_REGEXP" | "REGEXP" => Some(MatchType::FullRegexp),
            "PARTIAL_REGEXP" => Some(MatchType::PartialRegexp),
            _ => None,
        }
    }

    pub fn as_api_str(self) -> &'static str {
        match self {
            MatchType::Exact => "EXACT",
            MatchType::BeginsWith => "BEGINS_WITH",
            MatchType::EndsWith => "ENDS_WITH",
            MatchType::Contains => "CONTAINS",
            MatchType::FullRegexp => "FULL_REGEXP",
            MatchType::PartialRegexp => "PARTIAL_REGEXP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionFilter {
    pub field: String,
    pub match_type: MatchType,
    pub value: String,
}

impl DimensionFilter {
    pub fn exact(field: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            match_type: MatchType::Exact,
            value: value.to_string(),
        }
    }

    /// Reads `{"field": .., "operator": .., "value": ..}`. Returns `None` for
    /// anything incomplete or with an operator we cannot express.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let field = obj.get("field").and_then(Value::as_str)?.trim();
        let operator = obj.get("operator").and_then(Value::as_str).unwrap_or("");
        let match_value = match obj.get("value")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        if field.is_empty() {
            return None;
        }
        Some(Self {
            field: field.to_string(),
            match_type: MatchType::parse(operator)?,
            value: match_value,
        })
    }
}

/// One Data API `runReport` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub property_id: String,
    pub date_range: DateRange,
    pub metrics: Vec<String>,
    pub dimensions: Vec<String>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u32>,
    pub filters: Vec<DimensionFilter>,
}

impl ReportRequest {
    pub fn new(
        property_id: &str,
        date_range: DateRange,
        metrics: Vec<String>,
        dimensions: Vec<String>,
    ) -> Self {
        Self {
            property_id: property_id.trim().to_string(),
            date_range,
            metrics,
            dimensions,
            order_by: None,
            limit: None,
            filters: Vec::new(),
        }
    }

    pub fn ordered_by(mut self, order_by: Option<OrderBy>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn limited_to(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }

    pub fn filtered_by(mut self, filter: DimensionFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// `properties/{id}`, accepting ids that already carry the prefix.
    pub fn property_resource(&self) -> String {
        format!(
            "properties/{}",
            self.property_id.trim_start_matches("properties/")
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportRow {
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportTable {
    pub dimension_headers: Vec<String>,
    pub metric_headers: Vec<String>,
    pub rows: Vec<ReportRow>,
    pub row_count: u64,
}

impl ReportTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_dimension_value(&self, value: &str) -> bool {
        self.rows
            .iter()
            .any(|row| row.dimensions.iter().any(|d| d == value))
    }

    /// Sum of a metric column. Unknown metrics and unparsable cells count as zero.
    pub fn metric_total(&self, metric: &str) -> f64 {
        let Some(index) = self.metric_headers.iter().position(|h| h == metric) else {
            return 0.0;
        };
        self.rows
            .iter()
            .filter_map(|row| row.metrics.get(index))
            .filter_map(|cell| cell.parse::<f64>().ok())
            .sum()
    }
}

/// A GA4 property as listed by the Admin API account summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySummary {
    pub account_id: String,
    pub account_name: String,
    pub property_id: String,
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> ToolArgs {
        match value {
            Value::Object(map) => ToolArgs::new(map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_unknown_range_falls_back_to_last_30_days() {
        assert_eq!(DateRange::parse("lastYear"), DateRange::Last30Days);
        assert_eq!(DateRange::parse("last7days"), DateRange::Last7Days);
        assert_eq!(
            DateRange::Last28Days.bounds(),
            ("28daysAgo".to_string(), "today".to_string())
        );
    }

    #[test]
    fn test_explicit_dates_switch_to_custom() {
        let range = DateRange::from_args(
            &args(json!({"dateRange": "last7days", "startDate": "2024-01-01", "endDate": "2024-01-31"})),
            DateRange::Last30Days,
        );
        assert_eq!(
            range.bounds(),
            ("2024-01-01".to_string(), "2024-01-31".to_string())
        );

        let only_start = DateRange::from_args(
            &args(json!({"startDate": "2024-01-01"})),
            DateRange::Last7Days,
        );
        assert_eq!(only_start, DateRange::Last7Days);
    }

    #[test]
    fn test_filter_parsing() {
        let filter = DimensionFilter::from_value(
            &json!({"field": "country", "operator": "EQUALS", "value": "United States"}),
        )
        .unwrap();
        assert_eq!(filter.match_type, MatchType::Exact);
        assert_eq!(filter.field, "country");

        assert!(DimensionFilter::from_value(&json!({"field": "country", "operator": "NEAR", "value": "x"})).is_none());
        assert!(DimensionFilter::from_value(&json!({"operator": "EQUALS", "value": "x"})).is_none());
    }

    #[test]
    fn test_order_by_parsing() {
        assert_eq!(
            OrderBy::from_value(&json!({"metric": "sessions", "desc": true})),
            Some(OrderBy::metric_desc("sessions"))
        );
        let by_date = OrderBy::from_value(&json!({"dimension": "date"})).unwrap();
        assert!(!by_date.is_metric);
        assert!(!by_date.desc);
        assert!(OrderBy::from_value(&json!("sessions")).is_none());
    }

    #[test]
    fn test_metric_total_and_lookup() {
        let table = ReportTable {
            dimension_headers: vec!["eventName".to_string()],
            metric_headers: vec!["eventCount".to_string()],
            rows: vec![
                ReportRow {
                    dimensions: vec!["purchase".to_string()],
                    metrics: vec!["3".to_string()],
                },
                ReportRow {
                    dimensions: vec!["page_view".to_string()],
                    metrics: vec!["40".to_string()],
                },
            ],
            row_count: 2,
        };
        assert!(table.has_dimension_value("purchase"));
        assert!(!table.has_dimension_value("refund"));
        assert_eq!(table.metric_total("eventCount"), 43.0);
        assert_eq!(table.metric_total("sessions"), 0.0);
    }

    #[test]
    fn test_property_resource_accepts_prefix() {
        let plain = ReportRequest::new("123", DateRange::Today, vec![], vec![]);
        let prefixed = ReportRequest::new("properties/123", DateRange::Today, vec![], vec![]);
        assert_eq!(plain.property_resource(), "properties/123");
        assert_eq!(prefixed.property_resource(), "properties/123");
    }
}
