use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::core::analytics::analytics_service;
use crate::core::reports::{ReportFrequency, ScheduledReport};
use crate::core::tag_manager::tag_manager_service;

/// One configurable value a bot owner fills in at install time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupField {
    pub bs_name: String,
    pub bs_type: String,
    pub bs_default: Value,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bs_group: String,
    pub bs_description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bs_elements: Vec<SetupField>,
}

impl SetupField {
    fn new(name: &str, kind: &str, default: Value, group: &str, description: &str) -> Self {
        Self {
            bs_name: name.to_string(),
            bs_type: kind.to_string(),
            bs_default: default,
            bs_group: group.to_string(),
            bs_description: description.to_string(),
            bs_elements: Vec::new(),
        }
    }

    pub fn string_short(name: &str, group: &str, description: &str) -> Self {
        Self::new(name, "string_short", json!(""), group, description)
    }

    pub fn string_long(name: &str, group: &str, description: &str) -> Self {
        Self::new(name, "string_long", json!(""), group, description)
    }

    fn element(name: &str, kind: &str, default: &str, description: &str) -> Self {
        Self::new(name, kind, json!(default), "", description)
    }
}

/// Everything the MetricMaster bot can be configured with.
pub fn metricmaster_setup_schema() -> Vec<SetupField> {
    let mut schema = analytics_service::setup_schema();
    schema.extend(tag_manager_service::setup_schema());
    schema.push(SetupField::string_long(
        "GITHUB_REPO_URL",
        "GitHub Integration",
        "GitHub repository URL for automated PR creation (optional, e.g., 'https://github.com/user/repo')",
    ));
    schema.push(SetupField {
        bs_elements: vec![
            SetupField::element(
                "report_name",
                "string_short",
                "",
                "Report name (e.g., 'Weekly Traffic Report')",
            ),
            SetupField::element(
                "frequency",
                "string_short",
                "weekly",
                "Frequency: daily, weekly, monthly",
            ),
            SetupField::element("property_id", "string_short", "", "GA4 property ID"),
            SetupField::element(
                "metrics",
                "string_multiline",
                "totalUsers,sessions,screenPageViews",
                "Comma-separated metrics",
            ),
            SetupField::element(
                "dimensions",
                "string_multiline",
                "date",
                "Comma-separated dimensions",
            ),
        ],
        ..SetupField::new(
            "SCHEDULED_REPORTS",
            "list_dict",
            json!([]),
            "Scheduled Reports",
            "Configure automated analytics reports",
        )
    });
    schema
}

/// Schema defaults overridden by whatever the bot owner set. Keys the schema
/// does not know are dropped.
pub fn mix_setup(schema: &[SetupField], persona_setup: &Map<String, Value>) -> Map<String, Value> {
    schema
        .iter()
        .map(|field| {
            let value = persona_setup
                .get(&field.bs_name)
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| field.bs_default.clone());
            (field.bs_name.clone(), value)
        })
        .collect()
}

/// Typed view over the mixed setup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BotSetup {
    pub ga_default_property: Option<String>,
    pub gtm_default_account: Option<String>,
    pub gtm_default_container: Option<String>,
    pub github_repo_url: Option<String>,
    pub scheduled_reports: Vec<ScheduledReport>,
}

impl BotSetup {
    pub fn from_mixed(schema: &[SetupField], mixed: &Map<String, Value>) -> Self {
        let text = |key: &str| -> Option<String> {
            mixed
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let report_elements = schema
            .iter()
            .find(|f| f.bs_name == "SCHEDULED_REPORTS")
            .map(|f| f.bs_elements.as_slice())
            .unwrap_or(&[]);

        Self {
            ga_default_property: text("GA_DEFAULT_PROPERTY"),
            gtm_default_account: text("GTM_DEFAULT_ACCOUNT"),
            gtm_default_container: text("GTM_DEFAULT_CONTAINER"),
            github_repo_url: text("GITHUB_REPO_URL"),
            scheduled_reports: parse_scheduled_reports(
                mixed.get("SCHEDULED_REPORTS"),
                report_elements,
            ),
        }
    }

    pub fn load(persona_setup: &Map<String, Value>) -> Self {
        let schema = metricmaster_setup_schema();
        Self::from_mixed(&schema, &mix_setup(&schema, persona_setup))
    }
}

fn parse_scheduled_reports(value: Option<&Value>, elements: &[SetupField]) -> Vec<ScheduledReport> {
    // Some hosts store list_dict values as a JSON string.
    let decoded;
    let items = match value {
        Some(Value::Array(items)) => items,
        Some(Value::String(raw)) if !raw.trim().is_empty() => {
            match serde_json::from_str::<Value>(raw) {
                Ok(Value::Array(items)) => {
                    decoded = items;
                    &decoded
                }
                _ => {
                    tracing::warn!("SCHEDULED_REPORTS is not a JSON list, ignoring it");
                    return Vec::new();
                }
            }
        }
        _ => return Vec::new(),
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let Some(entry) = item.as_object() else {
                tracing::warn!(index, "Scheduled report entry is not an object");
                return None;
            };
            let field = |name: &str| -> String {
                entry
                    .get(name)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .or_else(|| {
                        elements
                            .iter()
                            .find(|e| e.bs_name == name)
                            .and_then(|e| e.bs_default.as_str())
                            .map(str::to_string)
                    })
                    .unwrap_or_default()
            };

            let property_id = field("property_id");
            if property_id.is_empty() {
                tracing::warn!(index, "Scheduled report has no property_id, skipping");
                return None;
            }
            let report_name = match field("report_name") {
                name if name.is_empty() => format!("Report {}", index + 1),
                name => name,
            };

            Some(ScheduledReport {
                report_name,
                frequency: ReportFrequency::parse(&field("frequency")),
                property_id,
                metrics: split_list(&field("metrics")),
                dimensions: split_list(&field("dimensions")),
            })
        })
        .collect()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c| c == ',' || c == '\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
