use serde::Serialize;
use serde_json::Value;

use crate::core::analytics::{analytics_service, enhanced_service};
use crate::core::prompts::{MAIN_PROMPT, SCHEDULED_PROMPT};
use crate::core::setup::{metricmaster_setup_schema, SetupField};
use crate::core::tag_manager::tag_manager_service;
use crate::core::tooling::CloudTool;

pub const BOT_NAME: &str = "metricmaster";
pub const BOT_VERSION: &str = env!("CARGO_PKG_VERSION");

const BOT_DESCRIPTION: &str = r#"
## MetricMaster - Google Analytics 4 & Tag Manager Specialist

Sets up and runs website analytics on Google Analytics 4 and Google Tag Manager.

**What it does:**

- Connects to Google with OAuth (or a service account) for GA4 and GTM access
- Finds or creates GA4 properties and GTM containers
- Hands out the GTM install snippet, ready for a pull request
- Links a GA4 measurement ID to a container
- Builds event tracking with triggers, tags and variables, then versions and publishes it
- Produces traffic, conversion, e-commerce, funnel and custom reports
- Runs daily, weekly or monthly reports on a schedule

Every change to a container waits for a human to confirm it first.
"#;

const INTRO_MESSAGE: &str = "Hi, I'm MetricMaster. I can set up Google Analytics 4 and Tag Manager for your site, configure event tracking, and report on your traffic. Where would you like to start?";

/// Schedule entry that triggers the report expert on weekday mornings.
const REPORT_SCHEDULE: &str = "WEEKDAYS:MO:FR/09:00";

#[derive(Debug, Clone, Serialize)]
pub struct FeaturedAction {
    pub feat_question: &'static str,
    pub feat_expert: &'static str,
    pub feat_depends_on_setup: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Expert {
    pub name: &'static str,
    pub description: &'static str,
    pub system_prompt: &'static str,
    pub tools: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleEntry {
    pub sched_type: &'static str,
    pub sched_when: &'static str,
    pub sched_first_question: &'static str,
    pub sched_fexp_name: &'static str,
}

/// Everything a marketplace needs to list and install the bot.
#[derive(Debug, Clone, Serialize)]
pub struct BotManifest {
    pub name: &'static str,
    pub version: &'static str,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub occupation: &'static str,
    pub accent_color: &'static str,
    pub description: &'static str,
    pub intro_message: &'static str,
    pub tags: Vec<&'static str>,
    pub tools: Vec<Value>,
    pub setup_schema: Vec<SetupField>,
    pub featured_actions: Vec<FeaturedAction>,
    pub experts: Vec<Expert>,
    pub schedule: Vec<ScheduleEntry>,
}

pub fn metricmaster_tools() -> Vec<CloudTool> {
    vec![
        analytics_service::tool(),
        enhanced_service::tool(),
        tag_manager_service::tool(),
    ]
}

pub fn build_manifest(tools: &[CloudTool]) -> BotManifest {
    let tool_json: Vec<Value> = tools.iter().map(CloudTool::openai_style_tool).collect();

    BotManifest {
        name: BOT_NAME,
        version: BOT_VERSION,
        title: "MetricMaster",
        subtitle: "Google Analytics 4 & Tag Manager specialist for website analytics setup and reporting",
        occupation: "Analytics Specialist",
        accent_color: "#4285F4",
        description: BOT_DESCRIPTION,
        intro_message: INTRO_MESSAGE,
        tags: vec!["Analytics", "Google Analytics", "Tag Manager", "Reports"],
        tools: tool_json.clone(),
        setup_schema: metricmaster_setup_schema(),
        featured_actions: vec![
            FeaturedAction {
                feat_question: "Help me set up Google Analytics 4 and Tag Manager",
                feat_expert: "default",
                feat_depends_on_setup: vec![],
            },
            FeaturedAction {
                feat_question: "Show me my website traffic for the last 30 days",
                feat_expert: "default",
                feat_depends_on_setup: vec!["GA_DEFAULT_PROPERTY"],
            },
            FeaturedAction {
                feat_question: "Set up event tracking for form submissions",
                feat_expert: "default",
                feat_depends_on_setup: vec!["GTM_DEFAULT_CONTAINER"],
            },
        ],
        experts: vec![
            Expert {
                name: "default",
                description: "Interactive analytics setup, configuration and reporting",
                system_prompt: MAIN_PROMPT,
                tools: tool_json.clone(),
            },
            Expert {
                name: "scheduled",
                description: "Automated report generation",
                system_prompt: SCHEDULED_PROMPT,
                tools: tool_json,
            },
        ],
        schedule: vec![ScheduleEntry {
            sched_type: "SCHED_ANY",
            sched_when: REPORT_SCHEDULE,
            sched_first_question: "Check if there are any scheduled reports configured. If yes, generate them and save them.",
            sched_fexp_name: "scheduled",
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_lists_tools_and_setup() {
        let manifest = build_manifest(&metricmaster_tools());
        let json = serde_json::to_value(&manifest).unwrap();

        assert_eq!(json["name"], "metricmaster");
        assert_eq!(json["version"], "0.1.0");
        let names: Vec<&str> = json["tools"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|t| t["function"]["name"].as_str())
            .collect();
        assert_eq!(
            names,
            vec!["google_analytics", "google_analytics_enhanced", "google_tag_manager"]
        );
        assert_eq!(json["setup_schema"].as_array().map(Vec::len), Some(5));
        assert_eq!(json["schedule"][0]["sched_when"], "WEEKDAYS:MO:FR/09:00");
    }

    #[test]
    fn test_featured_actions_reference_setup_keys() {
        let manifest = build_manifest(&metricmaster_tools());
        let keys: Vec<String> = manifest
            .setup_schema
            .iter()
            .map(|f| f.bs_name.clone())
            .collect();
        for action in &manifest.featured_actions {
            for dep in &action.feat_depends_on_setup {
                assert!(keys.iter().any(|k| k == dep), "unknown setup key {}", dep);
            }
        }
        assert_eq!(manifest.experts[1].system_prompt, SCHEDULED_PROMPT);
    }
}
