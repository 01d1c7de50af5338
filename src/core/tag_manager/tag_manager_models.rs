use serde::{Deserialize, Serialize};
use serde_json::Value;

// Resource shapes mirror the Tag Manager v2 REST API field names. Anything we
// only pass through (tag parameters, trigger filters) stays raw JSON.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub account_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub public_id: String,
    #[serde(default)]
    pub usage_context: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    #[serde(default)]
    pub workspace_id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub tag_type: String,
    #[serde(default)]
    pub parameter: Vec<Value>,
    #[serde(default)]
    pub firing_trigger_id: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub trigger_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub trigger_type: String,
    #[serde(default)]
    pub filter: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub variable_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub variable_type: String,
    #[serde(default)]
    pub parameter: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerVersion {
    #[serde(default)]
    pub container_version_id: String,
    #[serde(default)]
    pub name: String,
}

/// Body of a `create_version` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionDraft {
    pub name: String,
    pub notes: String,
}

/// `accounts/{a}/containers/{c}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerPath {
    pub account_id: String,
    pub container_id: String,
}

impl ContainerPath {
    pub fn new(account_id: impl Into<String>, container_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            container_id: container_id.into(),
        }
    }

    pub fn resource(&self) -> String {
        format!(
            "accounts/{}/containers/{}",
            self.account_id, self.container_id
        )
    }

    pub fn workspace(&self, workspace_id: impl Into<String>) -> WorkspacePath {
        WorkspacePath {
            container: self.clone(),
            workspace_id: workspace_id.into(),
        }
    }

    pub fn version(&self, version_id: &str) -> String {
        format!("{}/versions/{}", self.resource(), version_id)
    }
}

/// `accounts/{a}/containers/{c}/workspaces/{w}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePath {
    pub container: ContainerPath,
    pub workspace_id: String,
}

impl WorkspacePath {
    pub fn resource(&self) -> String {
        format!(
            "{}/workspaces/{}",
            self.container.resource(),
            self.workspace_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tag_uses_api_field_names() {
        let tag = Tag {
            name: "GA4 Configuration".to_string(),
            tag_type: "gaawe".to_string(),
            parameter: vec![json!({"key": "measurementId", "type": "template", "value": "G-1"})],
            firing_trigger_id: vec!["7".to_string()],
            ..Default::default()
        };
        let body = serde_json::to_value(&tag).unwrap();
        assert_eq!(body["type"], "gaawe");
        assert_eq!(body["firingTriggerId"], json!(["7"]));
        assert!(body.get("tagId").is_none());
    }

    #[test]
    fn test_paths() {
        let container = ContainerPath::new("1", "2");
        assert_eq!(container.resource(), "accounts/1/containers/2");
        assert_eq!(
            container.workspace("3").resource(),
            "accounts/1/containers/2/workspaces/3"
        );
        assert_eq!(container.version("5"), "accounts/1/containers/2/versions/5");
    }
}
