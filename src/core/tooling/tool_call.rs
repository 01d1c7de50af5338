// =============================================================================
// TOOL CALL CONTRACT
// =============================================================================
//
// Every integration (GA4, GA4-enhanced, GTM) is driven the same way: the model
// produces `{"op": "...", "args": {...}}`, we answer with a human-readable
// string. This module holds the shared pieces of that contract so the
// integrations only contain their own operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Prefix for every failure string handed back to the model.
pub const FAILURE_MARKER: &str = "❌";

/// Metadata the host attaches to a tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolCall {
    pub call_id: String,
    /// Set by the host after a human approved a previously requested confirmation.
    pub confirmed_by_human: bool,
}

impl ToolCall {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            confirmed_by_human: false,
        }
    }

    pub fn confirmed(mut self) -> Self {
        self.confirmed_by_human = true;
        self
    }
}

/// What the host should show a human before replaying a mutating call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    /// Groups actions of the same class, e.g. `gtm_write` or `gtm_publish`.
    pub setup_key: String,
    pub command: String,
    pub explanation: String,
}

/// Result of a tool invocation.
///
/// Failures are data, not errors: they go back to the model as text.
/// `NeedsConfirmation` is control flow for the host, which replays the call
/// with `confirmed_by_human` once a person has approved it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Success(String),
    Failure(String),
    NeedsConfirmation(ConfirmationRequest),
}

impl ToolOutcome {
    pub fn success(text: impl Into<String>) -> Self {
        ToolOutcome::Success(text.into())
    }

    pub fn failure(text: impl Into<String>) -> Self {
        ToolOutcome::Failure(text.into())
    }

    pub fn needs_confirmation(
        setup_key: &str,
        command: impl Into<String>,
        explanation: &str,
    ) -> Self {
        ToolOutcome::NeedsConfirmation(ConfirmationRequest {
            setup_key: setup_key.to_string(),
            command: command.into(),
            explanation: explanation.to_string(),
        })
    }

    /// Renders the outcome as the string the model sees.
    pub fn text(&self) -> String {
        match self {
            ToolOutcome::Success(text) => text.clone(),
            ToolOutcome::Failure(text) => format!("{} {}", FAILURE_MARKER, text),
            ToolOutcome::NeedsConfirmation(request) => format!(
                "⏸️ Confirmation required ({}): {}\n{}",
                request.setup_key, request.command, request.explanation
            ),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ToolOutcome::Failure(_))
    }

    pub fn confirmation(&self) -> Option<&ConfirmationRequest> {
        match self {
            ToolOutcome::NeedsConfirmation(request) => Some(request),
            _ => None,
        }
    }
}

/// Declaration of a tool as advertised to the model.
#[derive(Debug, Clone, Serialize)]
pub struct CloudTool {
    pub name: &'static str,
    pub description: &'static str,
    pub strict: bool,
    pub parameters: Value,
}

impl CloudTool {
    /// All our tools share the loose `{op, args}` shape.
    pub fn op_and_args(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            strict: false,
            parameters: json!({
                "type": "object",
                "properties": {
                    "op": {"type": "string", "description": "Start with 'help' for usage"},
                    "args": {"type": "object"},
                },
                "required": []
            }),
        }
    }

    pub fn openai_style_tool(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "strict": self.strict,
                "parameters": self.parameters,
            }
        })
    }
}

/// Something the host can route a tool call to.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> CloudTool;

    async fn called_by_model(&self, call: &ToolCall, model_args: Option<&Value>) -> ToolOutcome;
}

/// Flat argument object with lenient accessors.
///
/// Models are sloppy about types (`"accountId": 123456`), so scalar lookups
/// accept numbers and booleans too. Presence is the only validation done here.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Scalar value as a trimmed string, empty when missing.
    pub fn string(&self, key: &str) -> String {
        match self.value(key) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    pub fn string_or(&self, key: &str, default: &str) -> String {
        let value = self.string(key);
        if value.is_empty() {
            default.to_string()
        } else {
            value
        }
    }

    /// List of strings. A bare string counts as a one-element list.
    pub fn string_list(&self, key: &str) -> Option<Vec<String>> {
        match self.value(key)? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s.trim().to_string()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            Value::String(s) if !s.trim().is_empty() => Some(vec![s.trim().to_string()]),
            _ => None,
        }
    }

    pub fn string_list_or(&self, key: &str, default: &[&str]) -> Vec<String> {
        match self.string_list(key) {
            Some(list) if !list.is_empty() => list,
            _ => default.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Raw array items, empty when missing or not an array.
    pub fn array(&self, key: &str) -> Vec<Value> {
        match self.value(key) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    pub fn u32(&self, key: &str) -> Option<u32> {
        match self.value(key)? {
            Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Sets `key` unless the model already supplied it.
    pub fn insert_if_missing(&mut self, key: &str, value: &str) {
        if !self.has(key) {
            self.0.insert(key.to_string(), Value::String(value.to_string()));
        }
    }

    /// True when the key holds a non-empty string or a non-empty list.
    pub fn has(&self, key: &str) -> bool {
        match self.value(key) {
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(_) => !self.string(key).is_empty(),
            None => false,
        }
    }
}

/// Per-bot fallbacks for arguments the model leaves out, taken from setup.
#[derive(Debug, Clone, Default)]
pub struct ArgDefaults(Vec<(&'static str, String)>);

impl ArgDefaults {
    /// Adds a fallback. Blank values are ignored.
    pub fn with(mut self, key: &'static str, value: Option<String>) -> Self {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            self.0.push((key, value.trim().to_string()));
        }
        self
    }

    pub fn apply(&self, args: &mut ToolArgs) {
        for (key, value) in &self.0 {
            args.insert_if_missing(key, value);
        }
    }
}

/// Pulls the `args` object out of the model-produced arguments.
///
/// Some models send `args` as a JSON-encoded string; that is accepted as long
/// as it decodes to an object.
pub fn sanitize_args(model_args: &Map<String, Value>) -> Result<ToolArgs, ToolOutcome> {
    match model_args.get("args") {
        None | Some(Value::Null) => Ok(ToolArgs::default()),
        Some(Value::Object(map)) => Ok(ToolArgs::new(map.clone())),
        Some(Value::String(raw)) if raw.trim().is_empty() => Ok(ToolArgs::default()),
        Some(Value::String(raw)) => serde_json::from_str::<Map<String, Value>>(raw)
            .map(ToolArgs::new)
            .map_err(|e| ToolOutcome::failure(format!("'args' must be an object: {}", e))),
        Some(other) => Err(ToolOutcome::failure(format!(
            "'args' must be an object, got: {}",
            other
        ))),
    }
}

/// Extracts the trimmed `op` string, empty when missing.
pub fn operation_name(model_args: &Map<String, Value>) -> &str {
    model_args
        .get("op")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("")
}

/// First routing step every integration goes through before authenticating.
#[derive(Debug, Clone)]
pub enum CallRoute {
    Help,
    Status,
    Operation { op: String, args: ToolArgs },
}

/// Decides between help, status and a real operation.
///
/// No arguments at all means help. A blank `op` with other arguments present
/// means status, and status wins over help when both words appear.
pub fn route_call(model_args: Option<&Value>) -> Result<CallRoute, ToolOutcome> {
    let map = match model_args {
        None | Some(Value::Null) => return Ok(CallRoute::Help),
        Some(Value::Object(map)) if map.is_empty() => return Ok(CallRoute::Help),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(ToolOutcome::failure(format!(
                "Tool arguments must be an object, got: {}",
                other
            )))
        }
    };

    let op = operation_name(map).to_string();
    let args = sanitize_args(map)?;

    if op.is_empty() || op.contains("status") {
        return Ok(CallRoute::Status);
    }
    if op.contains("help") {
        return Ok(CallRoute::Help);
    }
    Ok(CallRoute::Operation { op, args })
}

/// Builds the "missing parameter" failure in the wording the model is used to.
pub fn missing_parameters(names: &[&str]) -> ToolOutcome {
    let quoted: Vec<String> = names.iter().map(|n| format!("'{}'", n)).collect();
    let message = match quoted.as_slice() {
        [single] => format!("Missing required parameter: {}", single),
        [first, second] => format!("Missing required parameters: {} and {}", first, second),
        many => format!("Missing required parameters: {}", many.join(", ")),
    };
    ToolOutcome::failure(message)
}

/// Returns the "missing parameter" failure when any of `names` is absent.
pub fn require(args: &ToolArgs, names: &[&str]) -> Option<ToolOutcome> {
    if names.iter().all(|name| args.has(name)) {
        None
    } else {
        Some(missing_parameters(names))
    }
}

/// Failure for an operation name the integration does not know.
pub fn unknown_operation(tool_name: &str, op: &str) -> ToolOutcome {
    ToolOutcome::failure(format!(
        "Unknown operation: {}\n\nTry {}(op='help') for usage.",
        op, tool_name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_sanitize_args_accepts_object_and_absent() {
        let args = sanitize_args(&object(json!({"op": "x", "args": {"accountId": "1"}}))).unwrap();
        assert_eq!(args.string("accountId"), "1");

        let empty = sanitize_args(&object(json!({"op": "x"}))).unwrap();
        assert!(!empty.has("accountId"));
    }

    #[test]
    fn test_sanitize_args_decodes_json_string() {
        let args =
            sanitize_args(&object(json!({"args": "{\"containerId\": 42}"}))).unwrap();
        assert_eq!(args.string("containerId"), "42");
    }

    #[test]
    fn test_sanitize_args_rejects_non_object() {
        let err = sanitize_args(&object(json!({"args": [1, 2]}))).unwrap_err();
        assert!(err.is_failure());
        assert!(err.text().starts_with("❌ 'args' must be an object"));
    }

    #[test]
    fn test_string_list_accepts_single_string() {
        let args = ToolArgs::new(object(json!({"usageContext": "web", "ids": ["1", 2]})));
        assert_eq!(args.string_list("usageContext"), Some(vec!["web".to_string()]));
        assert_eq!(
            args.string_list("ids"),
            Some(vec!["1".to_string(), "2".to_string()])
        );
        assert_eq!(args.string_list_or("missing", &["web"]), vec!["web"]);
    }

    #[test]
    fn test_arg_defaults_fill_only_missing_keys() {
        let defaults = ArgDefaults::default()
            .with("accountId", Some("111".to_string()))
            .with("containerId", Some("  ".to_string()));
        let mut args = ToolArgs::new(object(json!({"containerId": "", "propertyId": "9"})));
        defaults.apply(&mut args);
        assert_eq!(args.string("accountId"), "111");
        assert!(!args.has("containerId"));

        let mut explicit = ToolArgs::new(object(json!({"accountId": "222"})));
        defaults.apply(&mut explicit);
        assert_eq!(explicit.string("accountId"), "222");
    }

    #[test]
    fn test_missing_parameters_wording() {
        assert_eq!(
            missing_parameters(&["accountId"]).text(),
            "❌ Missing required parameter: 'accountId'"
        );
        assert_eq!(
            missing_parameters(&["accountId", "containerId"]).text(),
            "❌ Missing required parameters: 'accountId' and 'containerId'"
        );
        assert_eq!(
            missing_parameters(&["accountId", "containerId", "versionId"]).text(),
            "❌ Missing required parameters: 'accountId', 'containerId', 'versionId'"
        );
    }

    #[test]
    fn test_require_treats_blank_string_as_missing() {
        let args = ToolArgs::new(object(json!({"accountId": "  ", "containerId": "2"})));
        assert!(require(&args, &["accountId", "containerId"]).is_some());
        assert!(require(&args, &["containerId"]).is_none());
    }

    #[test]
    fn test_route_call_help_status_and_operation() {
        assert!(matches!(route_call(None), Ok(CallRoute::Help)));
        assert!(matches!(route_call(Some(&json!({}))), Ok(CallRoute::Help)));
        assert!(matches!(
            route_call(Some(&json!({"op": "help"}))),
            Ok(CallRoute::Help)
        ));
        assert!(matches!(
            route_call(Some(&json!({"op": "status+help"}))),
            Ok(CallRoute::Status)
        ));
        assert!(matches!(
            route_call(Some(&json!({"args": {"accountId": "1"}}))),
            Ok(CallRoute::Status)
        ));

        match route_call(Some(&json!({"op": "listTags", "args": {"accountId": "1"}}))) {
            Ok(CallRoute::Operation { op, args }) => {
                assert_eq!(op, "listTags");
                assert_eq!(args.string("accountId"), "1");
            }
            other => panic!("unexpected route: {:?}", other),
        }
    }

    #[test]
    fn test_route_call_reports_bad_args_before_status() {
        let err = route_call(Some(&json!({"op": "status", "args": 5}))).unwrap_err();
        assert!(err.is_failure());
    }

    #[test]
    fn test_openai_style_tool_shape() {
        let tool = CloudTool::op_and_args("google_tag_manager", "Manage GTM. Call with op='help'");
        let rendered = tool.openai_style_tool();
        assert_eq!(rendered["type"], "function");
        assert_eq!(rendered["function"]["name"], "google_tag_manager");
        assert_eq!(rendered["function"]["parameters"]["type"], "object");
        assert_eq!(rendered["function"]["strict"], false);
    }
}
