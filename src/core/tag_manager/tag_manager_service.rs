use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::auth::{AccessToken, ExternalAuth, GoogleSession};
use crate::core::setup::SetupField;
use crate::core::tooling::{
    require, route_call, unknown_operation, ApiError, ArgDefaults, CallRoute, CloudTool, ToolArgs,
    ToolCall, ToolHandler, ToolOutcome,
};

use super::tag_manager_api::TagManagerApi;
use super::tag_manager_help::HELP;
use super::tag_manager_models::{
    Container, ContainerPath, Tag, Trigger, Variable, VersionDraft, WorkspacePath,
};

pub const TOOL_NAME: &str = "google_tag_manager";
const SERVICE_LABEL: &str = "Google Tag Manager";

pub const REQUIRED_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/tagmanager.edit.containers",
    "https://www.googleapis.com/auth/tagmanager.readonly",
];

const WRITE_KEY: &str = "gtm_write";
const PUBLISH_KEY: &str = "gtm_publish";

pub fn tool() -> CloudTool {
    CloudTool::op_and_args(
        TOOL_NAME,
        "Manage Google Tag Manager containers, tags, triggers, and variables. Call with op='help' for usage",
    )
}

pub fn setup_schema() -> Vec<SetupField> {
    vec![
        SetupField::string_short(
            "GTM_DEFAULT_ACCOUNT",
            "Google Tag Manager",
            "Default GTM account ID (optional, e.g., '123456')",
        ),
        SetupField::string_short(
            "GTM_DEFAULT_CONTAINER",
            "Google Tag Manager",
            "Default GTM container ID (optional, e.g., '789')",
        ),
    ]
}

/// Operations the model can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GtmOperation {
    ListAccounts,
    ListContainers,
    GetContainer,
    CreateContainer,
    ListTags,
    CreateTag,
    ListTriggers,
    CreateTrigger,
    ListVariables,
    CreateVariable,
    CreateVersion,
    PublishVersion,
    LinkGa4,
}

impl GtmOperation {
    pub const ALL: [GtmOperation; 13] = [
        GtmOperation::ListAccounts,
        GtmOperation::ListContainers,
        GtmOperation::GetContainer,
        GtmOperation::CreateContainer,
        GtmOperation::ListTags,
        GtmOperation::CreateTag,
        GtmOperation::ListTriggers,
        GtmOperation::CreateTrigger,
        GtmOperation::ListVariables,
        GtmOperation::CreateVariable,
        GtmOperation::CreateVersion,
        GtmOperation::PublishVersion,
        GtmOperation::LinkGa4,
    ];

    pub fn parse(op: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.as_str() == op)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GtmOperation::ListAccounts => "listAccounts",
            GtmOperation::ListContainers => "listContainers",
            GtmOperation::GetContainer => "getContainer",
            GtmOperation::CreateContainer => "createContainer",
            GtmOperation::ListTags => "listTags",
            GtmOperation::CreateTag => "createTag",
            GtmOperation::ListTriggers => "listTriggers",
            GtmOperation::CreateTrigger => "createTrigger",
            GtmOperation::ListVariables => "listVariables",
            GtmOperation::CreateVariable => "createVariable",
            GtmOperation::CreateVersion => "createVersion",
            GtmOperation::PublishVersion => "publishVersion",
            GtmOperation::LinkGa4 => "linkGA4",
        }
    }

    /// What a human has to approve before this operation may run.
    /// Read-only operations return `None`.
    pub fn confirmation_request(self, args: &ToolArgs) -> Option<ToolOutcome> {
        let (key, command, explanation) = match self {
            GtmOperation::CreateContainer => (
                WRITE_KEY,
                format!("create container: {}", args.string("containerName")),
                "This will create a new GTM container in your account",
            ),
            GtmOperation::CreateTag => (
                WRITE_KEY,
                format!("create tag: {}", args.string("tagName")),
                "This will create a new tag in GTM",
            ),
            GtmOperation::CreateTrigger => (
                WRITE_KEY,
                format!("create trigger: {}", args.string("triggerName")),
                "This will create a new trigger in GTM",
            ),
            GtmOperation::CreateVariable => (
                WRITE_KEY,
                format!("create variable: {}", args.string("variableName")),
                "This will create a new variable in GTM",
            ),
            GtmOperation::CreateVersion => (
                WRITE_KEY,
                format!("create version: {}", args.string("versionName")),
                "This will create a new container version",
            ),
            GtmOperation::PublishVersion => (
                PUBLISH_KEY,
                format!("publish version {}", args.string("versionId")),
                "This will publish the container version to PRODUCTION",
            ),
            GtmOperation::LinkGa4 => (
                WRITE_KEY,
                format!("link GA4 measurement ID: {}", args.string("measurementId")),
                "This will create GA4 configuration tag in GTM",
            ),
            GtmOperation::ListAccounts
            | GtmOperation::ListContainers
            | GtmOperation::GetContainer
            | GtmOperation::ListTags
            | GtmOperation::ListTriggers
            | GtmOperation::ListVariables => return None,
        };
        Some(ToolOutcome::needs_confirmation(key, command, explanation))
    }
}

/// Tool-call adapter over the Tag Manager v2 API.
pub struct TagManagerService<C: TagManagerApi, A: ExternalAuth> {
    api: C,
    session: GoogleSession<A>,
    defaults: ArgDefaults,
}

impl<C, A> TagManagerService<C, A>
where
    C: TagManagerApi,
    A: ExternalAuth,
{
    pub fn new(api: C, session: GoogleSession<A>) -> Self {
        Self {
            api,
            session,
            defaults: ArgDefaults::default(),
        }
    }

    /// Fills `accountId`/`containerId` from setup when the model omits them.
    pub fn with_defaults(mut self, defaults: ArgDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    async fn run(
        &self,
        operation: GtmOperation,
        token: &AccessToken,
        args: &ToolArgs,
    ) -> Result<ToolOutcome, ApiError> {
        match operation {
            GtmOperation::ListAccounts => self.list_accounts(token).await,
            GtmOperation::ListContainers => self.list_containers(token, args).await,
            GtmOperation::GetContainer => self.get_container(token, args).await,
            GtmOperation::CreateContainer => self.create_container(token, args).await,
            GtmOperation::ListTags => self.list_tags(token, args).await,
            GtmOperation::CreateTag => self.create_tag(token, args).await,
            GtmOperation::ListTriggers => self.list_triggers(token, args).await,
            GtmOperation::CreateTrigger => self.create_trigger(token, args).await,
            GtmOperation::ListVariables => self.list_variables(token, args).await,
            GtmOperation::CreateVariable => self.create_variable(token, args).await,
            GtmOperation::CreateVersion => self.create_version(token, args).await,
            GtmOperation::PublishVersion => self.publish_version(token, args).await,
            GtmOperation::LinkGa4 => self.link_ga4(token, args).await,
        }
    }

    /// Uses `workspaceId` when given, otherwise the container's first workspace.
    /// `None` means the container has no workspace at all.
    async fn resolve_workspace(
        &self,
        token: &AccessToken,
        container: &ContainerPath,
        args: &ToolArgs,
    ) -> Result<Option<WorkspacePath>, ApiError> {
        let workspace_id = args.string("workspaceId");
        if !workspace_id.is_empty() {
            return Ok(Some(container.workspace(workspace_id)));
        }

        let workspaces = self.api.list_workspaces(token, container).await?;
        Ok(workspaces
            .into_iter()
            .next()
            .filter(|w| !w.workspace_id.is_empty())
            .map(|w| container.workspace(w.workspace_id)))
    }

    async fn list_accounts(&self, token: &AccessToken) -> Result<ToolOutcome, ApiError> {
        let accounts = self.api.list_accounts(token).await?;
        if accounts.is_empty() {
            return Ok(ToolOutcome::success(
                "📦 No Google Tag Manager accounts found.",
            ));
        }

        let mut output = vec!["📦 Google Tag Manager Accounts:\n".to_string()];
        for account in accounts {
            output.push(format!(
                "• {} (ID: {})",
                display_name(&account.name),
                account.account_id
            ));
        }
        Ok(ToolOutcome::success(output.join("\n")))
    }

    async fn list_containers(
        &self,
        token: &AccessToken,
        args: &ToolArgs,
    ) -> Result<ToolOutcome, ApiError> {
        if let Some(missing) = require(args, &["accountId"]) {
            return Ok(missing);
        }
        let account_id = args.string("accountId");

        let containers = self.api.list_containers(token, &account_id).await?;
        if containers.is_empty() {
            return Ok(ToolOutcome::success(format!(
                "📦 No containers found in account {}",
                account_id
            )));
        }

        let mut output = vec![format!("📦 Containers in Account {}:\n", account_id)];
        for container in containers {
            output.push(format!("• {}", display_name(&container.name)));
            output.push(format!("  ID: {}", container.container_id));
            output.push(format!("  Public ID: {}", container.public_id));
            output.push(format!("  Type: {}\n", container.usage_context.join(", ")));
        }
        Ok(ToolOutcome::success(output.join("\n")))
    }

    async fn get_container(&self, token: &AccessToken, args: &ToolArgs) -> Result<ToolOutcome, ApiError> {
        if let Some(missing) = require(args, &["accountId", "containerId"]) {
            return Ok(missing);
        }
        let path = container_path(args);

        let container = match self.api.get_container(token, &path).await {
            Ok(container) => container,
            Err(e) if e.is_not_found() => {
                return Ok(ToolOutcome::failure(format!(
                    "Container not found: {}/{}",
                    path.account_id, path.container_id
                )))
            }
            Err(e) => return Err(e),
        };

        Ok(ToolOutcome::success(container_details(&container)))
    }

    async fn create_container(
        &self,
        token: &AccessToken,
        args: &ToolArgs,
    ) -> Result<ToolOutcome, ApiError> {
        if let Some(missing) = require(args, &["accountId", "containerName"]) {
            return Ok(missing);
        }

        let body = Container {
            name: args.string("containerName"),
            usage_context: args.string_list_or("usageContext", &["web"]),
            ..Default::default()
        };
        let created = self
            .api
            .create_container(token, &args.string("accountId"), &body)
            .await?;

        Ok(ToolOutcome::success(format!(
            "✅ Created container: {} (ID: {})",
            created.name, created.container_id
        )))
    }

    async fn list_tags(&self, token: &AccessToken, args: &ToolArgs) -> Result<ToolOutcome, ApiError> {
        if let Some(missing) = require(args, &["accountId", "containerId"]) {
            return Ok(missing);
        }
        let container = container_path(args);
        let Some(workspace) = self.resolve_workspace(token, &container, args).await? else {
            return Ok(no_workspace(&container));
        };

        let tags = self.api.list_tags(token, &workspace).await?;
        if tags.is_empty() {
            return Ok(ToolOutcome::success(format!(
                "🏷️ No tags found in workspace {}",
                workspace.workspace_id
            )));
        }

        let mut output = vec![format!("🏷️ Tags in Workspace {}:\n", workspace.workspace_id)];
        for tag in tags {
            output.push(format!(
                "• {} (ID: {}, Type: {})",
                display_name(&tag.name),
                tag.tag_id,
                tag.tag_type
            ));
        }
        Ok(ToolOutcome::success(output.join("\n")))
    }

    async fn create_tag(&self, token: &AccessToken, args: &ToolArgs) -> Result<ToolOutcome, ApiError> {
        if let Some(missing) = require(args, &["accountId", "containerId", "tagName", "tagType"]) {
            return Ok(missing);
        }
        let container = container_path(args);
        let Some(workspace) = self.resolve_workspace(token, &container, args).await? else {
            return Ok(no_workspace(&container));
        };

        let body = Tag {
            name: args.string("tagName"),
            tag_type: args.string("tagType"),
            parameter: args.array("parameters"),
            firing_trigger_id: args.string_list("firingTriggerId").unwrap_or_default(),
            ..Default::default()
        };
        let created = self.api.create_tag(token, &workspace, &body).await?;

        Ok(ToolOutcome::success(format!(
            "✅ Created tag: {} (ID: {})",
            created.name, created.tag_id
        )))
    }

    async fn list_triggers(
        &self,
        token: &AccessToken,
        args: &ToolArgs,
    ) -> Result<ToolOutcome, ApiError> {
        if let Some(missing) = require(args, &["accountId", "containerId"]) {
            return Ok(missing);
        }
        let container = container_path(args);
        let Some(workspace) = self.resolve_workspace(token, &container, args).await? else {
            return Ok(no_workspace(&container));
        };

        let triggers = self.api.list_triggers(token, &workspace).await?;
        if triggers.is_empty() {
            return Ok(ToolOutcome::success(format!(
                "⚡ No triggers found in workspace {}",
                workspace.workspace_id
            )));
        }

        let mut output = vec![format!("⚡ Triggers in Workspace {}:\n", workspace.workspace_id)];
        for trigger in triggers {
            output.push(format!(
                "• {} (ID: {}, Type: {})",
                display_name(&trigger.name),
                trigger.trigger_id,
                trigger.trigger_type
            ));
        }
        Ok(ToolOutcome::success(output.join("\n")))
    }

    async fn create_trigger(
        &self,
        token: &AccessToken,
        args: &ToolArgs,
    ) -> Result<ToolOutcome, ApiError> {
        if let Some(missing) =
            require(args, &["accountId", "containerId", "triggerName", "triggerType"])
        {
            return Ok(missing);
        }
        let container = container_path(args);
        let Some(workspace) = self.resolve_workspace(token, &container, args).await? else {
            return Ok(no_workspace(&container));
        };

        let body = Trigger {
            name: args.string("triggerName"),
            trigger_type: args.string("triggerType"),
            filter: args.array("filters"),
            ..Default::default()
        };
        let created = self.api.create_trigger(token, &workspace, &body).await?;

        Ok(ToolOutcome::success(format!(
            "✅ Created trigger: {} (ID: {})",
            created.name, created.trigger_id
        )))
    }

    async fn list_variables(
        &self,
        token: &AccessToken,
        args: &ToolArgs,
    ) -> Result<ToolOutcome, ApiError> {
        if let Some(missing) = require(args, &["accountId", "containerId"]) {
            return Ok(missing);
        }
        let container = container_path(args);
        let Some(workspace) = self.resolve_workspace(token, &container, args).await? else {
            return Ok(no_workspace(&container));
        };

        let variables = self.api.list_variables(token, &workspace).await?;
        if variables.is_empty() {
            return Ok(ToolOutcome::success(format!(
                "📊 No variables found in workspace {}",
                workspace.workspace_id
            )));
        }

        let mut output = vec![format!("📊 Variables in Workspace {}:\n", workspace.workspace_id)];
        for variable in variables {
            output.push(format!(
                "• {} (ID: {}, Type: {})",
                display_name(&variable.name),
                variable.variable_id,
                variable.variable_type
            ));
        }
        Ok(ToolOutcome::success(output.join("\n")))
    }

    async fn create_variable(
        &self,
        token: &AccessToken,
        args: &ToolArgs,
    ) -> Result<ToolOutcome, ApiError> {
        if let Some(missing) =
            require(args, &["accountId", "containerId", "variableName", "variableType"])
        {
            return Ok(missing);
        }
        let container = container_path(args);
        let Some(workspace) = self.resolve_workspace(token, &container, args).await? else {
            return Ok(no_workspace(&container));
        };

        let value = args.string("value");
        let parameter = if value.is_empty() {
            Vec::new()
        } else {
            vec![template_parameter("value", &value)]
        };
        let body = Variable {
            name: args.string("variableName"),
            variable_type: args.string("variableType"),
            parameter,
            ..Default::default()
        };
        let created = self.api.create_variable(token, &workspace, &body).await?;

        Ok(ToolOutcome::success(format!(
            "✅ Created variable: {} (ID: {})",
            created.name, created.variable_id
        )))
    }

    async fn create_version(
        &self,
        token: &AccessToken,
        args: &ToolArgs,
    ) -> Result<ToolOutcome, ApiError> {
        if let Some(missing) = require(args, &["accountId", "containerId"]) {
            return Ok(missing);
        }
        let container = container_path(args);
        let Some(workspace) = self.resolve_workspace(token, &container, args).await? else {
            return Ok(no_workspace(&container));
        };

        let draft = VersionDraft {
            name: args.string("versionName"),
            notes: args.string("versionNotes"),
        };
        let version = self.api.create_version(token, &workspace, &draft).await?;

        Ok(ToolOutcome::success(format!(
            "✅ Created version: {} (ID: {})",
            version.name, version.container_version_id
        )))
    }

    async fn publish_version(
        &self,
        token: &AccessToken,
        args: &ToolArgs,
    ) -> Result<ToolOutcome, ApiError> {
        if let Some(missing) = require(args, &["accountId", "containerId", "versionId"]) {
            return Ok(missing);
        }
        let container = container_path(args);

        let published = self
            .api
            .publish_version(token, &container, &args.string("versionId"))
            .await?;

        Ok(ToolOutcome::success(format!(
            "✅ Published version to production: {}",
            published.name
        )))
    }

    /// Creates a GA4 tag that fires on the first pageview trigger of the workspace.
    async fn link_ga4(&self, token: &AccessToken, args: &ToolArgs) -> Result<ToolOutcome, ApiError> {
        if let Some(missing) = require(args, &["accountId", "containerId", "measurementId"]) {
            return Ok(missing);
        }
        let container = container_path(args);
        let Some(workspace) = self.resolve_workspace(token, &container, args).await? else {
            return Ok(no_workspace(&container));
        };

        let triggers = self.api.list_triggers(token, &workspace).await?;
        let Some(all_pages) = triggers
            .into_iter()
            .find(|t| t.trigger_type == "pageview" && !t.trigger_id.is_empty())
        else {
            return Ok(ToolOutcome::failure(
                "Could not find 'All Pages' trigger. Create a pageview trigger first.",
            ));
        };

        let body = Tag {
            name: "GA4 Configuration".to_string(),
            tag_type: "gaawe".to_string(),
            parameter: vec![template_parameter(
                "measurementId",
                &args.string("measurementId"),
            )],
            firing_trigger_id: vec![all_pages.trigger_id],
            ..Default::default()
        };
        let created = self.api.create_tag(token, &workspace, &body).await?;

        Ok(ToolOutcome::success(format!(
            "✅ Created GA4 configuration tag: {} (ID: {})\n\nGA4 is now linked to GTM. Create a version and publish to make it live.",
            created.name, created.tag_id
        )))
    }
}

#[async_trait]
impl<C, A> ToolHandler for TagManagerService<C, A>
where
    C: TagManagerApi,
    A: ExternalAuth,
{
    fn definition(&self) -> CloudTool {
        tool()
    }

    async fn called_by_model(&self, call: &ToolCall, model_args: Option<&Value>) -> ToolOutcome {
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

        let Some(operation) = GtmOperation::parse(&op) else {
            return unknown_operation(TOOL_NAME, &op);
        };

        if !call.confirmed_by_human {
            if let Some(confirmation) = operation.confirmation_request(&args) {
                tracing::info!(tool = TOOL_NAME, op = %op, "Waiting for human confirmation");
                return confirmation;
            }
        }

        match self.run(operation, &token, &args).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_auth_failure() => {
                tracing::warn!(tool = TOOL_NAME, op = %op, status = ?e.status(), "Token rejected, clearing session");
                self.session
                    .reauthorization_prompt(SERVICE_LABEL, e.status().unwrap_or_default())
                    .await
            }
            Err(e) => {
                let message = format!("{} API error: {}", SERVICE_LABEL, e);
                tracing::error!(tool = TOOL_NAME, op = %op, "{}", message);
                ToolOutcome::failure(message)
            }
        }
    }
}

fn container_path(args: &ToolArgs) -> ContainerPath {
    ContainerPath::new(args.string("accountId"), args.string("containerId"))
}

fn no_workspace(container: &ContainerPath) -> ToolOutcome {
    ToolOutcome::failure(format!(
        "No workspaces found in container {}/{}",
        container.account_id, container.container_id
    ))
}

fn display_name(name: &str) -> &str {
    if name.is_empty() {
        "Unknown"
    } else {
        name
    }
}

fn template_parameter(key: &str, value: &str) -> Value {
    json!({"key": key, "type": "template", "value": value})
}

/// Container summary plus the two install snippets for the site owner.
fn container_details(container: &Container) -> String {
    let public_id = &container.public_id;
    let lines = [
        "📦 Container Details:\n".to_string(),
        format!("Name: {}", display_name(&container.name)),
        format!("Container ID: {}", container.container_id),
        format!("Public ID: {}", public_id),
        format!("Usage Context: {}", container.usage_context.join(", ")),
        format!(
            "Time Zone: {}",
            container.time_zone_id.as_deref().unwrap_or("Unknown")
        ),
        "\n🔧 Container Snippet Code:".to_string(),
        "\nAdd this to your website's <head> section:".to_string(),
        "```html".to_string(),
        "<!-- Google Tag Manager -->".to_string(),
        "<script>(function(w,d,s,l,i){w[l]=w[l]||[];w[l].push({'gtm.start':".to_string(),
        "new Date().getTime(),event:'gtm.js'});var f=d.getElementsByTagName(s)[0],".to_string(),
        "j=d.createElement(s),dl=l!='dataLayer'?'&l='+l:'';j.async=true;j.src=".to_string(),
        "'https://www.googletagmanager.com/gtm.js?id='+i+dl;f.parentNode.insertBefore(j,f);"
            .to_string(),
        format!(
            "}})(window,document,'script','dataLayer','{}');</script>",
            public_id
        ),
        "<!-- End Google Tag Manager -->".to_string(),
        "```".to_string(),
        "\nAdd this immediately after opening <body> tag:".to_string(),
        "```html".to_string(),
        "<!-- Google Tag Manager (noscript) -->".to_string(),
        format!(
            "<noscript><iframe src=\"https://www.googletagmanager.com/ns.html?id={}\"",
            public_id
        ),
        "height=\"0\" width=\"0\" style=\"display:none;visibility:hidden\"></iframe></noscript>"
            .to_string(),
        "<!-- End Google Tag Manager (noscript) -->".to_string(),
        "```".to_string(),
    ];
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::tests::StubAuth;
    use crate::core::auth::AuthIdentity;
    use crate::core::tag_manager::tag_manager_models::{Account, ContainerVersion, Workspace};
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex};

    /// Records every API call by name and serves canned data.
    #[derive(Default)]
    struct RecordingApi {
        calls: Arc<Mutex<Vec<String>>>,
        workspaces: Vec<Workspace>,
        triggers: Vec<Trigger>,
        created_tags: Arc<Mutex<Vec<Tag>>>,
        container: Option<Container>,
        fail_with: Option<u16>,
    }

    impl RecordingApi {
        fn record(&self, name: &str) -> Result<(), ApiError> {
            self.calls.lock().unwrap().push(name.to_string());
            match self.fail_with {
                Some(status) => Err(ApiError::Status {
                    status,
                    message: "stub failure".to_string(),
                }),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl TagManagerApi for RecordingApi {
        async fn list_accounts(&self, _token: &AccessToken) -> Result<Vec<Account>, ApiError> {
            self.record("list_accounts")?;
            Ok(vec![Account {
                account_id: "123456".to_string(),
                name: "Acme".to_string(),
            }])
        }

        async fn list_containers(
            &self,
            _token: &AccessToken,
            _account_id: &str,
        ) -> Result<Vec<Container>, ApiError> {
            self.record("list_containers")?;
            Ok(Vec::new())
        }

        async fn get_container(
            &self,
            _token: &AccessToken,
            _path: &ContainerPath,
        ) -> Result<Container, ApiError> {
            self.record("get_container")?;
            self.container.clone().ok_or(ApiError::Status {
                status: 404,
                message: "not found".to_string(),
            })
        }

        async fn create_container(
            &self,
            _token: &AccessToken,
            _account_id: &str,
            container: &Container,
        ) -> Result<Container, ApiError> {
            self.record("create_container")?;
            Ok(Container {
                container_id: "789".to_string(),
                ..container.clone()
            })
        }

        async fn list_workspaces(
            &self,
            _token: &AccessToken,
            _path: &ContainerPath,
        ) -> Result<Vec<Workspace>, ApiError> {
            self.record("list_workspaces")?;
            Ok(self.workspaces.clone())
        }

        async fn list_tags(
            &self,
            _token: &AccessToken,
            _path: &WorkspacePath,
        ) -> Result<Vec<Tag>, ApiError> {
            self.record("list_tags")?;
            Ok(vec![Tag {
                tag_id: "1".to_string(),
                name: "Pageview".to_string(),
                tag_type: "gaawe".to_string(),
                ..Default::default()
            }])
        }

        async fn create_tag(
            &self,
            _token: &AccessToken,
            path: &WorkspacePath,
            tag: &Tag,
        ) -> Result<Tag, ApiError> {
            self.record(&format!("create_tag:{}", path.workspace_id))?;
            self.created_tags.lock().unwrap().push(tag.clone());
            Ok(Tag {
                tag_id: "42".to_string(),
                ..tag.clone()
            })
        }

        async fn list_triggers(
            &self,
            _token: &AccessToken,
            _path: &WorkspacePath,
        ) -> Result<Vec<Trigger>, ApiError> {
            self.record("list_triggers")?;
            Ok(self.triggers.clone())
        }

        async fn create_trigger(
            &self,
            _token: &AccessToken,
            _path: &WorkspacePath,
            trigger: &Trigger,
        ) -> Result<Trigger, ApiError> {
            self.record("create_trigger")?;
            Ok(trigger.clone())
        }

        async fn list_variables(
            &self,
            _token: &AccessToken,
            _path: &WorkspacePath,
        ) -> Result<Vec<Variable>, ApiError> {
            self.record("list_variables")?;
            Ok(Vec::new())
        }

        async fn create_variable(
            &self,
            _token: &AccessToken,
            _path: &WorkspacePath,
            variable: &Variable,
        ) -> Result<Variable, ApiError> {
            self.record("create_variable")?;
            Ok(variable.clone())
        }

        async fn create_version(
            &self,
            _token: &AccessToken,
            _path: &WorkspacePath,
            draft: &VersionDraft,
        ) -> Result<ContainerVersion, ApiError> {
            self.record("create_version")?;
            Ok(ContainerVersion {
                container_version_id: "5".to_string(),
                name: draft.name.clone(),
            })
        }

        async fn publish_version(
            &self,
            _token: &AccessToken,
            _path: &ContainerPath,
            version_id: &str,
        ) -> Result<ContainerVersion, ApiError> {
            self.record("publish_version")?;
            Ok(ContainerVersion {
                container_version_id: version_id.to_string(),
                name: "Initial Setup".to_string(),
            })
        }
    }

    fn service(
        api: RecordingApi,
        auth: Arc<StubAuth>,
    ) -> TagManagerService<RecordingApi, Arc<StubAuth>> {
        TagManagerService::new(
            api,
            GoogleSession::new(auth, AuthIdentity::new("ws1", "user1"), REQUIRED_SCOPES),
        )
    }

    fn default_workspace() -> Vec<Workspace> {
        vec![Workspace {
            workspace_id: "10".to_string(),
            name: "Default Workspace".to_string(),
        }]
    }

    #[tokio::test]
    async fn test_help_for_missing_or_empty_args() {
        let svc = service(RecordingApi::default(), Arc::new(StubAuth::authorized()));
        let call = ToolCall::new("c1");

        assert_eq!(svc.called_by_model(&call, None).await, ToolOutcome::success(HELP));
        assert_eq!(
            svc.called_by_model(&call, Some(&json!({}))).await,
            ToolOutcome::success(HELP)
        );
        assert_eq!(
            svc.called_by_model(&call, Some(&json!({"op": "help"}))).await,
            ToolOutcome::success(HELP)
        );
    }

    #[tokio::test]
    async fn test_unknown_operation_points_to_help() {
        let svc = service(RecordingApi::default(), Arc::new(StubAuth::authorized()));
        let outcome = svc
            .called_by_model(&ToolCall::new("c1"), Some(&json!({"op": "deleteEverything"})))
            .await;

        assert_eq!(
            outcome.text(),
            "❌ Unknown operation: deleteEverything\n\nTry google_tag_manager(op='help') for usage."
        );
    }

    #[tokio::test]
    async fn test_mutating_ops_need_confirmation_without_api_calls() {
        let api = RecordingApi {
            workspaces: default_workspace(),
            ..Default::default()
        };
        let calls = Arc::clone(&api.calls);
        let svc = service(api, Arc::new(StubAuth::authorized()));
        let call = ToolCall::new("c1");

        let mutating = GtmOperation::ALL
            .into_iter()
            .filter(|o| o.confirmation_request(&ToolArgs::default()).is_some());
        for operation in mutating {
            let outcome = svc
                .called_by_model(
                    &call,
                    Some(&json!({
                        "op": operation.as_str(),
                        "args": {"accountId": "1", "containerId": "2", "versionId": "5"}
                    })),
                )
                .await;
            let request = outcome
                .confirmation()
                .unwrap_or_else(|| panic!("{} did not ask for confirmation", operation.as_str()));
            let expected_key = if operation == GtmOperation::PublishVersion {
                "gtm_publish"
            } else {
                "gtm_write"
            };
            assert_eq!(request.setup_key, expected_key);
        }

        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_confirmation_wording() {
        let svc = service(RecordingApi::default(), Arc::new(StubAuth::authorized()));
        let outcome = svc
            .called_by_model(
                &ToolCall::new("c1"),
                Some(&json!({"op": "publishVersion", "args": {"versionId": "5"}})),
            )
            .await;

        let request = outcome.confirmation().unwrap();
        assert_eq!(request.command, "publish version 5");
        assert_eq!(
            request.explanation,
            "This will publish the container version to PRODUCTION"
        );
    }

    #[tokio::test]
    async fn test_missing_workspace_lists_once() {
        let api = RecordingApi {
            workspaces: default_workspace(),
            ..Default::default()
        };
        let calls = Arc::clone(&api.calls);
        let svc = service(api, Arc::new(StubAuth::authorized()));

        let outcome = svc
            .called_by_model(
                &ToolCall::new("c1"),
                Some(&json!({"op": "listTags", "args": {"accountId": "1", "containerId": "2"}})),
            )
            .await;

        assert!(outcome.text().starts_with("🏷️ Tags in Workspace 10:\n"));
        assert_eq!(*calls.lock().unwrap(), vec!["list_workspaces", "list_tags"]);
    }

    #[tokio::test]
    async fn test_empty_workspace_list_is_a_failure() {
        let api = RecordingApi::default();
        let calls = Arc::clone(&api.calls);
        let svc = service(api, Arc::new(StubAuth::authorized()));

        let outcome = svc
            .called_by_model(
                &ToolCall::new("c1"),
                Some(&json!({"op": "listVariables", "args": {"accountId": "1", "containerId": "2"}})),
            )
            .await;

        assert!(outcome.is_failure());
        assert_eq!(*calls.lock().unwrap(), vec!["list_workspaces"]);
    }

    #[tokio::test]
    async fn test_forbidden_clears_session() {
        let api = RecordingApi {
            fail_with: Some(403),
            ..Default::default()
        };
        let auth = Arc::new(StubAuth::authorized());
        let svc = service(api, Arc::clone(&auth));
        let args = json!({"op": "listAccounts", "args": {"x": 1}});

        let outcome = svc.called_by_model(&ToolCall::new("c1"), Some(&args)).await;
        assert!(outcome
            .text()
            .starts_with("❌ Google Tag Manager authentication error: 403\n\nPlease authorize at:\n"));
        assert_eq!(auth.lookups.load(Ordering::SeqCst), 1);

        svc.called_by_model(&ToolCall::new("c2"), Some(&args)).await;
        assert_eq!(auth.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let api = RecordingApi {
            fail_with: Some(500),
            ..Default::default()
        };
        let svc = service(api, Arc::new(StubAuth::authorized()));

        let outcome = svc
            .called_by_model(&ToolCall::new("c1"), Some(&json!({"op": "listAccounts"})))
            .await;
        assert_eq!(
            outcome.text(),
            "❌ Google Tag Manager API error: 500 - stub failure"
        );
    }

    #[tokio::test]
    async fn test_unauthenticated_operation_is_not_attempted() {
        let api = RecordingApi::default();
        let calls = Arc::clone(&api.calls);
        let svc = service(api, Arc::new(StubAuth::unauthorized()));

        let outcome = svc
            .called_by_model(&ToolCall::new("c1"), Some(&json!({"op": "listAccounts"})))
            .await;

        assert!(outcome.text().starts_with("❌ Not authenticated."));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_shows_identity() {
        let svc = service(RecordingApi::default(), Arc::new(StubAuth::authorized()));
        let outcome = svc
            .called_by_model(&ToolCall::new("c1"), Some(&json!({"op": "status"})))
            .await;

        assert_eq!(
            outcome.text(),
            "Google Tag Manager integration status:\n  Authenticated: ✅ Yes\n  User: user1\n  Workspace: ws1\n"
        );
    }

    #[tokio::test]
    async fn test_get_container_snippets_include_public_id() {
        let api = RecordingApi {
            container: Some(Container {
                container_id: "789".to_string(),
                name: "My Website".to_string(),
                public_id: "GTM-XXXX".to_string(),
                usage_context: vec!["web".to_string()],
                ..Default::default()
            }),
            ..Default::default()
        };
        let svc = service(api, Arc::new(StubAuth::authorized()));

        let text = svc
            .called_by_model(
                &ToolCall::new("c1"),
                Some(&json!({"op": "getContainer", "args": {"accountId": "1", "containerId": "789"}})),
            )
            .await
            .text();

        assert!(text.contains("})(window,document,'script','dataLayer','GTM-XXXX');</script>"));
        assert!(text.contains("<noscript><iframe src=\"https://www.googletagmanager.com/ns.html?id=GTM-XXXX\""));
        assert!(text.contains("Time Zone: Unknown"));
    }

    #[tokio::test]
    async fn test_get_container_not_found() {
        let svc = service(RecordingApi::default(), Arc::new(StubAuth::authorized()));
        let outcome = svc
            .called_by_model(
                &ToolCall::new("c1"),
                Some(&json!({"op": "getContainer", "args": {"accountId": "1", "containerId": "2"}})),
            )
            .await;

        assert_eq!(outcome.text(), "❌ Container not found: 1/2");
    }

    #[tokio::test]
    async fn test_missing_parameters_reported_after_confirmation() {
        let svc = service(RecordingApi::default(), Arc::new(StubAuth::authorized()));
        let outcome = svc
            .called_by_model(
                &ToolCall::new("c1").confirmed(),
                Some(&json!({"op": "createTag", "args": {"accountId": "1"}})),
            )
            .await;

        assert_eq!(
            outcome.text(),
            "❌ Missing required parameters: 'accountId', 'containerId', 'tagName', 'tagType'"
        );
    }

    #[tokio::test]
    async fn test_link_ga4_uses_pageview_trigger() {
        let api = RecordingApi {
            workspaces: default_workspace(),
            triggers: vec![
                Trigger {
                    trigger_id: "3".to_string(),
                    name: "Form".to_string(),
                    trigger_type: "formSubmission".to_string(),
                    ..Default::default()
                },
                Trigger {
                    trigger_id: "7".to_string(),
                    name: "All Pages".to_string(),
                    trigger_type: "pageview".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let calls = Arc::clone(&api.calls);
        let created_tags = Arc::clone(&api.created_tags);
        let svc = service(api, Arc::new(StubAuth::authorized()));

        let outcome = svc
            .called_by_model(
                &ToolCall::new("c1").confirmed(),
                Some(&json!({"op": "linkGA4", "args": {
                    "accountId": "1", "containerId": "2", "measurementId": "G-ABC"
                }})),
            )
            .await;

        assert!(outcome
            .text()
            .starts_with("✅ Created GA4 configuration tag: GA4 Configuration (ID: 42)"));
        let created = created_tags.lock().unwrap();
        assert_eq!(created[0].firing_trigger_id, vec!["7".to_string()]);
        assert_eq!(created[0].parameter[0]["value"], "G-ABC");
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["list_workspaces", "list_triggers", "create_tag:10"]
        );
    }

    #[tokio::test]
    async fn test_link_ga4_without_pageview_trigger() {
        let api = RecordingApi {
            workspaces: default_workspace(),
            ..Default::default()
        };
        let svc = service(api, Arc::new(StubAuth::authorized()));

        let outcome = svc
            .called_by_model(
                &ToolCall::new("c1").confirmed(),
                Some(&json!({"op": "linkGA4", "args": {
                    "accountId": "1", "containerId": "2", "workspaceId": "10", "measurementId": "G-ABC"
                }})),
            )
            .await;

        assert_eq!(
            outcome.text(),
            "❌ Could not find 'All Pages' trigger. Create a pageview trigger first."
        );
    }

    #[tokio::test]
    async fn test_setup_defaults_fill_container() {
        let api = RecordingApi {
            workspaces: default_workspace(),
            ..Default::default()
        };
        let calls = Arc::clone(&api.calls);
        let svc = service(api, Arc::new(StubAuth::authorized())).with_defaults(
            ArgDefaults::default()
                .with("accountId", Some("1".to_string()))
                .with("containerId", Some("2".to_string())),
        );

        let outcome = svc
            .called_by_model(&ToolCall::new("c1"), Some(&json!({"op": "listTriggers"})))
            .await;

        assert_eq!(outcome.text(), "⚡ No triggers found in workspace 10");
        assert_eq!(*calls.lock().unwrap(), vec!["list_workspaces", "list_triggers"]);
    }

    #[test]
    fn test_setup_schema_has_two_fields() {
        let schema = setup_schema();
        assert_eq!(schema.len(), 2);
        assert!(schema.iter().all(|f| f.bs_type == "string_short"));
    }

    #[test]
    fn test_scopes_cover_tag_manager() {
        assert!(REQUIRED_SCOPES.iter().all(|s| s.contains("tagmanager")));
    }
}
