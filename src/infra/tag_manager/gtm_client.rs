use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::core::auth::AccessToken;
use crate::core::tag_manager::{
    Account, Container, ContainerPath, ContainerVersion, Tag, TagManagerApi, Trigger, Variable,
    VersionDraft, Workspace, WorkspacePath,
};
use crate::core::tooling::ApiError;
use crate::infra::google::{decode, http_client, send};

const GTM_BASE_URL: &str = "https://tagmanager.googleapis.com/tagmanager/v2";

/// Tag Manager v2 REST client. Holds no credentials; each call brings its own token.
pub struct GtmApiClient {
    client: Client,
    base_url: String,
}

impl GtmApiClient {
    pub fn new() -> Result<Self, ApiError> {
        Ok(Self {
            client: http_client()?,
            base_url: GTM_BASE_URL.to_string(),
        })
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/{}", self.base_url, resource)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        token: &AccessToken,
        resource: &str,
    ) -> Result<T, ApiError> {
        tracing::debug!(resource, "GTM GET");
        let resp = send(self.client.get(self.url(resource)), token).await?;
        decode(resp).await
    }

    async fn post<B: serde::Serialize + ?Sized, T: serde::de::DeserializeOwned>(
        &self,
        token: &AccessToken,
        resource: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        tracing::debug!(resource, "GTM POST");
        let resp = send(self.client.post(self.url(resource)).json(body), token).await?;
        decode(resp).await
    }
}

// List endpoints wrap results in a field named after the resource and omit it
// entirely when there is nothing to list.
#[derive(Debug, Deserialize)]
struct AccountList {
    #[serde(default)]
    account: Vec<Account>,
}

#[derive(Debug, Deserialize)]
struct ContainerList {
    #[serde(default)]
    container: Vec<Container>,
}

#[derive(Debug, Deserialize)]
struct WorkspaceList {
    #[serde(default)]
    workspace: Vec<Workspace>,
}

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tag: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
struct TriggerList {
    #[serde(default)]
    trigger: Vec<Trigger>,
}

#[derive(Debug, Deserialize)]
struct VariableList {
    #[serde(default)]
    variable: Vec<Variable>,
}

/// `create_version` and `publish` both answer with the version wrapped.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionResponse {
    #[serde(default)]
    container_version: ContainerVersion,
}

#[async_trait]
impl TagManagerApi for GtmApiClient {
    async fn list_accounts(&self, token: &AccessToken) -> Result<Vec<Account>, ApiError> {
        let list: AccountList = self.get(token, "accounts").await?;
        Ok(list.account)
    }

    async fn list_containers(
        &self,
        token: &AccessToken,
        account_id: &str,
    ) -> Result<Vec<Container>, ApiError> {
        let list: ContainerList = self
            .get(token, &format!("accounts/{}/containers", account_id))
            .await?;
        Ok(list.container)
    }

    async fn get_container(
        &self,
        token: &AccessToken,
        path: &ContainerPath,
    ) -> Result<Container, ApiError> {
        self.get(token, &path.resource()).await
    }

    async fn create_container(
        &self,
        token: &AccessToken,
        account_id: &str,
        container: &Container,
    ) -> Result<Container, ApiError> {
        self.post(token, &format!("accounts/{}/containers", account_id), container)
            .await
    }

    async fn list_workspaces(
        &self,
        token: &AccessToken,
        path: &ContainerPath,
    ) -> Result<Vec<Workspace>, ApiError> {
        let list: WorkspaceList = self
            .get(token, &format!("{}/workspaces", path.resource()))
            .await?;
        Ok(list.workspace)
    }

    async fn list_tags(&self, token: &AccessToken, path: &WorkspacePath) -> Result<Vec<Tag>, ApiError> {
        let list: TagList = self
            .get(token, &format!("{}/tags", path.resource()))
            .await?;
        Ok(list.tag)
    }

    async fn create_tag(
        &self,
        token: &AccessToken,
        path: &WorkspacePath,
        tag: &Tag,
    ) -> Result<Tag, ApiError> {
        self.post(token, &format!("{}/tags", path.resource()), tag)
            .await
    }

    async fn list_triggers(
        &self,
        token: &AccessToken,
        path: &WorkspacePath,
    ) -> Result<Vec<Trigger>, ApiError> {
        let list: TriggerList = self
            .get(token, &format!("{}/triggers", path.resource()))
            .await?;
        Ok(list.trigger)
    }

    async fn create_trigger(
        &self,
        token: &AccessToken,
        path: &WorkspacePath,
        trigger: &Trigger,
    ) -> Result<Trigger, ApiError> {
        self.post(token, &format!("{}/triggers", path.resource()), trigger)
            .await
    }

    async fn list_variables(
        &self,
        token: &AccessToken,
        path: &WorkspacePath,
    ) -> Result<Vec<Variable>, ApiError> {
        let list: VariableList = self
            .get(token, &format!("{}/variables", path.resource()))
            .await?;
        Ok(list.variable)
    }

    async fn create_variable(
        &self,
        token: &AccessToken,
        path: &WorkspacePath,
        variable: &Variable,
    ) -> Result<Variable, ApiError> {
        self.post(token, &format!("{}/variables", path.resource()), variable)
            .await
    }

    async fn create_version(
        &self,
        token: &AccessToken,
        path: &WorkspacePath,
        draft: &VersionDraft,
    ) -> Result<ContainerVersion, ApiError> {
        let resp: VersionResponse = self
            .post(token, &format!("{}:create_version", path.resource()), draft)
            .await?;
        Ok(resp.container_version)
    }

    async fn publish_version(
        &self,
        token: &AccessToken,
        path: &ContainerPath,
        version_id: &str,
    ) -> Result<ContainerVersion, ApiError> {
        let resp: VersionResponse = self
            .post(token, &format!("{}:publish", path.version(version_id)), &json!({}))
            .await?;
        Ok(resp.container_version)
    }
}
