use async_trait::async_trait;

use crate::core::auth::AccessToken;
use crate::core::tooling::ApiError;

use super::tag_manager_models::{
    Account, Container, ContainerPath, ContainerVersion, Tag, Trigger, Variable, VersionDraft,
    Workspace, WorkspacePath,
};

/// Tag Manager v2 calls the service needs. Every call carries the caller's token.
#[async_trait]
pub trait TagManagerApi: Send + Sync {
    async fn list_accounts(&self, token: &AccessToken) -> Result<Vec<Account>, ApiError>;

    async fn list_containers(
        &self,
        token: &AccessToken,
        account_id: &str,
    ) -> Result<Vec<Container>, ApiError>;

    async fn get_container(
        &self,
        token: &AccessToken,
        path: &ContainerPath,
    ) -> Result<Container, ApiError>;

    async fn create_container(
        &self,
        token: &AccessToken,
        account_id: &str,
        container: &Container,
    ) -> Result<Container, ApiError>;

    async fn list_workspaces(
        &self,
        token: &AccessToken,
        path: &ContainerPath,
    ) -> Result<Vec<Workspace>, ApiError>;

    async fn list_tags(&self, token: &AccessToken, path: &WorkspacePath)
        -> Result<Vec<Tag>, ApiError>;

    async fn create_tag(
        &self,
        token: &AccessToken,
        path: &WorkspacePath,
        tag: &Tag,
    ) -> Result<Tag, ApiError>;

    async fn list_triggers(
        &self,
        token: &AccessToken,
        path: &WorkspacePath,
    ) -> Result<Vec<Trigger>, ApiError>;

    async fn create_trigger(
        &self,
        token: &AccessToken,
        path: &WorkspacePath,
        trigger: &Trigger,
    ) -> Result<Trigger, ApiError>;

    async fn list_variables(
        &self,
        token: &AccessToken,
        path: &WorkspacePath,
    ) -> Result<Vec<Variable>, ApiError>;

    async fn create_variable(
        &self,
        token: &AccessToken,
        path: &WorkspacePath,
        variable: &Variable,
    ) -> Result<Variable, ApiError>;

    async fn create_version(
        &self,
        token: &AccessToken,
        path: &WorkspacePath,
        draft: &VersionDraft,
    ) -> Result<ContainerVersion, ApiError>;

    async fn publish_version(
        &self,
        token: &AccessToken,
        path: &ContainerPath,
        version_id: &str,
    ) -> Result<ContainerVersion, ApiError>;
}
