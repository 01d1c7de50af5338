pub mod tag_manager_api;
pub mod tag_manager_help;
pub mod tag_manager_models;
pub mod tag_manager_service;

pub use tag_manager_api::TagManagerApi;
pub use tag_manager_models::{
    Account, Container, ContainerPath, ContainerVersion, Tag, Trigger, Variable, VersionDraft,
    Workspace, WorkspacePath,
};
pub use tag_manager_service::TagManagerService;
