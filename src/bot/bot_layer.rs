// Bot layer - host-facing surface: configuration, tool routing, stdio bridge
// and the install manifest.

#[path = "bot_config.rs"]
pub mod config;

#[path = "tool_registry.rs"]
pub mod registry;

#[path = "stdio_bridge.rs"]
pub mod bridge;

#[path = "install.rs"]
pub mod install;

pub use bridge::StdioBridge;
pub use config::{BotConfig, GoogleCredentials};
pub use registry::ToolRegistry;
