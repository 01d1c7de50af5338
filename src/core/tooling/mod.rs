pub mod api_error;
pub mod tool_call;

pub use api_error::ApiError;
pub use tool_call::{
    missing_parameters, require, route_call, unknown_operation, ArgDefaults, CallRoute, CloudTool,
    ConfirmationRequest, ToolArgs, ToolCall, ToolHandler, ToolOutcome,
};
