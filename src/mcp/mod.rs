pub mod gateway;
pub mod session;
pub mod types;

pub use gateway::{HttpGateway, ToolGateway};
pub use session::McpSession;
pub use types::{McpTool, McpToolResult, ToolContent};
