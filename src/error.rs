use std::fmt;

#[derive(Debug)]
pub enum VoxChatError {
    /// Gateway or inference endpoint unreachable while establishing a session.
    Connection(String),
    ApiError {
        status: u16,
        message: String,
    },
    /// JSON-RPC level failure from the tool gateway.
    Gateway(String),
    /// A single tool invocation failed; recovered inside the turn loop.
    ToolExecution(String),
    NetworkError(reqwest::Error),
    Timeout,
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    YamlError(serde_yaml::Error),
    Other(String),
}

impl fmt::Display for VoxChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoxChatError::Connection(msg) => write!(f, "Connection failed: {}", msg),
            VoxChatError::ApiError { status, message } => {
                write!(f, "API error (status {}): {}", status, message)
            }
            VoxChatError::Gateway(msg) => write!(f, "Gateway error: {}", msg),
            VoxChatError::ToolExecution(msg) => write!(f, "Tool error: {}", msg),
            VoxChatError::NetworkError(e) => write!(f, "Network error: {}", e),
            VoxChatError::Timeout => write!(f, "Request timeout"),
            VoxChatError::IoError(e) => write!(f, "IO error: {}", e),
            VoxChatError::JsonError(e) => write!(f, "JSON error: {}", e),
            VoxChatError::YamlError(e) => write!(f, "YAML error: {}", e),
            VoxChatError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for VoxChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VoxChatError::NetworkError(e) => Some(e),
            VoxChatError::IoError(e) => Some(e),
            VoxChatError::JsonError(e) => Some(e),
            VoxChatError::YamlError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for VoxChatError {
    fn from(err: reqwest::Error) -> Self {
        VoxChatError::NetworkError(err)
    }
}

impl From<std::io::Error> for VoxChatError {
    fn from(err: std::io::Error) -> Self {
        VoxChatError::IoError(err)
    }
}

impl From<serde_json::Error> for VoxChatError {
    fn from(err: serde_json::Error) -> Self {
        VoxChatError::JsonError(err)
    }
}

impl From<serde_yaml::Error> for VoxChatError {
    fn from(err: serde_yaml::Error) -> Self {
        VoxChatError::YamlError(err)
    }
}

impl From<anyhow::Error> for VoxChatError {
    fn from(err: anyhow::Error) -> Self {
        VoxChatError::Other(err.to_string())
    }
}

impl From<String> for VoxChatError {
    fn from(msg: String) -> Self {
        VoxChatError::Other(msg)
    }
}

impl From<&str> for VoxChatError {
    fn from(msg: &str) -> Self {
        VoxChatError::Other(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VoxChatError>;
