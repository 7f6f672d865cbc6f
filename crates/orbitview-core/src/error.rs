//! Error types for viewport construction and rendering

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewportError {
    #[error("Host environment unavailable: {0}")]
    HostUnavailable(String),
    #[error("Failed to create renderer: {0}")]
    RendererInit(String),
    #[error("Failed to parse config: {0}")]
    Config(#[from] toml::de::Error),
    #[error("Failed to parse JSON config: {0}")]
    ConfigJson(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single frame. The render loop logs it and keeps running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Rendering context lost")]
    ContextLost,
    #[error("Renderer has been disposed")]
    Disposed,
    #[error("Backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, ViewportError>;
