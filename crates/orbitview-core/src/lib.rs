//! orbitview core - viewport lifecycle, scene graph, camera and controls
//!
//! This crate is platform independent. The browser backend lives in
//! `orbitview-web`; [`host::ManualHost`] drives a viewport without one.

pub mod camera;
pub mod config;
pub mod controls;
pub mod error;
pub mod host;
pub mod renderer;
pub mod scene;
pub mod viewport;

// Re-export commonly used types
pub use camera::PerspectiveCamera;
pub use config::{load_config, ViewportConfig};
pub use controls::{ControlInput, Controls, InputQueue, OrbitControls};
pub use error::{RenderError, Result, ViewportError};
pub use host::{FrameRequestId, Host, ListenerId, ManualHost};
pub use renderer::{HeadlessRenderer, Renderer, RendererSettings, ShadowMapKind, ShadowMapSettings, Size};
pub use scene::{LineSegment, Node, NodeId, NodeKind, Scene};
pub use viewport::{Acquired, InstanceId, Viewport};
