//! Viewport configuration loading
//!
//! Every field has a default, so an empty TOML or JSON document yields the
//! stock viewport: 75° camera at (0, 10, 20), soft shadows, a size-10 axes
//! helper and damped orbit controls.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::renderer::{ShadowMapKind, ShadowMapSettings};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ViewportConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub controls: ControlsConfig,
    #[serde(default)]
    pub scene: SceneConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    #[serde(default = "default_fov")]
    pub fov: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    /// Initial camera position; the camera looks at the scene origin
    #[serde(default = "default_camera_position")]
    pub position: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: default_fov(),
            near: default_near(),
            far: default_far(),
            position: default_camera_position(),
        }
    }
}

fn default_fov() -> f32 {
    75.0
}

fn default_near() -> f32 {
    1.0
}

fn default_far() -> f32 {
    1000.0
}

fn default_camera_position() -> [f32; 3] {
    [0.0, 10.0, 20.0]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    #[serde(default)]
    pub shadow_map: ShadowMapConfig,
    /// RGBA clear color, components in 0..=1
    #[serde(default = "default_clear_color")]
    pub clear_color: [f32; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            shadow_map: ShadowMapConfig::default(),
            clear_color: default_clear_color(),
        }
    }
}

fn default_clear_color() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowMapConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub kind: ShadowMapKind,
}

impl Default for ShadowMapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kind: ShadowMapKind::default(),
        }
    }
}

impl From<&ShadowMapConfig> for ShadowMapSettings {
    fn from(config: &ShadowMapConfig) -> Self {
        Self {
            enabled: config.enabled,
            kind: config.kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlsConfig {
    /// Create orbit controls at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub enable_damping: bool,
    #[serde(default = "default_damping_factor")]
    pub damping_factor: f32,
    #[serde(default = "default_true")]
    pub enable_zoom: bool,
    #[serde(default = "default_true")]
    pub enable_pan: bool,
    #[serde(default = "default_speed")]
    pub rotate_speed: f32,
    #[serde(default = "default_speed")]
    pub zoom_speed: f32,
    #[serde(default = "default_speed")]
    pub pan_speed: f32,
    #[serde(default)]
    pub min_distance: f32,
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            enable_damping: true,
            damping_factor: default_damping_factor(),
            enable_zoom: true,
            enable_pan: true,
            rotate_speed: default_speed(),
            zoom_speed: default_speed(),
            pan_speed: default_speed(),
            min_distance: 0.0,
            max_distance: default_max_distance(),
        }
    }
}

fn default_damping_factor() -> f32 {
    0.05
}

fn default_speed() -> f32 {
    1.0
}

fn default_max_distance() -> f32 {
    f32::INFINITY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Size of the axes helper added at construction; 0 disables it
    #[serde(default = "default_axes_size")]
    pub axes_size: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            axes_size: default_axes_size(),
        }
    }
}

fn default_axes_size() -> f32 {
    10.0
}

fn default_true() -> bool {
    true
}

impl ViewportConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

/// Load configuration from a TOML file, falling back to defaults when absent
pub fn load_config(path: &Path) -> Result<ViewportConfig> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config = ViewportConfig::from_toml_str(&content)?;
        info!(path = %path.display(), "Loaded viewport configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Viewport configuration not found, using defaults"
        );
        Ok(ViewportConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_stock_viewport() {
        let config = ViewportConfig::default();
        assert_eq!(config.camera.fov, 75.0);
        assert_eq!(config.camera.near, 1.0);
        assert_eq!(config.camera.far, 1000.0);
        assert_eq!(config.camera.position, [0.0, 10.0, 20.0]);
        assert!(config.renderer.shadow_map.enabled);
        assert_eq!(config.renderer.shadow_map.kind, ShadowMapKind::PcfSoft);
        assert_eq!(config.controls.damping_factor, 0.05);
        assert!(config.controls.enable_damping);
        assert!(config.controls.enable_zoom);
        assert!(config.controls.enable_pan);
        assert_eq!(config.scene.axes_size, 10.0);
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = ViewportConfig::from_toml_str("").unwrap();
        assert_eq!(config, ViewportConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = ViewportConfig::from_toml_str(
            r#"
            [camera]
            fov = 50.0

            [controls]
            enable_pan = false

            [renderer.shadow_map]
            kind = "vsm"
            "#,
        )
        .unwrap();
        assert_eq!(config.camera.fov, 50.0);
        assert_eq!(config.camera.far, 1000.0);
        assert!(!config.controls.enable_pan);
        assert!(config.controls.enable_zoom);
        assert_eq!(config.renderer.shadow_map.kind, ShadowMapKind::Vsm);
        assert!(config.renderer.shadow_map.enabled);
    }

    #[test]
    fn test_json_config() {
        let config =
            ViewportConfig::from_json_str(r#"{"scene": {"axes_size": 0}, "controls": {"enabled": false}}"#)
                .unwrap();
        assert_eq!(config.scene.axes_size, 0.0);
        assert!(!config.controls.enabled);
    }

    #[test]
    fn test_invalid_json_is_error() {
        let err = ViewportConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, crate::ViewportError::ConfigJson(_)));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ViewportConfig::default());
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[camera]\nposition = [1.0, 2.0, 3.0]").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.camera.position, [1.0, 2.0, 3.0]);
    }
}
