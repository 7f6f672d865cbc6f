//! Renderer abstraction and the headless renderer

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

use crate::camera::PerspectiveCamera;
use crate::error::RenderError;
use crate::scene::Scene;

/// Pixel dimensions of a container or output surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height. A zero height yields a non-finite ratio.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Shadow filtering modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadowMapKind {
    Basic,
    Pcf,
    #[default]
    PcfSoft,
    Vsm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowMapSettings {
    pub enabled: bool,
    pub kind: ShadowMapKind,
}

impl Default for ShadowMapSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            kind: ShadowMapKind::PcfSoft,
        }
    }
}

/// Parameters for creating a renderer
#[derive(Debug, Clone, PartialEq)]
pub struct RendererSettings {
    pub size: Size,
    pub shadow_map: ShadowMapSettings,
    pub clear_color: [f32; 4],
}

/// A surface the scene is drawn onto
pub trait Renderer {
    fn size(&self) -> Size;

    fn set_size(&mut self, size: Size);

    fn shadow_map(&self) -> ShadowMapSettings;

    fn set_shadow_map(&mut self, settings: ShadowMapSettings);

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), RenderError>;

    /// Release backend resources. Rendering afterwards fails with
    /// [`RenderError::Disposed`].
    fn dispose(&mut self);
}

/// Observable state of a [`HeadlessRenderer`], shared with whoever created it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderStats {
    pub frames: u64,
    pub size: Size,
    pub shadow_map: ShadowMapSettings,
    pub disposed: bool,
    /// Segment count of the most recent frame
    pub last_segment_count: usize,
    /// Camera aspect seen by the most recent frame
    pub last_aspect: Option<f32>,
}

/// Renderer without an output device. It records what it was asked to do.
#[derive(Debug, Clone)]
pub struct HeadlessRenderer {
    stats: Rc<RefCell<RenderStats>>,
}

impl HeadlessRenderer {
    pub fn new(settings: &RendererSettings) -> Self {
        let stats = RenderStats {
            size: settings.size,
            shadow_map: settings.shadow_map,
            ..Default::default()
        };
        Self {
            stats: Rc::new(RefCell::new(stats)),
        }
    }

    /// Handle to the live statistics
    pub fn stats(&self) -> Rc<RefCell<RenderStats>> {
        Rc::clone(&self.stats)
    }
}

impl Renderer for HeadlessRenderer {
    fn size(&self) -> Size {
        self.stats.borrow().size
    }

    fn set_size(&mut self, size: Size) {
        self.stats.borrow_mut().size = size;
    }

    fn shadow_map(&self) -> ShadowMapSettings {
        self.stats.borrow().shadow_map
    }

    fn set_shadow_map(&mut self, settings: ShadowMapSettings) {
        self.stats.borrow_mut().shadow_map = settings;
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), RenderError> {
        let mut stats = self.stats.borrow_mut();
        if stats.disposed {
            return Err(RenderError::Disposed);
        }
        stats.frames += 1;
        stats.last_segment_count = scene.line_segments().len();
        stats.last_aspect = Some(camera.aspect);
        Ok(())
    }

    fn dispose(&mut self) {
        self.stats.borrow_mut().disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Node;

    fn settings(width: u32, height: u32) -> RendererSettings {
        RendererSettings {
            size: Size::new(width, height),
            shadow_map: ShadowMapSettings::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    #[test]
    fn test_size_aspect() {
        assert_eq!(Size::new(800, 600).aspect(), 800.0 / 600.0);
        assert!(!Size::new(0, 0).aspect().is_finite());
    }

    #[test]
    fn test_headless_counts_frames() {
        let mut renderer = HeadlessRenderer::new(&settings(800, 600));
        let mut scene = Scene::new();
        scene.add(Node::axes_helper(10.0));
        let camera = PerspectiveCamera::new(75.0, 800.0 / 600.0, 1.0, 1000.0);

        renderer.render(&scene, &camera).unwrap();
        renderer.render(&scene, &camera).unwrap();

        let stats = renderer.stats();
        let stats = stats.borrow();
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.last_segment_count, 3);
        assert_eq!(stats.size, Size::new(800, 600));
    }

    #[test]
    fn test_headless_render_after_dispose_fails() {
        let mut renderer = HeadlessRenderer::new(&settings(10, 10));
        renderer.dispose();
        let camera = PerspectiveCamera::new(75.0, 1.0, 1.0, 1000.0);
        assert_eq!(
            renderer.render(&Scene::new(), &camera),
            Err(RenderError::Disposed)
        );
    }

    #[test]
    fn test_shadow_map_default_is_soft() {
        let settings = ShadowMapSettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.kind, ShadowMapKind::PcfSoft);
    }
}
