//! Host environment capabilities
//!
//! A [`Host`] wraps the container element the viewport is bound to together
//! with the environment services the viewport consumes: frame scheduling,
//! window resize notifications and construction of the renderer and
//! controls. The browser implementation lives in `orbitview-web`;
//! [`ManualHost`] is a deterministic in-memory host.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::camera::PerspectiveCamera;
use crate::config::ControlsConfig;
use crate::controls::{Controls, OrbitControls};
use crate::error::{Result, ViewportError};
use crate::renderer::{HeadlessRenderer, RenderStats, Renderer, RendererSettings, Size};

/// Token for a scheduled frame, used to cancel it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameRequestId(pub i32);

/// Token for a resize subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u32);

pub type FrameTask = Box<dyn FnOnce()>;
pub type ResizeHandler = Rc<dyn Fn()>;

pub trait Host {
    /// Current size of the container element
    fn container_size(&self) -> Size;

    /// Create a renderer and append its output surface to the container
    fn create_renderer(&self, settings: &RendererSettings) -> Result<Box<dyn Renderer>>;

    /// Create camera controls wired to the host's input events
    fn create_controls(
        &self,
        config: &ControlsConfig,
        camera: &PerspectiveCamera,
    ) -> Box<dyn Controls> {
        Box::new(OrbitControls::new(camera, config))
    }

    /// Run `task` before the next repaint
    fn request_frame(&self, task: FrameTask) -> FrameRequestId;

    fn cancel_frame(&self, id: FrameRequestId);

    fn subscribe_resize(&self, handler: ResizeHandler) -> ListenerId;

    fn unsubscribe_resize(&self, id: ListenerId);
}

/// Host driven by explicit calls instead of a display and a window
///
/// Frames run only when [`ManualHost::advance_frame`] is called and resize
/// listeners only when [`ManualHost::fire_resize`] is called. Renderers are
/// [`HeadlessRenderer`]s whose statistics stay observable through
/// [`ManualHost::render_stats`]; controls count their disposals.
#[derive(Default)]
pub struct ManualHost {
    size: Cell<Size>,
    fail_renderer: Cell<bool>,
    next_frame: Cell<i32>,
    frames: RefCell<BTreeMap<FrameRequestId, FrameTask>>,
    cancelled: Cell<usize>,
    next_listener: Cell<u32>,
    listeners: RefCell<BTreeMap<ListenerId, ResizeHandler>>,
    surfaces: Cell<usize>,
    stats: RefCell<Option<Rc<RefCell<RenderStats>>>>,
    controls_disposed: Rc<Cell<usize>>,
    controls_surface: Cell<Option<usize>>,
}

impl ManualHost {
    pub fn new(size: Size) -> Self {
        let host = Self::default();
        host.size.set(size);
        host
    }

    pub fn set_container_size(&self, size: Size) {
        self.size.set(size);
    }

    /// Make renderer creation fail, as a browser without WebGL2 would
    pub fn set_renderer_failure(&self, fail: bool) {
        self.fail_renderer.set(fail);
    }

    /// Run every frame task that was pending when called. Tasks requested
    /// while running wait for the next call. Returns the number run.
    pub fn advance_frame(&self) -> usize {
        let due = std::mem::take(&mut *self.frames.borrow_mut());
        let count = due.len();
        for (_, task) in due {
            task();
        }
        count
    }

    /// Deliver a window resize notification to every listener
    pub fn fire_resize(&self) {
        let handlers: Vec<ResizeHandler> = self.listeners.borrow().values().cloned().collect();
        for handler in handlers {
            handler();
        }
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Number of cancellations that hit a pending frame
    pub fn cancelled_frames(&self) -> usize {
        self.cancelled.get()
    }

    pub fn resize_listeners(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Output surfaces appended to the container so far
    pub fn attached_surfaces(&self) -> usize {
        self.surfaces.get()
    }

    /// Statistics of the most recently created renderer
    pub fn render_stats(&self) -> Option<RenderStats> {
        self.stats.borrow().as_ref().map(|s| s.borrow().clone())
    }

    /// Surface the latest controls listen on, numbered from 1 in creation
    /// order; `None` if no surface existed when they were created
    pub fn controls_surface(&self) -> Option<usize> {
        self.controls_surface.get()
    }

    /// Times any controls created by this host were disposed
    pub fn controls_disposed(&self) -> usize {
        self.controls_disposed.get()
    }
}

/// Orbit controls that report disposal back to their [`ManualHost`]
struct CountedControls {
    controls: OrbitControls,
    disposed: Rc<Cell<usize>>,
}

impl Controls for CountedControls {
    fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        self.controls.update(camera)
    }

    fn enable_damping(&self) -> bool {
        self.controls.enable_damping()
    }

    fn set_enable_damping(&mut self, enabled: bool) {
        self.controls.set_enable_damping(enabled);
    }

    fn damping_factor(&self) -> f32 {
        self.controls.damping_factor()
    }

    fn set_damping_factor(&mut self, factor: f32) {
        self.controls.set_damping_factor(factor);
    }

    fn enable_zoom(&self) -> bool {
        self.controls.enable_zoom()
    }

    fn set_enable_zoom(&mut self, enabled: bool) {
        self.controls.set_enable_zoom(enabled);
    }

    fn enable_pan(&self) -> bool {
        self.controls.enable_pan()
    }

    fn set_enable_pan(&mut self, enabled: bool) {
        self.controls.set_enable_pan(enabled);
    }

    fn dispose(&mut self) {
        self.disposed.set(self.disposed.get() + 1);
    }
}

impl Host for ManualHost {
    fn container_size(&self) -> Size {
        self.size.get()
    }

    fn create_renderer(&self, settings: &RendererSettings) -> Result<Box<dyn Renderer>> {
        if self.fail_renderer.get() {
            return Err(ViewportError::RendererInit(
                "renderer creation disabled on this host".to_string(),
            ));
        }
        let renderer = HeadlessRenderer::new(settings);
        *self.stats.borrow_mut() = Some(renderer.stats());
        self.surfaces.set(self.surfaces.get() + 1);
        Ok(Box::new(renderer))
    }

    fn create_controls(
        &self,
        config: &ControlsConfig,
        camera: &PerspectiveCamera,
    ) -> Box<dyn Controls> {
        let surfaces = self.surfaces.get();
        self.controls_surface.set((surfaces > 0).then_some(surfaces));
        Box::new(CountedControls {
            controls: OrbitControls::new(camera, config),
            disposed: Rc::clone(&self.controls_disposed),
        })
    }

    fn request_frame(&self, task: FrameTask) -> FrameRequestId {
        let id = FrameRequestId(self.next_frame.get() + 1);
        self.next_frame.set(id.0);
        self.frames.borrow_mut().insert(id, task);
        id
    }

    fn cancel_frame(&self, id: FrameRequestId) {
        if self.frames.borrow_mut().remove(&id).is_some() {
            self.cancelled.set(self.cancelled.get() + 1);
        }
    }

    fn subscribe_resize(&self, handler: ResizeHandler) -> ListenerId {
        let id = ListenerId(self.next_listener.get() + 1);
        self.next_listener.set(id.0);
        self.listeners.borrow_mut().insert(id, handler);
        id
    }

    fn unsubscribe_resize(&self, id: ListenerId) {
        self.listeners.borrow_mut().remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_run_once_and_in_order() {
        let host = ManualHost::new(Size::new(1, 1));
        let log = Rc::new(RefCell::new(Vec::new()));
        for n in 0..3 {
            let log = Rc::clone(&log);
            host.request_frame(Box::new(move || log.borrow_mut().push(n)));
        }
        assert_eq!(host.pending_frames(), 3);
        assert_eq!(host.advance_frame(), 3);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert_eq!(host.advance_frame(), 0);
    }

    #[test]
    fn test_cancel_only_counts_pending() {
        let host = ManualHost::new(Size::new(1, 1));
        let id = host.request_frame(Box::new(|| {}));
        host.cancel_frame(id);
        host.cancel_frame(id);
        assert_eq!(host.cancelled_frames(), 1);
        assert_eq!(host.pending_frames(), 0);
    }

    #[test]
    fn test_resize_listeners() {
        let host = ManualHost::new(Size::new(1, 1));
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let id = host.subscribe_resize(Rc::new(move || counter.set(counter.get() + 1)));

        host.fire_resize();
        host.fire_resize();
        assert_eq!(hits.get(), 2);

        host.unsubscribe_resize(id);
        host.fire_resize();
        assert_eq!(hits.get(), 2);
        assert_eq!(host.resize_listeners(), 0);
    }

    #[test]
    fn test_renderer_failure_switch() {
        let host = ManualHost::new(Size::new(1, 1));
        let settings = RendererSettings {
            size: Size::new(1, 1),
            shadow_map: Default::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
        };
        host.set_renderer_failure(true);
        assert!(matches!(
            host.create_renderer(&settings),
            Err(ViewportError::RendererInit(_))
        ));
        assert_eq!(host.attached_surfaces(), 0);

        host.set_renderer_failure(false);
        assert!(host.create_renderer(&settings).is_ok());
        assert_eq!(host.attached_surfaces(), 1);
    }

    #[test]
    fn test_controls_count_disposals() {
        let host = ManualHost::new(Size::new(1, 1));
        let camera = PerspectiveCamera::new(75.0, 1.0, 1.0, 1000.0);
        let mut controls = host.create_controls(&ControlsConfig::default(), &camera);
        assert!(controls.enable_damping());
        controls.dispose();
        assert_eq!(host.controls_disposed(), 1);
        assert_eq!(host.controls_surface(), None);
    }
}
