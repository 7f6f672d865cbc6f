//! Viewport lifecycle: construction, frame loop, resize and teardown
//!
//! One viewport may be active per thread (on wasm32 that is the whole
//! program). [`Viewport::acquire`] is the init-once path: it reports whether
//! it built a new viewport or handed back the active one, and only the
//! former runs any side effects on the host.
//!
//! The frame loop is a task that re-requests itself at the start of every
//! tick and keeps the pending request token, so teardown can cancel it.
//! Frame and resize closures hold weak references; the host never keeps a
//! viewport alive.

use bevy_math::Vec3;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info, warn};

use crate::camera::PerspectiveCamera;
use crate::config::ViewportConfig;
use crate::controls::Controls;
use crate::error::Result;
use crate::host::{FrameRequestId, Host, ListenerId};
use crate::renderer::{Renderer, RendererSettings, ShadowMapSettings, Size};
use crate::scene::{Node, Scene};

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static ACTIVE: RefCell<Option<Viewport>> = const { RefCell::new(None) };
}

/// Identity of a constructed viewport; never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    fn next() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

pub type FrameCallback = Box<dyn FnMut()>;

/// Outcome of [`Viewport::acquire`]
#[derive(Clone)]
pub enum Acquired {
    /// A new viewport was built and is now active
    Created(Viewport),
    /// A viewport was already active; it is returned untouched
    Existing(Viewport),
}

impl Acquired {
    pub fn is_existing(&self) -> bool {
        matches!(self, Acquired::Existing(_))
    }

    pub fn into_viewport(self) -> Viewport {
        match self {
            Acquired::Created(v) | Acquired::Existing(v) => v,
        }
    }
}

struct ViewportState {
    scene: Scene,
    camera: PerspectiveCamera,
    renderer: Box<dyn Renderer>,
    controls: Option<Box<dyn Controls>>,
}

struct ViewportInner {
    id: InstanceId,
    host: Rc<dyn Host>,
    state: RefCell<ViewportState>,
    callbacks: RefCell<Vec<FrameCallback>>,
    frame_request: Cell<Option<FrameRequestId>>,
    resize_listener: Cell<Option<ListenerId>>,
    torn_down: Cell<bool>,
}

/// Handle to a viewport. Clones refer to the same viewport.
#[derive(Clone)]
pub struct Viewport {
    inner: Rc<ViewportInner>,
}

impl PartialEq for Viewport {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Viewport {}

impl std::fmt::Debug for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewport")
            .field("id", &self.inner.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Viewport {
    /// Build the stock viewport on `host`, or return the active one
    ///
    /// Nothing is drawn here: the first render happens when the host runs
    /// the first frame, so the output surface is blank until then.
    pub fn construct(host: Rc<dyn Host>) -> Result<Viewport> {
        Self::acquire(host, &ViewportConfig::default()).map(Acquired::into_viewport)
    }

    /// Build a viewport on `host` unless one is already active
    ///
    /// When a viewport is active, `host` and `config` are ignored and the
    /// active viewport is returned as [`Acquired::Existing`].
    pub fn acquire(host: Rc<dyn Host>, config: &ViewportConfig) -> Result<Acquired> {
        if let Some(existing) = Self::active() {
            debug!(id = ?existing.id(), "Viewport already active, reusing it");
            return Ok(Acquired::Existing(existing));
        }

        let viewport = Self::build(host, config)?;
        ACTIVE.with(|slot| *slot.borrow_mut() = Some(viewport.clone()));
        Ok(Acquired::Created(viewport))
    }

    /// The viewport currently occupying the instance slot
    pub fn active() -> Option<Viewport> {
        ACTIVE.with(|slot| slot.borrow().clone())
    }

    fn build(host: Rc<dyn Host>, config: &ViewportConfig) -> Result<Viewport> {
        let size = host.container_size();

        let mut camera = PerspectiveCamera::new(
            config.camera.fov,
            size.aspect(),
            config.camera.near,
            config.camera.far,
        );
        camera.position = Vec3::from_array(config.camera.position);
        camera.look_at(Vec3::ZERO);

        // Only fallible step; nothing observable has happened yet
        let renderer = host.create_renderer(&RendererSettings {
            size,
            shadow_map: (&config.renderer.shadow_map).into(),
            clear_color: config.renderer.clear_color,
        })?;

        let mut scene = Scene::new();
        if config.scene.axes_size > 0.0 {
            scene.add(Node::axes_helper(config.scene.axes_size));
        }

        let controls = config
            .controls
            .enabled
            .then(|| host.create_controls(&config.controls, &camera));

        let inner = Rc::new(ViewportInner {
            id: InstanceId::next(),
            host,
            state: RefCell::new(ViewportState {
                scene,
                camera,
                renderer,
                controls,
            }),
            callbacks: RefCell::new(Vec::new()),
            frame_request: Cell::new(None),
            resize_listener: Cell::new(None),
            torn_down: Cell::new(false),
        });

        ViewportInner::schedule_frame(&inner);

        let weak = Rc::downgrade(&inner);
        let listener = inner.host.subscribe_resize(Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.handle_resize();
            }
        }));
        inner.resize_listener.set(Some(listener));

        info!(
            id = ?inner.id,
            width = size.width,
            height = size.height,
            "Viewport created"
        );
        Ok(Viewport { inner })
    }

    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    /// False once torn down
    pub fn is_active(&self) -> bool {
        !self.inner.torn_down.get()
    }

    /// Run `callback` on every frame until teardown, after those already
    /// registered
    pub fn on_frame(&self, callback: impl FnMut() + 'static) {
        self.inner.callbacks.borrow_mut().push(Box::new(callback));
    }

    pub fn callback_count(&self) -> usize {
        self.inner.callbacks.borrow().len()
    }

    /// Snapshot of the camera
    pub fn camera(&self) -> PerspectiveCamera {
        self.inner.state.borrow().camera.clone()
    }

    pub fn renderer_size(&self) -> Size {
        self.inner.state.borrow().renderer.size()
    }

    pub fn shadow_map(&self) -> ShadowMapSettings {
        self.inner.state.borrow().renderer.shadow_map()
    }

    pub fn set_shadow_map(&self, settings: ShadowMapSettings) {
        self.inner.state.borrow_mut().renderer.set_shadow_map(settings);
    }

    pub fn has_controls(&self) -> bool {
        self.inner.state.borrow().controls.is_some()
    }

    pub fn with_scene<R>(&self, f: impl FnOnce(&mut Scene) -> R) -> R {
        f(&mut self.inner.state.borrow_mut().scene)
    }

    pub fn with_camera<R>(&self, f: impl FnOnce(&mut PerspectiveCamera) -> R) -> R {
        f(&mut self.inner.state.borrow_mut().camera)
    }

    /// Access the controls, if the viewport was built with them
    pub fn with_controls<R>(&self, f: impl FnOnce(&mut dyn Controls) -> R) -> Option<R> {
        let mut state = self.inner.state.borrow_mut();
        match state.controls.as_deref_mut() {
            Some(controls) => Some(f(controls)),
            None => None,
        }
    }

    /// Stop the frame loop, empty the scene, release the renderer and free
    /// the instance slot
    ///
    /// Every step checks its own precondition, so calling this again, or on
    /// a viewport whose slot was already taken by a newer one, is harmless.
    /// The renderer's output element stays in the container; removing it is
    /// up to the caller.
    pub fn teardown(&self) {
        let inner = &self.inner;

        if let Some(request) = inner.frame_request.take() {
            inner.host.cancel_frame(request);
        }

        {
            let mut state = inner.state.borrow_mut();
            let members = state.scene.node_ids();
            for id in members {
                state.scene.remove(id);
            }

            if !inner.torn_down.get() {
                state.renderer.dispose();
                if let Some(controls) = state.controls.as_deref_mut() {
                    controls.dispose();
                }
            }
        }
        inner.callbacks.borrow_mut().clear();

        ACTIVE.with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.as_ref() == Some(self) {
                *slot = None;
            }
        });

        if let Some(listener) = inner.resize_listener.take() {
            inner.host.unsubscribe_resize(listener);
        }

        if !inner.torn_down.replace(true) {
            info!(id = ?inner.id, "Viewport torn down");
        }
    }
}

impl ViewportInner {
    fn schedule_frame(this: &Rc<Self>) {
        let weak: Weak<Self> = Rc::downgrade(this);
        let request = this.host.request_frame(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                ViewportInner::tick(&inner);
            }
        }));
        this.frame_request.set(Some(request));
    }

    fn tick(this: &Rc<Self>) {
        this.frame_request.set(None);
        if this.torn_down.get() {
            return;
        }
        Self::schedule_frame(this);

        // Callbacks run with no borrow held so they can use the viewport
        let mut running = std::mem::take(&mut *this.callbacks.borrow_mut());
        for callback in running.iter_mut() {
            callback();
        }
        if this.torn_down.get() {
            return;
        }
        {
            let mut callbacks = this.callbacks.borrow_mut();
            running.append(&mut callbacks);
            *callbacks = running;
        }

        let mut state = this.state.borrow_mut();
        let ViewportState {
            scene,
            camera,
            renderer,
            controls,
        } = &mut *state;
        if let Err(e) = renderer.render(scene, camera) {
            error!(id = ?this.id, error = %e, "Failed to render frame");
        }
        if let Some(controls) = controls.as_deref_mut() {
            controls.update(camera);
        }
    }

    fn handle_resize(&self) {
        if self.torn_down.get() {
            return;
        }
        let size = self.host.container_size();
        let Ok(mut state) = self.state.try_borrow_mut() else {
            warn!(id = ?self.id, "Resize arrived while viewport state was in use, ignoring");
            return;
        };
        state.camera.aspect = size.aspect();
        state.camera.update_projection_matrix();
        state.renderer.set_size(size);
        debug!(id = ?self.id, width = size.width, height = size.height, "Viewport resized");
    }
}
