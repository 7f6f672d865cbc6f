//! Browser host: animation frames, window resize and the container element

use orbitview_core::config::ControlsConfig;
use orbitview_core::host::{FrameTask, ResizeHandler};
use orbitview_core::{
    Controls, FrameRequestId, Host, ListenerId, OrbitControls, PerspectiveCamera, Renderer,
    RendererSettings, Result, Size, ViewportError,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, HtmlElement, Window};

use crate::input::WebOrbitControls;
use crate::webgl::WebGlRenderer;

pub struct WebHost {
    window: Window,
    container: HtmlElement,
    /// Canvas of the last renderer created; the controls listen on it
    canvas: RefCell<Option<HtmlCanvasElement>>,
    next_listener: Cell<u32>,
    resize_listeners: RefCell<HashMap<ListenerId, Closure<dyn FnMut()>>>,
}

impl WebHost {
    pub fn new(container: HtmlElement) -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| ViewportError::HostUnavailable("no window object".to_string()))?;
        Ok(Self {
            window,
            container,
            canvas: RefCell::new(None),
            next_listener: Cell::new(0),
            resize_listeners: RefCell::new(HashMap::new()),
        })
    }
}

impl Host for WebHost {
    fn container_size(&self) -> Size {
        Size::new(
            self.container.offset_width().max(0) as u32,
            self.container.offset_height().max(0) as u32,
        )
    }

    fn create_renderer(&self, settings: &RendererSettings) -> Result<Box<dyn Renderer>> {
        let document = self
            .window
            .document()
            .ok_or_else(|| ViewportError::HostUnavailable("no document object".to_string()))?;
        let renderer = WebGlRenderer::new(&document, settings)
            .map_err(|e| ViewportError::RendererInit(format!("{:#}", e)))?;
        self.container
            .append_child(renderer.canvas())
            .map_err(|e| ViewportError::RendererInit(format!("failed to append canvas: {:?}", e)))?;
        *self.canvas.borrow_mut() = Some(renderer.canvas().clone());
        Ok(Box::new(renderer))
    }

    fn create_controls(
        &self,
        config: &ControlsConfig,
        camera: &PerspectiveCamera,
    ) -> Box<dyn Controls> {
        let canvas = self.canvas.borrow();
        let element: &HtmlElement = match canvas.as_ref() {
            Some(canvas) => &**canvas,
            None => &self.container,
        };
        Box::new(WebOrbitControls::new(
            OrbitControls::new(camera, config),
            element,
        ))
    }

    fn request_frame(&self, task: FrameTask) -> FrameRequestId {
        // Frees itself after running. A cancelled frame's closure is never
        // freed, which costs one allocation per teardown.
        let callback = Closure::once_into_js(move || task());
        match self.window.request_animation_frame(callback.unchecked_ref()) {
            Ok(id) => FrameRequestId(id),
            Err(e) => {
                tracing::error!("requestAnimationFrame failed, render loop stopped: {:?}", e);
                FrameRequestId(0)
            }
        }
    }

    fn cancel_frame(&self, id: FrameRequestId) {
        if let Err(e) = self.window.cancel_animation_frame(id.0) {
            tracing::warn!(id = id.0, "cancelAnimationFrame failed: {:?}", e);
        }
    }

    fn subscribe_resize(&self, handler: ResizeHandler) -> ListenerId {
        let id = ListenerId(self.next_listener.get() + 1);
        self.next_listener.set(id.0);

        let closure = Closure::wrap(Box::new(move || handler()) as Box<dyn FnMut()>);
        if let Err(e) = self
            .window
            .add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())
        {
            tracing::error!("Failed to add resize listener: {:?}", e);
        }
        self.resize_listeners.borrow_mut().insert(id, closure);
        id
    }

    fn unsubscribe_resize(&self, id: ListenerId) {
        if let Some(closure) = self.resize_listeners.borrow_mut().remove(&id) {
            self.window
                .remove_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())
                .ok();
        }
    }
}
