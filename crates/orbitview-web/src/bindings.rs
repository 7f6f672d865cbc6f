//! JavaScript facade over the viewport

use orbitview_core::{Node, NodeId, Viewport, ViewportConfig, ViewportError};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

use crate::host::WebHost;

fn to_js(e: ViewportError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Interactive 3D viewport bound to a container element
///
/// Only one viewport is live at a time: constructing a second one while the
/// first is active returns a handle to the first.
#[wasm_bindgen]
pub struct OrbitView {
    viewport: Viewport,
}

#[wasm_bindgen]
impl OrbitView {
    #[wasm_bindgen(constructor)]
    pub fn new(container: HtmlElement) -> Result<OrbitView, JsValue> {
        Self::create(container, &ViewportConfig::default())
    }

    /// Construct from a JSON configuration document
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(container: HtmlElement, config_json: &str) -> Result<OrbitView, JsValue> {
        let config = ViewportConfig::from_json_str(config_json).map_err(to_js)?;
        Self::create(container, &config)
    }

    /// Call `callback` with no arguments on every frame until destroyed
    #[wasm_bindgen(js_name = onFrame)]
    pub fn on_frame(&self, callback: js_sys::Function) {
        self.viewport.on_frame(move || {
            if let Err(e) = callback.call0(&JsValue::NULL) {
                tracing::error!("Frame callback threw: {:?}", e);
            }
        });
    }

    /// Add a grid on the ground plane; returns its node id
    #[wasm_bindgen(js_name = addGrid)]
    pub fn add_grid(&self, size: f32, divisions: u32) -> f64 {
        let id = self
            .viewport
            .with_scene(|scene| scene.add(Node::grid_helper(size, divisions)));
        id.as_u64() as f64
    }

    /// Remove a top-level node added earlier; returns whether it existed
    #[wasm_bindgen(js_name = removeNode)]
    pub fn remove_node(&self, id: f64) -> bool {
        self.viewport.with_scene(|scene| {
            let found = scene
                .children()
                .iter()
                .map(|node| node.id())
                .find(|node_id| node_id.as_u64() as f64 == id);
            found.and_then(|node_id: NodeId| scene.remove(node_id)).is_some()
        })
    }

    #[wasm_bindgen(js_name = cameraAspect)]
    pub fn camera_aspect(&self) -> f32 {
        self.viewport.camera().aspect
    }

    /// `[width, height]` of the canvas
    #[wasm_bindgen(js_name = canvasSize)]
    pub fn canvas_size(&self) -> Vec<u32> {
        let size = self.viewport.renderer_size();
        vec![size.width, size.height]
    }

    #[wasm_bindgen(js_name = isActive)]
    pub fn is_active(&self) -> bool {
        self.viewport.is_active()
    }

    /// Stop rendering and release GPU resources. The canvas stays in the
    /// container; remove it yourself if needed.
    pub fn destroy(&self) {
        self.viewport.teardown();
    }
}

impl OrbitView {
    fn create(container: HtmlElement, config: &ViewportConfig) -> Result<OrbitView, JsValue> {
        let host = WebHost::new(container).map_err(to_js)?;
        let acquired = Viewport::acquire(Rc::new(host), config).map_err(to_js)?;
        if acquired.is_existing() {
            tracing::info!("OrbitView already active, returning existing viewport");
        }
        Ok(OrbitView {
            viewport: acquired.into_viewport(),
        })
    }
}
