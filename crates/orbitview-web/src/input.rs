//! Pointer and wheel listeners feeding the orbit controls

use orbitview_core::{ControlInput, Controls, InputQueue, OrbitControls, PerspectiveCamera};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, HtmlElement, PointerEvent, WheelEvent};

/// What a drag does, chosen when the pointer goes down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DragMode {
    Rotate,
    Pan,
    Dolly,
}

impl DragMode {
    /// Map a `MouseEvent.button` value. Shift turns a left drag into a pan.
    pub(crate) fn from_button(button: i16, shift: bool) -> Option<Self> {
        match button {
            0 if shift => Some(DragMode::Pan),
            0 => Some(DragMode::Rotate),
            1 => Some(DragMode::Dolly),
            2 => Some(DragMode::Pan),
            _ => None,
        }
    }

    pub(crate) fn input(self, dx: f32, dy: f32, viewport_height: f32) -> ControlInput {
        match self {
            DragMode::Rotate => ControlInput::Rotate {
                dx,
                dy,
                viewport_height,
            },
            DragMode::Pan => ControlInput::Pan {
                dx,
                dy,
                viewport_height,
            },
            DragMode::Dolly => ControlInput::Dolly { dy },
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct DragState {
    mode: Option<DragMode>,
    last_x: f32,
    last_y: f32,
}

type Listener = Closure<dyn FnMut(Event)>;

/// DOM listeners on the renderer's canvas; removed on
/// [`PointerBindings::detach`] or drop
pub(crate) struct PointerBindings {
    element: HtmlElement,
    listeners: Vec<(&'static str, Listener)>,
}

impl PointerBindings {
    pub(crate) fn attach(element: &HtmlElement, queue: InputQueue) -> Self {
        let drag = Rc::new(Cell::new(DragState::default()));
        let mut listeners: Vec<(&'static str, Listener)> = Vec::new();

        let el = element.clone();
        let state = drag.clone();
        listeners.push((
            "pointerdown",
            Closure::wrap(Box::new(move |event: Event| {
                let Some(event) = event.dyn_ref::<PointerEvent>() else {
                    return;
                };
                let Some(mode) = DragMode::from_button(event.button(), event.shift_key()) else {
                    return;
                };
                el.set_pointer_capture(event.pointer_id()).ok();
                state.set(DragState {
                    mode: Some(mode),
                    last_x: event.client_x() as f32,
                    last_y: event.client_y() as f32,
                });
            }) as Box<dyn FnMut(Event)>),
        ));

        let el = element.clone();
        let state = drag.clone();
        let pending = queue.clone();
        listeners.push((
            "pointermove",
            Closure::wrap(Box::new(move |event: Event| {
                let Some(event) = event.dyn_ref::<PointerEvent>() else {
                    return;
                };
                let mut current = state.get();
                let Some(mode) = current.mode else {
                    return;
                };
                let (x, y) = (event.client_x() as f32, event.client_y() as f32);
                let height = el.client_height() as f32;
                pending.push(mode.input(x - current.last_x, y - current.last_y, height));
                current.last_x = x;
                current.last_y = y;
                state.set(current);
            }) as Box<dyn FnMut(Event)>),
        ));

        for name in ["pointerup", "pointercancel"] {
            let el = element.clone();
            let state = drag.clone();
            listeners.push((
                name,
                Closure::wrap(Box::new(move |event: Event| {
                    if let Some(event) = event.dyn_ref::<PointerEvent>() {
                        el.release_pointer_capture(event.pointer_id()).ok();
                    }
                    state.set(DragState::default());
                }) as Box<dyn FnMut(Event)>),
            ));
        }

        let pending = queue;
        listeners.push((
            "wheel",
            Closure::wrap(Box::new(move |event: Event| {
                event.prevent_default();
                if let Some(event) = event.dyn_ref::<WheelEvent>() {
                    pending.push(ControlInput::Wheel {
                        delta_y: event.delta_y() as f32,
                    });
                }
            }) as Box<dyn FnMut(Event)>),
        ));

        // Right-drag pans, so keep the context menu out of the way
        listeners.push((
            "contextmenu",
            Closure::wrap(Box::new(|event: Event| event.prevent_default()) as Box<dyn FnMut(Event)>),
        ));

        for (name, listener) in &listeners {
            if let Err(e) =
                element.add_event_listener_with_callback(name, listener.as_ref().unchecked_ref())
            {
                tracing::error!(listener = *name, "Failed to add listener: {:?}", e);
            }
        }

        Self {
            element: element.clone(),
            listeners,
        }
    }

    pub(crate) fn detach(&mut self) {
        for (name, listener) in self.listeners.drain(..) {
            self.element
                .remove_event_listener_with_callback(name, listener.as_ref().unchecked_ref())
                .ok();
        }
    }
}

impl Drop for PointerBindings {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Orbit controls driven by pointer input on the canvas
pub(crate) struct WebOrbitControls {
    controls: OrbitControls,
    bindings: PointerBindings,
}

impl WebOrbitControls {
    pub(crate) fn new(controls: OrbitControls, element: &HtmlElement) -> Self {
        let bindings = PointerBindings::attach(element, controls.input().clone());
        Self { controls, bindings }
    }
}

impl Controls for WebOrbitControls {
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
        self.bindings.detach();
    }
}
