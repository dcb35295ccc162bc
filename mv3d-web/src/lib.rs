/// MV3D Web - WASM model viewer drawing into a 2D canvas
///
/// `WebViewer` mounts a canvas inside a host container, loads the requested
/// asset over HTTP and runs the viewer from `requestAnimationFrame`. Every
/// listener it registers is removed again by `teardown`.
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, EventTarget, HtmlCanvasElement, HtmlElement, KeyboardEvent, MouseEvent, WheelEvent};

use mv3d_core::{Key, RenderSurface, Subscription, Viewer, ViewerRequest};

pub mod canvas;
pub mod input;
pub mod logging;
pub mod source;

pub use canvas::CanvasSurface;
pub use input::{PointerAction, PointerState};
pub use source::HttpSource;

/// Canvas size when the container has no layout yet
const DEFAULT_WIDTH: u32 = 800;
const DEFAULT_HEIGHT: u32 = 600;

struct Shared {
    viewer: Viewer,
    surface: CanvasSurface,
    pointer: PointerState,
    container: HtmlElement,
    last_timestamp: Option<f64>,
}

impl Shared {
    /// One animation frame; false once the viewer has been torn down
    fn frame(&mut self, timestamp: f64) -> bool {
        let dt = self.last_timestamp.map_or(0.0, |last| (timestamp - last) / 1000.0);
        self.last_timestamp = Some(timestamp);
        self.viewer.tick(dt as f32, &mut self.surface)
    }

    fn fit_to_container(&mut self) {
        let (width, height) = container_size(&self.container);
        self.viewer.resize(width, height, &mut self.surface);
    }

    fn pointer_moved(&mut self, event: &MouseEvent) {
        let mode = self.viewer.gizmo().map(|g| g.mode());
        let action = self
            .pointer
            .move_to(event.offset_x() as f32, event.offset_y() as f32, event.shift_key(), mode);
        match action {
            Some(PointerAction::Orbit { dx, dy }) => self.viewer.orbit(dx, dy),
            Some(PointerAction::DragGizmo(delta)) => {
                self.viewer.drag_gizmo(delta);
            }
            None => {}
        }
    }
}

#[wasm_bindgen]
pub struct WebViewer {
    shared: Rc<RefCell<Shared>>,
}

#[wasm_bindgen]
impl WebViewer {
    /// Mount a viewer inside the element `container_id`
    #[wasm_bindgen(constructor)]
    pub fn new(container_id: &str, config_json: &str) -> Result<WebViewer, JsValue> {
        let request = parse_request(config_json)?;

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
        let document = window.document().ok_or_else(|| JsValue::from_str("No document"))?;
        let container = document
            .get_element_by_id(container_id)
            .ok_or_else(|| JsValue::from_str(&format!("Container '{}' not found", container_id)))?
            .dyn_into::<HtmlElement>()?;
        let canvas = document.create_element("canvas")?.dyn_into::<HtmlCanvasElement>()?;
        container.append_child(&canvas)?;

        let mut surface = CanvasSurface::new(canvas.clone())?;
        let (width, height) = container_size(&container);
        surface.resize(width, height);

        let shared = Rc::new(RefCell::new(Shared {
            viewer: Viewer::new(Rc::new(HttpSource::new())),
            surface,
            pointer: PointerState::new(),
            container,
            last_timestamp: None,
        }));

        let window_target: &EventTarget = window.as_ref();
        let canvas_target: &EventTarget = canvas.as_ref();
        let subscriptions = vec![
            listen(window_target, "resize", &shared, |s, _: Event| s.fit_to_container())?,
            listen(window_target, "keydown", &shared, |s, e: KeyboardEvent| {
                s.viewer.handle_key_down(Key::from_key_code(e.key_code()));
            })?,
            listen(window_target, "keyup", &shared, |s, e: KeyboardEvent| {
                s.viewer.handle_key_up(Key::from_key_code(e.key_code()));
            })?,
            listen(canvas_target, "mousedown", &shared, |s, e: MouseEvent| {
                s.pointer.press(e.offset_x() as f32, e.offset_y() as f32)
            })?,
            listen(canvas_target, "mousemove", &shared, |s, e: MouseEvent| s.pointer_moved(&e))?,
            listen(window_target, "mouseup", &shared, |s, _: MouseEvent| s.pointer.release())?,
            listen(canvas_target, "wheel", &shared, |s, e: WheelEvent| {
                e.prevent_default();
                s.viewer.zoom(input::wheel_zoom(e.delta_y()));
            })?,
            Subscription::new("canvas", move || canvas.remove()),
        ];

        {
            let mut guard = shared.borrow_mut();
            let Shared { viewer, surface, .. } = &mut *guard;
            for subscription in subscriptions {
                viewer.subscribe(subscription);
            }
            viewer.start(request, surface);
        }
        start_render_loop(&window, &shared)?;

        Ok(WebViewer { shared })
    }

    /// Replace the viewer inputs; returns true when a new load was started
    #[wasm_bindgen(js_name = setRequest)]
    pub fn set_request(&self, config_json: &str) -> Result<bool, JsValue> {
        let request = parse_request(config_json)?;
        let mut shared = self.shared.borrow_mut();
        if let Some(color) = request.clear_color() {
            shared.surface.set_clear_color(color);
        }
        Ok(shared.viewer.on_request_changed(request))
    }

    #[wasm_bindgen(js_name = isLoading)]
    pub fn is_loading(&self) -> bool {
        self.shared.borrow().viewer.is_loading()
    }

    pub fn status(&self) -> String {
        self.shared.borrow().viewer.status().to_string()
    }

    /// Stop rendering and remove every listener and the canvas
    pub fn teardown(&self) {
        self.shared.borrow_mut().viewer.teardown();
    }
}

impl Drop for WebViewer {
    fn drop(&mut self) {
        if let Ok(mut shared) = self.shared.try_borrow_mut() {
            shared.viewer.teardown();
        };
    }
}

fn parse_request(json: &str) -> Result<ViewerRequest, JsValue> {
    serde_json::from_str(json).map_err(|e| JsValue::from_str(&format!("invalid viewer config: {}", e)))
}

fn container_size(container: &HtmlElement) -> (u32, u32) {
    let (width, height) = (container.client_width(), container.client_height());
    if width > 0 && height > 0 {
        (width as u32, height as u32)
    } else {
        (DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

/// Register `handler` for `name` events on `target`, undone when the
/// returned subscription is released
fn listen<E: JsCast + 'static>(
    target: &EventTarget,
    name: &'static str,
    shared: &Rc<RefCell<Shared>>,
    mut handler: impl FnMut(&mut Shared, E) + 'static,
) -> Result<Subscription, JsValue> {
    let weak = Rc::downgrade(shared);
    let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        let (Some(shared), Ok(event)) = (weak.upgrade(), event.dyn_into::<E>()) else {
            return;
        };
        // Events raised while the viewer is busy are dropped
        if let Ok(mut shared) = shared.try_borrow_mut() {
            handler(&mut shared, event);
        };
    });
    target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;

    let target = target.clone();
    Ok(Subscription::new(name, move || {
        let _ = target.remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
    }))
}

fn frame_tick(weak: &Weak<RefCell<Shared>>, timestamp: f64) -> bool {
    let Some(shared) = weak.upgrade() else {
        return false;
    };
    let running = match shared.try_borrow_mut() {
        Ok(mut shared) => shared.frame(timestamp),
        Err(_) => true,
    };
    running
}

/// Drive `Viewer::tick` from requestAnimationFrame until teardown
fn start_render_loop(window: &web_sys::Window, shared: &Rc<RefCell<Shared>>) -> Result<(), JsValue> {
    let handle = Rc::new(Cell::new(0));
    let callback: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));

    let weak = Rc::downgrade(shared);
    let next = callback.clone();
    let next_handle = handle.clone();
    *callback.borrow_mut() = Some(Closure::new(move |timestamp: f64| {
        if !frame_tick(&weak, timestamp) {
            let _ = next.borrow_mut().take();
            return;
        }
        if let (Some(window), Some(closure)) = (web_sys::window(), next.borrow().as_ref()) {
            if let Ok(id) = window.request_animation_frame(closure.as_ref().unchecked_ref()) {
                next_handle.set(id);
            }
        }
    }));

    if let Some(closure) = callback.borrow().as_ref() {
        handle.set(window.request_animation_frame(closure.as_ref().unchecked_ref())?);
    }

    let window = window.clone();
    shared
        .borrow_mut()
        .viewer
        .subscribe(Subscription::new("animation frame", move || {
            let _ = window.cancel_animation_frame(handle.get());
            let _ = callback.borrow_mut().take();
        }));
    Ok(())
}

#[wasm_bindgen(start)]
pub fn start() {
    logging::init("info");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_json_uses_host_names() {
        let request = parse_request(
            r##"{"assetUrl": "models/robot.fbx", "backgroundColor": "#112233", "gizmoEnabled": false}"##,
        )
        .unwrap();
        assert_eq!(request.asset_url, "models/robot.fbx");
        assert_eq!(request.clear_color.as_deref(), Some("#112233"));
        assert!(!request.gizmo_enabled);
    }
}
