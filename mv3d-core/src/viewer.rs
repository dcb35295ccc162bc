/// Viewer orchestration: scene lifecycle, load cycles and the render loop
///
/// Every change of asset URL starts a new load cycle with a fresh generation
/// number. The cycle clears the scene, rebuilds the helpers and hands the
/// asset to the loader with a `LoadTicket` carrying that generation. Messages
/// from older generations are dropped when the inbox is drained, so a slow
/// load that was superseded can never repopulate the scene.
use std::rc::Rc;

use nalgebra::{Point3, Vector3};
use tracing::{debug, info, warn};

use crate::asset::LoadedObject;
use crate::color::Rgb;
use crate::error::LoadError;
use crate::format::{resolve_format, resolve_tag};
use crate::gizmo::{GizmoEvent, GizmoView, ManipulationGizmo, TransformGizmo};
use crate::keymap::{key_down_command, key_up_command, Key};
use crate::loader::{AssetLoader, AssetSource, LoadInbox, LoadMessage, LoadTicket};
use crate::projection::Camera;
use crate::request::{LoadState, ViewerRequest};
use crate::rig::{apply_policy, OrbitControls};
use crate::scene::{NodeKind, SceneGraph};

pub const STATUS_READY: &str = "READY";

/// A rasterizer the viewer draws into
pub trait RenderSurface {
    fn size(&self) -> (u32, u32);
    fn resize(&mut self, width: u32, height: u32);
    fn set_clear_color(&mut self, color: Rgb);
    fn render(&mut self, frame: &Frame<'_>);
}

/// Everything needed to draw one frame
pub struct Frame<'a> {
    pub scene: &'a SceneGraph,
    pub camera: &'a Camera,
    pub gizmo: Option<GizmoView>,
}

/// A coloured world-space line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub from: Point3<f32>,
    pub to: Point3<f32>,
    pub color: Rgb,
}

const AXIS_COLORS: [Rgb; 3] = [Rgb::from_hex(0xff0000), Rgb::from_hex(0x00ff00), Rgb::from_hex(0x0000ff)];

impl Frame<'_> {
    /// Grid, axes and light indicator lines
    pub fn helper_lines(&self) -> Vec<LineSegment> {
        let mut lines = Vec::new();
        for node in self.scene.nodes() {
            match &node.kind {
                NodeKind::Grid(grid) => lines.extend(grid.segments().into_iter().map(|(from, to)| LineSegment {
                    from,
                    to,
                    color: grid.color,
                })),
                NodeKind::Axes { size } => {
                    let axes = [Vector3::x(), Vector3::y(), Vector3::z()];
                    lines.extend(axes.iter().zip(AXIS_COLORS).map(|(axis, color)| LineSegment {
                        from: Point3::origin(),
                        to: Point3::from(axis * *size),
                        color,
                    }));
                }
                NodeKind::DirectionalLight { light, indicator_size } => {
                    // A small cross at the light, with a ray back to the origin
                    let at = Point3::from(light.direction * *indicator_size);
                    let half = indicator_size / 2.0;
                    for axis in [Vector3::x(), Vector3::y(), Vector3::z()] {
                        lines.push(LineSegment {
                            from: at - axis * half,
                            to: at + axis * half,
                            color: light.color,
                        });
                    }
                    lines.push(LineSegment {
                        from: at,
                        to: Point3::origin(),
                        color: light.color,
                    });
                }
                _ => {}
            }
        }
        lines
    }

    /// One line per gizmo handle, red/green/blue for x/y/z
    pub fn gizmo_lines(&self) -> Vec<LineSegment> {
        let Some(view) = self.gizmo else {
            return Vec::new();
        };
        view.axes
            .iter()
            .zip(AXIS_COLORS)
            .map(|(axis, color)| LineSegment {
                from: view.origin,
                to: view.origin + axis * view.length,
                color,
            })
            .collect()
    }

    /// Lambert shading of a surface colour under the scene lights
    pub fn shade(&self, normal: &Vector3<f32>, base: Rgb) -> Rgb {
        let ambient = self.scene.ambient_light().unwrap_or(Rgb::BLACK);
        let (direct, light_color) = match self.scene.directional_light() {
            Some(light) => (normal.dot(&light.direction).max(0.0) * light.intensity, light.color),
            None => (0.0, Rgb::BLACK),
        };
        let channel = |base: u8, ambient: u8, light: u8| {
            base as f32 / 255.0 * (ambient as f32 / 255.0 + direct * light as f32 / 255.0)
        };
        Rgb::from_unit(
            channel(base.r, ambient.r, light_color.r),
            channel(base.g, ambient.g, light_color.g),
            channel(base.b, ambient.b, light_color.b),
        )
    }
}

/// Host registration (window listener, terminal mode, ...) undone on teardown
pub struct Subscription {
    name: &'static str,
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(name: &'static str, release: impl FnOnce() + 'static) -> Self {
        Self {
            name,
            release: Some(Box::new(release)),
        }
    }

    pub fn release(mut self) {
        if let Some(release) = self.release.take() {
            debug!("releasing {}", self.name);
            release();
        }
    }
}

pub struct Viewer {
    loader: AssetLoader,
    inbox: LoadInbox,
    request: Option<ViewerRequest>,
    generation: u64,
    state: LoadState,
    status: String,
    scene: SceneGraph,
    camera: Camera,
    controls: OrbitControls,
    gizmo: Option<Box<dyn ManipulationGizmo>>,
    subscriptions: Vec<Subscription>,
    started: bool,
    running: bool,
    needs_redraw: bool,
}

impl Viewer {
    pub fn new(source: Rc<dyn AssetSource>) -> Self {
        let inbox = LoadInbox::default();
        Self {
            loader: AssetLoader::new(source, inbox.clone()),
            inbox,
            request: None,
            generation: 0,
            state: LoadState::Idle,
            status: String::new(),
            scene: SceneGraph::new(),
            camera: Camera::default(),
            controls: OrbitControls::default(),
            gizmo: None,
            subscriptions: Vec::new(),
            started: false,
            running: false,
            needs_redraw: true,
        }
    }

    /// First-time setup, then the first load cycle
    pub fn start(&mut self, request: ViewerRequest, surface: &mut dyn RenderSurface) {
        if self.started {
            warn!("viewer already started, ignoring start request");
            return;
        }

        let (width, height) = surface.size();
        self.camera = Camera::new(width, height);
        if let Some(color) = request.clear_color() {
            surface.set_clear_color(color);
        }
        if request.gizmo_enabled {
            self.gizmo = Some(Box::new(TransformGizmo::new()) as Box<dyn ManipulationGizmo>);
        }

        self.started = true;
        self.running = true;
        info!("viewer started at {}x{}", width, height);
        self.begin_cycle(request);
    }

    /// Record a host registration to undo on teardown
    pub fn subscribe(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    /// Host input changed. Returns true when a new load cycle was started.
    pub fn on_request_changed(&mut self, request: ViewerRequest) -> bool {
        if !self.started {
            debug!("request changed before start, ignoring");
            return false;
        }
        if !self.running {
            debug!("request changed after teardown, ignoring");
            return false;
        }

        let unchanged = self
            .request
            .as_ref()
            .is_some_and(|current| current.asset_url == request.asset_url);
        if unchanged {
            debug!("asset url unchanged, not reloading {}", request.asset_url);
            self.request = Some(request);
            return false;
        }

        self.begin_cycle(request);
        true
    }

    fn begin_cycle(&mut self, request: ViewerRequest) {
        self.generation += 1;
        let ticket = LoadTicket {
            generation: self.generation,
        };

        self.set_loading(String::new());
        self.scene.clear();
        if let Some(gizmo) = self.gizmo.as_mut() {
            gizmo.detach();
        }
        self.scene.populate_helpers();
        self.needs_redraw = true;

        let url = request.asset_url.clone();
        let format = resolve_format(request.format_hint.as_deref(), &url);
        let tag = resolve_tag(request.format_hint.as_deref(), &url);
        self.request = Some(request);

        match format {
            Some(format) => {
                info!("load cycle {} for {} ({})", self.generation, url, format);
                self.loader.load(ticket, &url, format);
            }
            None => self.fail(LoadError::UnsupportedFormat(tag)),
        }
    }

    /// Apply every pending load message; returns how many were applied
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        for message in self.inbox.drain() {
            let ticket = message.ticket();
            if ticket.generation != self.generation {
                debug!(
                    "discarding message from generation {} (current {})",
                    ticket.generation, self.generation
                );
                continue;
            }
            if !self.state.is_loading() {
                debug!("cycle {} already finished, ignoring message", ticket.generation);
                continue;
            }

            match message {
                LoadMessage::Progress { detail, .. } => self.set_loading(detail),
                LoadMessage::Finished { outcome: Ok(object), .. } => self.finish(object),
                LoadMessage::Finished { outcome: Err(e), .. } => self.fail(e),
            }
            applied += 1;
        }
        applied
    }

    fn set_loading(&mut self, detail: String) {
        self.status = detail.clone();
        self.state = LoadState::Loading(detail);
    }

    fn finish(&mut self, mut object: LoadedObject) {
        if object.format.is_animated() && !object.play_first_clip() {
            debug!("{} has no animation clips", object.name);
        }

        let bounds = object.bounds();
        let name = object.name.clone();
        let id = match self.scene.add(NodeKind::Primary(Box::new(object))) {
            Ok(id) => id,
            Err(e) => {
                self.fail_with(e.to_string());
                return;
            }
        };

        let gizmo_enabled = self.request.as_ref().is_some_and(|r| r.gizmo_enabled);
        if gizmo_enabled {
            let gizmo = self
                .gizmo
                .get_or_insert_with(|| Box::new(TransformGizmo::new()) as Box<dyn ManipulationGizmo>);
            gizmo.attach(id);
            match self.scene.add(NodeKind::GizmoVisual) {
                Ok(visual) => gizmo.set_visual(Some(visual)),
                Err(e) => warn!("could not add gizmo visual: {}", e),
            }
        }

        if let Some(request) = self.request.as_ref() {
            apply_policy(&mut self.camera, request, bounds.as_ref());
        }

        info!("loaded {} ({} nodes in scene)", name, self.scene.len());
        self.state = LoadState::Loaded;
        self.status = STATUS_READY.to_string();
        self.needs_redraw = true;
    }

    fn fail(&mut self, error: LoadError) {
        self.fail_with(error.to_string());
    }

    fn fail_with(&mut self, reason: String) {
        warn!("load cycle {} failed: {}", self.generation, reason);
        self.status = reason.clone();
        self.state = LoadState::Failed(reason);
        self.needs_redraw = true;
    }

    /// One render-loop iteration. Returns false once the viewer is torn down.
    pub fn tick(&mut self, dt: f32, surface: &mut dyn RenderSurface) -> bool {
        if !self.running {
            return false;
        }

        self.pump();

        if let Some((_, object)) = self.scene.primary_mut() {
            if let Some(player) = object.player.as_mut() {
                player.advance(dt);
            }
        }

        let gizmo = self.gizmo.as_mut().map(|gizmo| {
            let target = self.scene.primary().map(|(_, object)| &object.transform);
            gizmo.update(&self.camera, target);
            gizmo.view()
        });

        surface.render(&Frame {
            scene: &self.scene,
            camera: &self.camera,
            gizmo: gizmo.flatten(),
        });
        self.needs_redraw = false;
        true
    }

    pub fn handle_key_down(&mut self, key: Key) -> bool {
        match (key_down_command(key), self.gizmo.as_mut()) {
            (Some(command), Some(gizmo)) => {
                gizmo.apply(command);
                self.needs_redraw = true;
                true
            }
            _ => false,
        }
    }

    pub fn handle_key_up(&mut self, key: Key) -> bool {
        match (key_up_command(key), self.gizmo.as_mut()) {
            (Some(command), Some(gizmo)) => {
                gizmo.apply(command);
                true
            }
            _ => false,
        }
    }

    /// Drag the gizmo by a world-space delta (radians when rotating)
    pub fn drag_gizmo(&mut self, delta: Vector3<f32>) -> bool {
        let (Some(gizmo), Some((id, object))) = (self.gizmo.as_mut(), self.scene.primary_mut()) else {
            return false;
        };
        if gizmo.attached() != Some(id) {
            return false;
        }
        let changed = gizmo.drag(&mut object.transform, delta) == Some(GizmoEvent::Changed);
        self.needs_redraw |= changed;
        changed
    }

    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.controls.rotate(&mut self.camera, dx, dy);
        self.needs_redraw = true;
    }

    pub fn zoom(&mut self, delta: f32) {
        self.controls.zoom(&mut self.camera, delta);
        self.needs_redraw = true;
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.controls.pan(&mut self.camera, dx, dy);
        self.needs_redraw = true;
    }

    pub fn resize(&mut self, width: u32, height: u32, surface: &mut dyn RenderSurface) {
        self.camera.set_viewport(width, height);
        surface.resize(width, height);
        self.needs_redraw = true;
    }

    /// Stop the render loop and release host registrations
    pub fn teardown(&mut self) {
        if !self.running && self.subscriptions.is_empty() {
            return;
        }
        self.running = false;
        for subscription in self.subscriptions.drain(..) {
            subscription.release();
        }
        if let Some(gizmo) = self.gizmo.as_mut() {
            gizmo.detach();
        }
        info!("viewer torn down");
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn load_state(&self) -> &LoadState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    pub fn request(&self) -> Option<&ViewerRequest> {
        self.request.as_ref()
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn gizmo(&self) -> Option<&dyn ManipulationGizmo> {
        self.gizmo.as_deref()
    }
}
