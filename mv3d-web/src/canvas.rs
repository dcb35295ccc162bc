/// Canvas 2D render surface
///
/// Triangles are filled back to front (painter's algorithm); helper lines
/// go underneath and gizmo handles on top.
use nalgebra::Vector3;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use mv3d_core::{Frame, LineSegment, RenderSurface, Rgb, ScreenPoint};

const DEFAULT_SURFACE: Rgb = Rgb::from_hex(0xcccccc);
const GIZMO_LINE_WIDTH: f64 = 3.0;

/// A projected, shaded triangle ready to fill
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenTriangle {
    pub points: [ScreenPoint; 3],
    pub color: Rgb,
    pub depth: f32,
}

/// Project and shade the primary object's triangles, farthest first
pub fn painter_triangles(frame: &Frame<'_>, width: u32, height: u32) -> Vec<ScreenTriangle> {
    let Some((_, object)) = frame.scene.primary() else {
        return Vec::new();
    };
    let model = object.transform.model_matrix();
    let mvp = frame.camera.view_projection() * model;

    let mut triangles: Vec<ScreenTriangle> = object
        .mesh
        .triangles
        .iter()
        .filter_map(|triangle| {
            let [a, b, c] = &triangle.vertices;
            let points = [
                frame.camera.project_to_screen(&a.position, &mvp, width, height)?,
                frame.camera.project_to_screen(&b.position, &mvp, width, height)?,
                frame.camera.project_to_screen(&c.position, &mvp, width, height)?,
            ];
            let normal = model
                .transform_vector(&triangle.calculate_normal())
                .try_normalize(1e-6)
                .unwrap_or_else(Vector3::zeros);
            let base = object.slot_color(triangle.material).unwrap_or(DEFAULT_SURFACE);
            Some(ScreenTriangle {
                points,
                color: frame.shade(&normal, base),
                depth: points.iter().map(|p| p.depth).sum::<f32>() / 3.0,
            })
        })
        .collect();

    triangles.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    triangles
}

pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    clear_color: Rgb,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, wasm_bindgen::JsValue> {
        let context = canvas
            .get_context("2d")?
            .ok_or_else(|| wasm_bindgen::JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self {
            canvas,
            context,
            clear_color: Rgb::BLACK,
        })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn stroke_lines(&self, frame: &Frame<'_>, lines: &[LineSegment], line_width: f64) {
        let (width, height) = self.size();
        let mvp = frame.camera.view_projection();
        self.context.set_line_width(line_width);
        for line in lines {
            let Some((a, b)) = frame.camera.project_segment(&line.from, &line.to, &mvp, width, height) else {
                continue;
            };
            self.context.set_stroke_style_str(&line.color.to_css());
            self.context.begin_path();
            self.context.move_to(a.x as f64, a.y as f64);
            self.context.line_to(b.x as f64, b.y as f64);
            self.context.stroke();
        }
    }

    fn fill_triangles(&self, triangles: &[ScreenTriangle]) {
        for triangle in triangles {
            let css = triangle.color.to_css();
            let [a, b, c] = triangle.points;
            self.context.set_fill_style_str(&css);
            // Stroke in the same colour to hide seams between neighbours
            self.context.set_stroke_style_str(&css);
            self.context.set_line_width(1.0);
            self.context.begin_path();
            self.context.move_to(a.x as f64, a.y as f64);
            self.context.line_to(b.x as f64, b.y as f64);
            self.context.line_to(c.x as f64, c.y as f64);
            self.context.close_path();
            self.context.fill();
            self.context.stroke();
        }
    }
}

impl RenderSurface for CanvasSurface {
    fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }

    fn set_clear_color(&mut self, color: Rgb) {
        self.clear_color = color;
    }

    fn render(&mut self, frame: &Frame<'_>) {
        let (width, height) = self.size();
        self.context.set_fill_style_str(&self.clear_color.to_css());
        self.context.fill_rect(0.0, 0.0, width as f64, height as f64);

        self.stroke_lines(frame, &frame.helper_lines(), 1.0);
        self.fill_triangles(&painter_triangles(frame, width, height));
        self.stroke_lines(frame, &frame.gizmo_lines(), GIZMO_LINE_WIDTH);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mv3d_core::{AssetFormat, Camera, LoadedObject, Mesh, NodeKind, SceneGraph};

    #[test]
    fn test_painter_order_is_far_to_near() {
        let mut scene = SceneGraph::new();
        scene.populate_helpers();
        scene
            .add(NodeKind::Primary(Box::new(LoadedObject::new(
                "cube",
                AssetFormat::Fbx,
                Mesh::cube(50.0),
            ))))
            .unwrap();
        let camera = Camera::new(640, 480);
        let frame = Frame {
            scene: &scene,
            camera: &camera,
            gizmo: None,
        };

        let triangles = painter_triangles(&frame, 640, 480);
        assert_eq!(triangles.len(), 12);
        assert!(triangles.windows(2).all(|w| w[0].depth >= w[1].depth));

        // The face towards the camera is drawn last and lit
        let nearest = triangles.last().unwrap();
        assert_ne!(nearest.color, Rgb::BLACK);
    }

    #[test]
    fn test_no_primary_no_triangles() {
        let scene = SceneGraph::new();
        let camera = Camera::default();
        let frame = Frame {
            scene: &scene,
            camera: &camera,
            gizmo: None,
        };
        assert!(painter_triangles(&frame, 100, 100).is_empty());
    }
}
