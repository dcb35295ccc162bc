/// ASCII rasterizer for terminal rendering
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::{Matrix4, Vector3};
use std::io::Write;

use mv3d_core::{Frame, GizmoMode, LineSegment, LoadedObject, RenderSurface, Rgb, ScreenPoint, Triangle};

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Terminal cells are roughly twice as tall as they are wide
pub const CELL_ASPECT: u32 = 2;

/// Surface colour for triangles without a material
const DEFAULT_SURFACE: Rgb = Rgb::from_hex(0xcccccc);

/// ASCII renderer that converts the scene to terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    clear_color: Rgb,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    color_buffer: Vec<Rgb>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            clear_color: Rgb::BLACK,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            color_buffer: vec![Rgb::WHITE; size],
        }
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
        self.color_buffer.fill(Rgb::WHITE);
    }

    pub fn char_at(&self, x: usize, y: usize) -> Option<char> {
        (x < self.width && y < self.height).then(|| self.char_buffer[y * self.width + x])
    }

    pub fn color_at(&self, x: usize, y: usize) -> Option<Rgb> {
        (x < self.width && y < self.height).then(|| self.color_buffer[y * self.width + x])
    }

    pub fn clear_color(&self) -> Rgb {
        self.clear_color
    }

    fn render_object(&mut self, frame: &Frame<'_>, object: &LoadedObject) {
        let model = object.transform.model_matrix();
        let mvp = frame.camera.view_projection() * model;
        for triangle in &object.mesh.triangles {
            self.render_triangle(frame, object, triangle, &model, &mvp);
        }
    }

    fn render_triangle(
        &mut self,
        frame: &Frame<'_>,
        object: &LoadedObject,
        triangle: &Triangle,
        model: &Matrix4<f32>,
        mvp: &Matrix4<f32>,
    ) {
        // Project vertices to screen space
        let mut screen_coords = Vec::with_capacity(3);
        for vertex in &triangle.vertices {
            match frame
                .camera
                .project_to_screen(&vertex.position, mvp, self.width as u32, self.height as u32)
            {
                Some(point) => screen_coords.push(point),
                None => return, // Triangle is clipped
            }
        }

        // Shade with the world-space face normal
        let normal = model
            .transform_vector(&triangle.calculate_normal())
            .try_normalize(1e-6)
            .unwrap_or_else(Vector3::zeros);
        let base = object.slot_color(triangle.material).unwrap_or(DEFAULT_SURFACE);
        let color = frame.shade(&normal, base);

        self.rasterize_triangle(&screen_coords, ramp_char(color.luminance()), color);
    }

    fn rasterize_triangle(&mut self, coords: &[ScreenPoint], character: char, color: Rgb) {
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box
        let min_x = v0.x.min(v1.x).min(v2.x).floor() as i32;
        let max_x = v0.x.max(v1.x).max(v2.x).ceil() as i32;
        let min_y = v0.y.min(v1.y).min(v2.y).floor() as i32;
        let max_y = v0.y.max(v1.y).max(v2.y).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        // Scanline rasterization
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                // Barycentric coordinates
                if let Some((w0, w1, w2)) = barycentric((v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y), (px, py)) {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        // Interpolate depth
                        let depth = w0 * v0.depth + w1 * v1.depth + w2 * v2.depth;
                        self.plot(x as usize, y as usize, depth, character, color);
                    }
                }
            }
        }
    }

    fn render_lines(&mut self, frame: &Frame<'_>, lines: &[LineSegment], glyph: Option<char>, depth_tested: bool) {
        let mvp = frame.camera.view_projection();
        let (width, height) = (self.width as u32, self.height as u32);
        for line in lines {
            let Some((a, b)) = frame.camera.project_segment(&line.from, &line.to, &mvp, width, height) else {
                continue;
            };
            let Some((a, b)) = clip_to_rect(a, b, self.width as f32, self.height as f32) else {
                continue;
            };
            let character = glyph.unwrap_or_else(|| slope_char(b.x - a.x, b.y - a.y));
            self.draw_line(a, b, character, line.color, depth_tested);
        }
    }

    fn draw_line(&mut self, a: ScreenPoint, b: ScreenPoint, character: char, color: Rgb, depth_tested: bool) {
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let x = (a.x + dx * t).round();
            let y = (a.y + dy * t).round();
            if x < 0.0 || y < 0.0 {
                continue;
            }
            let depth = if depth_tested {
                a.depth + (b.depth - a.depth) * t
            } else {
                f32::NEG_INFINITY
            };
            self.plot(x as usize, y as usize, depth, character, color);
        }
    }

    fn plot(&mut self, x: usize, y: usize, depth: f32, character: char, color: Rgb) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = y * self.width + x;
        if depth < self.depth_buffer[idx] || depth == f32::NEG_INFINITY {
            self.depth_buffer[idx] = depth;
            self.char_buffer[idx] = character;
            self.color_buffer[idx] = color;
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.queue(SetBackgroundColor(to_terminal_color(self.clear_color)))?;
        for y in 0..self.height {
            writer.queue(cursor::MoveTo(0, y as u16))?;
            for x in 0..self.width {
                let idx = y * self.width + x;
                writer.queue(SetForegroundColor(to_terminal_color(self.color_buffer[idx])))?;
                writer.queue(Print(self.char_buffer[idx]))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl RenderSurface for AsciiRenderer {
    /// Size in square "pixels", so the camera aspect matches the terminal
    fn size(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32 * CELL_ASPECT)
    }

    fn resize(&mut self, width: u32, height: u32) {
        *self = Self {
            clear_color: self.clear_color,
            ..Self::new(width as usize, (height / CELL_ASPECT).max(1) as usize)
        };
    }

    fn set_clear_color(&mut self, color: Rgb) {
        self.clear_color = color;
    }

    fn render(&mut self, frame: &Frame<'_>) {
        self.clear();
        self.render_lines(frame, &frame.helper_lines(), None, true);
        if let Some((_, object)) = frame.scene.primary() {
            self.render_object(frame, object);
        }

        // Handles stay visible through the object
        let glyph = frame.gizmo.and_then(|view| match view.mode {
            GizmoMode::Translate => None,
            GizmoMode::Rotate => Some('o'),
            GizmoMode::Scale => Some('#'),
        });
        self.render_lines(frame, &frame.gizmo_lines(), glyph, false);
    }
}

fn to_terminal_color(color: Rgb) -> Color {
    Color::Rgb {
        r: color.r,
        g: color.g,
        b: color.b,
    }
}

/// Map brightness to a character on the ramp, never blank for a lit surface
fn ramp_char(brightness: f32) -> char {
    let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32) as usize;
    LUMINOSITY_RAMP[char_index.clamp(1, LUMINOSITY_RAMP.len() - 1)]
}

/// Pick a line glyph from the screen-space direction (y grows downwards)
fn slope_char(dx: f32, dy: f32) -> char {
    let (ax, ay) = (dx.abs(), dy.abs());
    if ay < ax * 0.5 {
        '-'
    } else if ax < ay * 0.5 {
        '|'
    } else if (dx > 0.0) == (dy > 0.0) {
        '\\'
    } else {
        '/'
    }
}

/// Liang-Barsky clip of a screen segment against the cell grid
fn clip_to_rect(a: ScreenPoint, b: ScreenPoint, width: f32, height: f32) -> Option<(ScreenPoint, ScreenPoint)> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let mut t0 = 0.0f32;
    let mut t1 = 1.0f32;
    for (p, q) in [(-dx, a.x), (dx, width - 1.0 - a.x), (-dy, a.y), (dy, height - 1.0 - a.y)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t1 {
                return None;
            }
            t0 = t0.max(t);
        } else {
            if t < t0 {
                return None;
            }
            t1 = t1.min(t);
        }
    }

    let at = |t: f32| ScreenPoint {
        x: a.x + dx * t,
        y: a.y + dy * t,
        depth: a.depth + (b.depth - a.depth) * t,
    };
    Some((at(t0), at(t1)))
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
