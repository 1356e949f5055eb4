/// ASCII rasterizer for terminal rendering
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use meshview_core::{
    geometry::face_normal, Camera, CullMode, LineSegment, ProjectionMode, RenderBackend,
    RenderError, Shading, TriangleBatch,
};
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use std::io::Write;

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &['.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Terminal cells are roughly twice as tall as they are wide.
const CELL_HEIGHT_RATIO: u32 = 2;

/// One character cell of the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub color: Color,
}

impl Cell {
    const BLANK: Cell = Cell {
        ch: ' ',
        color: Color::Reset,
    };
}

/// ASCII renderer that rasterizes mesh buffers into terminal characters
pub struct AsciiRenderer<W: Write> {
    out: W,
    width: usize,
    height: usize,
    camera: Camera,
    depth_buffer: Vec<f32>,
    cells: Vec<Cell>,
}

impl<W: Write> AsciiRenderer<W> {
    pub fn new(out: W, width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            out,
            width,
            height,
            camera: Camera::new(width as u32, height as u32 * CELL_HEIGHT_RATIO),
            depth_buffer: vec![f32::INFINITY; size],
            cells: vec![Cell::BLANK; size],
        }
    }

    /// Change the frame size, e.g. after a terminal resize.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.camera.aspect = width as f32 / (height.max(1) as u32 * CELL_HEIGHT_RATIO) as f32;
        self.depth_buffer = vec![f32::INFINITY; width * height];
        self.cells = vec![Cell::BLANK; width * height];
    }

    pub fn set_projection(&mut self, mode: ProjectionMode) {
        self.camera.mode = mode;
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<Cell> {
        (x < self.width && y < self.height).then(|| self.cells[y * self.width + x])
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.cells.fill(Cell::BLANK);
    }

    fn project(&self, mvp: &Matrix4<f32>, p: &Point3<f32>) -> Option<(f32, f32, f32)> {
        Camera::project_to_screen(mvp, p, self.width as u32, self.height as u32)
    }

    /// Blinn-Phong intensity and color at one corner.
    fn shade(&self, world: &Point3<f32>, normal: Vector3<f32>, shading: &Shading) -> (f32, Color) {
        let to_eye = (self.camera.position - world)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::z);
        // Two-sided lighting unless back faces are culled
        let normal = if shading.cull_mode == CullMode::None && normal.dot(&to_eye) < 0.0 {
            -normal
        } else {
            normal
        };

        let light = shading.light.direction;
        let diffuse = normal.dot(&light).max(0.0);
        let half = (light + to_eye).try_normalize(f32::EPSILON).unwrap_or(light);
        let specular = if diffuse > 0.0 {
            normal.dot(&half).max(0.0).powf(shading.material.shininess)
        } else {
            0.0
        };

        let ambient = shading.light.ambient;
        let intensity = (ambient + (1.0 - ambient) * diffuse + specular).min(1.0);

        let [dr, dg, db, _] = shading.material.ambient_diffuse;
        let [sr, sg, sb, _] = shading.material.specular;
        let lit = ambient + (1.0 - ambient) * diffuse;
        let channel = |d: f32, s: f32| ((d * lit + s * specular).clamp(0.0, 1.0) * 255.0) as u8;
        let color = Color::Rgb {
            r: channel(dr, sr),
            g: channel(dg, sg),
            b: channel(db, sb),
        };
        (intensity, color)
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], shades: &[(f32, Color); 3]) {
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i64;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i64;
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i64;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i64;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i64 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i64 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                // Barycentric coordinates
                let Some((w0, w1, w2)) =
                    barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py))
                else {
                    return;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                // Interpolate depth
                let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    let intensity = w0 * shades[0].0 + w1 * shades[1].0 + w2 * shades[2].0;
                    let nearest = if w0 >= w1 && w0 >= w2 {
                        0
                    } else if w1 >= w2 {
                        1
                    } else {
                        2
                    };
                    self.depth_buffer[idx] = depth;
                    self.cells[idx] = Cell {
                        ch: ramp(intensity),
                        color: shades[nearest].1,
                    };
                }
            }
        }
    }

    /// Bresenham line drawn over everything, ignoring depth.
    fn rasterize_line(&mut self, from: (f32, f32), to: (f32, f32), color: Color) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let ch = line_char(dx, dy);

        let (mut x0, mut y0) = (from.0.floor() as i64, from.1.floor() as i64);
        let (x1, y1) = (to.0.floor() as i64, to.1.floor() as i64);
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let ex = (x1 - x0).abs();
        let ey = -(y1 - y0).abs();
        let mut err = ex + ey;

        loop {
            if x0 >= 0 && y0 >= 0 && (x0 as usize) < self.width && (y0 as usize) < self.height {
                self.cells[y0 as usize * self.width + x0 as usize] = Cell { ch, color };
            }
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= ey {
                err += ey;
                x0 += sx;
            }
            if e2 <= ex {
                err += ex;
                y0 += sy;
            }
        }
    }

    pub fn draw(&mut self) -> std::io::Result<()> {
        self.out.queue(cursor::MoveTo(0, 0))?;
        let mut current = Color::Reset;
        for y in 0..self.height {
            self.out.queue(cursor::MoveTo(0, y as u16))?;
            for x in 0..self.width {
                let cell = self.cells[y * self.width + x];
                if cell.color != current {
                    self.out.queue(SetForegroundColor(cell.color))?;
                    current = cell.color;
                }
                self.out.queue(Print(cell.ch))?;
            }
        }
        self.out.queue(ResetColor)?;
        Ok(())
    }
}

impl<W: Write> RenderBackend for AsciiRenderer<W> {
    fn begin_frame(&mut self) -> Result<(), RenderError> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::Surface(format!(
                "{}x{} terminal is too small to draw in",
                self.width, self.height
            )));
        }
        self.clear();
        Ok(())
    }

    fn draw_triangles(
        &mut self,
        batch: TriangleBatch<'_>,
        model: &Matrix4<f32>,
        shading: &Shading,
    ) -> Result<(), RenderError> {
        let mvp = self.camera.view_projection() * model;
        let linear: Matrix3<f32> = model.fixed_view::<3, 3>(0, 0).clone_owned();
        let normal_matrix = linear.try_inverse().map(|m| m.transpose()).unwrap_or(linear);

        for [a, b, c] in batch.triangles() {
            let corners = [a, b, c];
            let mut local = [Point3::origin(); 3];
            for (slot, &index) in local.iter_mut().zip(&corners) {
                *slot = batch.position(index).ok_or_else(|| {
                    RenderError::InvalidBuffer(format!("index {index} has no position"))
                })?;
            }

            let Some(coords) = self.project_triangle(&mvp, &local) else {
                continue; // Triangle is clipped
            };

            let area = (coords[1].0 - coords[0].0) * (coords[2].1 - coords[0].1)
                - (coords[1].1 - coords[0].1) * (coords[2].0 - coords[0].0);
            // Screen y grows downwards, so front faces have negative area
            if shading.cull_mode == CullMode::Back && area >= 0.0 {
                continue;
            }

            let world = local.map(|p| model.transform_point(&p));
            let flat = face_normal(&world[0], &world[1], &world[2]);
            let mut shades = [(0.0, Color::Reset); 3];
            for (i, shade) in shades.iter_mut().enumerate() {
                let normal = batch
                    .normal(corners[i])
                    .and_then(|n| (normal_matrix * n).try_normalize(f32::EPSILON))
                    .unwrap_or(flat);
                *shade = self.shade(&world[i], normal, shading);
            }

            self.rasterize_triangle(&coords, &shades);
        }
        Ok(())
    }

    fn draw_lines(
        &mut self,
        lines: &[LineSegment],
        model: &Matrix4<f32>,
    ) -> Result<(), RenderError> {
        let mvp = self.camera.view_projection() * model;
        for line in lines {
            let from = self.project(&mvp, &line.from);
            let to = self.project(&mvp, &line.to);
            let (Some(from), Some(to)) = (from, to) else {
                continue;
            };
            let [r, g, b] = line.color.map(|c| (c.clamp(0.0, 1.0) * 255.0) as u8);
            self.rasterize_line((from.0, from.1), (to.0, to.1), Color::Rgb { r, g, b });
        }
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        self.draw()?;
        Ok(())
    }
}

impl<W: Write> AsciiRenderer<W> {
    fn project_triangle(
        &self,
        mvp: &Matrix4<f32>,
        corners: &[Point3<f32>; 3],
    ) -> Option<[(f32, f32, f32); 3]> {
        Some([
            self.project(mvp, &corners[0])?,
            self.project(mvp, &corners[1])?,
            self.project(mvp, &corners[2])?,
        ])
    }
}

fn ramp(intensity: f32) -> char {
    let index = (intensity.clamp(0.0, 1.0) * (LUMINOSITY_RAMP.len() - 1) as f32).round() as usize;
    LUMINOSITY_RAMP[index.min(LUMINOSITY_RAMP.len() - 1)]
}

fn line_char(dx: f32, dy: f32) -> char {
    let angle = dy.atan2(dx).to_degrees().rem_euclid(180.0);
    match angle {
        a if !(22.5..157.5).contains(&a) => '-',
        a if a < 67.5 => '\\',
        a if a < 112.5 => '|',
        _ => '/',
    }
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
