//! Triangle rasterization: clipping against the camera plane, bounding box traversal,
//! barycentric coverage, depth test and fragment shading.

use na::{vector, Matrix3, Vector2, Vector3, Vector4};
use nalgebra as na;

use super::buffer::FrameBuffer;
use super::shader::Shader;
use super::util::project;

/// Triangles with |2 * area| below this in screen space are treated as covering nothing.
pub const DEGENERATE_EPSILON: f32 = 1e-2;

/// Smallest `w` a vertex may have to be drawn. Anything closer to (or behind) the camera plane
/// gets clipped away.
pub const NEAR_W: f32 = 1e-5;

/// Vertex of a triangle after clipping, together with its barycentric coordinates in the
/// triangle it was cut from. Those are what varyings of the shader are indexed by.
#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    position: Vector4<f32>,
    weights: Vector3<f32>,
}

impl ClipVertex {
    fn lerp(&self, other: &ClipVertex, t: f32) -> ClipVertex {
        return ClipVertex {
            position: self.position.lerp(&other.position, t),
            weights: self.weights.lerp(&other.weights, t),
        };
    }
}

/// Barycentric coordinates of `p` relative to triangle `a`, `b`, `c`.
///
/// For a degenerate triangle returns something with a negative coordinate, so the point
/// is just treated as outside.
pub fn barycentric(a: Vector2<f32>, b: Vector2<f32>, c: Vector2<f32>, p: Vector2<f32>) -> Vector3<f32> {
    let raw_cross = vector![b.x - a.x, c.x - a.x, a.x - p.x].cross(&vector![b.y - a.y, c.y - a.y, a.y - p.y]);
    if raw_cross.z.abs() < DEGENERATE_EPSILON {
        return vector![-1.0, 1.0, 1.0];
    }
    return vector![
        1.0 - (raw_cross.x + raw_cross.y) / raw_cross.z,
        raw_cross.x / raw_cross.z,
        raw_cross.y / raw_cross.z
    ];
}

/// Depth from interpolated clip space z and w, clamped and rounded to [0, depth_range].
fn quantize_depth(z: f32, w: f32, depth_range: i32) -> i32 {
    return (z / w).clamp(0.0, depth_range as f32).round() as i32;
}

/// Draws a triangle given in clip space (before perspective divide) into the frame.
///
/// Fragments pass the depth test if they are at least as close as what is already in the
/// z-buffer, so on equal depth the last drawn triangle wins. Returns number of written pixels.
pub fn draw_triangle<S: Shader + ?Sized>(clip: &[Vector4<f32>; 3], shader: &S, frame: &mut FrameBuffer) -> usize {
    let vertices = [0, 1, 2].map(|i| ClipVertex {
        position: clip[i],
        weights: Matrix3::<f32>::identity().column(i).into_owned(),
    });
    // Overflowed model coordinates end up here as inf or NaN, such triangle can't cover anything.
    if clip.iter().any(|v| !v.iter().all(|c| c.is_finite())) {
        return 0;
    }
    if clip.iter().all(|v| v.w >= NEAR_W) {
        return rasterize(&vertices, shader, frame);
    }

    return clip_near(&vertices)
        .iter()
        .map(|triangle| rasterize(triangle, shader, frame))
        .sum();
}

/// Cuts away the part of the triangle with `w < NEAR_W`. What's left is a polygon of up to
/// 4 vertices, returned as a fan of triangles.
fn clip_near(triangle: &[ClipVertex; 3]) -> Vec<[ClipVertex; 3]> {
    let mut polygon: Vec<ClipVertex> = Vec::with_capacity(4);
    for i in 0..3 {
        let current = triangle[i];
        let next = triangle[(i + 1) % 3];
        let current_inside = current.position.w >= NEAR_W;
        let next_inside = next.position.w >= NEAR_W;
        if current_inside {
            polygon.push(current);
        }
        if current_inside != next_inside {
            let t = (NEAR_W - current.position.w) / (next.position.w - current.position.w);
            polygon.push(current.lerp(&next, t));
        }
    }
    if polygon.len() < 3 {
        return Vec::new();
    }
    return (1..polygon.len() - 1)
        .map(|i| [polygon[0], polygon[i], polygon[i + 1]])
        .collect();
}

fn rasterize<S: Shader + ?Sized>(vertices: &[ClipVertex; 3], shader: &S, frame: &mut FrameBuffer) -> usize {
    if frame.width() == 0 || frame.rows().is_empty() {
        return 0;
    }

    let inv_w = vector![
        1.0 / vertices[0].position.w,
        1.0 / vertices[1].position.w,
        1.0 / vertices[2].position.w
    ];
    let screen = [0, 1, 2].map(|i| project(vertices[i].position * inv_w[i]).xy());
    let z_values = vector![vertices[0].position.z, vertices[1].position.z, vertices[2].position.z];
    let w_values = vector![vertices[0].position.w, vertices[1].position.w, vertices[2].position.w];
    // Columns are coordinates of the vertices in the triangle the shader knows about.
    let weights = Matrix3::from_columns(&[vertices[0].weights, vertices[1].weights, vertices[2].weights]);

    // Bounding box cut to the part of the frame owned by the buffer. Cutting happens in floats,
    // so far away vertices can't overflow the integer conversion.
    let rows = frame.rows();
    let min_x = screen.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
    let max_x = screen.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max);
    let min_y = screen.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
    let max_y = screen.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);
    let x_from = min_x.floor().max(0.0) as i64;
    let x_to = max_x.ceil().min((frame.width() - 1) as f32) as i64;
    let y_from = min_y.floor().max(rows.start as f32) as i64;
    let y_to = max_y.ceil().min((rows.end - 1) as f32) as i64;

    let mut written = 0;
    // Empty when the triangle is off the frame, from > to.
    for y in y_from..=y_to {
        for x in x_from..=x_to {
            let point = vector![x as f32, y as f32];
            let bar_screen = barycentric(screen[0], screen[1], screen[2], point);
            // Negated so NaN weights are outside too.
            if !(bar_screen.x >= 0.0 && bar_screen.y >= 0.0 && bar_screen.z >= 0.0) {
                continue;
            }

            let (x, y) = (x as u32, y as u32);
            let depth = quantize_depth(bar_screen.dot(&z_values), bar_screen.dot(&w_values), frame.depth_range());
            if frame.depth(x, y) > depth {
                continue;
            }

            // Perspective correction: screen space weights don't interpolate linearly in clip space.
            let mut bar_clip = bar_screen.component_mul(&inv_w);
            bar_clip /= bar_clip.sum();
            if let Some(color) = shader.fragment(weights * bar_clip) {
                frame.write(x, y, color, depth);
                written += 1;
            }
        }
    }
    return written;
}
