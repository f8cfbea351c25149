pub mod buffer;
pub mod model;
pub mod raster;
pub mod shader;
pub mod tiles;
pub mod transform;
pub mod util;

use log::debug;
use na::Vector3;
use nalgebra as na;

use buffer::FrameBuffer;
use model::Model;
use shader::Shader;
use transform::{Camera, Transform};

/// Everything a frame is rendered with besides the model: transform chain and light.
/// Lives for one render call.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    pub transform: Transform,
    pub light_direction: Vector3<f32>, // Surfaces with normals along it are lit the most.
}

impl RenderContext {
    pub fn new(camera: &Camera, light_direction: Vector3<f32>, width: u32, height: u32, depth_range: i32) -> Self {
        return Self {
            transform: Transform::from_camera(camera, width, height, depth_range as f32),
            light_direction,
        };
    }
}

/// What a render call did, mostly for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    pub faces: usize,     // Faces sent to the rasterizer.
    pub fragments: usize, // Pixel writes, overdraw included.
}

/// Draws every face of the model into the frame. The frame is not cleared, so several calls
/// accumulate with depth testing between them.
pub fn render<S: Shader + ?Sized>(model: &Model, shader: &mut S, frame: &mut FrameBuffer) -> RenderStats {
    let mut stats = RenderStats::default();
    for face in 0..model.face_count() {
        let clip = [0, 1, 2].map(|nth_vertex| shader.vertex(face, nth_vertex));
        stats.fragments += raster::draw_triangle(&clip, &*shader, frame);
        stats.faces += 1;
    }
    debug!(
        "rendered rows {:?}: {} faces, {} fragments",
        frame.rows(),
        stats.faces,
        stats.fragments
    );
    return stats;
}

#[cfg(test)]
mod tests {
    use super::*;
    use buffer::DEPTH_SENTINEL;
    use image::Rgb;
    use model::VertexIndex;
    use na::vector;
    use shader::{GreyShader, ShaderKind};

    /// The unit right triangle at z = 1 with all normals set to `normal`.
    fn unit_triangle(normal: Vector3<f32>) -> Model {
        let faces = vec![[0, 1, 2].map(|i| VertexIndex { position: i, uv: 0, normal: 0 })];
        return Model::from_parts(
            vec![vector![0.0, 0.0, 1.0], vector![1.0, 0.0, 1.0], vector![0.0, 1.0, 1.0]],
            vec![vector![0.0, 0.0]],
            vec![normal],
            faces,
            None,
        );
    }

    fn identity_context(light_direction: Vector3<f32>) -> RenderContext {
        return RenderContext {
            transform: Transform::identity(),
            light_direction,
        };
    }

    #[test]
    fn unit_triangle_under_identity_fills_right_triangle() {
        let model = unit_triangle(vector![0.0, 0.0, -1.0]);
        let context = identity_context(vector![0.0, 0.0, -1.0]);
        let mut shader = GreyShader::new(&model, &context);
        let mut frame = FrameBuffer::new(4, 4, 255);
        let stats = render(&model, &mut shader, &mut frame);
        assert_eq!(stats, RenderStats { faces: 1, fragments: 3 });

        let inside = [(0, 0), (1, 0), (0, 1)];
        for y in 0..4 {
            for x in 0..4 {
                if inside.contains(&(x, y)) {
                    assert_eq!(frame.color(x, y), Rgb([255, 255, 255]));
                    assert_eq!(frame.depth(x, y), 1);
                } else {
                    assert_eq!(frame.color(x, y), Rgb([0, 0, 0]));
                    assert_eq!(frame.depth(x, y), DEPTH_SENTINEL);
                }
            }
        }
    }

    #[test]
    fn scaled_unit_triangle_has_uniform_intensity() {
        let model = unit_triangle(vector![0.0, 0.0, -1.0]);
        let mut context = identity_context(vector![0.0, 0.0, -1.0]);
        context.transform.viewport = transform::viewport(-20.0, -20.0, 40.0, 40.0, 2.0);
        let mut shader = GreyShader::new(&model, &context);
        let mut frame = FrameBuffer::new(32, 32, 2);
        let stats = render(&model, &mut shader, &mut frame);
        // Maps to (0, 0), (20, 0), (0, 20).
        assert_eq!(stats.fragments, (1..=21).sum::<usize>());
        let first = frame.color(0, 0);
        assert_ne!(first, Rgb([0, 0, 0]));
        for y in 0..32u32 {
            for x in 0..32u32 {
                if x + y <= 20 {
                    assert_eq!(frame.color(x, y), first);
                    assert_eq!(frame.depth(x, y), 2);
                } else {
                    assert_eq!(frame.depth(x, y), DEPTH_SENTINEL);
                }
            }
        }
    }

    #[test]
    fn perpendicular_light_gives_black() {
        let model = unit_triangle(vector![0.0, 0.0, -1.0]);
        let context = identity_context(vector![1.0, 0.0, 0.0]);
        let mut shader = GreyShader::new(&model, &context);
        let mut frame = FrameBuffer::new(4, 4, 255);
        let stats = render(&model, &mut shader, &mut frame);
        assert_eq!(stats.fragments, 3);
        for (x, y) in [(0, 0), (1, 0), (0, 1)] {
            assert_eq!(frame.color(x, y), Rgb([0, 0, 0]));
            // Still drawn, just black.
            assert_eq!(frame.depth(x, y), 1);
        }
    }

    #[test]
    fn camera_render_puts_model_in_the_middle() {
        // Square facing the camera, two triangles.
        let faces = vec![
            [0, 1, 2].map(|i| VertexIndex { position: i, uv: 0, normal: 0 }),
            [0, 2, 3].map(|i| VertexIndex { position: i, uv: 0, normal: 0 }),
        ];
        let model = Model::from_parts(
            vec![
                vector![-0.5, -0.5, 0.0],
                vector![0.5, -0.5, 0.0],
                vector![0.5, 0.5, 0.0],
                vector![-0.5, 0.5, 0.0],
            ],
            vec![vector![0.0, 0.0]],
            vec![vector![0.0, 0.0, 1.0]],
            faces,
            None,
        );
        let camera = Camera {
            eye: vector![0.0, 0.0, 3.0],
            target: Vector3::zeros(),
            up: vector![0.0, 1.0, 0.0],
        };
        let context = RenderContext::new(&camera, vector![0.0, 0.0, 1.0], 64, 64, 255);
        let mut shader = ShaderKind::Grey.build(&model, &context);
        let mut frame = FrameBuffer::new(64, 64, 255);
        let stats = render(&model, shader.as_mut(), &mut frame);
        assert_eq!(stats.faces, 2);
        // Square spans pixels 20..=44 in both directions.
        assert_eq!(frame.color(36, 28), Rgb([255, 255, 255]));
        assert_eq!(frame.depth(0, 0), DEPTH_SENTINEL);
        assert_eq!(frame.depth(63, 63), DEPTH_SENTINEL);
        // Plane through the target sits in the middle of the depth range.
        assert!((127..=128).contains(&frame.depth(36, 28)));
    }

    #[test]
    fn closer_surface_hides_farther_one() {
        // Two overlapping triangles, the one at z = 0.5 is closer to the camera at z = 3.
        let faces = vec![
            [0, 1, 2].map(|i| VertexIndex { position: i, uv: 0, normal: 0 }),
            [3, 4, 5].map(|i| VertexIndex { position: i, uv: 0, normal: 1 }),
        ];
        let positions = vec![
            vector![-1.0, -1.0, 0.5],
            vector![1.0, -1.0, 0.5],
            vector![0.0, 1.0, 0.5],
            vector![-1.0, -1.0, -0.5],
            vector![1.0, -1.0, -0.5],
            vector![0.0, 1.0, -0.5],
        ];
        // The near one faces the light, the far one doesn't.
        let normals = vec![vector![0.0, 0.0, 1.0], vector![0.0, 0.0, -1.0]];
        let camera = Camera {
            eye: vector![0.0, 0.0, 3.0],
            target: Vector3::zeros(),
            up: vector![0.0, 1.0, 0.0],
        };
        let context = RenderContext::new(&camera, vector![0.0, 0.0, 1.0], 64, 64, 255);

        for order in [faces.clone(), faces.iter().rev().copied().collect()] {
            let model = Model::from_parts(positions.clone(), vec![vector![0.0, 0.0]], normals.clone(), order, None);
            let mut shader = GreyShader::new(&model, &context);
            let mut frame = FrameBuffer::new(64, 64, 255);
            render(&model, &mut shader, &mut frame);
            assert_eq!(frame.color(32, 30), Rgb([255, 255, 255]));
        }
    }
}
