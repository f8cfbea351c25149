//! Matrices taking model space to the frame buffer: view (look-at), projection and viewport.
//! They are always composed as `viewport * projection * view`.

use na::{matrix, Matrix4, Vector3};
use nalgebra as na;

use super::util::{normalize_or_zero, MIN_NORM};

/// Matrix moving the world into the basis around the camera.
///
/// New basis is `z = eye - target`, `x = up x z`, `y = z x x`, with origin translated to `target`.
/// Degenerate when `up` is parallel to `eye - target`. A camera sitting in the target keeps
/// looking down the world -z axis, same as `projection` leaves it without perspective.
pub fn look_at(eye: Vector3<f32>, target: Vector3<f32>, up: Vector3<f32>) -> Matrix4<f32> {
    let new_z = (eye - target).try_normalize(MIN_NORM).unwrap_or_else(Vector3::z);
    let new_x = normalize_or_zero(up.cross(&new_z));
    let new_y = new_z.cross(&new_x);
    let rotation = matrix![new_x.x, new_x.y, new_x.z, 0.0;
                           new_y.x, new_y.y, new_y.z, 0.0;
                           new_z.x, new_z.y, new_z.z, 0.0;
                           0.0,     0.0,     0.0,     1.0];
    let translation = matrix![1.0, 0.0, 0.0, -target.x;
                              0.0, 1.0, 0.0, -target.y;
                              0.0, 0.0, 1.0, -target.z;
                              0.0, 0.0, 0.0, 1.0];
    return rotation * translation;
}

/// Simple pinhole projection. After it `w = 1 - z / |eye - target|`, so the final divide
/// shrinks everything further away from the camera.
pub fn projection(eye: Vector3<f32>, target: Vector3<f32>) -> Matrix4<f32> {
    let mut projection_matrix = Matrix4::identity();
    let distance = (eye - target).norm();
    // Camera sitting in the target has no meaningful perspective, leaving identity.
    if distance > 0.0 {
        projection_matrix[(3, 2)] = -1.0 / distance;
    }
    return projection_matrix;
}

/// Maps [-1, 1]^3 cube to [x, x + w] * [y, y + h] * [0, depth].
pub fn viewport(x: f32, y: f32, w: f32, h: f32, depth: f32) -> Matrix4<f32> {
    return matrix![w / 2.0, 0.0,     0.0,         x + w / 2.0;
                   0.0,     h / 2.0, 0.0,         y + h / 2.0;
                   0.0,     0.0,     depth / 2.0, depth / 2.0;
                   0.0,     0.0,     0.0,         1.0];
}

#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub eye: Vector3<f32>,
    pub target: Vector3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn view(&self) -> Matrix4<f32> {
        return look_at(self.eye, self.target, self.up);
    }

    pub fn projection(&self) -> Matrix4<f32> {
        return projection(self.eye, self.target);
    }
}

/// The three stages of the vertex transform, kept apart so each can be swapped out.
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub viewport: Matrix4<f32>,
}

impl Transform {
    /// Transform for a camera looking at a frame of the given size. The picture takes
    /// the central 3/4 of the frame in both directions.
    pub fn from_camera(camera: &Camera, width: u32, height: u32, depth: f32) -> Self {
        let w = width as f32;
        let h = height as f32;
        return Self {
            view: camera.view(),
            projection: camera.projection(),
            viewport: viewport(w / 8.0, h / 8.0, w * 3.0 / 4.0, h * 3.0 / 4.0, depth),
        };
    }

    #[cfg(test)]
    pub fn identity() -> Self {
        return Self {
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            viewport: Matrix4::identity(),
        };
    }

    /// Full chain, applied to vertices in homogenous coordinates.
    pub fn combined(&self) -> Matrix4<f32> {
        return self.viewport * self.projection * self.view;
    }
}
