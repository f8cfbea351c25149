//! Programmable part of the pipeline.
//!
//! Vertex stage is run for each vertex of a face and records per-vertex values (varyings) into
//! the shader, fragment stage is run for each covered pixel of that face and interpolates them.
//! Varyings live in the shader instance and only describe the face currently being drawn.

use image::Rgb;
use na::{Matrix2x3, Matrix3, Matrix4, Vector3, Vector4};
use nalgebra as na;

use super::model::Model;
use super::util::{embed, normalize_or_zero, scale_color};
use super::RenderContext;

pub trait Shader {
    /// Returns clip-space position of the `nth_vertex` of the `face`, before perspective divide.
    /// Call with `nth_vertex == 0` starts a new face and resets the varyings.
    fn vertex(&mut self, face: usize, nth_vertex: usize) -> Vector4<f32>;

    /// Color of a fragment with the given barycentric coordinates in the current face,
    /// or `None` if the fragment has to be discarded.
    fn fragment(&self, bar_coord: Vector3<f32>) -> Option<Rgb<u8>>;
}

/// Per-vertex values of the face being drawn, one column per vertex.
#[derive(Debug, Default, Clone, Copy)]
pub struct Varyings {
    pub normals: Matrix3<f32>,
    pub uvs: Matrix2x3<f32>,
}

/// Values shared by every vertex and fragment of a frame.
#[derive(Debug, Clone, Copy)]
struct Uniforms {
    transform: Matrix4<f32>,       // Full model to screen transform.
    light_direction: Vector3<f32>, // Unit length.
}

impl Uniforms {
    fn new(context: &RenderContext) -> Self {
        return Self {
            transform: context.transform.combined(),
            light_direction: normalize_or_zero(context.light_direction),
        };
    }

    /// Diffuse coefficient for the normal interpolated from the varyings.
    fn intensity(&self, varyings: &Varyings, bar_coord: Vector3<f32>) -> f32 {
        let normal = varyings.normals * bar_coord;
        // Opposite normals can cancel out, such fragment gets no light.
        let normal = match normal.try_normalize(f32::EPSILON) {
            Some(normal) => normal,
            None => return 0.0,
        };
        return normal.dot(&self.light_direction).max(0.0);
    }
}

/// Smooth greyscale shading from interpolated vertex normals.
pub struct GreyShader<'a> {
    model: &'a Model,
    uniforms: Uniforms,
    varyings: Varyings,
}

impl<'a> GreyShader<'a> {
    pub fn new(model: &'a Model, context: &RenderContext) -> Self {
        return Self {
            model,
            uniforms: Uniforms::new(context),
            varyings: Varyings::default(),
        };
    }
}

impl Shader for GreyShader<'_> {
    fn vertex(&mut self, face: usize, nth_vertex: usize) -> Vector4<f32> {
        if nth_vertex == 0 {
            self.varyings = Varyings::default();
        }
        self.varyings
            .normals
            .set_column(nth_vertex, &self.model.normal(face, nth_vertex));
        return self.uniforms.transform * embed(self.model.position(face, nth_vertex), 1.0);
    }

    fn fragment(&self, bar_coord: Vector3<f32>) -> Option<Rgb<u8>> {
        let intensity = self.uniforms.intensity(&self.varyings, bar_coord);
        return Some(scale_color(Rgb([255, 255, 255]), intensity));
    }
}

/// Diffuse texture lit by interpolated vertex normals.
pub struct TexturedShader<'a> {
    model: &'a Model,
    uniforms: Uniforms,
    varyings: Varyings,
}

impl<'a> TexturedShader<'a> {
    pub fn new(model: &'a Model, context: &RenderContext) -> Self {
        return Self {
            model,
            uniforms: Uniforms::new(context),
            varyings: Varyings::default(),
        };
    }
}

impl Shader for TexturedShader<'_> {
    fn vertex(&mut self, face: usize, nth_vertex: usize) -> Vector4<f32> {
        if nth_vertex == 0 {
            self.varyings = Varyings::default();
        }
        self.varyings
            .normals
            .set_column(nth_vertex, &self.model.normal(face, nth_vertex));
        self.varyings
            .uvs
            .set_column(nth_vertex, &self.model.uv(face, nth_vertex));
        return self.uniforms.transform * embed(self.model.position(face, nth_vertex), 1.0);
    }

    fn fragment(&self, bar_coord: Vector3<f32>) -> Option<Rgb<u8>> {
        let intensity = self.uniforms.intensity(&self.varyings, bar_coord);
        let uv = self.varyings.uvs * bar_coord;
        return Some(scale_color(self.model.diffuse(uv), intensity));
    }
}

/// Which shader to draw a model with. Plain value, so it can be handed to other threads,
/// which build their own shader instances from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    Grey,
    Textured,
}

impl ShaderKind {
    /// Textured shading if the model has something to sample, greyscale otherwise.
    pub fn for_model(model: &Model) -> Self {
        if model.has_diffuse() {
            return ShaderKind::Textured;
        }
        return ShaderKind::Grey;
    }

    pub fn build<'a>(self, model: &'a Model, context: &RenderContext) -> Box<dyn Shader + 'a> {
        return match self {
            ShaderKind::Grey => Box::new(GreyShader::new(model, context)),
            ShaderKind::Textured => Box::new(TexturedShader::new(model, context)),
        };
    }
}
