use image::Rgb;
use na::{vector, Vector3, Vector4};
use nalgebra as na;

/// Norm below which a vector is treated as zero by `normalize_or_zero`.
pub const MIN_NORM: f32 = 1e-12;

/// Embedding into homogenous coordinates, `fill` becomes the last coordinate.
/// Points use 1.0, directions use 0.0.
pub fn embed(v: Vector3<f32>, fill: f32) -> Vector4<f32> {
    return vector![v.x, v.y, v.z, fill];
}

/// Projection from homogenous coordinates. Simply drops the last coordinate, no division is done,
/// so `project(embed(v, fill)) == v` for any `v`.
pub fn project(v: Vector4<f32>) -> Vector3<f32> {
    return vector![v.x, v.y, v.z];
}

/// Normalization, which doesn't blow up on zero vectors.
///
/// Normalizing a zero vector has no meaningful answer, so callers are expected to never do it.
/// Debug builds assert on it, release builds return the zero vector.
pub fn normalize_or_zero(v: Vector3<f32>) -> Vector3<f32> {
    debug_assert!(v.norm() > MIN_NORM, "normalizing a zero-length vector");
    return v.try_normalize(MIN_NORM).unwrap_or_else(Vector3::zeros);
}

/// Scales every channel of the color by the intensity, which is clamped to [0.0, 1.0].
pub fn scale_color(color: Rgb<u8>, intensity: f32) -> Rgb<u8> {
    let t = intensity.clamp(0.0, 1.0);
    let [r, g, b] = color.0;
    return Rgb([
        (t * r as f32) as u8,
        (t * g as f32) as u8,
        (t * b as f32) as u8,
    ]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_undoes_embed_exactly() {
        let vectors = [
            vector![0.0, 0.0, 0.0],
            vector![1.5, -2.25, 3.125],
            vector![f32::MAX, f32::MIN_POSITIVE, -0.0],
            vector![1e-30, 7e20, -4.0],
        ];
        for v in vectors {
            assert_eq!(project(embed(v, 1.0)), v);
            assert_eq!(project(embed(v, 0.0)), v);
            assert_eq!(project(embed(v, -3.5)), v);
        }
    }

    #[test]
    fn embed_appends_fill() {
        let v = embed(vector![1.0, 2.0, 3.0], 1.0);
        assert_eq!(v, vector![1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn normalize_gives_unit_length() {
        let n = normalize_or_zero(vector![3.0, 0.0, 4.0]);
        assert!((n.norm() - 1.0).abs() < 1e-6);
        assert!((n.x - 0.6).abs() < 1e-6);
        assert!((n.z - 0.8).abs() < 1e-6);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn normalize_zero_is_zero_in_release() {
        assert_eq!(normalize_or_zero(Vector3::zeros()), Vector3::zeros());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "zero-length")]
    fn normalize_zero_asserts_in_debug() {
        normalize_or_zero(Vector3::zeros());
    }

    #[test]
    fn cross_is_perpendicular_to_both() {
        let a: Vector3<f32> = vector![1.0, 2.0, 3.0];
        let b: Vector3<f32> = vector![-2.0, 0.5, 4.0];
        let c = a.cross(&b);
        assert!(c.dot(&a).abs() < 1e-5);
        assert!(c.dot(&b).abs() < 1e-5);
    }

    #[test]
    fn scale_color_clamps_intensity() {
        let color = Rgb([200, 100, 50]);
        assert_eq!(scale_color(color, 1.0), color);
        assert_eq!(scale_color(color, 2.0), color);
        assert_eq!(scale_color(color, -1.0), Rgb([0, 0, 0]));
        assert_eq!(scale_color(color, 0.5), Rgb([100, 50, 25]));
    }
}
