use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use log::{debug, info, warn};
use na::{vector, Vector2, Vector3};
use nalgebra as na;
use obj::raw::object::Polygon;
use obj::raw::{parse_obj, RawObj};
use thiserror::Error;

use super::util::normalize_or_zero;

/// Color returned by `diffuse` for models without a texture.
const UNTEXTURED: Rgb<u8> = Rgb([255, 255, 255]);

/// Names of the diffuse texture relative to the model name, in lookup order.
const DIFFUSE_SUFFIXES: [&str; 2] = ["_diffuse.tga", "_diffuse.png"];

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to open model {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: obj::ObjError,
    },

    #[error("polygon {polygon} refers to {attribute} {index}, but there are only {count}")]
    BadIndex {
        polygon: usize,
        attribute: &'static str,
        index: usize,
        count: usize,
    },
}

/// Indices of the attributes of one vertex of a face in the flat attribute arrays.
/// The same position may come with different uvs and normals in different faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexIndex {
    pub position: usize,
    pub uv: usize,
    pub normal: usize,
}

/// Triangulated mesh with an optional diffuse texture.
/// Every face has all three attributes, missing ones are filled in on load.
pub struct Model {
    positions: Vec<Vector3<f32>>,
    uvs: Vec<Vector2<f32>>,
    normals: Vec<Vector3<f32>>, // Unit length.
    faces: Vec<[VertexIndex; 3]>,
    diffuse: Option<RgbImage>,
}

impl Model {
    /// Loads model from an .obj file. Diffuse texture is looked up next to it as
    /// `<name>_diffuse.tga` or `<name>_diffuse.png`, a model without one is still fine.
    pub fn open(path: &Path) -> Result<Self, ModelError> {
        let file = File::open(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw = parse_obj(BufReader::new(file)).map_err(|source| ModelError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let mut model = Self::from_raw(raw)?;
        info!(
            "loaded {}: {} vertices, {} faces, {} uvs, {} normals",
            path.display(),
            model.vertex_count(),
            model.face_count(),
            model.uvs.len(),
            model.normals.len()
        );

        match diffuse_texture_path(path) {
            Some(texture_path) => match image::open(&texture_path) {
                Ok(texture) => {
                    info!("loaded diffuse texture {}", texture_path.display());
                    model.diffuse = Some(texture.to_rgb8());
                }
                Err(err) => warn!("failed to load diffuse texture {}: {}", texture_path.display(), err),
            },
            None => debug!("no diffuse texture next to {}", path.display()),
        }

        return Ok(model);
    }

    /// Builds a model out of parsed .obj data, triangulating polygons as fans.
    pub fn from_raw(raw: RawObj) -> Result<Self, ModelError> {
        let positions: Vec<Vector3<f32>> = raw
            .positions
            .iter()
            .map(|&(x, y, z, _)| vector![x, y, z])
            .collect();
        let mut uvs: Vec<Vector2<f32>> = raw.tex_coords.iter().map(|&(u, v, _)| vector![u, v]).collect();
        let mut normals: Vec<Vector3<f32>> = raw
            .normals
            .iter()
            .map(|&(x, y, z)| vector![x, y, z].try_normalize(f32::EPSILON).unwrap_or_else(Vector3::z))
            .collect();

        let mut faces = Vec::with_capacity(raw.polygons.len());
        let mut default_uv: Option<usize> = None;
        for (polygon_index, polygon) in raw.polygons.iter().enumerate() {
            // Optional uv and normal indices per corner.
            let corners: Vec<(usize, Option<usize>, Option<usize>)> = match polygon {
                Polygon::P(ps) => ps.iter().map(|&p| (p, None, None)).collect(),
                Polygon::PT(pts) => pts.iter().map(|&(p, t)| (p, Some(t), None)).collect(),
                Polygon::PN(pns) => pns.iter().map(|&(p, n)| (p, None, Some(n))).collect(),
                Polygon::PTN(ptns) => ptns.iter().map(|&(p, t, n)| (p, Some(t), Some(n))).collect(),
            };
            if corners.len() < 3 {
                debug!("skipping polygon {} with {} vertices", polygon_index, corners.len());
                continue;
            }
            for &(p, t, n) in &corners {
                check_index(polygon_index, "position", p, positions.len())?;
                if let Some(t) = t {
                    check_index(polygon_index, "uv", t, uvs.len())?;
                }
                if let Some(n) = n {
                    check_index(polygon_index, "normal", n, normals.len())?;
                }
            }

            for i in 1..corners.len() - 1 {
                let triangle = [corners[0], corners[i], corners[i + 1]];
                let mut face_normal: Option<usize> = None;
                let mut face = [VertexIndex { position: 0, uv: 0, normal: 0 }; 3];
                for (k, &(p, t, n)) in triangle.iter().enumerate() {
                    let uv = match t {
                        Some(t) => t,
                        None => *default_uv.get_or_insert_with(|| {
                            uvs.push(Vector2::zeros());
                            uvs.len() - 1
                        }),
                    };
                    let normal = match n {
                        Some(n) => n,
                        None => *face_normal.get_or_insert_with(|| {
                            let [a, b, c] = triangle.map(|corner| positions[corner.0]);
                            let cross = (b - a).cross(&(c - a));
                            normals.push(cross.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::z));
                            normals.len() - 1
                        }),
                    };
                    face[k] = VertexIndex { position: p, uv, normal };
                }
                faces.push(face);
            }
        }

        return Ok(Self::from_parts(positions, uvs, normals, faces, None));
    }

    /// Model from already prepared attribute arrays. Indices of the faces must be in range of
    /// the arrays, normals are normalized here.
    pub fn from_parts(
        positions: Vec<Vector3<f32>>,
        uvs: Vec<Vector2<f32>>,
        normals: Vec<Vector3<f32>>,
        faces: Vec<[VertexIndex; 3]>,
        diffuse: Option<RgbImage>,
    ) -> Self {
        let normals = normals.into_iter().map(normalize_or_zero).collect();
        return Self {
            positions,
            uvs,
            normals,
            faces,
            diffuse,
        };
    }

    pub fn vertex_count(&self) -> usize {
        return self.positions.len();
    }

    pub fn face_count(&self) -> usize {
        return self.faces.len();
    }

    pub fn face(&self, face: usize) -> [VertexIndex; 3] {
        return self.faces[face];
    }

    pub fn position(&self, face: usize, nth_vertex: usize) -> Vector3<f32> {
        return self.positions[self.face(face)[nth_vertex].position];
    }

    /// Unit normal of the vertex of the face.
    pub fn normal(&self, face: usize, nth_vertex: usize) -> Vector3<f32> {
        return self.normals[self.face(face)[nth_vertex].normal];
    }

    pub fn uv(&self, face: usize, nth_vertex: usize) -> Vector2<f32> {
        return self.uvs[self.face(face)[nth_vertex].uv];
    }

    pub fn has_diffuse(&self) -> bool {
        return self.diffuse.is_some();
    }

    /// Nearest texel of the diffuse texture. UV is clamped to [0, 1], v grows upwards while
    /// texture rows grow downwards, so rows are flipped.
    pub fn diffuse(&self, uv: Vector2<f32>) -> Rgb<u8> {
        let texture = match &self.diffuse {
            Some(texture) => texture,
            None => return UNTEXTURED,
        };
        if texture.width() == 0 || texture.height() == 0 {
            return UNTEXTURED;
        }
        let u = uv.x.clamp(0.0, 1.0);
        let v = uv.y.clamp(0.0, 1.0);
        let x = ((u * texture.width() as f32) as u32).min(texture.width() - 1);
        let y = (((1.0 - v) * texture.height() as f32) as u32).min(texture.height() - 1);
        return *texture.get_pixel(x, y);
    }
}

fn check_index(polygon: usize, attribute: &'static str, index: usize, count: usize) -> Result<(), ModelError> {
    if index >= count {
        return Err(ModelError::BadIndex {
            polygon,
            attribute,
            index,
            count,
        });
    }
    return Ok(());
}

/// `dir/head.obj` -> `dir/head_diffuse.tga`, if such a file exists.
fn diffuse_texture_path(model_path: &Path) -> Option<PathBuf> {
    let stem = model_path.file_stem()?.to_string_lossy().into_owned();
    return DIFFUSE_SUFFIXES
        .iter()
        .map(|suffix| model_path.with_file_name(format!("{}{}", stem, suffix)))
        .find(|candidate| candidate.is_file());
}
