use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time;

use anyhow::{bail, Context};
use log::{error, info};
use nalgebra::{vector, Vector3};

use crate::scene::buffer::FrameBuffer;
use crate::scene::model::Model;
use crate::scene::shader::ShaderKind;
use crate::scene::tiles::render_tiled;
use crate::scene::transform::Camera;
use crate::scene::{render, RenderContext};

/// Everything a run needs to know.
pub struct Params {
    pub width: u32,
    pub height: u32,
    pub depth_range: i32,          // Depth buffer values go from 0 (far) to this (near).
    pub asset_path: PathBuf,       // .obj file, texture is looked up next to it.
    pub output_path: PathBuf,
    pub depth_output_path: PathBuf,
    pub camera: Camera,
    pub light_direction: Vector3<f32>,
    pub threads: usize,            // 1 renders on the calling thread.
}

impl Default for Params {
    fn default() -> Self {
        return Self {
            width: 800,
            height: 800,
            depth_range: 255,
            asset_path: PathBuf::from("obj/african_head.obj"),
            output_path: PathBuf::from("output.png"),
            depth_output_path: PathBuf::from("zbuffer.png"),
            camera: Camera {
                eye: vector![1.0, 1.0, 3.0],
                target: Vector3::zeros(),
                up: vector![0.0, 1.0, 0.0],
            },
            light_direction: vector![1.0, 1.0, 1.0],
            threads: thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        };
    }
}

/// Loads the model, renders one frame and writes color and depth images.
pub fn run(params: Params) -> anyhow::Result<()> {
    let model = match Model::open(&params.asset_path) {
        Ok(model) => model,
        Err(err) => {
            error!("{}", err);
            return Err(err).with_context(|| format!("can't load model {}", params.asset_path.display()));
        }
    };
    if model.face_count() == 0 {
        bail!("model {} has no faces", params.asset_path.display());
    }

    let kind = ShaderKind::for_model(&model);
    let context = RenderContext::new(
        &params.camera,
        params.light_direction,
        params.width,
        params.height,
        params.depth_range,
    );
    info!("rendering {} with {:?} shader", params.asset_path.display(), kind);

    let start = time::Instant::now();
    let (mut frame, stats) = if params.threads > 1 {
        render_tiled(
            Arc::new(model),
            kind,
            context,
            params.width,
            params.height,
            params.depth_range,
            params.threads,
        )?
    } else {
        let mut frame = FrameBuffer::new(params.width, params.height, params.depth_range);
        let mut shader = kind.build(&model, &context);
        let stats = render(&model, shader.as_mut(), &mut frame);
        (frame, stats)
    };
    info!(
        "{}x{} frame, {} faces, {} fragments in {} ms",
        frame.width(),
        frame.height(),
        stats.faces,
        stats.fragments,
        start.elapsed().as_millis()
    );

    // Origin to the top left corner, as image files expect.
    frame.flip_vertically();
    frame
        .color_image()
        .save(&params.output_path)
        .with_context(|| format!("can't write {}", params.output_path.display()))?;
    frame
        .depth_image()
        .save(&params.depth_output_path)
        .with_context(|| format!("can't write {}", params.depth_output_path.display()))?;
    info!(
        "wrote {} and {}",
        params.output_path.display(),
        params.depth_output_path.display()
    );

    return Ok(());
}
