//! Parallel rendering. The frame is cut into horizontal bands, every band is rendered on its
//! own thread with its own shader instance and the bands are stitched together afterwards.
//! Pixels of a band only ever see triangles in the same order as a sequential render would,
//! so the result is identical to it.

use std::sync::{mpsc, Arc};

use log::{debug, info};
use thiserror::Error;
use threadpool::ThreadPool;

use super::buffer::FrameBuffer;
use super::model::Model;
use super::shader::ShaderKind;
use super::{render, RenderContext, RenderStats};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{lost} of {bands} render bands never came back, worker thread panicked")]
    WorkerLost { lost: usize, bands: usize },
}

/// Rows of a `height` tall frame split into at most `count` bands of about equal height.
fn bands(height: u32, count: usize) -> Vec<std::ops::Range<u32>> {
    let count = count.clamp(1, height.max(1) as usize) as u32;
    let band_height = (height + count - 1) / count;
    return (0..count)
        .map(|i| (i * band_height).min(height)..((i + 1) * band_height).min(height))
        .filter(|rows| !rows.is_empty())
        .collect();
}

/// Renders the whole model into a fresh frame using `workers` threads.
pub fn render_tiled(
    model: Arc<Model>,
    kind: ShaderKind,
    context: RenderContext,
    width: u32,
    height: u32,
    depth_range: i32,
    workers: usize,
) -> Result<(FrameBuffer, RenderStats), RenderError> {
    let bands = bands(height, workers);
    info!("rendering {}x{} in {} bands on {} threads", width, height, bands.len(), workers.max(1));

    let pool = ThreadPool::new(workers.max(1));
    let (sender, receiver) = mpsc::channel();
    for rows in bands.iter().cloned() {
        let model = Arc::clone(&model);
        let sender = sender.clone();
        pool.execute(move || {
            let mut band = FrameBuffer::band(width, height, rows, depth_range);
            let mut shader = kind.build(&model, &context);
            let stats = render(&model, shader.as_mut(), &mut band);
            // Receiver only goes away once the caller stopped waiting for us.
            let _ = sender.send((band, stats));
        });
    }
    // Otherwise the loop below never ends when a job dies without sending.
    drop(sender);

    let mut frame = FrameBuffer::new(width, height, depth_range);
    let mut stats = RenderStats::default();
    let mut received = 0;
    for (band, band_stats) in receiver.iter() {
        debug!("band {:?} done", band.rows());
        frame.blit(&band);
        // Every band walks all faces, count them once.
        stats.faces = band_stats.faces;
        stats.fragments += band_stats.fragments;
        received += 1;
    }

    if received != bands.len() {
        return Err(RenderError::WorkerLost {
            lost: bands.len() - received,
            bands: bands.len(),
        });
    }
    return Ok((frame, stats));
}
