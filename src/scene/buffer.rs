use std::ops::Range;

use image::{imageops, GrayImage, Luma, Rgb, RgbImage};

/// Depth value of a pixel nothing has been drawn to yet.
pub const DEPTH_SENTINEL: i32 = i32::MIN;

/// Color and depth images of a frame, addressed by pixel coordinate with (0, 0) in the bottom
/// left corner while rendering.
///
/// A buffer may own only a band of rows of the full frame, in which case it still takes
/// coordinates of the full frame, but only accepts the ones inside its band.
pub struct FrameBuffer {
    width: u32,
    height: u32,       // Height of the full frame, not of the band.
    rows: Range<u32>,  // Rows of the full frame owned by this buffer.
    depth_range: i32,  // Depth values are quantized to [0, depth_range].
    color: RgbImage,   // Band rows only, first row is rows.start.
    depth: Vec<i32>,   // Same layout as color.
}

impl FrameBuffer {
    /// Buffer for the whole frame, black and with an empty z-buffer.
    pub fn new(width: u32, height: u32, depth_range: i32) -> Self {
        return Self::band(width, height, 0..height, depth_range);
    }

    /// Buffer owning only `rows` of a `width` x `height` frame.
    pub fn band(width: u32, height: u32, rows: Range<u32>, depth_range: i32) -> Self {
        let rows = rows.start.min(height)..rows.end.min(height);
        let band_height = rows.end.saturating_sub(rows.start);
        return Self {
            width,
            height,
            depth_range,
            color: RgbImage::new(width, band_height),
            depth: vec![DEPTH_SENTINEL; width as usize * band_height as usize],
            rows,
        };
    }

    pub fn width(&self) -> u32 {
        return self.width;
    }

    pub fn height(&self) -> u32 {
        return self.height;
    }

    pub fn rows(&self) -> Range<u32> {
        return self.rows.clone();
    }

    pub fn depth_range(&self) -> i32 {
        return self.depth_range;
    }

    /// Checking if pixel coordinate belongs to this buffer.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        return x >= 0
            && (x as u32) < self.width
            && y >= self.rows.start as i32
            && (y as u32) < self.rows.end;
    }

    fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(self.contains(x as i32, y as i32));
        return x as usize + (y - self.rows.start) as usize * self.width as usize;
    }

    /// Stored depth at the pixel. Pixel has to be inside the buffer.
    pub fn depth(&self, x: u32, y: u32) -> i32 {
        return self.depth[self.index(x, y)];
    }

    /// Stored color at the pixel. Pixel has to be inside the buffer.
    pub fn color(&self, x: u32, y: u32) -> Rgb<u8> {
        return *self.color.get_pixel(x, y - self.rows.start);
    }

    /// Overwrites both color and depth of the pixel, no depth test is done here.
    pub fn write(&mut self, x: u32, y: u32, color: Rgb<u8>, depth: i32) {
        let index = self.index(x, y);
        self.depth[index] = depth;
        self.color.put_pixel(x, y - self.rows.start, color);
    }

    /// Copies a band rendered elsewhere into the matching rows of this buffer.
    pub fn blit(&mut self, band: &FrameBuffer) {
        debug_assert_eq!(self.width, band.width);
        let rows = band.rows.start.max(self.rows.start)..band.rows.end.min(self.rows.end);
        for y in rows {
            for x in 0..self.width {
                let index = self.index(x, y);
                self.depth[index] = band.depth(x, y);
                self.color.put_pixel(x, y - self.rows.start, band.color(x, y));
            }
        }
    }

    /// Turns rows upside down, converting bottom-up addressing used while rendering to top-down
    /// used by image files. Should be called exactly once, right before the output is written.
    pub fn flip_vertically(&mut self) {
        imageops::flip_vertical_in_place(&mut self.color);
        let row_len = self.width as usize;
        if row_len == 0 {
            return;
        }
        let n_rows = self.depth.len() / row_len;
        for i in 0..n_rows / 2 {
            let (top, bottom) = self.depth.split_at_mut((n_rows - 1 - i) * row_len);
            top[i * row_len..(i + 1) * row_len].swap_with_slice(&mut bottom[..row_len]);
        }
    }

    pub fn color_image(&self) -> &RgbImage {
        return &self.color;
    }

    /// Greyscale picture of the z-buffer, brighter is closer. Untouched pixels are black.
    pub fn depth_image(&self) -> GrayImage {
        let band_height = self.rows.end - self.rows.start;
        let scale = 255.0 / self.depth_range.max(1) as f32;
        return GrayImage::from_fn(self.width, band_height, |x, y| {
            let z = self.depth[x as usize + y as usize * self.width as usize];
            if z == DEPTH_SENTINEL {
                return Luma([0]);
            }
            return Luma([(z as f32 * scale).clamp(0.0, 255.0) as u8]);
        });
    }
}
