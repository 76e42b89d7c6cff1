//! FFmpeg filter definitions.

/// Fit the input inside `width`x`height` without cropping, center-pad the
/// rest, and emit RGBA so the frame keeps an alpha channel.
pub fn fit_and_pad(width: u32, height: u32) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,\
         format=rgba",
        w = width,
        h = height
    )
}

/// EBU R128 single-pass loudness normalization.
pub fn loudnorm(integrated_lufs: f64, true_peak_db: f64, range_lu: f64) -> String {
    format!(
        "loudnorm=I={}:TP={}:LRA={}",
        integrated_lufs, true_peak_db, range_lu
    )
}

/// Placement of a source image on the canvas, as `fit_and_pad` computes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitGeometry {
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub pad_x: u32,
    pub pad_y: u32,
}

impl FitGeometry {
    /// Mirror FFmpeg's `force_original_aspect_ratio=decrease` arithmetic:
    /// each axis is the smaller of the canvas size and the size implied by
    /// the other axis at the source aspect ratio (rounded to nearest).
    pub fn compute(src_width: u32, src_height: u32, canvas_width: u32, canvas_height: u32) -> Option<Self> {
        if src_width == 0 || src_height == 0 {
            return None;
        }

        let rescale = |a: u32, b: u32, c: u32| -> u32 {
            let (a, b, c) = (a as u64, b as u64, c as u64);
            ((a * b + c / 2) / c) as u32
        };

        let scaled_width = rescale(canvas_height, src_width, src_height).min(canvas_width);
        let scaled_height = rescale(canvas_width, src_height, src_width).min(canvas_height);

        Some(Self {
            scaled_width,
            scaled_height,
            pad_x: (canvas_width - scaled_width) / 2,
            pad_y: (canvas_height - scaled_height) / 2,
        })
    }

    /// Padding is on the left/right only.
    pub fn pads_horizontally(&self) -> bool {
        self.pad_x > 0 && self.pad_y == 0
    }

    /// Padding is on the top/bottom only.
    pub fn pads_vertically(&self) -> bool {
        self.pad_y > 0 && self.pad_x == 0
    }
}
