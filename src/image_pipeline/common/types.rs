//! Image data types shared by every dehazing stage

use ndarray::{Array2, Array3, ArrayView3, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::image_pipeline::common::error::{DehazeError, Result};

/// NTSC luminance weights, applied to R, G and B.
const LUMA_WEIGHTS: [f32; 3] = [0.2989, 0.5870, 0.1140];

/// Three-channel image with samples normalized to [0, 1]
///
/// Data is laid out as `height x width x 3`. The constructor rejects empty
/// images, wrong channel counts and out-of-range or non-finite samples, so any
/// `ColorImage` reaching the dehazing core is valid input.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorImage {
    data: Array3<f32>,
}

impl ColorImage {
    pub fn new(data: Array3<f32>) -> Result<Self> {
        let (height, width, channels) = data.dim();
        if height == 0 || width == 0 {
            return Err(DehazeError::InvalidDimensions(width, height));
        }
        if channels != 3 {
            return Err(DehazeError::InvalidImage(format!(
                "expected 3 channels, got {}",
                channels
            )));
        }
        if let Some(bad) = data.iter().find(|v| !v.is_finite() || **v < 0.0 || **v > 1.0) {
            return Err(DehazeError::InvalidImage(format!(
                "sample {} outside [0, 1]",
                bad
            )));
        }
        Ok(Self { data })
    }

    /// Builds an image from interleaved RGB samples in row-major order.
    pub fn from_interleaved(width: usize, height: usize, samples: Vec<f32>) -> Result<Self> {
        if samples.len() != width * height * 3 {
            return Err(DehazeError::InvalidImage(format!(
                "{} samples do not fill a {}x{} RGB image",
                samples.len(),
                width,
                height
            )));
        }
        let data = Array3::from_shape_vec((height, width, 3), samples)
            .map_err(|e| DehazeError::InvalidImage(e.to_string()))?;
        Self::new(data)
    }

    /// Image where every pixel has the same color.
    pub fn uniform(width: usize, height: usize, rgb: [f32; 3]) -> Result<Self> {
        let data = Array3::from_shape_fn((height, width, 3), |(_, _, c)| rgb[c]);
        Self::new(data)
    }

    /// Skips validation; only for values the core produced and already clipped.
    pub(crate) fn from_clipped(data: Array3<f32>) -> Self {
        Self { data }
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn pixel_count(&self) -> usize {
        self.width() * self.height()
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    pub fn pixel(&self, y: usize, x: usize) -> [f32; 3] {
        [self.data[[y, x, 0]], self.data[[y, x, 1]], self.data[[y, x, 2]]]
    }

    pub fn into_array(self) -> Array3<f32> {
        self.data
    }

    /// Per-pixel minimum over the three channels.
    pub fn min_channel(&self) -> Array2<f32> {
        self.data
            .map_axis(Axis(2), |px| px.iter().fold(f32::INFINITY, |acc, &v| acc.min(v)))
    }

    pub fn to_luminance(&self) -> Array2<f32> {
        let mut gray = Array2::<f32>::zeros((self.height(), self.width()));
        Zip::from(&mut gray)
            .and(self.data.lanes(Axis(2)))
            .for_each(|g, px| {
                *g = LUMA_WEIGHTS[0] * px[0] + LUMA_WEIGHTS[1] * px[1] + LUMA_WEIGHTS[2] * px[2];
            });
        gray
    }

    /// Interleaved RGB samples scaled to `u8`, clipped to [0, 1] first.
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.data
            .iter()
            .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect()
    }

    pub fn to_rgb16(&self) -> Vec<u16> {
        self.data
            .iter()
            .map(|&v| (v.clamp(0.0, 1.0) * u16::MAX as f32).round() as u16)
            .collect()
    }
}

/// Global airlight color, one intensity per channel in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtmosphericLight(pub [f32; 3]);

impl AtmosphericLight {
    pub fn channels(&self) -> [f32; 3] {
        self.0
    }
}

impl std::fmt::Display for AtmosphericLight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.3}, {:.3}, {:.3}]", self.0[0], self.0[1], self.0[2])
    }
}
