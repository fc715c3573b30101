//! Patch statistics: min-channel erosion (the dark channel) and the sliding
//! window extrema used elsewhere in the pipeline.

use std::collections::VecDeque;

use ndarray::{Array2, ArrayView1, ArrayViewMut1, Zip};

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::common::types::ColorImage;
use crate::image_pipeline::dehaze::params::validate_patch_size;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Extremum {
    Min,
    Max,
}

impl Extremum {
    /// True when `candidate` makes `kept` redundant in the window.
    fn dominates(self, candidate: f32, kept: f32) -> bool {
        match self {
            Self::Min => candidate <= kept,
            Self::Max => candidate >= kept,
        }
    }
}

/// Dark channel of `image`: per-pixel channel minimum eroded by a square
/// `patch_size` window. Windows are clipped at the borders, which equals
/// replicate extension for a minimum.
pub fn dark_channel(image: &ColorImage, patch_size: usize) -> Result<Array2<f32>> {
    validate_patch_size(patch_size)?;
    Ok(min_filter(&image.min_channel(), patch_size / 2))
}

pub(crate) fn min_filter(src: &Array2<f32>, radius: usize) -> Array2<f32> {
    extremum_filter(src, radius, Extremum::Min)
}

pub(crate) fn max_filter(src: &Array2<f32>, radius: usize) -> Array2<f32> {
    extremum_filter(src, radius, Extremum::Max)
}

/// Separable square-window extremum, O(1) amortized per pixel regardless of radius.
fn extremum_filter(src: &Array2<f32>, radius: usize, kind: Extremum) -> Array2<f32> {
    if radius == 0 {
        return src.clone();
    }
    let mut rows = Array2::<f32>::zeros(src.dim());
    Zip::from(rows.rows_mut())
        .and(src.rows())
        .par_for_each(|out, lane| sliding_extremum(lane, out, radius, kind));

    let mut result = Array2::<f32>::zeros(src.dim());
    Zip::from(result.columns_mut())
        .and(rows.columns())
        .par_for_each(|out, lane| sliding_extremum(lane, out, radius, kind));
    result
}

/// Monotonic-deque window extremum over one lane.
fn sliding_extremum(src: ArrayView1<f32>, mut out: ArrayViewMut1<f32>, radius: usize, kind: Extremum) {
    let len = src.len();
    let mut window: VecDeque<usize> = VecDeque::with_capacity(2 * radius + 1);
    let mut next = 0;

    for i in 0..len {
        let hi = (i + radius).min(len - 1);
        while next <= hi {
            while let Some(&back) = window.back() {
                if kind.dominates(src[next], src[back]) {
                    window.pop_back();
                } else {
                    break;
                }
            }
            window.push_back(next);
            next += 1;
        }
        let lo = i.saturating_sub(radius);
        while let Some(&front) = window.front() {
            if front < lo {
                window.pop_front();
            } else {
                break;
            }
        }
        if let Some(&front) = window.front() {
            out[i] = src[front];
        }
    }
}
