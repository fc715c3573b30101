//! Transmission refinement strategies
//!
//! Both strategies share the [`TransmissionRefiner`] contract: they take the
//! coarse, patch-resolution transmission and the hazy image as guide, and
//! return an edge-aligned map of the same size.

mod guided_filter;
mod soft_matting;

use ndarray::Array2;

use crate::image_pipeline::common::error::{DehazeError, Result};
use crate::image_pipeline::common::types::ColorImage;
use crate::image_pipeline::dehaze::params::{DehazeParams, RefinementMethod};

pub use guided_filter::{GuidedFilter, box_mean};
pub use soft_matting::SoftMatting;

pub trait TransmissionRefiner: Send + Sync {
    fn name(&self) -> &'static str;

    fn refine(&self, coarse: &Array2<f32>, guide: &ColorImage) -> Result<Array2<f32>>;
}

/// Refiner selected by `params.refinement`.
pub fn refiner_for(params: &DehazeParams) -> Box<dyn TransmissionRefiner> {
    match params.refinement {
        RefinementMethod::GuidedFilter => Box::new(GuidedFilter {
            radius: params.gf_radius,
            epsilon: params.gf_epsilon,
        }),
        RefinementMethod::SoftMatting => Box::new(SoftMatting {
            params: params.soft_matting,
        }),
    }
}

fn check_same_size(coarse: &Array2<f32>, guide: &ColorImage) -> Result<()> {
    let (height, width) = coarse.dim();
    if (height, width) != (guide.height(), guide.width()) {
        return Err(DehazeError::InvalidImage(format!(
            "transmission is {}x{}, guide is {}x{}",
            width,
            height,
            guide.width(),
            guide.height()
        )));
    }
    Ok(())
}
