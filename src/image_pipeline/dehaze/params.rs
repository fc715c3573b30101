//! Dehazing hyperparameters

use serde::{Deserialize, Serialize};

use crate::image_pipeline::common::error::{DehazeError, Result};

/// Transmission refinement strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementMethod {
    /// Edge-aware local linear smoothing (fast)
    GuidedFilter,
    /// Matting Laplacian linear system (exact, slow, bounded by `max_pixels`)
    SoftMatting,
}

impl RefinementMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GuidedFilter => "guided_filter",
            Self::SoftMatting => "soft_matting",
        }
    }
}

/// Constants of the soft matting system `(L + lambda * U) t = lambda * t_coarse`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftMattingParams {
    /// Fidelity weight of the coarse estimate
    pub lambda: f64,
    /// Regularizer added to each window's color covariance
    pub epsilon: f64,
    /// Largest image (in pixels) the sparse factorization is attempted on
    pub max_pixels: usize,
}

impl Default for SoftMattingParams {
    fn default() -> Self {
        Self {
            lambda: 1e-3,
            epsilon: 1e-7,
            max_pixels: 40_000,
        }
    }
}

/// One complete parameter set for a dehazing run
///
/// The same image and the same `DehazeParams` always produce the same output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DehazeParams {
    /// Side of the square dark-channel patch; odd
    pub patch_size: usize,
    /// Fraction of estimated haze removed, in (0, 1]
    pub omega: f32,
    /// Fraction of the brightest dark-channel pixels used for the airlight, in (0, 1]
    pub atmospheric_light_percentile: f64,
    /// Transmission floor applied during recovery, in (0, 1)
    pub t0: f32,
    pub refinement: RefinementMethod,
    /// Guided filter window radius; window side is `2 * gf_radius + 1`
    pub gf_radius: usize,
    /// Guided filter regularizer
    pub gf_epsilon: f32,
    pub soft_matting: SoftMattingParams,
}

impl Default for DehazeParams {
    fn default() -> Self {
        Self {
            patch_size: 15,
            omega: 0.95,
            atmospheric_light_percentile: 0.001,
            t0: 0.1,
            refinement: RefinementMethod::GuidedFilter,
            gf_radius: 60,
            gf_epsilon: 1e-3,
            soft_matting: SoftMattingParams::default(),
        }
    }
}

impl std::fmt::Display for DehazeParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "patch_size={}, omega={}, atmospheric_light_percentile={}, t0={}, refinement={}",
            self.patch_size, self.omega, self.atmospheric_light_percentile, self.t0, self.refinement.as_str()
        )?;
        match self.refinement {
            RefinementMethod::GuidedFilter => {
                write!(f, ", gf_radius={}, gf_epsilon={}", self.gf_radius, self.gf_epsilon)
            }
            RefinementMethod::SoftMatting => write!(
                f,
                ", lambda={}, epsilon={}",
                self.soft_matting.lambda, self.soft_matting.epsilon
            ),
        }
    }
}

/// Canonical defaults, published for collaborators that pre-populate forms.
pub fn default_params() -> DehazeParams {
    DehazeParams::default()
}

impl DehazeParams {
    pub fn builder() -> DehazeParamsBuilder {
        DehazeParamsBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        validate_patch_size(self.patch_size)?;
        if !(self.omega > 0.0 && self.omega <= 1.0) {
            return Err(DehazeError::invalid_parameter(
                "omega",
                format!("must lie in (0, 1], got {}", self.omega),
            ));
        }
        validate_percentile(self.atmospheric_light_percentile)?;
        if !(self.t0 > 0.0 && self.t0 < 1.0) {
            return Err(DehazeError::invalid_parameter(
                "t0",
                format!("must lie in (0, 1), got {}", self.t0),
            ));
        }
        if self.gf_radius == 0 {
            return Err(DehazeError::invalid_parameter("gf_radius", "must be positive"));
        }
        if !(self.gf_epsilon.is_finite() && self.gf_epsilon > 0.0) {
            return Err(DehazeError::invalid_parameter(
                "gf_epsilon",
                format!("must be positive, got {}", self.gf_epsilon),
            ));
        }
        let sm = &self.soft_matting;
        if !(sm.lambda.is_finite() && sm.lambda > 0.0) {
            return Err(DehazeError::invalid_parameter(
                "soft_matting.lambda",
                format!("must be positive, got {}", sm.lambda),
            ));
        }
        if !(sm.epsilon.is_finite() && sm.epsilon > 0.0) {
            return Err(DehazeError::invalid_parameter(
                "soft_matting.epsilon",
                format!("must be positive, got {}", sm.epsilon),
            ));
        }
        Ok(())
    }

    /// Validates the parameters and the resource bound they imply for an image
    /// of the given size.
    pub fn validate_for_image(&self, width: usize, height: usize) -> Result<()> {
        self.validate()?;
        if width == 0 || height == 0 {
            return Err(DehazeError::InvalidDimensions(width, height));
        }
        let pixels = width * height;
        if self.refinement == RefinementMethod::SoftMatting && pixels > self.soft_matting.max_pixels {
            return Err(DehazeError::ResourceLimit {
                strategy: RefinementMethod::SoftMatting.as_str(),
                pixels,
                limit: self.soft_matting.max_pixels,
            });
        }
        Ok(())
    }
}

pub(crate) fn validate_patch_size(patch_size: usize) -> Result<()> {
    if patch_size == 0 || patch_size % 2 == 0 {
        return Err(DehazeError::invalid_parameter(
            "patch_size",
            format!("must be a positive odd integer, got {}", patch_size),
        ));
    }
    Ok(())
}

pub(crate) fn validate_percentile(percentile: f64) -> Result<()> {
    if !(percentile > 0.0 && percentile <= 1.0) {
        return Err(DehazeError::invalid_parameter(
            "atmospheric_light_percentile",
            format!("must lie in (0, 1], got {}", percentile),
        ));
    }
    Ok(())
}

/// Builder for DehazeParams
#[derive(Default)]
pub struct DehazeParamsBuilder {
    patch_size: Option<usize>,
    omega: Option<f32>,
    atmospheric_light_percentile: Option<f64>,
    t0: Option<f32>,
    refinement: Option<RefinementMethod>,
    gf_radius: Option<usize>,
    gf_epsilon: Option<f32>,
    soft_matting: Option<SoftMattingParams>,
}

impl DehazeParamsBuilder {
    pub fn patch_size(mut self, patch_size: usize) -> Self {
        self.patch_size = Some(patch_size);
        self
    }

    pub fn omega(mut self, omega: f32) -> Self {
        self.omega = Some(omega);
        self
    }

    pub fn atmospheric_light_percentile(mut self, percentile: f64) -> Self {
        self.atmospheric_light_percentile = Some(percentile);
        self
    }

    pub fn t0(mut self, t0: f32) -> Self {
        self.t0 = Some(t0);
        self
    }

    pub fn refinement(mut self, method: RefinementMethod) -> Self {
        self.refinement = Some(method);
        self
    }

    pub fn gf_radius(mut self, radius: usize) -> Self {
        self.gf_radius = Some(radius);
        self
    }

    pub fn gf_epsilon(mut self, epsilon: f32) -> Self {
        self.gf_epsilon = Some(epsilon);
        self
    }

    pub fn soft_matting(mut self, params: SoftMattingParams) -> Self {
        self.soft_matting = Some(params);
        self
    }

    pub fn build(self) -> DehazeParams {
        let default = DehazeParams::default();
        DehazeParams {
            patch_size: self.patch_size.unwrap_or(default.patch_size),
            omega: self.omega.unwrap_or(default.omega),
            atmospheric_light_percentile: self
                .atmospheric_light_percentile
                .unwrap_or(default.atmospheric_light_percentile),
            t0: self.t0.unwrap_or(default.t0),
            refinement: self.refinement.unwrap_or(default.refinement),
            gf_radius: self.gf_radius.unwrap_or(default.gf_radius),
            gf_epsilon: self.gf_epsilon.unwrap_or(default.gf_epsilon),
            soft_matting: self.soft_matting.unwrap_or(default.soft_matting),
        }
    }
}
