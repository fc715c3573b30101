//! Cartesian parameter grids

use serde::{Deserialize, Serialize};

use crate::image_pipeline::dehaze::{DehazeParams, RefinementMethod};

/// Candidate values per parameter; an empty list keeps the `base` value.
///
/// Combinations are enumerated with the fields nested in declaration order:
/// `patch_size` is the outermost loop and `gf_epsilon` varies fastest. Each
/// list is walked in the order given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentGrid {
    pub base: DehazeParams,
    pub patch_size: Vec<usize>,
    pub omega: Vec<f32>,
    pub atmospheric_light_percentile: Vec<f64>,
    pub t0: Vec<f32>,
    pub refinement: Vec<RefinementMethod>,
    pub gf_radius: Vec<usize>,
    pub gf_epsilon: Vec<f32>,
}

const AXES: usize = 7;

impl ExperimentGrid {
    pub fn new(base: DehazeParams) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    fn axis_lengths(&self) -> [usize; AXES] {
        [
            self.patch_size.len(),
            self.omega.len(),
            self.atmospheric_light_percentile.len(),
            self.t0.len(),
            self.refinement.len(),
            self.gf_radius.len(),
            self.gf_epsilon.len(),
        ]
        .map(|len| len.max(1))
    }

    pub fn total_runs(&self) -> usize {
        self.axis_lengths().iter().product()
    }

    /// Parameter set of run `index`, or `None` past the end.
    pub fn combination(&self, index: usize) -> Option<DehazeParams> {
        if index >= self.total_runs() {
            return None;
        }

        // mixed-radix decode, last axis least significant
        let lengths = self.axis_lengths();
        let mut digits = [0usize; AXES];
        let mut rest = index;
        for axis in (0..AXES).rev() {
            digits[axis] = rest % lengths[axis];
            rest /= lengths[axis];
        }

        fn pick<T: Copy>(values: &[T], digit: usize, base: T) -> T {
            values.get(digit).copied().unwrap_or(base)
        }

        let base = self.base;
        Some(DehazeParams {
            patch_size: pick(&self.patch_size, digits[0], base.patch_size),
            omega: pick(&self.omega, digits[1], base.omega),
            atmospheric_light_percentile: pick(
                &self.atmospheric_light_percentile,
                digits[2],
                base.atmospheric_light_percentile,
            ),
            t0: pick(&self.t0, digits[3], base.t0),
            refinement: pick(&self.refinement, digits[4], base.refinement),
            gf_radius: pick(&self.gf_radius, digits[5], base.gf_radius),
            gf_epsilon: pick(&self.gf_epsilon, digits[6], base.gf_epsilon),
            ..base
        })
    }

    /// Every combination in run-index order.
    pub fn combinations(&self) -> impl Iterator<Item = DehazeParams> + '_ {
        (0..self.total_runs()).filter_map(move |i| self.combination(i))
    }
}
