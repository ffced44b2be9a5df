//! Classifying the points of 4DGS scene by their opacities over time.
//!
//! A point whose opacity spreads evenly over the observed frames has a high
//! normalized entropy, and it is regarded as static. A point which only
//! appears in a short period is regarded as dynamic.

pub use super::*;
pub use burn::config::Config;

/// The default bound for [`Gaussian4dScene::visible_at`].
pub const DEFAULT_OPACITY_THRESHOLD: f64 = 5e-3;

/// Normalized entropies within it below `1.0` are rounded to `1.0`.
pub const NORMALIZED_ENTROPY_TOLERANCE: f64 = 1e-5;

#[derive(Config, Debug)]
pub struct TemporalActivityConfig {
    /// Points with a normalized entropy no less than it are static.
    #[config(default = 0.75)]
    pub entropy_threshold: f64,

    /// It avoids the division by zero and the logarithm of zero.
    #[config(default = 1e-12)]
    pub eps: f64,

    /// Frames per second of the observation.
    #[config(default = 30.0)]
    pub fps: f64,

    /// Count of frames in the observation, which starts at the time `0`.
    #[config(default = 300)]
    pub frame_count: usize,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TemporalActivity {
    Dynamic,
    Static,
}

/// Normalized Shannon entropy of each row in `opacities`.
///
/// - `opacities` has the shape `[P, T]` with non-negative values.
/// - The output has the shape `[P]`, ranging from `0.0` to `1.0`.
///
/// Each row is normalized to a distribution over `T` steps, and its entropy
/// is divided by `ln(T)`. A row of zeros has the entropy of `0.0`,
/// and a constant positive row has the entropy of exactly `1.0`.
pub fn temporal_entropy<B: Backend>(
    opacities: Tensor<B, 2>,
    eps: f64,
) -> Result<Tensor<B, 1>, Error> {
    let [_, step_count] = opacities.dims();
    if step_count < 2 {
        return Err(Error::Validation(
            "The count of time steps".into(),
            format!("at least 2, but got {step_count}"),
        ));
    }

    // [P, 1]
    let sums = opacities.to_owned().sum_dim(1).add_scalar(eps);
    // [P, T]
    let probabilities = opacities / sums;
    // [P, 1]
    let entropies = (probabilities.to_owned() * probabilities.add_scalar(eps).log())
        .sum_dim(1)
        .neg();

    let entropies = entropies
        .div_scalar((step_count as f64).ln())
        .clamp(0.0, 1.0);
    let is_uniform = entropies
        .to_owned()
        .greater_equal_elem(1.0 - NORMALIZED_ENTROPY_TOLERANCE);

    Ok(entropies.mask_fill(is_uniform, 1.0).squeeze(1))
}

/// Whether the [normalized entropy](temporal_entropy) of each row in
/// `opacities` is no less than `entropy_threshold`.
///
/// The output has the shape `[P]`.
pub fn entropy_indices<B: Backend>(
    opacities: Tensor<B, 2>,
    entropy_threshold: f64,
    eps: f64,
) -> Result<Tensor<B, 1, Bool>, Error> {
    Ok(temporal_entropy(opacities, eps)?.greater_equal_elem(entropy_threshold))
}

/// Temporal activity classifiers
impl<B: Backend> Gaussian4dScene<B> {
    /// Opacities at the times `k / fps` for `k` in `0..frame_count`.
    ///
    /// The shape is `[P, T]`.
    /// - `T` is `frame_count`.
    pub fn sample_opacities(
        &self,
        fps: f64,
        frame_count: usize,
    ) -> Result<Tensor<B, 2>, Error> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(Error::Validation(
                "fps".into(),
                format!("positive and finite, but got {fps}"),
            ));
        }

        // [1, T]
        let time = Tensor::<B, 1, Int>::arange(0..frame_count as i64, &self.device())
            .float()
            .div_scalar(fps)
            .unsqueeze::<2>();

        Ok(Self::make_opacities_at(
            self.opacities.val(),
            self.times.val(),
            self.durations.val(),
            time,
        ))
    }

    /// Whether each point is static over the observation in `config`.
    ///
    /// The output has the shape `[P]`.
    pub fn classify_static(
        &self,
        config: &TemporalActivityConfig,
    ) -> Result<Tensor<B, 1, Bool>, Error> {
        let opacities = self.sample_opacities(config.fps, config.frame_count)?;
        let is_static = entropy_indices(opacities, config.entropy_threshold, config.eps)?;

        #[cfg(all(debug_assertions, not(test)))]
        log::debug!(
            target: "gausplat::temporal::activity",
            "Gaussian4dScene::classify_static > static_count ({}) of point_count ({})",
            is_static.to_owned().true_count(),
            self.point_count(),
        );

        Ok(is_static)
    }

    /// The [temporal activity](TemporalActivity) of each point.
    pub fn classify_activities(
        &self,
        config: &TemporalActivityConfig,
    ) -> Result<Vec<TemporalActivity>, Error> {
        Ok(self
            .classify_static(config)?
            .into_data()
            .iter::<bool>()
            .map(|is_static| {
                if is_static {
                    TemporalActivity::Static
                } else {
                    TemporalActivity::Dynamic
                }
            })
            .collect())
    }

    /// Whether the opacity of each point at `time` is greater than `opacity_threshold`.
    ///
    /// The output has the shape `[P]`.
    #[inline]
    pub fn visible_at(
        &self,
        time: f64,
        opacity_threshold: f64,
    ) -> Tensor<B, 1, Bool> {
        self.get_opacities_at(time)
            .squeeze(1)
            .greater_elem(opacity_threshold)
    }
}

impl Default for TemporalActivityConfig {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
