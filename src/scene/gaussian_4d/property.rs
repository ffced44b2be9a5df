//! 4DGS scene property implementation.

pub use super::*;

use burn::tensor::activation;
use humansize::{format_size, BINARY};

/// The bound of opacities before converting them to logits.
pub const OPACITY_LOGIT_EPSILON: f64 = 1e-8;

/// Outer property value getters at a time
impl<B: Backend> Gaussian4dScene<B> {
    /// 3D Positions at `time`. (Outer value)
    ///
    /// The shape is `[P, 3]`.
    ///
    /// The points move linearly without clamping `time`.
    #[inline]
    pub fn get_positions_at(
        &self,
        time: f64,
    ) -> Tensor<B, 2> {
        Self::make_positions_at(
            self.positions.val(),
            self.times.val(),
            self.velocities.val(),
            self.time_tensor(time),
        )
    }

    /// Opacities at `time`. (Outer value)
    ///
    /// The shape is `[P, 1]`.
    ///
    /// They range from `0.0` to the peak opacities.
    #[inline]
    pub fn get_opacities_at(
        &self,
        time: f64,
    ) -> Tensor<B, 2> {
        Self::make_opacities_at(
            self.opacities.val(),
            self.times.val(),
            self.durations.val(),
            self.time_tensor(time),
        )
    }

    /// Opacities at `time` in logit space. (Inner value)
    ///
    /// The shape is `[P, 1]`.
    #[inline]
    pub fn get_opacities_logit_at(
        &self,
        time: f64,
    ) -> Tensor<B, 2> {
        Self::make_opacities_logit(self.get_opacities_at(time))
    }

    /// Peak opacities. (Outer value)
    ///
    /// The shape is `[P, 1]`.
    #[inline]
    pub fn get_opacities(&self) -> Tensor<B, 2> {
        activation::sigmoid(self.opacities.val())
    }

    /// 3D scalings. (Outer value)
    ///
    /// The shape is `[P, 3]`.
    #[inline]
    pub fn get_scalings(&self) -> Tensor<B, 2> {
        self.scalings.val().exp()
    }

    /// Durations of the temporal opacity envelope. (Outer value)
    ///
    /// The shape is `[P, 1]`.
    ///
    /// They are the standard deviations of the envelope and always positive.
    #[inline]
    pub fn get_durations(&self) -> Tensor<B, 2> {
        self.durations.val().exp()
    }

    /// Colors in SH space from degree 0 to [`Self::colors_sh_degree`].
    ///
    /// The shape is `[P, M, 3]`.
    /// - `M` is `(D + 1)^2`.
    #[inline]
    pub fn colors_sh(&self) -> Tensor<B, 3> {
        Tensor::cat(vec![self.colors_sh_dc.val(), self.colors_sh_rest.val()], 1)
    }

    #[inline]
    fn time_tensor(
        &self,
        time: f64,
    ) -> Tensor<B, 2> {
        Tensor::full([1, 1], time, &self.device())
    }
}

/// Outer property value makers at a time
impl<B: Backend> Gaussian4dScene<B> {
    /// Making values for [`Gaussian4dScene::get_positions_at`]
    ///
    /// `time` is either `[1, 1]` or `[P, 1]`.
    #[inline]
    pub fn make_positions_at(
        positions: Tensor<B, 2>,
        times: Tensor<B, 2>,
        velocities: Tensor<B, 2>,
        time: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        positions + (time - times) * velocities
    }

    /// Making values for [`Gaussian4dScene::get_opacities_at`]
    ///
    /// `time` is either `[1, 1]` or `[P, 1]`.
    #[inline]
    pub fn make_opacities_at(
        opacities: Tensor<B, 2>,
        times: Tensor<B, 2>,
        durations: Tensor<B, 2>,
        time: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let envelopes = ((time - times) / durations.exp())
            .powf_scalar(2.0)
            .mul_scalar(-0.5)
            .exp();
        activation::sigmoid(opacities) * envelopes
    }

    /// Making values for [`Gaussian4dScene::get_opacities_logit_at`]
    ///
    /// Both the opacities and their complements are clamped to
    /// `[OPACITY_LOGIT_EPSILON, 1]`, so the logits are finite even if
    /// `1 - OPACITY_LOGIT_EPSILON` rounds to `1` in 32-bit floats.
    #[inline]
    pub fn make_opacities_logit(opacities: Tensor<B, 2>) -> Tensor<B, 2> {
        let complements = (-opacities.to_owned() + 1.0).clamp(OPACITY_LOGIT_EPSILON, 1.0);
        opacities.clamp(OPACITY_LOGIT_EPSILON, 1.0).log() - complements.log()
    }
}

/// Attribute getters
impl<B: Backend> Gaussian4dScene<B> {
    /// The device.
    #[inline]
    pub fn device(&self) -> B::Device {
        self.positions.device()
    }

    /// Number of points.
    #[inline]
    pub fn point_count(&self) -> usize {
        let point_count_target = self.positions.dims()[0];
        let point_count_other = self.colors_sh_dc.dims()[0];
        debug_assert_eq!(point_count_other, point_count_target);
        let point_count_other = self.colors_sh_rest.dims()[0];
        debug_assert_eq!(point_count_other, point_count_target);
        let point_count_other = self.durations.dims()[0];
        debug_assert_eq!(point_count_other, point_count_target);
        let point_count_other = self.opacities.dims()[0];
        debug_assert_eq!(point_count_other, point_count_target);
        let point_count_other = self.rotations.dims()[0];
        debug_assert_eq!(point_count_other, point_count_target);
        let point_count_other = self.scalings.dims()[0];
        debug_assert_eq!(point_count_other, point_count_target);
        let point_count_other = self.times.dims()[0];
        debug_assert_eq!(point_count_other, point_count_target);
        let point_count_other = self.velocities.dims()[0];
        debug_assert_eq!(point_count_other, point_count_target);

        point_count_target
    }

    /// Whether there is no point.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.point_count() == 0
    }

    /// Degree of colors in SH space.
    ///
    /// It derives from the shape of [`Self::colors_sh_rest`].
    #[inline]
    pub fn colors_sh_degree(&self) -> u32 {
        let colors_sh_rest_count = self.colors_sh_rest.dims()[1];
        ((colors_sh_rest_count + 1).isqrt() - 1) as u32
    }

    /// Size of the parameters in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.num_params() * size_of::<B::FloatElem>()
    }

    /// Readable size of the parameters.
    #[inline]
    pub fn size_readable(&self) -> String {
        format_size(self.size(), BINARY.decimal_places(1))
    }
}
