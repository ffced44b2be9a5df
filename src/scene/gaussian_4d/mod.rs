//! 4DGS scene, temporal Gaussians moving linearly with an opacity envelope in time.

pub mod activity;
pub mod checkpoint;
pub mod export;
pub mod property;

pub use crate::{
    error::Error,
    function::TensorBoolExtension,
    render::view::View,
    spherical_harmonics::{colors_sh_degree, colors_sh_rest_count, SH_DEGREE_MAX},
};
pub use burn::{
    module::{Module, Param},
    tensor::{backend::Backend, Bool, Int, Tensor, TensorData},
};
pub use activity::*;
pub use checkpoint::*;
pub use export::*;
pub use property::*;

use std::fmt;

/// 4DGS scene representation.
///
/// All the parameters are index-aligned on the first dimension `P`,
/// which is [`Self::point_count`].
#[derive(Module)]
pub struct Gaussian4dScene<B: Backend> {
    /// Colors in SH space (only degree 0).
    ///
    /// The shape is `[P, 1, 3]`.
    pub colors_sh_dc: Param<Tensor<B, 3>>,
    /// Colors in SH space (except degree 0).
    ///
    /// The shape is `[P, K, 3]`.
    /// - `K` is `(D + 1)^2 - 1`, where `D` is [`Self::colors_sh_degree`].
    pub colors_sh_rest: Param<Tensor<B, 3>>,
    /// Durations of the temporal opacity envelope in log space.
    ///
    /// The shape is `[P, 1]`.
    pub durations: Param<Tensor<B, 2>>,
    /// Peak opacities in logit space.
    ///
    /// The shape is `[P, 1]`.
    pub opacities: Param<Tensor<B, 2>>,
    /// 3D positions at [`Self::times`].
    ///
    /// The shape is `[P, 3]`.
    pub positions: Param<Tensor<B, 2>>,
    /// Rotations as quaternions in scalar-first order, i.e., `[w, x, y, z]`.
    ///
    /// The shape is `[P, 4]`.
    ///
    /// They are passed to the rasterizer without normalization.
    pub rotations: Param<Tensor<B, 2>>,
    /// 3D scalings in log space.
    ///
    /// The shape is `[P, 3]`.
    pub scalings: Param<Tensor<B, 2>>,
    /// Centers of the temporal opacity envelope.
    ///
    /// The shape is `[P, 1]`.
    pub times: Param<Tensor<B, 2>>,
    /// Linear velocities.
    ///
    /// The shape is `[P, 3]`.
    pub velocities: Param<Tensor<B, 2>>,
}

/// Host data for [`Gaussian4dScene::from_data`].
///
/// The shapes are the same as the fields of [`Gaussian4dScene`].
#[derive(Clone, Debug)]
pub struct Gaussian4dSceneData {
    pub colors_sh_dc: TensorData,
    pub colors_sh_rest: TensorData,
    pub durations: TensorData,
    pub opacities: TensorData,
    pub positions: TensorData,
    pub rotations: TensorData,
    pub scalings: TensorData,
    pub times: TensorData,
    pub velocities: TensorData,
}

/// Scene constructors
impl<B: Backend> Gaussian4dScene<B> {
    /// Create a scene from the inner values of parameters.
    ///
    /// The arguments are in the order of `means, scales, quats, opacities,
    /// sh_0, sh_n, times, durations, velocities`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        positions: Tensor<B, 2>,
        scalings: Tensor<B, 2>,
        rotations: Tensor<B, 2>,
        opacities: Tensor<B, 2>,
        colors_sh_dc: Tensor<B, 3>,
        colors_sh_rest: Tensor<B, 3>,
        times: Tensor<B, 2>,
        durations: Tensor<B, 2>,
        velocities: Tensor<B, 2>,
    ) -> Result<Self, Error> {
        let scene = Self {
            colors_sh_dc: Param::from_tensor(colors_sh_dc),
            colors_sh_rest: Param::from_tensor(colors_sh_rest),
            durations: Param::from_tensor(durations),
            opacities: Param::from_tensor(opacities),
            positions: Param::from_tensor(positions),
            rotations: Param::from_tensor(rotations),
            scalings: Param::from_tensor(scalings),
            times: Param::from_tensor(times),
            velocities: Param::from_tensor(velocities),
        };
        scene.validate()?;

        #[cfg(all(debug_assertions, not(test)))]
        log::debug!(
            target: "gausplat::temporal::scene",
            "Gaussian4dScene::new > {scene:?}",
        );

        Ok(scene)
    }

    /// Create a scene from host data.
    ///
    /// The data are converted to 32-bit floats regardless of their types.
    pub fn from_data(
        data: Gaussian4dSceneData,
        device: &B::Device,
    ) -> Result<Self, Error> {
        fn tensor<B: Backend, const D: usize>(
            name: &str,
            data: TensorData,
            device: &B::Device,
        ) -> Result<Tensor<B, D>, Error> {
            if data.shape.len() != D {
                return Err(Error::Shape(format!(
                    "{name} should have {D} dimensions, but got the shape {:?}",
                    data.shape
                )));
            }
            Ok(Tensor::from_data(data.convert::<f32>(), device))
        }

        Self::new(
            tensor("positions", data.positions, device)?,
            tensor("scalings", data.scalings, device)?,
            tensor("rotations", data.rotations, device)?,
            tensor("opacities", data.opacities, device)?,
            tensor("colors_sh_dc", data.colors_sh_dc, device)?,
            tensor("colors_sh_rest", data.colors_sh_rest, device)?,
            tensor("times", data.times, device)?,
            tensor("durations", data.durations, device)?,
            tensor("velocities", data.velocities, device)?,
        )
    }

    /// Create a scene without points.
    pub fn empty(
        colors_sh_degree: u32,
        device: &B::Device,
    ) -> Self {
        let colors_sh_rest_count = colors_sh_rest_count(colors_sh_degree);

        Self {
            colors_sh_dc: Param::from_tensor(Tensor::zeros([0, 1, 3], device)),
            colors_sh_rest: Param::from_tensor(Tensor::zeros(
                [0, colors_sh_rest_count, 3],
                device,
            )),
            durations: Param::from_tensor(Tensor::zeros([0, 1], device)),
            opacities: Param::from_tensor(Tensor::zeros([0, 1], device)),
            positions: Param::from_tensor(Tensor::zeros([0, 3], device)),
            rotations: Param::from_tensor(Tensor::zeros([0, 4], device)),
            scalings: Param::from_tensor(Tensor::zeros([0, 3], device)),
            times: Param::from_tensor(Tensor::zeros([0, 1], device)),
            velocities: Param::from_tensor(Tensor::zeros([0, 3], device)),
        }
    }
}

/// Scene combinators
impl<B: Backend> Gaussian4dScene<B> {
    /// The union of the points in `self` and `other`, in that order.
    pub fn union(
        &self,
        other: &Self,
    ) -> Result<Self, Error> {
        let degree = self.colors_sh_degree();
        let degree_other = other.colors_sh_degree();
        if degree != degree_other {
            return Err(Error::Shape(format!(
                "The degrees of colors_sh should be the same, \
                but got {degree} and {degree_other}"
            )));
        }

        Self::new(
            Tensor::cat(vec![self.positions.val(), other.positions.val()], 0),
            Tensor::cat(vec![self.scalings.val(), other.scalings.val()], 0),
            Tensor::cat(vec![self.rotations.val(), other.rotations.val()], 0),
            Tensor::cat(vec![self.opacities.val(), other.opacities.val()], 0),
            Tensor::cat(vec![self.colors_sh_dc.val(), other.colors_sh_dc.val()], 0),
            Tensor::cat(
                vec![self.colors_sh_rest.val(), other.colors_sh_rest.val()],
                0,
            ),
            Tensor::cat(vec![self.times.val(), other.times.val()], 0),
            Tensor::cat(vec![self.durations.val(), other.durations.val()], 0),
            Tensor::cat(vec![self.velocities.val(), other.velocities.val()], 0),
        )
    }

    /// Selecting the points where `mask` is `true`.
    ///
    /// The shape of `mask` should be `[P]`.
    pub fn select(
        &self,
        mask: Tensor<B, 1, Bool>,
    ) -> Result<Self, Error> {
        let point_count = self.point_count();
        let [mask_count] = mask.dims();
        if mask_count != point_count {
            return Err(Error::Shape(format!(
                "The mask should have {point_count} entries, but got {mask_count}"
            )));
        }

        self.select_indices(mask.true_indices())
    }

    /// Selecting the points at `indices`, in the given order.
    pub fn select_indices(
        &self,
        indices: Tensor<B, 1, Int>,
    ) -> Result<Self, Error> {
        let point_count = self.point_count();
        if let Some(index) = indices
            .to_owned()
            .into_data()
            .iter::<i64>()
            .find(|index| *index < 0 || *index as usize >= point_count)
        {
            return Err(Error::Shape(format!(
                "The index {index} is out of the range of {point_count} points"
            )));
        }

        Self::new(
            self.positions.val().select(0, indices.to_owned()),
            self.scalings.val().select(0, indices.to_owned()),
            self.rotations.val().select(0, indices.to_owned()),
            self.opacities.val().select(0, indices.to_owned()),
            self.colors_sh_dc.val().select(0, indices.to_owned()),
            self.colors_sh_rest.val().select(0, indices.to_owned()),
            self.times.val().select(0, indices.to_owned()),
            self.durations.val().select(0, indices.to_owned()),
            self.velocities.val().select(0, indices),
        )
    }
}

/// Scene validators
impl<B: Backend> Gaussian4dScene<B> {
    /// Checking the shapes of all parameters.
    pub fn validate(&self) -> Result<&Self, Error> {
        let point_count = self.positions.dims()[0];

        fn check(
            name: &str,
            dims: &[usize],
            target: &[Option<usize>],
        ) -> Result<(), Error> {
            let is_valid = dims.len() == target.len()
                && dims
                    .iter()
                    .zip(target)
                    .all(|(dim, target)| target.is_none_or(|target| *dim == target));
            if is_valid {
                return Ok(());
            }

            let target = target
                .iter()
                .map(|dim| dim.map_or("_".into(), |dim| dim.to_string()))
                .collect::<Vec<_>>()
                .join(", ");
            Err(Error::Shape(format!(
                "{name} should have the shape [{target}], but got {dims:?}"
            )))
        }

        let p = Some(point_count);
        check("positions", &self.positions.dims(), &[p, Some(3)])?;
        check("scalings", &self.scalings.dims(), &[p, Some(3)])?;
        check("rotations", &self.rotations.dims(), &[p, Some(4)])?;
        check("opacities", &self.opacities.dims(), &[p, Some(1)])?;
        check("colors_sh_dc", &self.colors_sh_dc.dims(), &[p, Some(1), Some(3)])?;
        check("colors_sh_rest", &self.colors_sh_rest.dims(), &[p, None, Some(3)])?;
        check("times", &self.times.dims(), &[p, Some(1)])?;
        check("durations", &self.durations.dims(), &[p, Some(1)])?;
        check("velocities", &self.velocities.dims(), &[p, Some(3)])?;

        let colors_sh_rest_count = self.colors_sh_rest.dims()[1];
        if colors_sh_degree(colors_sh_rest_count).is_none() {
            return Err(Error::Shape(format!(
                "The count of colors_sh_rest should be (D + 1)^2 - 1, \
                but got {colors_sh_rest_count}"
            )));
        }

        Ok(self)
    }
}

impl<B: Backend> fmt::Debug for Gaussian4dScene<B> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        f.debug_struct(&format!("Gaussian4dScene<{}>", B::name()))
            .field("point_count", &self.point_count())
            .field("colors_sh_degree", &self.colors_sh_degree())
            .field("size", &self.size_readable())
            .field("colors_sh_dc.dims()", &self.colors_sh_dc.dims())
            .field("colors_sh_rest.dims()", &self.colors_sh_rest.dims())
            .field("durations.dims()", &self.durations.dims())
            .field("opacities.dims()", &self.opacities.dims())
            .field("positions.dims()", &self.positions.dims())
            .field("rotations.dims()", &self.rotations.dims())
            .field("scalings.dims()", &self.scalings.dims())
            .field("times.dims()", &self.times.dims())
            .field("velocities.dims()", &self.velocities.dims())
            .finish()
    }
}

impl<B: Backend> Default for Gaussian4dScene<B> {
    #[inline]
    fn default() -> Self {
        Self::empty(SH_DEGREE_MAX, &Default::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    /// A scene of `point_count` points in SH degree 1, and every value
    /// derives from `offset` and its index.
    pub fn scene_of(
        point_count: usize,
        offset: f32,
    ) -> Gaussian4dScene<B> {
        let device = Default::default();
        let values = |width: usize| {
            (0..point_count * width)
                .map(|i| offset + i as f32 * 0.01)
                .collect::<Vec<_>>()
        };

        Gaussian4dScene::new(
            Tensor::from_data(TensorData::new(values(3), [point_count, 3]), &device),
            Tensor::from_data(TensorData::new(values(3), [point_count, 3]), &device),
            Tensor::from_data(TensorData::new(values(4), [point_count, 4]), &device),
            Tensor::from_data(TensorData::new(values(1), [point_count, 1]), &device),
            Tensor::from_data(TensorData::new(values(3), [point_count, 1, 3]), &device),
            Tensor::from_data(TensorData::new(values(9), [point_count, 3, 3]), &device),
            Tensor::from_data(TensorData::new(values(1), [point_count, 1]), &device),
            Tensor::from_data(TensorData::new(values(1), [point_count, 1]), &device),
            Tensor::from_data(TensorData::new(values(3), [point_count, 3]), &device),
        )
        .unwrap()
    }

    pub fn assert_scene_eq(
        output: &Gaussian4dScene<B>,
        target: &Gaussian4dScene<B>,
    ) {
        macro_rules! assert_param_eq {
            ($($name:ident),*) => {$(
                output
                    .$name
                    .val()
                    .into_data()
                    .assert_eq(&target.$name.val().into_data(), true);
            )*};
        }

        assert_param_eq!(
            colors_sh_dc,
            colors_sh_rest,
            durations,
            opacities,
            positions,
            rotations,
            scalings,
            times,
            velocities
        );
    }

    #[test]
    fn new_and_point_count() {
        let scene = scene_of(5, 0.0);

        assert_eq!(scene.point_count(), 5);
        assert_eq!(scene.colors_sh_degree(), 1);
        assert!(!scene.is_empty());
        for dims in [
            scene.positions.dims().to_vec(),
            scene.scalings.dims().to_vec(),
            scene.rotations.dims().to_vec(),
            scene.opacities.dims().to_vec(),
            scene.colors_sh_dc.dims().to_vec(),
            scene.colors_sh_rest.dims().to_vec(),
            scene.times.dims().to_vec(),
            scene.durations.dims().to_vec(),
            scene.velocities.dims().to_vec(),
        ] {
            assert_eq!(dims[0], 5);
        }
    }

    #[test]
    fn new_with_mismatched_point_counts() {
        let device = Default::default();
        let scene = Gaussian4dScene::<B>::new(
            Tensor::zeros([3, 3], &device),
            Tensor::zeros([3, 3], &device),
            Tensor::zeros([3, 4], &device),
            Tensor::zeros([2, 1], &device),
            Tensor::zeros([3, 1, 3], &device),
            Tensor::zeros([3, 0, 3], &device),
            Tensor::zeros([3, 1], &device),
            Tensor::zeros([3, 1], &device),
            Tensor::zeros([3, 3], &device),
        );

        assert!(matches!(scene, Err(Error::Shape(_))), "{scene:?}");
    }

    #[test]
    fn new_with_invalid_colors_sh_rest() {
        let device = Default::default();
        let scene = Gaussian4dScene::<B>::new(
            Tensor::zeros([3, 3], &device),
            Tensor::zeros([3, 3], &device),
            Tensor::zeros([3, 4], &device),
            Tensor::zeros([3, 1], &device),
            Tensor::zeros([3, 1, 3], &device),
            Tensor::zeros([3, 5, 3], &device),
            Tensor::zeros([3, 1], &device),
            Tensor::zeros([3, 1], &device),
            Tensor::zeros([3, 3], &device),
        );

        assert!(matches!(scene, Err(Error::Shape(_))), "{scene:?}");
    }

    #[test]
    fn from_data_converts_to_f32() {
        let device = Default::default();
        let data = Gaussian4dSceneData {
            colors_sh_dc: TensorData::new(vec![0.5_f64; 3], [1, 1, 3]),
            colors_sh_rest: TensorData::new(Vec::<f64>::new(), [1, 0, 3]),
            durations: TensorData::new(vec![0.0_f64], [1, 1]),
            opacities: TensorData::new(vec![1.0_f64], [1, 1]),
            positions: TensorData::new(vec![1.0_f64, 2.0, 3.0], [1, 3]),
            rotations: TensorData::new(vec![1.0_f64, 0.0, 0.0, 0.0], [1, 4]),
            scalings: TensorData::new(vec![-1.0_f64; 3], [1, 3]),
            times: TensorData::new(vec![0.5_f64], [1, 1]),
            velocities: TensorData::new(vec![0.0_f64; 3], [1, 3]),
        };

        let scene = Gaussian4dScene::<B>::from_data(data, &device).unwrap();
        assert_eq!(scene.point_count(), 1);
        assert_eq!(scene.colors_sh_degree(), 0);

        let target = vec![1.0_f32, 2.0, 3.0];
        let output = scene.positions.val().into_data().to_vec::<f32>().unwrap();
        assert_eq!(output, target);
    }

    #[test]
    fn from_data_with_wrong_rank() {
        let device = Default::default();
        let data = Gaussian4dSceneData {
            colors_sh_dc: TensorData::new(vec![0.5_f32; 3], [1, 3]),
            colors_sh_rest: TensorData::new(Vec::<f32>::new(), [1, 0, 3]),
            durations: TensorData::new(vec![0.0_f32], [1, 1]),
            opacities: TensorData::new(vec![1.0_f32], [1, 1]),
            positions: TensorData::new(vec![1.0_f32, 2.0, 3.0], [1, 3]),
            rotations: TensorData::new(vec![1.0_f32, 0.0, 0.0, 0.0], [1, 4]),
            scalings: TensorData::new(vec![-1.0_f32; 3], [1, 3]),
            times: TensorData::new(vec![0.5_f32], [1, 1]),
            velocities: TensorData::new(vec![0.0_f32; 3], [1, 3]),
        };

        let scene = Gaussian4dScene::<B>::from_data(data, &device);
        assert!(matches!(scene, Err(Error::Shape(_))), "{scene:?}");
    }

    #[test]
    fn empty_shapes() {
        let device = Default::default();

        for degree in 0..=SH_DEGREE_MAX {
            let scene = Gaussian4dScene::<B>::empty(degree, &device);
            assert_eq!(scene.point_count(), 0);
            assert!(scene.is_empty());
            assert_eq!(scene.colors_sh_degree(), degree);
            scene.validate().unwrap();
        }
    }

    #[test]
    fn union_point_count_and_order() {
        let scene_1 = scene_of(3, 0.0);
        let scene_2 = scene_of(4, 10.0);

        let scene = scene_1.union(&scene_2).unwrap();
        assert_eq!(scene.point_count(), 7);

        let target = Tensor::cat(vec![scene_1.positions.val(), scene_2.positions.val()], 0);
        let output = scene.positions.val();
        output.into_data().assert_eq(&target.into_data(), true);

        let target = scene_2.velocities.val();
        let output = scene.velocities.val().slice([3..7, 0..3]);
        output.into_data().assert_eq(&target.into_data(), true);
    }

    #[test]
    fn union_with_empty_is_identity() {
        let device = Default::default();
        let scene = scene_of(3, 1.0);
        let empty = Gaussian4dScene::<B>::empty(1, &device);

        assert_scene_eq(&empty.union(&scene).unwrap(), &scene);
        assert_scene_eq(&scene.union(&empty).unwrap(), &scene);
    }

    #[test]
    fn union_with_mismatched_degrees() {
        let device = Default::default();
        let scene = scene_of(3, 1.0);
        let empty = Gaussian4dScene::<B>::empty(3, &device);

        let output = scene.union(&empty);
        assert!(matches!(output, Err(Error::Shape(_))), "{output:?}");
    }

    #[test]
    fn select_by_mask() {
        let device = Default::default();
        let scene = scene_of(4, 0.0);
        let mask = Tensor::<B, 1, Bool>::from_data(
            TensorData::new(vec![true, false, false, true], [4]),
            &device,
        );

        let output = scene.select(mask).unwrap();
        assert_eq!(output.point_count(), 2);

        let target = Tensor::cat(
            vec![
                scene.colors_sh_rest.val().slice([0..1, 0..3, 0..3]),
                scene.colors_sh_rest.val().slice([3..4, 0..3, 0..3]),
            ],
            0,
        );
        output
            .colors_sh_rest
            .val()
            .into_data()
            .assert_eq(&target.into_data(), true);

        let target = Tensor::cat(
            vec![
                scene.times.val().slice([0..1, 0..1]),
                scene.times.val().slice([3..4, 0..1]),
            ],
            0,
        );
        output.times.val().into_data().assert_eq(&target.into_data(), true);
    }

    #[test]
    fn select_with_mismatched_mask() {
        let device = Default::default();
        let scene = scene_of(4, 0.0);
        let mask = Tensor::<B, 1, Bool>::from_data(
            TensorData::new(vec![true, false], [2]),
            &device,
        );

        let output = scene.select(mask);
        assert!(matches!(output, Err(Error::Shape(_))), "{output:?}");
    }

    #[test]
    fn select_indices_out_of_range() {
        let device = Default::default();
        let scene = scene_of(2, 0.0);
        let indices =
            Tensor::<B, 1, Int>::from_data(TensorData::new(vec![0_i64, 2], [2]), &device);

        let output = scene.select_indices(indices);
        assert!(matches!(output, Err(Error::Shape(_))), "{output:?}");
    }
}
