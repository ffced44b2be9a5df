//! Rendering the 4DGS scene at a time through a rasterizer.

pub use crate::{
    error::Error,
    render::view::View,
    scene::gaussian_4d::Gaussian4dScene,
};
pub use burn::{
    config::Config,
    tensor::{backend::Backend, Tensor},
};

use std::fmt;

/// A differentiable rasterizer of 3D Gaussians.
///
/// The implementation projects the points through the camera of a [`View`]
/// and composites them into an image.
pub trait Gaussian4dRasterizer<B: Backend> {
    /// The error of rasterization, which is propagated as [`Error::Rasterize`].
    type Error: std::error::Error + Send + Sync + 'static;
    /// Auxiliary outputs, which are passed through untouched.
    type Meta;

    fn rasterize(
        &self,
        input: RasterizeInput<B>,
        view: &View,
    ) -> Result<RasterizeOutput<B, Self::Meta>, Self::Error>;
}

/// The points of the scene evaluated at a time.
#[derive(Clone, Debug)]
pub struct RasterizeInput<B: Backend> {
    /// `[P, M, 3]`
    pub colors_sh: Tensor<B, 3>,
    /// `(0 ~ D)`
    pub colors_sh_degree_max: u32,
    /// `[P]`
    pub opacities: Tensor<B, 1>,
    /// `[P, 3]`
    pub positions: Tensor<B, 2>,
    /// `[P, 4]`
    pub rotations: Tensor<B, 2>,
    /// `[P, 3]`
    pub scalings: Tensor<B, 2>,
}

#[derive(Clone, Debug)]
pub struct RasterizeOutput<B: Backend, M> {
    /// `[I_y, I_x]`
    pub alphas_2d: Tensor<B, 2>,
    /// `[I_y, I_x, 3]`
    pub colors_rgb_2d: Tensor<B, 3>,
    pub meta: M,
}

#[derive(Config, Debug)]
pub struct Gaussian4dRenderOptions {
    /// It should be no more than [`Gaussian4dScene::colors_sh_degree`].
    ///
    /// The degree of the scene is used if it is `None`.
    #[config(default = "None")]
    pub colors_sh_degree_max: Option<u32>,

    /// Clamping the colors to `[0, 1]`.
    #[config(default = true)]
    pub is_clamped: bool,
}

#[derive(Clone)]
pub struct Gaussian4dRenderOutput<B: Backend, M> {
    /// `[I_y, I_x]`
    pub alphas_2d: Tensor<B, 2>,
    /// `[I_y, I_x, 3]`
    pub colors_rgb_2d: Tensor<B, 3>,
    pub meta: M,
}

impl<B: Backend> Gaussian4dScene<B> {
    /// Rendering the scene at `time` from `view`.
    pub fn render<R: Gaussian4dRasterizer<B>>(
        &self,
        rasterizer: &R,
        time: f64,
        view: &View,
        options: &Gaussian4dRenderOptions,
    ) -> Result<Gaussian4dRenderOutput<B, R::Meta>, Error> {
        #[cfg(all(debug_assertions, not(test)))]
        log::debug!(
            target: "gausplat::temporal::render",
            "Gaussian4dScene::render > time ({time}), view_id ({})",
            view.view_id,
        );

        let colors_sh_degree = self.colors_sh_degree();
        let colors_sh_degree_max = options.colors_sh_degree_max.unwrap_or(colors_sh_degree);
        if colors_sh_degree_max > colors_sh_degree {
            return Err(Error::Validation(
                "colors_sh_degree_max".into(),
                format!("no more than {colors_sh_degree}, but got {colors_sh_degree_max}"),
            ));
        }
        if view.image_width == 0 || view.image_height == 0 {
            return Err(Error::Validation(
                "The image size".into(),
                format!(
                    "positive, but got {}x{}",
                    view.image_width, view.image_height
                ),
            ));
        }

        let input = RasterizeInput {
            colors_sh: self.colors_sh(),
            colors_sh_degree_max,
            opacities: self.get_opacities_at(time).squeeze(1),
            positions: self.get_positions_at(time),
            rotations: self.rotations.val(),
            scalings: self.get_scalings(),
        };

        let output = rasterizer
            .rasterize(input, view)
            .map_err(|error| Error::Rasterize(error.into()))?;

        let colors_rgb_2d = if options.is_clamped {
            output.colors_rgb_2d.clamp(0.0, 1.0)
        } else {
            output.colors_rgb_2d
        };

        Ok(Gaussian4dRenderOutput {
            alphas_2d: output.alphas_2d,
            colors_rgb_2d,
            meta: output.meta,
        })
    }
}

impl Default for Gaussian4dRenderOptions {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend, M> fmt::Debug for Gaussian4dRenderOutput<B, M> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct(&format!("Gaussian4dRenderOutput<{}>", B::name()))
            .field("alphas_2d.dims()", &self.alphas_2d.dims())
            .field("colors_rgb_2d.dims()", &self.colors_rgb_2d.dims())
            .finish()
    }
}
