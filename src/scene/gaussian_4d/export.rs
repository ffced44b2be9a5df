//! 4DGS scene export implementation.

pub use super::*;

pub use gausplat_loader::source::polygon;

use crate::spherical_harmonics::SH_COEF_DC;
use gausplat_loader::function::{Decoder, Encoder};
use std::io::{BufWriter, Cursor, Write};

/// The arrays of a 4DGS scene evaluated at a time, in the layout of 3DGS.
#[derive(Clone, Debug)]
pub struct Gaussian4dFrame<B: Backend> {
    /// `[P, 1, 3]`
    pub colors_sh_dc: Tensor<B, 3>,
    /// `[P, K, 3]`
    pub colors_sh_rest: Tensor<B, 3>,
    /// Opacities at [`Self::time`] in logit space.
    ///
    /// The shape is `[P]`.
    pub opacities: Tensor<B, 1>,
    /// Positions at [`Self::time`].
    ///
    /// The shape is `[P, 3]`.
    pub positions: Tensor<B, 2>,
    /// `[P, 4]` (w, x, y, z)
    pub rotations: Tensor<B, 2>,
    /// Scalings in log space.
    ///
    /// The shape is `[P, 3]`.
    pub scalings: Tensor<B, 2>,
    pub time: f64,
}

/// Frame exporters
impl<B: Backend> Gaussian4dScene<B> {
    /// All the points at `time`.
    pub fn frame_at(
        &self,
        time: f64,
    ) -> Gaussian4dFrame<B> {
        Gaussian4dFrame {
            colors_sh_dc: self.colors_sh_dc.val(),
            colors_sh_rest: self.colors_sh_rest.val(),
            opacities: self.get_opacities_logit_at(time).squeeze(1),
            positions: self.get_positions_at(time),
            rotations: self.rotations.val(),
            scalings: self.scalings.val(),
            time,
        }
    }

    /// The points at `time` whose opacities are greater than `opacity_threshold`.
    pub fn visible_frame_at(
        &self,
        time: f64,
        opacity_threshold: f64,
    ) -> Result<Gaussian4dFrame<B>, Error> {
        let frame = self
            .frame_at(time)
            .select(self.visible_at(time, opacity_threshold))?;

        #[cfg(all(debug_assertions, not(test)))]
        log::debug!(
            target: "gausplat::temporal::export",
            "Gaussian4dScene::visible_frame_at > time ({time}), point_count ({} of {})",
            frame.point_count(),
            self.point_count(),
        );

        Ok(frame)
    }
}

/// The 3DGS PLY header of a frame with `colors_sh_rest_count` coefficients
/// per channel in `f_rest_*`.
///
/// The vertex count is `0`.
pub fn polygon_header_of_frame(
    colors_sh_rest_count: usize,
) -> Result<polygon::Header, Error> {
    let properties = ["x", "y", "z"]
        .map(String::from)
        .into_iter()
        .chain((0..3).map(|index| format!("f_dc_{index}")))
        .chain((0..colors_sh_rest_count * 3).map(|index| format!("f_rest_{index}")))
        .chain([String::from("opacity")])
        .chain((0..3).map(|index| format!("scale_{index}")))
        .chain((0..4).map(|index| format!("rot_{index}")))
        .map(|name| format!("property float {name}\n"))
        .collect::<String>();
    let source = format!(
        "ply\nformat binary_little_endian 1.0\nelement vertex 0\n{properties}end_header\n"
    );

    polygon::Header::decode(&mut Cursor::new(source))
        .map_err(|error| Error::Polygon(error.into()))
}

impl<B: Backend> Gaussian4dFrame<B> {
    /// Number of points.
    #[inline]
    pub fn point_count(&self) -> usize {
        self.positions.dims()[0]
    }

    /// Base colors in RGB space.
    ///
    /// The shape is `[P, 3]`.
    #[inline]
    pub fn colors_rgb(&self) -> Tensor<B, 2> {
        self.colors_sh_dc
            .to_owned()
            .squeeze(1)
            .mul_scalar(SH_COEF_DC)
            .add_scalar(0.5)
    }

    /// Selecting the points where `mask` is `true`.
    ///
    /// The shape of `mask` should be `[P]`.
    pub fn select(
        self,
        mask: Tensor<B, 1, Bool>,
    ) -> Result<Self, Error> {
        let point_count = self.point_count();
        let [mask_count] = mask.dims();
        if mask_count != point_count {
            return Err(Error::Shape(format!(
                "The mask should have {point_count} entries, but got {mask_count}"
            )));
        }

        let indices = mask.true_indices();

        Ok(Self {
            colors_sh_dc: self.colors_sh_dc.select(0, indices.to_owned()),
            colors_sh_rest: self.colors_sh_rest.select(0, indices.to_owned()),
            opacities: self.opacities.select(0, indices.to_owned()),
            positions: self.positions.select(0, indices.to_owned()),
            rotations: self.rotations.select(0, indices.to_owned()),
            scalings: self.scalings.select(0, indices),
            time: self.time,
        })
    }

    /// Export the frame in the 3DGS PLY format.
    ///
    /// The vertex properties are `x y z f_dc_* f_rest_* opacity scale_* rot_*`
    /// in 32-bit floats and native-endian binary.
    /// `f_rest_*` is in channel-major order.
    pub fn encode_polygon(
        &self,
        writer: &mut impl Write,
    ) -> Result<(), Error> {
        let writer = &mut BufWriter::new(writer);

        let point_count = self.point_count();
        let colors_sh_rest_count = self.colors_sh_rest.dims()[1];

        let mut header = polygon_header_of_frame(colors_sh_rest_count)?;
        // NOTE: The data format is set to binary native-endian.
        header.format = polygon::Format::binary_native_endian();
        header
            .get_mut("vertex")
            .ok_or_else(|| Error::Data("The vertex element is missing".into()))?
            .count = point_count;
        let property_count = 3 + 3 + colors_sh_rest_count * 3 + 1 + 3 + 4;
        header
            .encode(writer)
            .map_err(|error| Error::Polygon(error.into()))?;

        // [P, 3] <- [P, 1, 3]
        let colors_sh_dc = self.colors_sh_dc.to_owned().flatten(1, 2);
        // [P, 3 * K] <- [P, 3, K] <- [P, K, 3]
        let colors_sh_rest = self
            .colors_sh_rest
            .to_owned()
            .swap_dims(1, 2)
            .flatten(1, 2);
        // [P, 1]
        let opacities = self.opacities.to_owned().unsqueeze_dim(1);

        let mut columns = vec![self.positions.to_owned(), colors_sh_dc];
        if colors_sh_rest_count != 0 {
            columns.push(colors_sh_rest);
        }
        columns.extend([opacities, self.scalings.to_owned(), self.rotations.to_owned()]);

        // [P, 3 + 3 + 3 * K + 1 + 3 + 4]
        let data = Tensor::cat(columns, 1)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|error| Error::Data(format!("{error:?}")))?;
        debug_assert_eq!(data.len(), point_count * property_count);

        writer.write_all(bytemuck::cast_slice(&data))?;
        writer.flush()?;

        #[cfg(all(debug_assertions, not(test)))]
        log::debug!(
            target: "gausplat::temporal::export",
            "Gaussian4dFrame::encode_polygon > time ({}), point_count ({point_count})",
            self.time,
        );

        Ok(())
    }
}
