/// A camera view in 3D space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct View {
    /// Image height.
    pub image_height: u32,
    /// Image width.
    pub image_width: u32,
    /// Intrinsic matrix of the pinhole camera.
    ///
    /// It is in **row-major order**, i.e., `K[row][col]`.
    ///
    /// # Format
    ///
    /// ```plaintext
    /// [f_x 0   c_x]
    /// [0   f_y c_y]
    /// [0   0   1  ]
    /// ```
    pub intrinsics: [[f64; 3]; 3],
    /// View ID.
    pub view_id: u32,
    /// Affine transformation from world space to view space.
    ///
    /// It is in **column-major order**, i.e., `M[col][row]`.
    ///
    /// # Format
    ///
    /// ```plaintext
    /// [R_v   | T_v]
    /// [...   | ...]
    /// [0 0 0 | 1  ]
    /// ```
    pub view_transform: [[f64; 4]; 4],
}

impl Default for View {
    fn default() -> Self {
        Self {
            image_height: 1,
            image_width: 1,
            intrinsics: Self::intrinsics(1.0, 1.0, 0.5, 0.5),
            view_id: 0,
            view_transform: Self::transform(
                &[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
                &[0.0; 3],
            ),
        }
    }
}

/// Linear transformations.
impl View {
    /// Returns the affine transformation matrix.
    ///
    /// It is in **column-major order**, i.e., `M[col][row]`.
    #[inline]
    pub const fn transform(
        rotation: &[[f64; 3]; 3],
        translation: &[f64; 3],
    ) -> [[f64; 4]; 4] {
        let r = rotation;
        let t = translation;
        [
            [r[0][0], r[0][1], r[0][2], 0.0],
            [r[1][0], r[1][1], r[1][2], 0.0],
            [r[2][0], r[2][1], r[2][2], 0.0],
            [t[0], t[1], t[2], 1.0],
        ]
    }

    /// Returns the intrinsic matrix in **row-major order**.
    #[inline]
    pub const fn intrinsics(
        focal_length_x: f64,
        focal_length_y: f64,
        principal_point_x: f64,
        principal_point_y: f64,
    ) -> [[f64; 3]; 3] {
        [
            [focal_length_x, 0.0, principal_point_x],
            [0.0, focal_length_y, principal_point_y],
            [0.0, 0.0, 1.0],
        ]
    }

    /// Returns the intrinsic matrix of a centered principal point.
    ///
    /// The fields of view are in radians.
    pub fn intrinsics_from_field_of_view(
        field_of_view_x: f64,
        field_of_view_y: f64,
        image_width: u32,
        image_height: u32,
    ) -> [[f64; 3]; 3] {
        let focal_length_x = image_width as f64 / (field_of_view_x / 2.0).tan() / 2.0;
        let focal_length_y = image_height as f64 / (field_of_view_y / 2.0).tan() / 2.0;
        Self::intrinsics(
            focal_length_x,
            focal_length_y,
            image_width as f64 / 2.0,
            image_height as f64 / 2.0,
        )
    }
}

/// Intrinsic getters.
impl View {
    #[inline]
    pub const fn focal_length_x(&self) -> f64 {
        self.intrinsics[0][0]
    }

    #[inline]
    pub const fn focal_length_y(&self) -> f64 {
        self.intrinsics[1][1]
    }

    /// The horizontal field of view in radians.
    #[inline]
    pub fn field_of_view_x(&self) -> f64 {
        (self.image_width as f64 / 2.0 / self.focal_length_x()).atan() * 2.0
    }

    /// The vertical field of view in radians.
    #[inline]
    pub fn field_of_view_y(&self) -> f64 {
        (self.image_height as f64 / 2.0 / self.focal_length_y()).atan() * 2.0
    }
}

/// Dimension operations
impl View {
    /// Returns the aspect ratio (`width / height`).
    #[inline]
    pub const fn aspect_ratio(&self) -> f32 {
        self.image_width as f32 / self.image_height as f32
    }

    /// Resizing the view to the maximum side length of `to`.
    ///
    /// The intrinsics are scaled along with the image.
    pub fn resize_max(
        &mut self,
        to: u32,
    ) -> &mut Self {
        let (image_width, image_height) = (self.image_width, self.image_height);
        let ratio = self.aspect_ratio();
        if ratio > 1.0 {
            self.image_width = to;
            self.image_height = (to as f32 / ratio).ceil() as u32;
        } else {
            self.image_width = (to as f32 * ratio).ceil() as u32;
            self.image_height = to;
        }

        let scale_x = self.image_width as f64 / image_width as f64;
        let scale_y = self.image_height as f64 / image_height as f64;
        self.intrinsics[0][0] *= scale_x;
        self.intrinsics[0][2] *= scale_x;
        self.intrinsics[1][1] *= scale_y;
        self.intrinsics[1][2] *= scale_y;
        self
    }
}
