//! Spherical harmonics bookkeeping.

/// The maximum degree of spherical harmonics that rasterizers evaluate
pub const SH_DEGREE_MAX: u32 = 3;

/// The real coefficient of the orthonormalized spherical harmonic of degree 0
///
/// ## Example
///
/// ```rust
/// use gausplat_temporal::spherical_harmonics::SH_COEF_DC;
///
/// assert_eq!(SH_COEF_DC, 0.28209479177387814);
/// ```
pub const SH_COEF_DC: f64 = 0.28209479177387814;

/// The count of coefficients from degree 0 to `degree`, i.e. `(degree + 1)^2`.
#[inline]
pub const fn colors_sh_count(degree: u32) -> usize {
    (degree as usize + 1).pow(2)
}

/// The count of coefficients above degree 0, i.e. `(degree + 1)^2 - 1`.
#[inline]
pub const fn colors_sh_rest_count(degree: u32) -> usize {
    colors_sh_count(degree) - 1
}

/// The degree whose higher-order coefficient count is `rest_count`.
///
/// It returns `None` if `rest_count + 1` is not a perfect square.
///
/// ## Example
///
/// ```rust
/// use gausplat_temporal::spherical_harmonics::colors_sh_degree;
///
/// assert_eq!(colors_sh_degree(0), Some(0));
/// assert_eq!(colors_sh_degree(15), Some(3));
/// assert_eq!(colors_sh_degree(4), None);
/// ```
#[inline]
pub const fn colors_sh_degree(rest_count: usize) -> Option<u32> {
    let count = rest_count + 1;
    let degree = count.isqrt() - 1;
    if (degree + 1) * (degree + 1) == count {
        Some(degree as u32)
    } else {
        None
    }
}

/// Converting degree-0 coefficients to base RGB colors.
#[inline]
pub fn colors_rgb_from_sh_dc(coefficient: f64) -> f64 {
    coefficient * SH_COEF_DC + 0.5
}
