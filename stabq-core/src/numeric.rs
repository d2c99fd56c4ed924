//! Scalar numerics: fixed-precision real and complex types
//!
//! The active precision is selected at compile time. By default `Real` is
//! `f64`; enabling the `single-precision` feature switches the whole
//! workspace to `f32`. Everything downstream (amplitudes, gate payloads,
//! the textual circuit format) is expressed in these aliases.

/// Floating-point scalar at the active precision
#[cfg(not(feature = "single-precision"))]
pub type Real = f64;

/// Floating-point scalar at the active precision
#[cfg(feature = "single-precision")]
pub type Real = f32;

/// Complex scalar at the active precision
pub type Complex = num_complex::Complex<Real>;

/// Cutoff under which a squared norm is treated as zero
#[cfg(not(feature = "single-precision"))]
pub const NORM_EPSILON: Real = 1e-10;

/// Cutoff under which a squared norm is treated as zero
#[cfg(feature = "single-precision")]
pub const NORM_EPSILON: Real = 1e-5;

/// 1/sqrt(2) at the active precision
pub const SQRT2_INV: Real = std::f64::consts::FRAC_1_SQRT_2 as Real;

pub const ZERO_C: Complex = Complex::new(0.0, 0.0);
pub const ONE_C: Complex = Complex::new(1.0, 0.0);
pub const I_C: Complex = Complex::new(0.0, 1.0);

/// True when `c` is negligibly small
#[inline]
pub fn is_norm_zero(c: Complex) -> bool {
    c.norm_sqr() <= NORM_EPSILON
}

/// True when `a` and `b` differ by a negligible amount
#[inline]
pub fn approx_eq(a: Complex, b: Complex) -> bool {
    is_norm_zero(a - b)
}

/// True when `c` lies on the unit circle, within tolerance
#[inline]
pub fn is_unit(c: Complex) -> bool {
    (c.norm_sqr() - 1.0).abs() <= NORM_EPSILON
}

/// i raised to the power `e` (mod 4), the phase alphabet of a tableau row
#[inline]
pub fn i_pow(e: u8) -> Complex {
    match e & 3 {
        0 => ONE_C,
        1 => I_C,
        2 => -ONE_C,
        _ => -I_C,
    }
}
