//! Cell value types

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Numeric types a raster cell may hold.
///
/// The engine computes in `f64`; the other types appear when reading
/// categorical inputs (land-cover codes, boolean masks) from disk.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Sentinel used when a value cannot be represented
    fn default_nodata() -> Self;

    /// Whether `self` is no-data under the given sentinel
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    fn is_float() -> bool;

    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Lossy conversion from `f64`, falling back to the type's sentinel
    fn from_f64(value: f64) -> Self {
        <Self as NumCast>::from(value).unwrap_or_else(Self::default_nodata)
    }
}

macro_rules! impl_int_element {
    ($($t:ty),*) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::MIN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }

            fn is_float() -> bool {
                false
            }
        }
    )*};
}

macro_rules! impl_float_element {
    ($($t:ty),*) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            // NaN is always no-data. A sentinel matches with a tolerance
            // scaled to its magnitude, so -9999 read back from f32 still hits.
            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) if nd.is_nan() => false,
                    Some(nd) => (self - nd).abs() <= <$t>::EPSILON * 100.0 * nd.abs().max(1.0),
                    None => false,
                }
            }

            fn is_float() -> bool {
                true
            }
        }
    )*};
}

impl_int_element!(u8, i16, u16, i32);
impl_float_element!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_always_nodata() {
        assert!(f64::NAN.is_nodata(None));
        assert!(f64::NAN.is_nodata(Some(-9999.0)));
    }

    #[test]
    fn float_sentinel_survives_f32_roundtrip() {
        let stored = -9999.0_f32 as f64;
        assert!(stored.is_nodata(Some(-9999.0)));
        assert!(!(-9998.0_f64).is_nodata(Some(-9999.0)));
    }

    #[test]
    fn integer_sentinel_is_exact() {
        assert!(0u8.is_nodata(Some(0)));
        assert!(!1u8.is_nodata(Some(0)));
        assert!(!0u8.is_nodata(None));
    }

    #[test]
    fn from_f64_saturates_to_sentinel() {
        assert_eq!(u8::from_f64(300.0), u8::MIN);
        assert_eq!(i32::from_f64(42.0), 42);
    }
}
