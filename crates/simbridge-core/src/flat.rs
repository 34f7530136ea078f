//! Flat numeric vector protocol.
//!
//! Every input, setup and state struct can be converted to and from a flat
//! `f64` slice with a fixed arity. Wrong arity is a hard error, never padded
//! or truncated.

use crate::error::InputError;

/// Fails with [`InputError::ArityMismatch`] unless `values.len() == expected`.
pub fn check_arity(target: &'static str, expected: usize, values: &[f64]) -> Result<(), InputError> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(InputError::ArityMismatch {
            target,
            expected,
            got: values.len(),
        })
    }
}

/// Types with a fixed-arity flat `f64` representation.
pub trait FlatVector: Sized {
    /// Number of values in the flat form.
    const ARITY: usize;

    /// Name used in arity errors.
    const NAME: &'static str;

    /// Build from a flat slice; fails on wrong length.
    fn from_flat(values: &[f64]) -> Result<Self, InputError>;

    /// Append the flat form to `out`.
    fn write_flat(&self, out: &mut Vec<f64>);

    fn to_flat(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(Self::ARITY);
        self.write_flat(&mut out);
        out
    }

    /// Field-wise equality where two unset fields compare equal.
    fn flat_eq(&self, other: &Self) -> bool {
        self.to_flat()
            .iter()
            .zip(other.to_flat().iter())
            .all(|(a, b)| (a.is_nan() && b.is_nan()) || a == b)
    }
}
