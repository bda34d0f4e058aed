//! Windowing stage
//!
//! Applies precomputed window coefficients to a time-domain block before the
//! transform to reduce spectral leakage.

use crate::error::{Result, StftError};

/// Multiply `input` by `window` element-wise into `out`
///
/// All three slices must have the same length; nothing is truncated or
/// zero-padded.
pub fn apply_window(input: &[f32], window: &[f32], out: &mut [f32]) -> Result<()> {
    check_len(window.len(), input.len())?;
    check_len(window.len(), out.len())?;

    for ((o, &x), &w) in out.iter_mut().zip(input).zip(window) {
        *o = x * w;
    }

    Ok(())
}

/// Apply window in-place
pub fn apply_window_inplace(signal: &mut [f32], window: &[f32]) -> Result<()> {
    check_len(window.len(), signal.len())?;

    for (s, &w) in signal.iter_mut().zip(window) {
        *s *= w;
    }

    Ok(())
}

fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(StftError::LengthMismatch { expected, actual })
    }
}
