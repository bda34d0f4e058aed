//! Magnitude extraction and frequency-axis helpers

use crate::error::{Result, StftError};
use num_complex::Complex32;

/// Largest input sample magnitude the engine is specified for
///
/// With a window bounded by 1, every bin satisfies |X[k]| ≤ L · max|x|. Keeping
/// |x| ≤ 1e6 (well above any ADC code or sensor voltage) leaves even squared
/// magnitudes of 65536-point blocks far inside f32 range.
pub const MAX_INPUT_AMPLITUDE: f32 = 1.0e6;

/// Floor applied before taking logarithms
const DB_FLOOR: f32 = 1e-10;

/// Convert packed (re, im) pairs into magnitudes
///
/// `spectral` holds L values (L/2 pairs); `out` receives L/2 magnitudes with
/// `out[k] = sqrt(re[k]² + im[k]²)`.
pub fn extract_magnitudes(spectral: &[f32], out: &mut [f32]) -> Result<()> {
    if spectral.len() % 2 != 0 {
        return Err(StftError::InvalidLength {
            len: spectral.len(),
            reason: "spectral buffer must hold whole (re, im) pairs",
        });
    }

    let bins = spectral.len() / 2;
    if out.len() != bins {
        return Err(StftError::LengthMismatch {
            expected: bins,
            actual: out.len(),
        });
    }

    for (mag, pair) in out.iter_mut().zip(spectral.chunks_exact(2)) {
        *mag = Complex32::new(pair[0], pair[1]).norm();
    }

    Ok(())
}

/// Convert magnitudes to dB relative to `reference`
///
/// 20·log10(|X[k]| / reference), floored at 1e-10 to avoid log(0).
pub fn magnitude_db(magnitudes: &[f32], reference: f32, out: &mut [f32]) -> Result<()> {
    if out.len() != magnitudes.len() {
        return Err(StftError::LengthMismatch {
            expected: magnitudes.len(),
            actual: out.len(),
        });
    }

    for (db, &mag) in out.iter_mut().zip(magnitudes) {
        *db = 20.0 * (mag.max(DB_FLOOR) / reference).log10();
    }

    Ok(())
}

/// Index of the largest magnitude, or `None` for an empty spectrum
pub fn peak_bin(magnitudes: &[f32]) -> Option<usize> {
    magnitudes
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
}

/// Centre frequency in Hz of `bin` for a block of `block_len` samples
pub fn bin_to_hz(bin: usize, block_len: usize, sample_rate: f32) -> f32 {
    bin as f32 * sample_rate / block_len as f32
}

/// Frequency axis in Hz for the L/2 magnitude bins
pub fn frequency_bins_hz(block_len: usize, sample_rate: f32) -> Vec<f32> {
    (0..block_len / 2)
        .map(|bin| bin_to_hz(bin, block_len, sample_rate))
        .collect()
}

/// Bin whose centre is nearest to `freq_hz`
pub fn hz_to_bin(freq_hz: f32, block_len: usize, sample_rate: f32) -> usize {
    (freq_hz * block_len as f32 / sample_rate).round() as usize
}
