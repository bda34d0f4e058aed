//! Forward real FFT capability
//!
//! The pipeline talks to the transform through [`SpectralTransform`]: an
//! `init` step that prepares a handle for a block length, and a
//! `forward_real` step that turns a windowed block into a packed spectral
//! buffer. Both steps report failure explicitly.
//!
//! # Packed layout
//!
//! A block of L reals maps to L reals holding L/2 (re, im) pairs:
//!
//! | index        | value            |
//! |--------------|------------------|
//! | 0, 1         | Re X[0], Re X[L/2] |
//! | 2k, 2k+1     | Re X[k], Im X[k] for k = 1..L/2-1 |
//!
//! DC and Nyquist are purely real for real input, so their real parts share
//! the first pair. This is the layout produced by fixed-size real FFT
//! routines on embedded DSP libraries.

use crate::error::TransformError;
use num_complex::Complex32;
use realfft::{RealFftPlanner, RealToComplex};
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Forward real FFT backend
pub trait SpectralTransform {
    /// Prepared state for one block length
    type Handle;

    /// Prepare a handle for blocks of `len` samples
    fn init(&mut self, len: usize) -> Result<Self::Handle, TransformError>;

    /// Transform `input` into the packed spectral layout in `output`
    ///
    /// `input` may be used as scratch and is left in an unspecified state.
    /// Both slices must have the handle's length.
    fn forward_real(
        &mut self,
        handle: &mut Self::Handle,
        input: &mut [f32],
        output: &mut [f32],
    ) -> Result<(), TransformError>;
}

fn check_init_len(len: usize, max_len: Option<usize>) -> Result<(), TransformError> {
    let reason = if len < 2 {
        "length must be at least 2"
    } else if len % 2 != 0 {
        "length must be even"
    } else if max_len.is_some_and(|max| len > max) {
        "length exceeds backend maximum"
    } else {
        return Ok(());
    };

    Err(TransformError::Init {
        len,
        reason: reason.to_string(),
    })
}

fn check_block(len: usize, input: &[f32], output: &[f32]) -> Result<(), TransformError> {
    if input.len() != len || output.len() != len {
        return Err(TransformError::Process(format!(
            "buffer lengths {}/{} do not match planned length {}",
            input.len(),
            output.len(),
            len
        )));
    }
    Ok(())
}

/// Write bins 0..=L/2 of `spectrum` into the packed layout
fn pack_half_spectrum(spectrum: &[Complex32], output: &mut [f32]) {
    let half = output.len() / 2;

    output[0] = spectrum[0].re;
    output[1] = spectrum[half].re;

    for k in 1..half {
        output[2 * k] = spectrum[k].re;
        output[2 * k + 1] = spectrum[k].im;
    }
}

/// Real-input FFT backed by `realfft`
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFftTransform {
    max_len: Option<usize>,
}

/// Planned real FFT with reusable buffers
pub struct RealFftHandle {
    r2c: Arc<dyn RealToComplex<f32>>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl RealFftHandle {
    /// Block length this handle was planned for
    pub fn len(&self) -> usize {
        self.r2c.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RealFftTransform {
    pub fn new() -> Self {
        Self { max_len: None }
    }

    /// Reject lengths above `max_len` at init, like fixed-table FFT libraries
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }
}

impl SpectralTransform for RealFftTransform {
    type Handle = RealFftHandle;

    fn init(&mut self, len: usize) -> Result<RealFftHandle, TransformError> {
        check_init_len(len, self.max_len)?;

        let mut planner = RealFftPlanner::<f32>::new();
        let r2c = planner.plan_fft_forward(len);
        let spectrum = r2c.make_output_vec();
        let scratch = r2c.make_scratch_vec();

        Ok(RealFftHandle {
            r2c,
            spectrum,
            scratch,
        })
    }

    fn forward_real(
        &mut self,
        handle: &mut RealFftHandle,
        input: &mut [f32],
        output: &mut [f32],
    ) -> Result<(), TransformError> {
        check_block(handle.len(), input, output)?;

        handle
            .r2c
            .process_with_scratch(input, &mut handle.spectrum, &mut handle.scratch)
            .map_err(|e| TransformError::Process(e.to_string()))?;

        pack_half_spectrum(&handle.spectrum, output);
        Ok(())
    }
}

/// Complex FFT of the real block backed by `rustfft`
///
/// Twice the work of [`RealFftTransform`]; kept as a reference backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplexFftTransform;

/// Planned complex FFT with reusable buffers
pub struct ComplexFftHandle {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl ComplexFftTransform {
    pub fn new() -> Self {
        Self
    }
}

impl SpectralTransform for ComplexFftTransform {
    type Handle = ComplexFftHandle;

    fn init(&mut self, len: usize) -> Result<ComplexFftHandle, TransformError> {
        check_init_len(len, None)?;

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(len);
        let scratch = vec![Complex32::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        let buffer = vec![Complex32::new(0.0, 0.0); len];

        Ok(ComplexFftHandle {
            fft,
            buffer,
            scratch,
        })
    }

    fn forward_real(
        &mut self,
        handle: &mut ComplexFftHandle,
        input: &mut [f32],
        output: &mut [f32],
    ) -> Result<(), TransformError> {
        check_block(handle.buffer.len(), input, output)?;

        for (c, &x) in handle.buffer.iter_mut().zip(input.iter()) {
            *c = Complex32::new(x, 0.0);
        }

        handle
            .fft
            .process_with_scratch(&mut handle.buffer, &mut handle.scratch);

        pack_half_spectrum(&handle.buffer, output);
        Ok(())
    }
}
