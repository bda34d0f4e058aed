//! Gaussian window synthesis and caching
//!
//! The Gabor transform uses a Gaussian window with σ = L/6 centred at
//! μ = (L-1)/2, so ±3σ (about 99.7% of the Gaussian mass) spans the block.
//! Window parameters depend only on L; every window is synthesized once per
//! distinct L and shared immutably afterwards.

use crate::error::{Result, StftError};
use std::collections::HashMap;
use std::sync::Arc;

/// Check that `len` is a usable block length
///
/// The transform needs a power of two, and the magnitude layout needs an even
/// length so that L/2 bins exist.
pub fn validate_block_length(len: usize) -> Result<()> {
    let reason = if len == 0 {
        "must be positive"
    } else if len % 2 != 0 {
        "must be even"
    } else if !len.is_power_of_two() {
        "must be a power of two"
    } else {
        return Ok(());
    };

    Err(StftError::InvalidLength { len, reason })
}

/// Gaussian window parameters derived from the block length
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowParams {
    /// Standard deviation in samples (L/6)
    pub sigma: f32,

    /// Centre of the window in samples ((L-1)/2)
    pub mu: f32,
}

impl WindowParams {
    /// Derive parameters for block length `len`
    pub fn for_length(len: usize) -> Result<Self> {
        validate_block_length(len)?;

        Ok(Self {
            sigma: len as f32 / 6.0,
            mu: (len as f32 - 1.0) / 2.0,
        })
    }

    /// Coefficient value at the first and last sample
    ///
    /// Equals exp(-4.5 · ((L-1)/L)²), which tends to the ±3σ value exp(-4.5)
    /// as L grows.
    pub fn edge_value(&self) -> f32 {
        let z = self.mu as f64 / self.sigma as f64;
        (-0.5 * z * z).exp() as f32
    }
}

/// Immutable Gaussian window for one block length
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianWindow {
    params: WindowParams,
    coefficients: Vec<f32>,
}

impl GaussianWindow {
    /// Synthesize the window for block length `len`
    ///
    /// w[n] = exp(-0.5 · ((n - μ) / σ)²) for n = 0..L-1
    pub fn new(len: usize) -> Result<Self> {
        let params = WindowParams::for_length(len)?;

        // Evaluated in f64 so both halves round identically
        let sigma = len as f64 / 6.0;
        let mu = (len as f64 - 1.0) / 2.0;

        let coefficients = (0..len)
            .map(|n| {
                let z = (n as f64 - mu) / sigma;
                (-0.5 * z * z).exp() as f32
            })
            .collect();

        Ok(Self {
            params,
            coefficients,
        })
    }

    /// Block length L
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    /// Always false: a valid window has at least two coefficients
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Parameters used to build the window
    pub fn params(&self) -> WindowParams {
        self.params
    }

    /// Window coefficients
    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }
}

/// Memoizing window provider
///
/// Hands out shared windows keyed by block length. Channels with the same L
/// share one allocation; the coefficients are never mutated after synthesis.
#[derive(Debug, Default)]
pub struct WindowCache {
    windows: HashMap<usize, Arc<GaussianWindow>>,
    computed: usize,
}

impl WindowCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the window for `len`, synthesizing it on first request
    pub fn get(&mut self, len: usize) -> Result<Arc<GaussianWindow>> {
        if let Some(window) = self.windows.get(&len) {
            tracing::trace!(block_len = len, "window served from cache");
            return Ok(Arc::clone(window));
        }

        let window = Arc::new(GaussianWindow::new(len)?);
        self.computed += 1;

        let params = window.params();
        tracing::debug!(block_len = len, sigma = params.sigma, mu = params.mu, "window synthesized");

        self.windows.insert(len, Arc::clone(&window));
        Ok(window)
    }

    /// Number of windows synthesized so far
    pub fn computed_count(&self) -> usize {
        self.computed
    }

    /// Number of distinct block lengths cached
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
