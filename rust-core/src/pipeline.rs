//! Per-channel STFT pipeline
//!
//! A [`ChannelPipeline`] owns everything one channel needs to turn a block of
//! time-domain samples into a magnitude spectrum: the cached Gaussian window,
//! the transform handle, and its windowed, spectral and magnitude buffers.
//! Buffers are allocated once and reused for every block.

use crate::config::{ChannelConfig, ChannelId};
use crate::error::{Result, StftError, TransformError};
use crate::spectrum::fft::SpectralTransform;
use crate::spectrum::magnitude::{extract_magnitudes, frequency_bins_hz, peak_bin, bin_to_hz};
use crate::spectrum::window::{validate_block_length, GaussianWindow, WindowCache, WindowParams};
use crate::spectrum::windowing::apply_window;
use std::sync::Arc;

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Ready to accept blocks; the last transform (if any) succeeded
    Configured,

    /// Last transform failed; the output buffer is stale
    Faulted,
}

/// Per-channel counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Blocks that produced a fresh spectrum
    pub updates: u64,

    /// Blocks rejected by the transform backend
    pub failures: u64,
}

/// STFT pipeline for one channel
pub struct ChannelPipeline<T: SpectralTransform> {
    config: ChannelConfig,
    window: Arc<GaussianWindow>,
    transform: T,
    handle: Option<T::Handle>,

    /// Windowed block (also transform scratch)
    windowed: Vec<f32>,

    /// Packed (re, im) pairs
    spectral: Vec<f32>,

    /// Output magnitudes, L/2 bins
    magnitudes: Vec<f32>,

    state: PipelineState,
    has_output: bool,
    last_failure: Option<TransformError>,
    stats: PipelineStats,
}

impl<T: SpectralTransform> ChannelPipeline<T> {
    /// Build a pipeline for `config`
    ///
    /// Fails with `InvalidLength` if the block length is unusable; no pipeline
    /// exists in that case. A transform backend that fails to initialise
    /// leaves the pipeline `Faulted`, and the next [`update`](Self::update)
    /// retries initialisation.
    pub fn new(config: ChannelConfig, windows: &mut WindowCache, mut transform: T) -> Result<Self> {
        let len = config.block_len;
        validate_block_length(len)?;
        let window = windows.get(len)?;

        let (handle, state, last_failure) = match transform.init(len) {
            Ok(handle) => (Some(handle), PipelineState::Configured, None),
            Err(err) => {
                tracing::warn!(channel = %config.id, error = %err, "transform init failed");
                (None, PipelineState::Faulted, Some(err))
            }
        };

        let params = window.params();
        tracing::debug!(
            channel = %config.id,
            label = %config.label,
            block_len = len,
            sigma = params.sigma,
            mu = params.mu,
            "channel configured"
        );

        Ok(Self {
            config,
            window,
            transform,
            handle,
            windowed: vec![0.0; len],
            spectral: vec![0.0; len],
            magnitudes: vec![0.0; len / 2],
            state,
            has_output: false,
            last_failure,
            stats: PipelineStats::default(),
        })
    }

    /// Process one input block and return the fresh magnitude spectrum
    ///
    /// The returned slice has L/2 bins and stays valid until the next call.
    /// On a transform failure the pipeline becomes `Faulted` and no spectrum
    /// is returned; the caller retries with the next block.
    pub fn update(&mut self, input: &[f32]) -> Result<&[f32]> {
        let len = self.config.block_len;
        if input.len() != len {
            return Err(StftError::LengthMismatch {
                expected: len,
                actual: input.len(),
            });
        }

        apply_window(input, self.window.coefficients(), &mut self.windowed)?;

        if let Err(err) = self.transform_block() {
            self.handle = None;
            self.state = PipelineState::Faulted;
            self.stats.failures += 1;
            tracing::warn!(channel = %self.config.id, error = %err, "transform failed, spectrum not updated");
            self.last_failure = Some(err.clone());
            return Err(err.into());
        }

        extract_magnitudes(&self.spectral, &mut self.magnitudes)?;

        if self.state == PipelineState::Faulted {
            tracing::debug!(channel = %self.config.id, "channel recovered");
        }
        self.state = PipelineState::Configured;
        self.last_failure = None;
        self.has_output = true;
        self.stats.updates += 1;

        Ok(&self.magnitudes)
    }

    fn transform_block(&mut self) -> std::result::Result<(), TransformError> {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => self.transform.init(self.config.block_len)?,
        };
        let handle = self.handle.insert(handle);

        self.transform
            .forward_real(handle, &mut self.windowed, &mut self.spectral)
    }

    /// Change the block length, rebuilding window, buffers and transform
    ///
    /// Returns `Ok(false)` when the length is unchanged. An invalid length
    /// leaves the pipeline exactly as it was.
    pub fn reconfigure(&mut self, block_len: usize, windows: &mut WindowCache) -> Result<bool> {
        if block_len == self.config.block_len {
            return Ok(false);
        }

        validate_block_length(block_len)?;
        let window = windows.get(block_len)?;

        self.config.block_len = block_len;
        self.window = window;
        self.windowed = vec![0.0; block_len];
        self.spectral = vec![0.0; block_len];
        self.magnitudes = vec![0.0; block_len / 2];
        self.has_output = false;

        match self.transform.init(block_len) {
            Ok(handle) => {
                self.handle = Some(handle);
                self.state = PipelineState::Configured;
                self.last_failure = None;
            }
            Err(err) => {
                tracing::warn!(channel = %self.config.id, error = %err, "transform init failed");
                self.handle = None;
                self.state = PipelineState::Faulted;
                self.last_failure = Some(err);
            }
        }

        tracing::debug!(channel = %self.config.id, block_len, "channel reconfigured");
        Ok(true)
    }

    /// Latest magnitude spectrum, if the last block succeeded
    pub fn spectrum(&self) -> Option<&[f32]> {
        match self.state {
            PipelineState::Configured if self.has_output => Some(&self.magnitudes),
            _ => None,
        }
    }

    /// Frequency in Hz of the strongest bin in the latest spectrum
    pub fn peak_frequency(&self) -> Option<f32> {
        let spectrum = self.spectrum()?;
        let bin = peak_bin(spectrum)?;
        Some(bin_to_hz(bin, self.config.block_len, self.config.sample_rate))
    }

    /// Frequency axis in Hz for this channel's bins
    pub fn frequency_bins_hz(&self) -> Vec<f32> {
        frequency_bins_hz(self.config.block_len, self.config.sample_rate)
    }

    pub fn id(&self) -> ChannelId {
        self.config.id
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn block_len(&self) -> usize {
        self.config.block_len
    }

    /// Number of magnitude bins (L/2)
    pub fn num_bins(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn is_faulted(&self) -> bool {
        self.state == PipelineState::Faulted
    }

    /// Error from the last failed transform, cleared on success
    pub fn last_failure(&self) -> Option<&TransformError> {
        self.last_failure.as_ref()
    }

    /// Cached window shared with other channels of the same length
    pub fn window(&self) -> &Arc<GaussianWindow> {
        &self.window
    }

    pub fn window_params(&self) -> WindowParams {
        self.window.params()
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::fft::{ComplexFftTransform, RealFftTransform};
    use crate::spectrum::magnitude::hz_to_bin;
    use std::f32::consts::PI;

    /// Wraps a real backend and fails on selected calls
    struct FlakyTransform {
        inner: RealFftTransform,
        fail_next_forward: bool,
        fail_init: bool,
        init_calls: usize,
    }

    impl FlakyTransform {
        fn new() -> Self {
            Self {
                inner: RealFftTransform::new(),
                fail_next_forward: false,
                fail_init: false,
                init_calls: 0,
            }
        }
    }

    impl SpectralTransform for FlakyTransform {
        type Handle = <RealFftTransform as SpectralTransform>::Handle;

        fn init(&mut self, len: usize) -> std::result::Result<Self::Handle, TransformError> {
            self.init_calls += 1;
            if self.fail_init {
                return Err(TransformError::Init {
                    len,
                    reason: "simulated".into(),
                });
            }
            self.inner.init(len)
        }

        fn forward_real(
            &mut self,
            handle: &mut Self::Handle,
            input: &mut [f32],
            output: &mut [f32],
        ) -> std::result::Result<(), TransformError> {
            if std::mem::take(&mut self.fail_next_forward) {
                return Err(TransformError::Process("simulated".into()));
            }
            self.inner.forward_real(handle, input, output)
        }
    }

    fn sine(freq_hz: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| (2.0 * PI * freq_hz * n as f32 / sample_rate).sin())
            .collect()
    }

    fn pipeline(len: usize) -> ChannelPipeline<RealFftTransform> {
        let mut windows = WindowCache::new();
        ChannelPipeline::new(ChannelConfig::new(0, len), &mut windows, RealFftTransform::new()).unwrap()
    }

    #[test]
    fn test_sine_peak_bin() {
        let cases = [
            (50.0, 1000.0, 256),
            (120.0, 1000.0, 512),
            (440.0, 8000.0, 1024),
            (3000.0, 48000.0, 2048),
            (10.0, 100.0, 64),
        ];

        for (freq, fs, len) in cases {
            let mut windows = WindowCache::new();
            let config = ChannelConfig::new(0, len).with_sample_rate(fs);
            let mut p = ChannelPipeline::new(config, &mut windows, RealFftTransform::new()).unwrap();

            let spectrum = p.update(&sine(freq, fs, len)).unwrap();
            assert_eq!(spectrum.len(), len / 2);

            let peak = peak_bin(spectrum).unwrap() as i64;
            let expected = hz_to_bin(freq, len, fs) as i64;
            assert!((peak - expected).abs() <= 1, "f={} fs={} L={}: peak {} expected {}", freq, fs, len, peak, expected);

            let peak_hz = p.peak_frequency().unwrap();
            assert!((peak_hz - freq).abs() <= 1.5 * fs / len as f32 + 1e-3);
        }
    }

    #[test]
    fn test_zero_input_gives_zero_spectrum() {
        let mut p = pipeline(256);
        let spectrum = p.update(&[0.0; 256]).unwrap();

        assert_eq!(spectrum.len(), 128);
        assert!(spectrum.iter().all(|&m| m == 0.0));
    }

    #[test]
    fn test_length_mismatch() {
        let mut p = pipeline(256);

        let err = p.update(&[1.0; 255]).unwrap_err();
        assert!(matches!(err, StftError::LengthMismatch { expected: 256, actual: 255 }));

        let err = p.update(&[1.0; 512]).unwrap_err();
        assert!(err.is_length_error());

        assert!(p.spectrum().is_none());
        assert_eq!(p.stats(), PipelineStats::default());
    }

    #[test]
    fn test_invalid_length_prevents_construction() {
        let mut windows = WindowCache::new();

        for len in [0, 3, 100] {
            let result = ChannelPipeline::new(ChannelConfig::new(0, len), &mut windows, RealFftTransform::new());
            assert!(matches!(result, Err(StftError::InvalidLength { .. })));
        }
        assert!(windows.is_empty());
    }

    #[test]
    fn test_window_not_recomputed_per_update() {
        let mut windows = WindowCache::new();
        let mut p = ChannelPipeline::new(ChannelConfig::new(0, 128), &mut windows, RealFftTransform::new()).unwrap();
        let before = Arc::clone(p.window());

        for _ in 0..10 {
            p.update(&sine(30.0, 1000.0, 128)).unwrap();
        }

        assert!(Arc::ptr_eq(&before, p.window()));
        assert_eq!(windows.computed_count(), 1);
        assert_eq!(p.stats().updates, 10);
    }

    #[test]
    fn test_transform_failure_is_explicit_and_recoverable() {
        let mut windows = WindowCache::new();
        let mut p = ChannelPipeline::new(ChannelConfig::new(4, 256), &mut windows, FlakyTransform::new()).unwrap();

        let first = p.update(&sine(50.0, 1000.0, 256)).unwrap().to_vec();
        assert_eq!(peak_bin(&first), Some(13));

        p.transform.fail_next_forward = true;
        let err = p.update(&sine(200.0, 1000.0, 256)).unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(p.state(), PipelineState::Faulted);
        assert!(p.spectrum().is_none());
        assert!(matches!(p.last_failure(), Some(TransformError::Process(_))));

        // Retry with the next block succeeds and reflects the new input
        let fresh = p.update(&sine(200.0, 1000.0, 256)).unwrap().to_vec();
        assert_eq!(peak_bin(&fresh), Some(hz_to_bin(200.0, 256, 1000.0)));
        assert_ne!(first, fresh);
        assert_eq!(p.state(), PipelineState::Configured);
        assert!(p.last_failure().is_none());
        assert_eq!(p.stats(), PipelineStats { updates: 2, failures: 1 });

        // Handle was dropped after the failure and planned again
        assert_eq!(p.transform.init_calls, 2);
    }

    #[test]
    fn test_init_failure_starts_faulted_and_retries() {
        let mut windows = WindowCache::new();
        let mut flaky = FlakyTransform::new();
        flaky.fail_init = true;

        let mut p = ChannelPipeline::new(ChannelConfig::new(1, 64), &mut windows, flaky).unwrap();
        assert!(p.is_faulted());
        assert!(matches!(p.last_failure(), Some(TransformError::Init { len: 64, .. })));

        assert!(p.update(&[1.0; 64]).unwrap_err().is_recoverable());
        assert!(p.spectrum().is_none());

        p.transform.fail_init = false;
        let spectrum = p.update(&[1.0; 64]).unwrap();
        assert!(spectrum[0] > 0.0);
        assert!(!p.is_faulted());
    }

    #[test]
    fn test_backend_over_capacity_faults() {
        let mut windows = WindowCache::new();
        let capped = RealFftTransform::new().with_max_len(4096);
        let mut p = ChannelPipeline::new(ChannelConfig::new(2, 8192), &mut windows, capped).unwrap();

        assert!(p.is_faulted());
        let err = p.update(&vec![0.5; 8192]).unwrap_err();
        assert!(matches!(err, StftError::TransformFailure(TransformError::Init { len: 8192, .. })));
    }

    #[test]
    fn test_reconfigure() {
        let mut windows = WindowCache::new();
        let mut p = ChannelPipeline::new(ChannelConfig::new(0, 256), &mut windows, RealFftTransform::new()).unwrap();
        p.update(&sine(50.0, 1000.0, 256)).unwrap();

        assert!(!p.reconfigure(256, &mut windows).unwrap());
        assert!(p.spectrum().is_some());

        assert!(p.reconfigure(512, &mut windows).unwrap());
        assert_eq!(p.block_len(), 512);
        assert_eq!(p.num_bins(), 256);
        assert_eq!(p.window().len(), 512);
        assert!(p.spectrum().is_none());
        assert_eq!(windows.computed_count(), 2);

        assert!(p.update(&[0.0; 256]).unwrap_err().is_length_error());
        assert_eq!(p.update(&sine(50.0, 1000.0, 512)).unwrap().len(), 256);

        // Invalid length keeps the current configuration
        assert!(p.reconfigure(300, &mut windows).is_err());
        assert_eq!(p.block_len(), 512);
        assert!(p.spectrum().is_some());
    }

    #[test]
    fn test_backends_produce_same_magnitudes() {
        let mut windows = WindowCache::new();
        let mut real = ChannelPipeline::new(ChannelConfig::new(0, 256), &mut windows, RealFftTransform::new()).unwrap();
        let mut complex = ChannelPipeline::new(ChannelConfig::new(1, 256), &mut windows, ComplexFftTransform::new()).unwrap();

        let signal: Vec<f32> = sine(75.0, 1000.0, 256)
            .iter()
            .zip(sine(310.0, 1000.0, 256))
            .map(|(a, b)| a + 0.3 * b + 0.2)
            .collect();

        let a = real.update(&signal).unwrap().to_vec();
        let b = complex.update(&signal).unwrap();

        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-3);
        }
        assert_eq!(windows.computed_count(), 1);
    }

    #[test]
    fn test_frequency_axis() {
        let mut windows = WindowCache::new();
        let config = ChannelConfig::new(0, 256).with_sample_rate(1000.0);
        let p = ChannelPipeline::new(config, &mut windows, RealFftTransform::new()).unwrap();

        let freqs = p.frequency_bins_hz();
        assert_eq!(freqs.len(), p.num_bins());
        assert!((freqs[13] - 50.78125).abs() < 1e-3);
    }
}
