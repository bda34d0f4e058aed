//! Gabor STFT - Multi-Channel Magnitude Spectrum Engine
//!
//! Gaussian-windowed short-time Fourier transform for continuously sampled
//! analog channels. Each channel receives fixed-length blocks from an upstream
//! pre-filter and produces an L/2-bin magnitude spectrum with bounded work per
//! block and no allocation after construction.
//!
//! ```
//! use gabor_stft::{ChannelId, EngineConfig, SpectrumEngine};
//!
//! let mut engine = SpectrumEngine::new(&EngineConfig::default())?;
//! let block = vec![0.0f32; 256];
//! let spectrum = engine.update(ChannelId(0), &block)?;
//! assert_eq!(spectrum.len(), 128);
//! # Ok::<(), gabor_stft::StftError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod spectrum;

pub use config::{ChannelConfig, ChannelId, EngineConfig};
pub use engine::SpectrumEngine;
pub use error::{Result, StftError, TransformError};
pub use pipeline::{ChannelPipeline, PipelineState, PipelineStats};
pub use spectrum::{ComplexFftTransform, GaussianWindow, RealFftTransform, SpectralTransform, WindowCache};
