//! Spectral stages: window synthesis, windowing, transform, magnitude

pub mod fft;
pub mod magnitude;
pub mod window;
pub mod windowing;

pub use fft::{ComplexFftTransform, RealFftTransform, SpectralTransform};
pub use magnitude::{extract_magnitudes, magnitude_db, peak_bin};
pub use window::{GaussianWindow, WindowCache, WindowParams};
pub use windowing::apply_window;
