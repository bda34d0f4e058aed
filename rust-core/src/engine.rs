//! Multi-channel STFT engine
//!
//! Holds one [`ChannelPipeline`] per configured channel and routes each
//! incoming block to its channel. All channels share a single code path; each
//! owns its own scratch and output buffers, so updating one channel can never
//! touch another channel's spectrum.
//!
//! The engine never retries a failed block. A transform failure is returned to
//! the caller, the channel is marked faulted, and the next block for that
//! channel is processed normally.

use crate::config::{ChannelConfig, ChannelId, EngineConfig};
use crate::error::{Result, StftError};
use crate::pipeline::ChannelPipeline;
use crate::spectrum::fft::{RealFftTransform, SpectralTransform};
use crate::spectrum::window::WindowCache;

/// Multi-channel spectrum engine
pub struct SpectrumEngine<T: SpectralTransform = RealFftTransform> {
    windows: WindowCache,

    /// Sorted by channel id
    channels: Vec<ChannelPipeline<T>>,
}

impl SpectrumEngine<RealFftTransform> {
    /// Build an engine using the `realfft` backend for every channel
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Self::with_transform(config, |_| RealFftTransform::new())
    }
}

impl<T: SpectralTransform> SpectrumEngine<T> {
    /// Build an engine with a caller-supplied transform per channel
    ///
    /// The whole configuration is validated before any pipeline is built.
    pub fn with_transform<F>(config: &EngineConfig, mut make_transform: F) -> Result<Self>
    where
        F: FnMut(&ChannelConfig) -> T,
    {
        config.validate()?;

        let mut windows = WindowCache::new();
        let mut channels = Vec::with_capacity(config.channels.len());

        for channel in &config.channels {
            let transform = make_transform(channel);
            channels.push(ChannelPipeline::new(channel.clone(), &mut windows, transform)?);
        }
        channels.sort_by_key(|p| p.id());

        tracing::info!(
            channels = channels.len(),
            windows = windows.len(),
            "spectrum engine ready"
        );

        Ok(Self { windows, channels })
    }

    fn index_of(&self, id: ChannelId) -> Result<usize> {
        self.channels
            .binary_search_by_key(&id, |p| p.id())
            .map_err(|_| StftError::UnknownChannel(id))
    }

    /// Process a new block for channel `id` and return its magnitude spectrum
    pub fn update(&mut self, id: ChannelId, input: &[f32]) -> Result<&[f32]> {
        let index = self.index_of(id)?;
        self.channels[index].update(input)
    }

    /// Latest spectrum of channel `id`, if its last block succeeded
    pub fn spectrum(&self, id: ChannelId) -> Option<&[f32]> {
        self.pipeline(id).ok()?.spectrum()
    }

    /// Change the block length of channel `id`
    ///
    /// Returns `Ok(false)` if the length was already `block_len`.
    pub fn reconfigure(&mut self, id: ChannelId, block_len: usize) -> Result<bool> {
        let index = self.index_of(id)?;
        self.channels[index].reconfigure(block_len, &mut self.windows)
    }

    pub fn pipeline(&self, id: ChannelId) -> Result<&ChannelPipeline<T>> {
        let index = self.index_of(id)?;
        Ok(&self.channels[index])
    }

    pub fn pipeline_mut(&mut self, id: ChannelId) -> Result<&mut ChannelPipeline<T>> {
        let index = self.index_of(id)?;
        Ok(&mut self.channels[index])
    }

    pub fn pipelines(&self) -> std::slice::Iter<'_, ChannelPipeline<T>> {
        self.channels.iter()
    }

    /// Disjoint mutable access to every channel
    ///
    /// Each pipeline can be handed to a different execution context.
    pub fn pipelines_mut(&mut self) -> std::slice::IterMut<'_, ChannelPipeline<T>> {
        self.channels.iter_mut()
    }

    /// Configured channel ids in ascending order
    pub fn channel_ids(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.channels.iter().map(|p| p.id())
    }

    /// Channels whose last block failed
    pub fn faulted_channels(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.channels.iter().filter(|p| p.is_faulted()).map(|p| p.id())
    }

    /// Shared window cache
    pub fn windows(&self) -> &WindowCache {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
