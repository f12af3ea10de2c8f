//! Samplers

use crate::error::Result;
use crate::graphics_device::backend::Backend;
use crate::graphics_device::RenderDevice;
use crate::resource_table::SamplerId;
use crate::{hal_bail, hal_debug};

const SOURCE: &str = "obsidian::sampler";

/// Texel filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerFilter {
    Nearest,
    Linear,
}

/// Filter between mip levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MipmapMode {
    Nearest,
    Linear,
}

/// Behavior outside `[0, 1]` texture coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerRepeatMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

/// Predefined border colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerBorderColor {
    Black,
    White,
    TransparentBlack,
}

/// Comparison function for depth-compare samplers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOperation {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

/// Sampler descriptor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerDesc {
    pub min_filter: SamplerFilter,
    pub mag_filter: SamplerFilter,
    pub address_mode_u: SamplerRepeatMode,
    pub address_mode_v: SamplerRepeatMode,
    pub address_mode_w: SamplerRepeatMode,
    pub anisotropy_enabled: bool,
    /// Must be >= 1 when anisotropy is enabled
    pub max_anisotropy: f32,
    pub border_color: SamplerBorderColor,
    pub mipmap_mode: MipmapMode,
    pub mip_lod_bias: f32,
    pub min_lod: f32,
    pub max_lod: f32,
    /// Enables depth comparison when set
    pub compare_op: Option<CompareOperation>,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            min_filter: SamplerFilter::Nearest,
            mag_filter: SamplerFilter::Nearest,
            address_mode_u: SamplerRepeatMode::ClampToEdge,
            address_mode_v: SamplerRepeatMode::ClampToEdge,
            address_mode_w: SamplerRepeatMode::ClampToEdge,
            anisotropy_enabled: false,
            max_anisotropy: 1.0,
            border_color: SamplerBorderColor::Black,
            mipmap_mode: MipmapMode::Nearest,
            mip_lod_bias: 0.0,
            min_lod: 0.0,
            max_lod: 0.0,
            compare_op: None,
        }
    }
}

pub(crate) struct SamplerEntry<B: Backend> {
    pub(crate) native: B::Sampler,
    pub(crate) desc: SamplerDesc,
}

pub(crate) fn validate_sampler_desc(desc: &SamplerDesc) -> Result<()> {
    if desc.min_lod.is_nan() || desc.max_lod.is_nan() || desc.min_lod > desc.max_lod {
        hal_bail!(
            ConfigurationError,
            SOURCE,
            "Sampler min_lod ({}) must be <= max_lod ({})",
            desc.min_lod, desc.max_lod
        );
    }
    if desc.anisotropy_enabled && !(desc.max_anisotropy >= 1.0) {
        hal_bail!(
            ConfigurationError,
            SOURCE,
            "Sampler max_anisotropy must be >= 1 when anisotropy is enabled (got {})",
            desc.max_anisotropy
        );
    }
    Ok(())
}

impl<B: Backend> RenderDevice<B> {
    /// Create a sampler
    pub fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerId> {
        validate_sampler_desc(desc)?;
        let native = self.backend.create_sampler(desc)?;
        let id = self.samplers.insert(SamplerEntry { native, desc: *desc });
        hal_debug!(SOURCE, "Created sampler {:?}", id);
        Ok(id)
    }

    /// Descriptor a live sampler was created from
    pub fn sampler_desc(&self, id: SamplerId) -> Result<SamplerDesc> {
        Ok(self.samplers.get(id)?.desc)
    }

    pub fn destroy_sampler(&mut self, id: SamplerId) -> Result<()> {
        let entry = self.samplers.remove(id)?;
        self.backend.destroy_sampler(entry.native);
        hal_debug!(SOURCE, "Destroyed sampler {:?}", id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "sampler_tests.rs"]
mod tests;
