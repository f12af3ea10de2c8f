//! Textures: sampled images, depth-stencil targets, render targets and
//! wrapped swapchain images

use bitflags::bitflags;

use crate::error::Result;
use crate::graphics_device::backend::{
    Backend, FormatFeatureFlags, FormatProperties, ImageAspect, ImageDesc, ImageTiling,
    ImageUpload, ImageViewDesc, NativeImageUsage,
};
use crate::graphics_device::buffer::stage_bytes;
use crate::graphics_device::RenderDevice;
use crate::resource_table::TextureId;
use crate::{hal_bail, hal_debug, hal_err};

const SOURCE: &str = "obsidian::texture";

// ============================================================================
// Formats
// ============================================================================

/// Pixel formats for textures and attachments
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFormat {
    R8_UNORM,
    R8G8_UNORM,
    R8G8B8_UNORM,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    R16G16B16A16_SFLOAT,
    R32_SFLOAT,
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
    R32G32B32A32_SFLOAT,
    D16_UNORM,
    D32_SFLOAT,
    D24_UNORM_S8_UINT,
    D32_SFLOAT_S8_UINT,
}

impl DataFormat {
    /// Size of one texel in bytes
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            DataFormat::R8_UNORM => 1,
            DataFormat::R8G8_UNORM => 2,
            DataFormat::R8G8B8_UNORM => 3,
            DataFormat::R8G8B8A8_UNORM
            | DataFormat::R8G8B8A8_SRGB
            | DataFormat::B8G8R8A8_UNORM
            | DataFormat::B8G8R8A8_SRGB => 4,
            DataFormat::R16G16B16A16_SFLOAT => 8,
            DataFormat::R32_SFLOAT => 4,
            DataFormat::R32G32_SFLOAT => 8,
            DataFormat::R32G32B32_SFLOAT => 12,
            DataFormat::R32G32B32A32_SFLOAT => 16,
            DataFormat::D16_UNORM => 2,
            DataFormat::D32_SFLOAT => 4,
            DataFormat::D24_UNORM_S8_UINT => 4,
            DataFormat::D32_SFLOAT_S8_UINT => 8,
        }
    }

    /// True for formats with a depth aspect
    pub fn is_depth(self) -> bool {
        matches!(
            self,
            DataFormat::D16_UNORM
                | DataFormat::D32_SFLOAT
                | DataFormat::D24_UNORM_S8_UINT
                | DataFormat::D32_SFLOAT_S8_UINT
        )
    }

    /// True for formats with a stencil aspect
    pub fn has_stencil(self) -> bool {
        matches!(
            self,
            DataFormat::D24_UNORM_S8_UINT | DataFormat::D32_SFLOAT_S8_UINT
        )
    }

    pub fn is_srgb(self) -> bool {
        matches!(self, DataFormat::R8G8B8A8_SRGB | DataFormat::B8G8R8A8_SRGB)
    }

    /// Aspects a full view of this format covers
    pub fn aspect(self) -> ImageAspect {
        if self.has_stencil() {
            ImageAspect::DEPTH | ImageAspect::STENCIL
        } else if self.is_depth() {
            ImageAspect::DEPTH
        } else {
            ImageAspect::COLOR
        }
    }
}

/// Texture dimensionality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureType {
    Texture2D,
    Texture3D,
}

/// Samples per texel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SampleCount {
    S1,
    S2,
    S4,
    S8,
    S16,
    S32,
    S64,
}

impl SampleCount {
    pub fn count(self) -> u32 {
        match self {
            SampleCount::S1 => 1,
            SampleCount::S2 => 2,
            SampleCount::S4 => 4,
            SampleCount::S8 => 8,
            SampleCount::S16 => 16,
            SampleCount::S32 => 32,
            SampleCount::S64 => 64,
        }
    }
}

bitflags! {
    /// How a texture will be used
    ///
    /// `COLOR_ATTACHMENT` and `DEPTH_STENCIL_ATTACHMENT` are mutually exclusive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Framebuffer color attachment
        const COLOR_ATTACHMENT = 1 << 1;
        /// Framebuffer depth-stencil attachment
        const DEPTH_STENCIL_ATTACHMENT = 1 << 2;
        /// Sampled from shaders
        const SHADER_SAMPLING = 1 << 3;
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// Texture creation descriptor
#[derive(Debug, Clone, Copy)]
pub struct TextureDesc<'a> {
    pub texture_type: TextureType,
    pub format: DataFormat,
    pub width: u32,
    pub height: u32,
    /// Must be 1 for `Texture2D`
    pub depth: u32,
    /// Mip levels, including level 0
    pub mipmaps: u32,
    pub samples: SampleCount,
    pub usage: TextureUsage,
    /// Texel data for level 0 (sampled textures only)
    pub data: Option<&'a [u8]>,
}

impl Default for TextureDesc<'_> {
    fn default() -> Self {
        Self {
            texture_type: TextureType::Texture2D,
            format: DataFormat::R8G8B8A8_UNORM,
            width: 1,
            height: 1,
            depth: 1,
            mipmaps: 1,
            samples: SampleCount::S1,
            usage: TextureUsage::SHADER_SAMPLING,
            data: None,
        }
    }
}

/// Properties of a live texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub texture_type: TextureType,
    pub format: DataFormat,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mipmaps: u32,
    pub samples: SampleCount,
    pub usage: TextureUsage,
    /// Wraps an externally owned image (swapchain)
    pub wrapped: bool,
}

/// Largest valid mip count for the given extent
pub fn max_mip_levels(width: u32, height: u32, depth: u32) -> u32 {
    let largest = width.max(height).max(depth).max(1);
    u32::BITS - largest.leading_zeros()
}

// ============================================================================
// Internal state
// ============================================================================

/// Native image behind a texture
pub(crate) enum TextureStorage<B: Backend> {
    /// Image and memory allocated by the HAL
    Owned(B::Image),
    /// Image owned by a swapchain
    Wrapped(B::ImageHandle),
}

pub(crate) struct TextureEntry<B: Backend> {
    pub(crate) info: TextureInfo,
    pub(crate) storage: TextureStorage<B>,
    pub(crate) view: B::ImageView,
}

/// Creation path selected from the usage bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TexturePath {
    Sampled,
    DepthStencil { sampled: bool },
    RenderTarget { sampled: bool },
}

pub(crate) fn select_path(usage: TextureUsage) -> Result<TexturePath> {
    let color = usage.contains(TextureUsage::COLOR_ATTACHMENT);
    let depth = usage.contains(TextureUsage::DEPTH_STENCIL_ATTACHMENT);
    let sampled = usage.contains(TextureUsage::SHADER_SAMPLING);

    match (color, depth, sampled) {
        (false, false, false) => Err(hal_err!(
            ConfigurationError,
            SOURCE,
            "Texture usage must not be empty"
        )),
        (true, true, _) => Err(hal_err!(
            ConfigurationError,
            SOURCE,
            "COLOR_ATTACHMENT and DEPTH_STENCIL_ATTACHMENT are mutually exclusive"
        )),
        (false, false, true) => Ok(TexturePath::Sampled),
        (false, true, sampled) => Ok(TexturePath::DepthStencil { sampled }),
        (true, false, sampled) => Ok(TexturePath::RenderTarget { sampled }),
    }
}

/// Validate a descriptor before anything is allocated
pub(crate) fn validate_texture_desc(desc: &TextureDesc<'_>) -> Result<TexturePath> {
    let path = select_path(desc.usage)?;

    if desc.width == 0 || desc.height == 0 || desc.depth == 0 {
        hal_bail!(
            ConfigurationError,
            SOURCE,
            "Texture extent must be at least 1x1x1 (got {}x{}x{})",
            desc.width, desc.height, desc.depth
        );
    }
    if desc.texture_type == TextureType::Texture2D && desc.depth != 1 {
        hal_bail!(ConfigurationError, SOURCE, "Texture2D requires depth = 1 (got {})", desc.depth);
    }
    let max_mips = max_mip_levels(desc.width, desc.height, desc.depth);
    if desc.mipmaps == 0 || desc.mipmaps > max_mips {
        hal_bail!(
            ConfigurationError,
            SOURCE,
            "Mip count {} out of range 1..={} for {}x{}x{}",
            desc.mipmaps, max_mips, desc.width, desc.height, desc.depth
        );
    }

    match path {
        TexturePath::DepthStencil { .. } if !desc.format.is_depth() => {
            hal_bail!(ConfigurationError, SOURCE, "Depth-stencil texture needs a depth format (got {:?})", desc.format);
        }
        TexturePath::Sampled | TexturePath::RenderTarget { .. } if desc.format.is_depth() => {
            hal_bail!(ConfigurationError, SOURCE, "Color texture cannot use depth format {:?}", desc.format);
        }
        _ => {}
    }

    if path != TexturePath::Sampled {
        if desc.texture_type != TextureType::Texture2D {
            hal_bail!(ConfigurationError, SOURCE, "Attachment textures must be Texture2D");
        }
        if desc.mipmaps != 1 {
            hal_bail!(ConfigurationError, SOURCE, "Attachment textures must have a single mip level");
        }
    }

    if desc.samples != SampleCount::S1 && desc.usage.contains(TextureUsage::SHADER_SAMPLING) {
        hal_bail!(
            ConfigurationError,
            SOURCE,
            "Multisampled textures ({:?}) cannot be sampled",
            desc.samples
        );
    }

    if let Some(data) = desc.data {
        if path != TexturePath::Sampled {
            hal_bail!(ConfigurationError, SOURCE, "Initial data is only allowed on sampled textures");
        }
        let expected = desc.width as u64
            * desc.height as u64
            * desc.depth as u64
            * desc.format.bytes_per_pixel() as u64;
        if data.len() as u64 != expected {
            hal_bail!(
                ConfigurationError,
                SOURCE,
                "Texture data is {} bytes, expected {} ({}x{}x{} {:?})",
                data.len(), expected, desc.width, desc.height, desc.depth, desc.format
            );
        }
    }

    Ok(path)
}

/// Pick optimal tiling if it has `required`, else linear
pub(crate) fn select_tiling(
    props: &FormatProperties,
    required: FormatFeatureFlags,
) -> Option<ImageTiling> {
    [ImageTiling::Optimal, ImageTiling::Linear]
        .into_iter()
        .find(|tiling| props.features(*tiling).contains(required))
}

// ============================================================================
// RenderDevice operations
// ============================================================================

impl<B: Backend> RenderDevice<B> {
    /// Create a texture
    ///
    /// The usage bits select the creation path: sampled-only textures are
    /// uploaded through a staging buffer, depth-stencil and color textures
    /// become framebuffer attachments (optionally also sampled).
    pub fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId> {
        let path = validate_texture_desc(desc)?;
        let props = self.backend.format_properties(desc.format);

        let (image, aspect) = match path {
            TexturePath::Sampled => (self.create_sampled_image(desc, &props)?, ImageAspect::COLOR),
            TexturePath::DepthStencil { sampled } => {
                let mut required = FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT;
                let mut usage = NativeImageUsage::DEPTH_STENCIL_ATTACHMENT;
                if sampled {
                    required |= FormatFeatureFlags::SAMPLED_IMAGE;
                    usage |= NativeImageUsage::SAMPLED;
                }
                let tiling = select_tiling(&props, required).ok_or_else(|| {
                    hal_err!(
                        ConfigurationError,
                        SOURCE,
                        "Format {:?} does not support {:?} with optimal or linear tiling",
                        desc.format, required
                    )
                })?;
                let image = self.backend.create_image(&image_desc(desc, tiling, usage))?;
                (image, desc.format.aspect())
            }
            TexturePath::RenderTarget { sampled } => {
                let mut required = FormatFeatureFlags::COLOR_ATTACHMENT;
                let mut usage = NativeImageUsage::COLOR_ATTACHMENT;
                if sampled {
                    required |= FormatFeatureFlags::SAMPLED_IMAGE;
                    usage |= NativeImageUsage::SAMPLED;
                }
                if !props.optimal_tiling.contains(required) {
                    hal_bail!(
                        ConfigurationError,
                        SOURCE,
                        "Format {:?} cannot be a color attachment ({:?}) with optimal tiling",
                        desc.format, required
                    );
                }
                let image = self
                    .backend
                    .create_image(&image_desc(desc, ImageTiling::Optimal, usage))?;
                (image, ImageAspect::COLOR)
            }
        };

        let handle = self.backend.image_handle(&image);
        let view_desc = ImageViewDesc {
            texture_type: desc.texture_type,
            format: desc.format,
            aspect,
            mip_levels: desc.mipmaps,
        };
        let view = match self.backend.create_image_view(handle, &view_desc) {
            Ok(view) => view,
            Err(e) => {
                self.backend.destroy_image(image);
                return Err(e);
            }
        };

        let info = TextureInfo {
            texture_type: desc.texture_type,
            format: desc.format,
            width: desc.width,
            height: desc.height,
            depth: desc.depth,
            mipmaps: desc.mipmaps,
            samples: desc.samples,
            usage: desc.usage,
            wrapped: false,
        };
        let id = self.textures.insert(TextureEntry {
            info,
            storage: TextureStorage::Owned(image),
            view,
        });

        hal_debug!(
            SOURCE,
            "Created texture {:?}: {}x{}x{} {:?} {:?} ({} mips)",
            id, desc.width, desc.height, desc.depth, desc.format, path, desc.mipmaps
        );
        Ok(id)
    }

    /// Sampled path: device-local optimal image, staged upload, mip blits
    fn create_sampled_image(
        &mut self,
        desc: &TextureDesc<'_>,
        props: &FormatProperties,
    ) -> Result<B::Image> {
        if !props.optimal_tiling.contains(FormatFeatureFlags::SAMPLED_IMAGE) {
            hal_bail!(
                ConfigurationError,
                SOURCE,
                "Format {:?} cannot be sampled with optimal tiling",
                desc.format
            );
        }

        let generate_mipmaps = desc.data.is_some() && desc.mipmaps > 1;
        let mut usage = NativeImageUsage::SAMPLED | NativeImageUsage::TRANSFER_DST;
        if generate_mipmaps {
            let blit = FormatFeatureFlags::BLIT_SRC
                | FormatFeatureFlags::BLIT_DST
                | FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR;
            if !props.optimal_tiling.contains(blit) {
                hal_bail!(
                    ConfigurationError,
                    SOURCE,
                    "Format {:?} does not support linear blits, cannot generate {} mip levels",
                    desc.format, desc.mipmaps
                );
            }
            usage |= NativeImageUsage::TRANSFER_SRC;
        }

        let image = self
            .backend
            .create_image(&image_desc(desc, ImageTiling::Optimal, usage))?;

        let staging = match desc.data {
            Some(data) => match stage_bytes(&mut self.backend, data) {
                Ok(staging) => Some(staging),
                Err(e) => {
                    self.backend.destroy_image(image);
                    return Err(e);
                }
            },
            None => None,
        };

        let upload = ImageUpload {
            width: desc.width,
            height: desc.height,
            depth: desc.depth,
            mip_levels: desc.mipmaps,
            generate_mipmaps,
        };
        let result = self.backend.upload_image(&image, staging.as_ref(), &upload);
        if let Some(staging) = staging {
            self.backend.destroy_buffer(staging);
        }
        if let Err(e) = result {
            self.backend.destroy_image(image);
            return Err(e);
        }

        Ok(image)
    }

    /// Register a swapchain image as a surface-owned color texture
    pub(crate) fn wrap_swapchain_image(
        &mut self,
        handle: B::ImageHandle,
        format: DataFormat,
        width: u32,
        height: u32,
    ) -> Result<TextureId> {
        let view = self.backend.create_image_view(
            handle,
            &ImageViewDesc {
                texture_type: TextureType::Texture2D,
                format,
                aspect: ImageAspect::COLOR,
                mip_levels: 1,
            },
        )?;
        Ok(self.textures.insert(TextureEntry {
            info: TextureInfo {
                texture_type: TextureType::Texture2D,
                format,
                width,
                height,
                depth: 1,
                mipmaps: 1,
                samples: SampleCount::S1,
                usage: TextureUsage::COLOR_ATTACHMENT,
                wrapped: true,
            },
            storage: TextureStorage::Wrapped(handle),
            view,
        }))
    }

    /// Properties of a live texture
    pub fn texture_info(&self, id: TextureId) -> Result<TextureInfo> {
        Ok(self.textures.get(id)?.info)
    }

    /// Destroy a texture
    ///
    /// Owned textures release their view, image and memory. Wrapped
    /// swapchain images are released, bookkeeping only, by their surface.
    ///
    /// # Errors
    ///
    /// - `ResourceStateError` if the texture wraps a swapchain image
    ///   (`TextureInfo::wrapped`); destroy or resize its surface instead.
    /// - `ResourceStateError` if a live framebuffer still uses it.
    /// - `LookupFailure` for a stale ID.
    pub fn destroy_texture(&mut self, id: TextureId) -> Result<()> {
        let entry = self.textures.get(id)?;
        if entry.info.wrapped {
            hal_bail!(
                ResourceStateError,
                SOURCE,
                "Texture {:?} is a swapchain image owned by its surface",
                id
            );
        }
        if let Some((fb, _)) = self
            .framebuffers
            .iter()
            .find(|(_, fb)| fb.attachments.contains(&id))
        {
            hal_bail!(
                ResourceStateError,
                SOURCE,
                "Texture {:?} is still attached to framebuffer {:?}",
                id, fb
            );
        }

        let entry = self.textures.remove(id)?;
        release_texture(&mut self.backend, entry);
        hal_debug!(SOURCE, "Destroyed texture {:?}", id);
        Ok(())
    }
}

fn image_desc(desc: &TextureDesc<'_>, tiling: ImageTiling, usage: NativeImageUsage) -> ImageDesc {
    ImageDesc {
        texture_type: desc.texture_type,
        format: desc.format,
        width: desc.width,
        height: desc.height,
        depth: desc.depth,
        mip_levels: desc.mipmaps,
        samples: desc.samples,
        tiling,
        usage,
    }
}

/// Release the native objects of a texture already removed from its table
pub(crate) fn release_texture<B: Backend>(backend: &mut B, entry: TextureEntry<B>) {
    backend.destroy_image_view(entry.view);
    match entry.storage {
        TextureStorage::Owned(image) => backend.destroy_image(image),
        TextureStorage::Wrapped(_) => {}
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
