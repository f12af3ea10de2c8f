//! Backend trait - native GPU API behind the device facade
//!
//! A backend owns the native device and knows how to create, use and destroy
//! native objects. It keeps no resource tables and enforces no HAL invariant:
//! validation, ID bookkeeping and the frame state machine live in
//! [`RenderDevice`](super::RenderDevice). Native handles are exposed to the
//! core only as associated types, so nothing outside the backend crate ever
//! depends on the native API.

use bitflags::bitflags;
use std::fmt;

use crate::config::PresentMode;
use crate::error::Result;
use crate::graphics_device::frame_buffer::AttachmentRole;
use crate::graphics_device::sampler::SamplerDesc;
use crate::graphics_device::texture::{DataFormat, SampleCount, TextureType};

// ============================================================================
// Buffers
// ============================================================================

bitflags! {
    /// Native buffer usage
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NativeBufferUsage: u32 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        const UNIFORM = 1 << 2;
        const TRANSFER_SRC = 1 << 3;
        const TRANSFER_DST = 1 << 4;
    }
}

/// Memory location of a native allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryLocation {
    /// Device-local, not host-mappable
    GpuOnly,
    /// Host-visible and host-coherent, persistently mapped
    CpuToGpu,
}

/// Native buffer creation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeBufferDesc {
    pub size: u64,
    pub usage: NativeBufferUsage,
    pub location: MemoryLocation,
}

// ============================================================================
// Images
// ============================================================================

bitflags! {
    /// Native image usage
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NativeImageUsage: u32 {
        const TRANSFER_SRC = 1 << 0;
        const TRANSFER_DST = 1 << 1;
        const SAMPLED = 1 << 2;
        const COLOR_ATTACHMENT = 1 << 3;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 4;
    }
}

bitflags! {
    /// Format capabilities for one tiling mode
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FormatFeatureFlags: u32 {
        const SAMPLED_IMAGE = 1 << 0;
        const SAMPLED_IMAGE_FILTER_LINEAR = 1 << 1;
        const COLOR_ATTACHMENT = 1 << 2;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 3;
        const BLIT_SRC = 1 << 4;
        const BLIT_DST = 1 << 5;
    }
}

bitflags! {
    /// Image aspects covered by a view
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageAspect: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// Format capabilities reported by the physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatProperties {
    pub linear_tiling: FormatFeatureFlags,
    pub optimal_tiling: FormatFeatureFlags,
}

impl Default for FormatFeatureFlags {
    fn default() -> Self {
        FormatFeatureFlags::empty()
    }
}

impl FormatProperties {
    /// Features for the given tiling
    pub fn features(&self, tiling: ImageTiling) -> FormatFeatureFlags {
        match tiling {
            ImageTiling::Optimal => self.optimal_tiling,
            ImageTiling::Linear => self.linear_tiling,
        }
    }
}

/// Image memory tiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageTiling {
    Optimal,
    Linear,
}

/// Image layouts used by the HAL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    Undefined,
    TransferDst,
    ColorAttachment,
    DepthStencilAttachment,
    ShaderReadOnly,
    PresentSrc,
}

/// Native image creation parameters (always device-local)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDesc {
    pub texture_type: TextureType,
    pub format: DataFormat,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_levels: u32,
    pub samples: SampleCount,
    pub tiling: ImageTiling,
    pub usage: NativeImageUsage,
}

/// Image view creation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageViewDesc {
    pub texture_type: TextureType,
    pub format: DataFormat,
    pub aspect: ImageAspect,
    pub mip_levels: u32,
}

/// Parameters of a sampled-image upload
///
/// With a staging buffer the image goes `Undefined -> TransferDst`, level 0
/// receives the buffer contents, levels `1..mip_levels` are generated by
/// successive blits when `generate_mipmaps` is set, and every level ends in
/// `ShaderReadOnly`. Without a staging buffer the image is only transitioned
/// to `ShaderReadOnly`. The call blocks until the transfer queue is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageUpload {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_levels: u32,
    pub generate_mipmaps: bool,
}

// ============================================================================
// Render passes
// ============================================================================

/// Attachment load operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadOp {
    Clear,
    Load,
    DontCare,
}

/// Attachment store operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Store,
    DontCare,
}

/// Fully resolved attachment of a render pass
///
/// Produced by the framebuffer-format planner; backends translate it
/// verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentPlan {
    pub format: DataFormat,
    pub samples: SampleCount,
    pub role: AttachmentRole,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub stencil_load_op: LoadOp,
    pub stencil_store_op: StoreOp,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,
}

// ============================================================================
// Presentation
// ============================================================================

/// What a native surface supports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    pub min_image_count: u32,
    /// 0 means no upper bound
    pub max_image_count: u32,
    /// Extent imposed by the window system, `None` if the swapchain decides
    pub current_extent: Option<(u32, u32)>,
    pub min_extent: (u32, u32),
    pub max_extent: (u32, u32),
    /// Supported surface formats the HAL can express
    pub formats: Vec<DataFormat>,
    pub present_modes: Vec<PresentMode>,
}

/// Swapchain creation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainDesc {
    pub format: DataFormat,
    pub width: u32,
    pub height: u32,
    pub image_count: u32,
    pub present_mode: PresentMode,
}

/// Swapchain created by the backend
#[derive(Debug, Clone)]
pub struct SwapchainInfo<H> {
    pub format: DataFormat,
    pub width: u32,
    pub height: u32,
    pub present_mode: PresentMode,
    /// Images owned by the swapchain
    pub images: Vec<H>,
}

/// Result of an image acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireResult {
    Acquired { image_index: u32, suboptimal: bool },
    OutOfDate,
}

/// Result of a presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentResult {
    Presented,
    Suboptimal,
    OutOfDate,
}

// ============================================================================
// Backend trait
// ============================================================================

/// Native GPU API used by [`RenderDevice`](super::RenderDevice)
///
/// Every creation call either returns a fully built object or fails without
/// leaking anything it allocated. Destruction calls are infallible and must
/// only be given objects the GPU no longer uses.
pub trait Backend {
    type Buffer;
    type Image;
    /// Non-owning reference to an image (owned or swapchain)
    type ImageHandle: Copy + fmt::Debug;
    type ImageView;
    type Sampler;
    type RenderPass;
    type Framebuffer;
    type Semaphore;
    type Fence;
    type Swapchain;
    type NativeSurface;
    type CommandBuffer;

    // ===== DEVICE INFO =====

    /// Physical device name
    fn device_name(&self) -> String;

    /// Physical device vendor
    fn vendor(&self) -> String;

    // ===== BUFFERS =====

    /// Create a buffer (mapped when `location` is `CpuToGpu`)
    fn create_buffer(&mut self, desc: &NativeBufferDesc) -> Result<Self::Buffer>;

    /// Write into a host-visible buffer through its mapped pointer
    fn write_buffer(&mut self, buffer: &mut Self::Buffer, offset: u64, data: &[u8]) -> Result<()>;

    /// One-shot copy of `size` bytes on the transfer queue, blocks until done
    fn copy_buffer(&mut self, src: &Self::Buffer, dst: &Self::Buffer, size: u64) -> Result<()>;

    fn destroy_buffer(&mut self, buffer: Self::Buffer);

    // ===== IMAGES =====

    /// Format capabilities for linear and optimal tiling
    fn format_properties(&self, format: DataFormat) -> FormatProperties;

    /// Create a device-local image
    fn create_image(&mut self, desc: &ImageDesc) -> Result<Self::Image>;

    /// Handle used to create views on an owned image
    fn image_handle(&self, image: &Self::Image) -> Self::ImageHandle;

    /// Upload staged data (if any) and leave the image shader-readable
    fn upload_image(
        &mut self,
        image: &Self::Image,
        staging: Option<&Self::Buffer>,
        upload: &ImageUpload,
    ) -> Result<()>;

    fn create_image_view(&mut self, image: Self::ImageHandle, desc: &ImageViewDesc) -> Result<Self::ImageView>;

    fn destroy_image_view(&mut self, view: Self::ImageView);

    fn destroy_image(&mut self, image: Self::Image);

    // ===== SAMPLERS =====

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<Self::Sampler>;

    fn destroy_sampler(&mut self, sampler: Self::Sampler);

    // ===== RENDER PASSES / FRAMEBUFFERS =====

    /// Compile a render pass with one subpass using every attachment
    fn create_render_pass(&mut self, attachments: &[AttachmentPlan]) -> Result<Self::RenderPass>;

    fn destroy_render_pass(&mut self, render_pass: Self::RenderPass);

    fn create_framebuffer(
        &mut self,
        render_pass: &Self::RenderPass,
        views: &[&Self::ImageView],
        width: u32,
        height: u32,
    ) -> Result<Self::Framebuffer>;

    fn destroy_framebuffer(&mut self, framebuffer: Self::Framebuffer);

    // ===== SYNCHRONIZATION =====

    fn create_semaphore(&mut self) -> Result<Self::Semaphore>;

    fn destroy_semaphore(&mut self, semaphore: Self::Semaphore);

    fn create_fence(&mut self, signaled: bool) -> Result<Self::Fence>;

    fn destroy_fence(&mut self, fence: Self::Fence);

    /// Wait for a fence, `Error::Timeout` after `timeout_ns`
    fn wait_fence(&mut self, fence: &Self::Fence, timeout_ns: u64) -> Result<()>;

    fn fence_signaled(&self, fence: &Self::Fence) -> Result<bool>;

    fn reset_fence(&mut self, fence: &Self::Fence) -> Result<()>;

    // ===== PRESENTATION =====

    fn surface_capabilities(&self, surface: &Self::NativeSurface) -> Result<SurfaceCapabilities>;

    /// Create a swapchain, retiring `old` if given (the caller destroys it)
    fn create_swapchain(
        &mut self,
        surface: &Self::NativeSurface,
        desc: &SwapchainDesc,
        old: Option<&Self::Swapchain>,
    ) -> Result<(Self::Swapchain, SwapchainInfo<Self::ImageHandle>)>;

    fn destroy_swapchain(&mut self, swapchain: Self::Swapchain);

    fn destroy_native_surface(&mut self, surface: Self::NativeSurface);

    /// Acquire the next presentable image, signalling `signal` when ready
    fn acquire_next_image(
        &mut self,
        swapchain: &Self::Swapchain,
        signal: &Self::Semaphore,
        timeout_ns: u64,
    ) -> Result<AcquireResult>;

    /// Submit command buffers to the graphics queue
    ///
    /// Waits on `wait` at the color-attachment-output stage, signals
    /// `signal` and `fence` on completion.
    fn submit(
        &mut self,
        command_buffers: &[Self::CommandBuffer],
        wait: &Self::Semaphore,
        signal: &Self::Semaphore,
        fence: &Self::Fence,
    ) -> Result<()>;

    /// Present `image_index` once `wait` is signaled
    fn present(
        &mut self,
        swapchain: &Self::Swapchain,
        image_index: u32,
        wait: &Self::Semaphore,
    ) -> Result<PresentResult>;

    /// Block until the device has finished all submitted work
    fn wait_idle(&mut self) -> Result<()>;
}
