/// Conversions between HAL enums and Vulkan codes
///
/// Every HAL -> Vulkan mapping is an exhaustive `match` without a wildcard
/// arm, so adding a HAL variant breaks the build until it is mapped. Vulkan
/// -> HAL mappings are partial: the platform may report values the HAL cannot
/// express, and those come back as `None`.

use ash::vk;
use obsidian_hal::obsidian::{
    AttachmentRole, CompareOperation, DataFormat, FormatFeatureFlags, ImageAspect, ImageLayout,
    ImageTiling, LoadOp, MemoryLocation, MipmapMode, NativeBufferUsage, NativeImageUsage,
    PresentMode, SampleCount, SamplerBorderColor, SamplerFilter, SamplerRepeatMode, StoreOp,
    TextureType,
};

// ============================================================================
// Formats
// ============================================================================

pub(crate) fn format_to_vk(format: DataFormat) -> vk::Format {
    match format {
        DataFormat::R8_UNORM => vk::Format::R8_UNORM,
        DataFormat::R8G8_UNORM => vk::Format::R8G8_UNORM,
        DataFormat::R8G8B8_UNORM => vk::Format::R8G8B8_UNORM,
        DataFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        DataFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        DataFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        DataFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        DataFormat::R16G16B16A16_SFLOAT => vk::Format::R16G16B16A16_SFLOAT,
        DataFormat::R32_SFLOAT => vk::Format::R32_SFLOAT,
        DataFormat::R32G32_SFLOAT => vk::Format::R32G32_SFLOAT,
        DataFormat::R32G32B32_SFLOAT => vk::Format::R32G32B32_SFLOAT,
        DataFormat::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
        DataFormat::D16_UNORM => vk::Format::D16_UNORM,
        DataFormat::D32_SFLOAT => vk::Format::D32_SFLOAT,
        DataFormat::D24_UNORM_S8_UINT => vk::Format::D24_UNORM_S8_UINT,
        DataFormat::D32_SFLOAT_S8_UINT => vk::Format::D32_SFLOAT_S8_UINT,
    }
}

/// Reverse of [`format_to_vk`], `None` for formats the HAL does not know
pub(crate) fn vk_to_format(format: vk::Format) -> Option<DataFormat> {
    let format = match format {
        vk::Format::R8_UNORM => DataFormat::R8_UNORM,
        vk::Format::R8G8_UNORM => DataFormat::R8G8_UNORM,
        vk::Format::R8G8B8_UNORM => DataFormat::R8G8B8_UNORM,
        vk::Format::R8G8B8A8_UNORM => DataFormat::R8G8B8A8_UNORM,
        vk::Format::R8G8B8A8_SRGB => DataFormat::R8G8B8A8_SRGB,
        vk::Format::B8G8R8A8_UNORM => DataFormat::B8G8R8A8_UNORM,
        vk::Format::B8G8R8A8_SRGB => DataFormat::B8G8R8A8_SRGB,
        vk::Format::R16G16B16A16_SFLOAT => DataFormat::R16G16B16A16_SFLOAT,
        vk::Format::R32_SFLOAT => DataFormat::R32_SFLOAT,
        vk::Format::R32G32_SFLOAT => DataFormat::R32G32_SFLOAT,
        vk::Format::R32G32B32_SFLOAT => DataFormat::R32G32B32_SFLOAT,
        vk::Format::R32G32B32A32_SFLOAT => DataFormat::R32G32B32A32_SFLOAT,
        vk::Format::D16_UNORM => DataFormat::D16_UNORM,
        vk::Format::D32_SFLOAT => DataFormat::D32_SFLOAT,
        vk::Format::D24_UNORM_S8_UINT => DataFormat::D24_UNORM_S8_UINT,
        vk::Format::D32_SFLOAT_S8_UINT => DataFormat::D32_SFLOAT_S8_UINT,
        _ => return None,
    };
    Some(format)
}

pub(crate) fn format_features_from_vk(flags: vk::FormatFeatureFlags) -> FormatFeatureFlags {
    let mut features = FormatFeatureFlags::empty();
    if flags.contains(vk::FormatFeatureFlags::SAMPLED_IMAGE) {
        features |= FormatFeatureFlags::SAMPLED_IMAGE;
    }
    if flags.contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR) {
        features |= FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR;
    }
    if flags.contains(vk::FormatFeatureFlags::COLOR_ATTACHMENT) {
        features |= FormatFeatureFlags::COLOR_ATTACHMENT;
    }
    if flags.contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT) {
        features |= FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    if flags.contains(vk::FormatFeatureFlags::BLIT_SRC) {
        features |= FormatFeatureFlags::BLIT_SRC;
    }
    if flags.contains(vk::FormatFeatureFlags::BLIT_DST) {
        features |= FormatFeatureFlags::BLIT_DST;
    }
    features
}

pub(crate) fn aspect_to_vk(aspect: ImageAspect) -> vk::ImageAspectFlags {
    let mut flags = vk::ImageAspectFlags::empty();
    if aspect.contains(ImageAspect::COLOR) { flags |= vk::ImageAspectFlags::COLOR; }
    if aspect.contains(ImageAspect::DEPTH) { flags |= vk::ImageAspectFlags::DEPTH; }
    if aspect.contains(ImageAspect::STENCIL) { flags |= vk::ImageAspectFlags::STENCIL; }
    flags
}

// ============================================================================
// Images
// ============================================================================

pub(crate) fn image_type_to_vk(texture_type: TextureType) -> vk::ImageType {
    match texture_type {
        TextureType::Texture2D => vk::ImageType::TYPE_2D,
        TextureType::Texture3D => vk::ImageType::TYPE_3D,
    }
}

pub(crate) fn view_type_to_vk(texture_type: TextureType) -> vk::ImageViewType {
    match texture_type {
        TextureType::Texture2D => vk::ImageViewType::TYPE_2D,
        TextureType::Texture3D => vk::ImageViewType::TYPE_3D,
    }
}

pub(crate) fn sample_count_to_vk(count: SampleCount) -> vk::SampleCountFlags {
    match count {
        SampleCount::S1 => vk::SampleCountFlags::TYPE_1,
        SampleCount::S2 => vk::SampleCountFlags::TYPE_2,
        SampleCount::S4 => vk::SampleCountFlags::TYPE_4,
        SampleCount::S8 => vk::SampleCountFlags::TYPE_8,
        SampleCount::S16 => vk::SampleCountFlags::TYPE_16,
        SampleCount::S32 => vk::SampleCountFlags::TYPE_32,
        SampleCount::S64 => vk::SampleCountFlags::TYPE_64,
    }
}

pub(crate) fn tiling_to_vk(tiling: ImageTiling) -> vk::ImageTiling {
    match tiling {
        ImageTiling::Optimal => vk::ImageTiling::OPTIMAL,
        ImageTiling::Linear => vk::ImageTiling::LINEAR,
    }
}

pub(crate) fn image_usage_to_vk(usage: NativeImageUsage) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::empty();
    if usage.contains(NativeImageUsage::TRANSFER_SRC) { flags |= vk::ImageUsageFlags::TRANSFER_SRC; }
    if usage.contains(NativeImageUsage::TRANSFER_DST) { flags |= vk::ImageUsageFlags::TRANSFER_DST; }
    if usage.contains(NativeImageUsage::SAMPLED) { flags |= vk::ImageUsageFlags::SAMPLED; }
    if usage.contains(NativeImageUsage::COLOR_ATTACHMENT) { flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT; }
    if usage.contains(NativeImageUsage::DEPTH_STENCIL_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    flags
}

pub(crate) fn image_layout_to_vk(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::Undefined => vk::ImageLayout::UNDEFINED,
        ImageLayout::TransferDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        ImageLayout::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthStencilAttachment => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        ImageLayout::ShaderReadOnly => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ImageLayout::PresentSrc => vk::ImageLayout::PRESENT_SRC_KHR,
    }
}

// ============================================================================
// Buffers
// ============================================================================

pub(crate) fn buffer_usage_to_vk(usage: NativeBufferUsage) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::empty();
    if usage.contains(NativeBufferUsage::VERTEX) { flags |= vk::BufferUsageFlags::VERTEX_BUFFER; }
    if usage.contains(NativeBufferUsage::INDEX) { flags |= vk::BufferUsageFlags::INDEX_BUFFER; }
    if usage.contains(NativeBufferUsage::UNIFORM) { flags |= vk::BufferUsageFlags::UNIFORM_BUFFER; }
    if usage.contains(NativeBufferUsage::TRANSFER_SRC) { flags |= vk::BufferUsageFlags::TRANSFER_SRC; }
    if usage.contains(NativeBufferUsage::TRANSFER_DST) { flags |= vk::BufferUsageFlags::TRANSFER_DST; }
    flags
}

pub(crate) fn memory_location_to_gpu_allocator(location: MemoryLocation) -> gpu_allocator::MemoryLocation {
    match location {
        MemoryLocation::GpuOnly => gpu_allocator::MemoryLocation::GpuOnly,
        MemoryLocation::CpuToGpu => gpu_allocator::MemoryLocation::CpuToGpu,
    }
}

// ============================================================================
// Render passes
// ============================================================================

pub(crate) fn load_op_to_vk(load_op: LoadOp) -> vk::AttachmentLoadOp {
    match load_op {
        LoadOp::Clear => vk::AttachmentLoadOp::CLEAR,
        LoadOp::Load => vk::AttachmentLoadOp::LOAD,
        LoadOp::DontCare => vk::AttachmentLoadOp::DONT_CARE,
    }
}

pub(crate) fn store_op_to_vk(store_op: StoreOp) -> vk::AttachmentStoreOp {
    match store_op {
        StoreOp::Store => vk::AttachmentStoreOp::STORE,
        StoreOp::DontCare => vk::AttachmentStoreOp::DONT_CARE,
    }
}

/// Layout an attachment is in while its subpass runs
pub(crate) fn subpass_layout(role: AttachmentRole) -> vk::ImageLayout {
    match role {
        AttachmentRole::Color => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        AttachmentRole::Depth | AttachmentRole::DepthStencil => {
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        }
    }
}

// ============================================================================
// Samplers
// ============================================================================

pub(crate) fn filter_to_vk(filter: SamplerFilter) -> vk::Filter {
    match filter {
        SamplerFilter::Nearest => vk::Filter::NEAREST,
        SamplerFilter::Linear => vk::Filter::LINEAR,
    }
}

pub(crate) fn mipmap_mode_to_vk(mode: MipmapMode) -> vk::SamplerMipmapMode {
    match mode {
        MipmapMode::Nearest => vk::SamplerMipmapMode::NEAREST,
        MipmapMode::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

pub(crate) fn address_mode_to_vk(mode: SamplerRepeatMode) -> vk::SamplerAddressMode {
    match mode {
        SamplerRepeatMode::Repeat => vk::SamplerAddressMode::REPEAT,
        SamplerRepeatMode::MirroredRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
        SamplerRepeatMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        SamplerRepeatMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
    }
}

pub(crate) fn border_color_to_vk(color: SamplerBorderColor) -> vk::BorderColor {
    match color {
        SamplerBorderColor::Black => vk::BorderColor::FLOAT_OPAQUE_BLACK,
        SamplerBorderColor::White => vk::BorderColor::FLOAT_OPAQUE_WHITE,
        SamplerBorderColor::TransparentBlack => vk::BorderColor::FLOAT_TRANSPARENT_BLACK,
    }
}

pub(crate) fn compare_op_to_vk(op: CompareOperation) -> vk::CompareOp {
    match op {
        CompareOperation::Never => vk::CompareOp::NEVER,
        CompareOperation::Less => vk::CompareOp::LESS,
        CompareOperation::Equal => vk::CompareOp::EQUAL,
        CompareOperation::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOperation::Greater => vk::CompareOp::GREATER,
        CompareOperation::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareOperation::GreaterOrEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareOperation::Always => vk::CompareOp::ALWAYS,
    }
}

// ============================================================================
// Presentation
// ============================================================================

pub(crate) fn present_mode_to_vk(mode: PresentMode) -> vk::PresentModeKHR {
    match mode {
        PresentMode::Fifo => vk::PresentModeKHR::FIFO,
        PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
    }
}

pub(crate) fn vk_to_present_mode(mode: vk::PresentModeKHR) -> Option<PresentMode> {
    match mode {
        vk::PresentModeKHR::FIFO => Some(PresentMode::Fifo),
        vk::PresentModeKHR::MAILBOX => Some(PresentMode::Mailbox),
        vk::PresentModeKHR::IMMEDIATE => Some(PresentMode::Immediate),
        _ => None,
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
