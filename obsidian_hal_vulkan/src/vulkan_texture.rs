/// Texture - Vulkan images, image views and staged uploads

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use obsidian_hal::obsidian::{ImageDesc, ImageTiling, ImageUpload, ImageViewDesc, TextureType};
use obsidian_hal::{hal_bail, Result};

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::{allocation_error, vk_error, GpuContext};
use crate::vulkan_format::{
    aspect_to_vk, format_to_vk, image_type_to_vk, image_usage_to_vk, sample_count_to_vk,
    tiling_to_vk, view_type_to_vk,
};

const SOURCE: &str = "obsidian::vulkan::texture";

/// Device-local Vulkan image owned by the backend
pub struct Image {
    /// Vulkan image
    pub(crate) image: vk::Image,
    /// GPU memory allocation, taken on destruction
    pub(crate) allocation: Option<Allocation>,
    /// Creation parameters
    pub(crate) desc: ImageDesc,
}

impl Image {
    /// Native handle
    pub fn handle(&self) -> vk::Image {
        self.image
    }
}

pub(crate) fn create_image(ctx: &GpuContext, desc: &ImageDesc) -> Result<Image> {
    unsafe {
        let create_info = vk::ImageCreateInfo::default()
            .image_type(image_type_to_vk(desc.texture_type))
            .format(format_to_vk(desc.format))
            .extent(vk::Extent3D {
                width: desc.width,
                height: desc.height,
                depth: desc.depth,
            })
            .mip_levels(desc.mip_levels)
            .array_layers(1)
            .samples(sample_count_to_vk(desc.samples))
            .tiling(tiling_to_vk(desc.tiling))
            .usage(image_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = ctx.device.create_image(&create_info, None).map_err(|e| {
            vk_error(
                &format!("Failed to create {}x{}x{} {:?} image", desc.width, desc.height, desc.depth, desc.format),
                e,
            )
        })?;

        let requirements = ctx.device.get_image_memory_requirements(image);

        let allocation = ctx.allocator().and_then(|mut allocator| {
            allocator
                .allocate(&AllocationCreateDesc {
                    name: "texture",
                    requirements,
                    location: gpu_allocator::MemoryLocation::GpuOnly,
                    linear: desc.tiling == ImageTiling::Linear,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| {
                    allocation_error(
                        &format!("texture {}x{}x{}", desc.width, desc.height, desc.depth),
                        requirements.size,
                        e,
                    )
                })
        });
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                ctx.device.destroy_image(image, None);
                return Err(e);
            }
        };

        if let Err(e) = ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
            ctx.device.destroy_image(image, None);
            if let Ok(mut allocator) = ctx.allocator() {
                allocator.free(allocation).ok();
            }
            return Err(vk_error("Failed to bind texture image memory", e));
        }

        Ok(Image {
            image,
            allocation: Some(allocation),
            desc: *desc,
        })
    }
}

/// Staged upload: copy level 0 from `staging`, blit the remaining levels when
/// requested, leave every level in SHADER_READ_ONLY_OPTIMAL
pub(crate) fn upload_image(
    ctx: &GpuContext,
    image: &Image,
    staging: Option<&Buffer>,
    upload: &ImageUpload,
) -> Result<()> {
    if upload.mip_levels == 0 || upload.mip_levels > image.desc.mip_levels {
        hal_bail!(
            BackendError,
            SOURCE,
            "Upload of {} mip levels into an image with {}",
            upload.mip_levels,
            image.desc.mip_levels
        );
    }

    let aspect_mask = aspect_to_vk(image.desc.format.aspect());
    let vk_image = image.image;

    let Some(staging) = staging else {
        // No data: transition straight to SHADER_READ_ONLY_OPTIMAL
        return ctx.one_shot("texture layout transition", |device, command_buffer| unsafe {
            let barrier = layout_barrier(
                vk_image,
                aspect_mask,
                0,
                upload.mip_levels,
                (vk::ImageLayout::UNDEFINED, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
                (vk::AccessFlags::empty(), vk::AccessFlags::SHADER_READ),
            );
            device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        });
    };

    let staging_buffer = staging.buffer;
    ctx.one_shot("texture upload", |device, command_buffer| unsafe {
        // Transition all levels: UNDEFINED -> TRANSFER_DST_OPTIMAL
        let barrier_to_transfer = layout_barrier(
            vk_image,
            aspect_mask,
            0,
            upload.mip_levels,
            (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL),
            (vk::AccessFlags::empty(), vk::AccessFlags::TRANSFER_WRITE),
        );
        device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier_to_transfer],
        );

        let region = vk::BufferImageCopy::default()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .image_extent(vk::Extent3D {
                width: upload.width,
                height: upload.height,
                depth: upload.depth,
            });

        device.cmd_copy_buffer_to_image(
            command_buffer,
            staging_buffer,
            vk_image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[region],
        );

        if upload.generate_mipmaps && upload.mip_levels > 1 {
            record_mip_blits(device, command_buffer, vk_image, aspect_mask, upload);
        } else {
            let barrier_to_shader = layout_barrier(
                vk_image,
                aspect_mask,
                0,
                upload.mip_levels,
                (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
                (vk::AccessFlags::TRANSFER_WRITE, vk::AccessFlags::SHADER_READ),
            );
            device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier_to_shader],
            );
        }
    })
}

/// Generate levels `1..mip_levels` by successive linear blits
///
/// Each source level goes TRANSFER_DST -> TRANSFER_SRC for its blit, then to
/// SHADER_READ_ONLY. The last level is still TRANSFER_DST after the loop.
unsafe fn record_mip_blits(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    aspect_mask: vk::ImageAspectFlags,
    upload: &ImageUpload,
) {
    let extent_at = |level: u32| {
        (
            (upload.width >> level).max(1) as i32,
            (upload.height >> level).max(1) as i32,
            (upload.depth >> level).max(1) as i32,
        )
    };

    for mip in 1..upload.mip_levels {
        let src_mip = mip - 1;
        let (src_width, src_height, src_depth) = extent_at(src_mip);
        let (dst_width, dst_height, dst_depth) = extent_at(mip);

        let barrier_src = layout_barrier(
            image,
            aspect_mask,
            src_mip,
            1,
            (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::TRANSFER_SRC_OPTIMAL),
            (vk::AccessFlags::TRANSFER_WRITE, vk::AccessFlags::TRANSFER_READ),
        );
        device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::TRANSFER,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier_src],
        );

        let blit = vk::ImageBlit::default()
            .src_subresource(vk::ImageSubresourceLayers {
                aspect_mask,
                mip_level: src_mip,
                base_array_layer: 0,
                layer_count: 1,
            })
            .src_offsets([
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D { x: src_width, y: src_height, z: src_depth },
            ])
            .dst_subresource(vk::ImageSubresourceLayers {
                aspect_mask,
                mip_level: mip,
                base_array_layer: 0,
                layer_count: 1,
            })
            .dst_offsets([
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D { x: dst_width, y: dst_height, z: dst_depth },
            ]);

        device.cmd_blit_image(
            command_buffer,
            image,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[blit],
            vk::Filter::LINEAR,
        );

        // Source level is done
        let barrier_src_final = layout_barrier(
            image,
            aspect_mask,
            src_mip,
            1,
            (vk::ImageLayout::TRANSFER_SRC_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
            (vk::AccessFlags::TRANSFER_READ, vk::AccessFlags::SHADER_READ),
        );
        device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier_src_final],
        );
    }

    let barrier_last_mip = layout_barrier(
        image,
        aspect_mask,
        upload.mip_levels - 1,
        1,
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
        (vk::AccessFlags::TRANSFER_WRITE, vk::AccessFlags::SHADER_READ),
    );
    device.cmd_pipeline_barrier(
        command_buffer,
        vk::PipelineStageFlags::TRANSFER,
        vk::PipelineStageFlags::FRAGMENT_SHADER,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        &[barrier_last_mip],
    );
}

fn layout_barrier(
    image: vk::Image,
    aspect_mask: vk::ImageAspectFlags,
    base_mip_level: u32,
    level_count: u32,
    (old_layout, new_layout): (vk::ImageLayout, vk::ImageLayout),
    (src_access, dst_access): (vk::AccessFlags, vk::AccessFlags),
) -> vk::ImageMemoryBarrier<'static> {
    vk::ImageMemoryBarrier::default()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level,
            level_count,
            base_array_layer: 0,
            layer_count: 1,
        })
        .src_access_mask(src_access)
        .dst_access_mask(dst_access)
}

pub(crate) fn create_image_view(ctx: &GpuContext, image: vk::Image, desc: &ImageViewDesc) -> Result<vk::ImageView> {
    let create_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(view_type_to_vk(desc.texture_type))
        .format(format_to_vk(desc.format))
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: aspect_to_vk(desc.aspect),
            base_mip_level: 0,
            level_count: desc.mip_levels,
            base_array_layer: 0,
            layer_count: 1,
        });

    unsafe {
        ctx.device.create_image_view(&create_info, None).map_err(|e| {
            let kind = match desc.texture_type {
                TextureType::Texture2D => "2D",
                TextureType::Texture3D => "3D",
            };
            vk_error(&format!("Failed to create {} image view", kind), e)
        })
    }
}

pub(crate) fn destroy_image(ctx: &GpuContext, mut image: Image) {
    unsafe {
        if let Some(allocation) = image.allocation.take() {
            if let Ok(mut allocator) = ctx.allocator() {
                allocator.free(allocation).ok();
            }
        }
        ctx.device.destroy_image(image.image, None);
    }
}
