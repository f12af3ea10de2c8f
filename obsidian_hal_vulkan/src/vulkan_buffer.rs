/// Buffer - Vulkan buffers backed by gpu-allocator memory

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use obsidian_hal::obsidian::{MemoryLocation, NativeBufferDesc};
use obsidian_hal::{hal_bail, hal_err, Result};

use crate::vulkan_context::{allocation_error, vk_error, GpuContext};
use crate::vulkan_format::{buffer_usage_to_vk, memory_location_to_gpu_allocator};

const SOURCE: &str = "obsidian::vulkan::buffer";

/// Vulkan buffer and the memory bound to it
pub struct Buffer {
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation, taken on destruction
    pub(crate) allocation: Option<Allocation>,
    /// Requested size in bytes
    pub(crate) size: u64,
    pub(crate) location: MemoryLocation,
}

impl Buffer {
    /// Native handle, for binding in caller-recorded command buffers
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

pub(crate) fn create_buffer(ctx: &GpuContext, desc: &NativeBufferDesc) -> Result<Buffer> {
    unsafe {
        let create_info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(buffer_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = ctx
            .device
            .create_buffer(&create_info, None)
            .map_err(|e| vk_error(&format!("Failed to create buffer of size {} bytes", desc.size), e))?;

        let requirements = ctx.device.get_buffer_memory_requirements(buffer);

        let allocation = ctx.allocator().and_then(|mut allocator| {
            allocator
                .allocate(&AllocationCreateDesc {
                    name: "buffer",
                    requirements,
                    location: memory_location_to_gpu_allocator(desc.location),
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| allocation_error("buffer", requirements.size, e))
        });
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                ctx.device.destroy_buffer(buffer, None);
                return Err(e);
            }
        };

        if let Err(e) = ctx.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
            ctx.device.destroy_buffer(buffer, None);
            if let Ok(mut allocator) = ctx.allocator() {
                allocator.free(allocation).ok();
            }
            return Err(vk_error("Failed to bind buffer memory", e));
        }

        Ok(Buffer {
            buffer,
            allocation: Some(allocation),
            size: desc.size,
            location: desc.location,
        })
    }
}

pub(crate) fn write_buffer(buffer: &mut Buffer, offset: u64, data: &[u8]) -> Result<()> {
    let end = offset
        .checked_add(data.len() as u64)
        .filter(|&end| end <= buffer.size)
        .ok_or_else(|| {
            hal_err!(
                BackendError,
                SOURCE,
                "Write of {} bytes at offset {} exceeds buffer size {}",
                data.len(),
                offset,
                buffer.size
            )
        })?;

    if buffer.location != MemoryLocation::CpuToGpu {
        hal_bail!(BackendError, SOURCE, "Buffer is not CPU-accessible");
    }

    let mapped = buffer
        .allocation
        .as_mut()
        .and_then(|allocation| allocation.mapped_slice_mut())
        .ok_or_else(|| hal_err!(BackendError, SOURCE, "Buffer memory is not mapped"))?;

    mapped[offset as usize..end as usize].copy_from_slice(data);
    Ok(())
}

pub(crate) fn copy_buffer(ctx: &GpuContext, src: &Buffer, dst: &Buffer, size: u64) -> Result<()> {
    if size > src.size || size > dst.size {
        hal_bail!(
            BackendError,
            SOURCE,
            "Copy of {} bytes exceeds buffer sizes ({} -> {})",
            size,
            src.size,
            dst.size
        );
    }

    let region = vk::BufferCopy::default().src_offset(0).dst_offset(0).size(size);
    ctx.one_shot("buffer copy", |device, command_buffer| unsafe {
        device.cmd_copy_buffer(command_buffer, src.buffer, dst.buffer, &[region]);
    })
}

pub(crate) fn destroy_buffer(ctx: &GpuContext, mut buffer: Buffer) {
    unsafe {
        // Free GPU memory first, the buffer is destroyed even if the lock fails
        if let Some(allocation) = buffer.allocation.take() {
            if let Ok(mut allocator) = ctx.allocator() {
                allocator.free(allocation).ok();
            }
        }
        ctx.device.destroy_buffer(buffer.buffer, None);
    }
}
