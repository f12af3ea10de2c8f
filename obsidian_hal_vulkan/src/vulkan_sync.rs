/// Sync - semaphores, fences and graphics-queue submission

use ash::vk;
use obsidian_hal::Result;

use crate::vulkan_context::{vk_error, GpuContext};

pub(crate) fn create_semaphore(ctx: &GpuContext) -> Result<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::default();
    unsafe {
        ctx.device
            .create_semaphore(&create_info, None)
            .map_err(|e| vk_error("Failed to create semaphore", e))
    }
}

pub(crate) fn create_fence(ctx: &GpuContext, signaled: bool) -> Result<vk::Fence> {
    let flags = if signaled {
        vk::FenceCreateFlags::SIGNALED
    } else {
        vk::FenceCreateFlags::empty()
    };
    let create_info = vk::FenceCreateInfo::default().flags(flags);
    unsafe {
        ctx.device
            .create_fence(&create_info, None)
            .map_err(|e| vk_error("Failed to create fence", e))
    }
}

/// Blocks at most `timeout_ns`, `Error::Timeout` when it expires
pub(crate) fn wait_fence(ctx: &GpuContext, fence: vk::Fence, timeout_ns: u64) -> Result<()> {
    unsafe {
        ctx.device
            .wait_for_fences(&[fence], true, timeout_ns)
            .map_err(|e| vk_error("Failed to wait for fence", e))
    }
}

pub(crate) fn fence_signaled(ctx: &GpuContext, fence: vk::Fence) -> Result<bool> {
    unsafe {
        ctx.device
            .get_fence_status(fence)
            .map_err(|e| vk_error("Failed to query fence status", e))
    }
}

pub(crate) fn reset_fence(ctx: &GpuContext, fence: vk::Fence) -> Result<()> {
    unsafe {
        ctx.device
            .reset_fences(&[fence])
            .map_err(|e| vk_error("Failed to reset fence", e))
    }
}

/// Submit on the graphics queue, waiting on `wait` at the
/// color-attachment-output stage
pub(crate) fn submit(
    ctx: &GpuContext,
    command_buffers: &[vk::CommandBuffer],
    wait: vk::Semaphore,
    signal: vk::Semaphore,
    fence: vk::Fence,
) -> Result<()> {
    let wait_semaphores = [wait];
    let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
    let signal_semaphores = [signal];

    let submit_info = vk::SubmitInfo::default()
        .wait_semaphores(&wait_semaphores)
        .wait_dst_stage_mask(&wait_stages)
        .command_buffers(command_buffers)
        .signal_semaphores(&signal_semaphores);

    unsafe {
        ctx.device
            .queue_submit(ctx.graphics_queue, &[submit_info], fence)
            .map_err(|e| vk_error("Failed to submit commands to GPU queue", e))
    }
}
