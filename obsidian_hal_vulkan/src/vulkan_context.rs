/// GpuContext - device-level objects shared by every Vulkan resource module
///
/// Contains everything needed for GPU operations:
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Graphics queue, also used as the transfer queue
/// - Command pool and fence for blocking one-shot transfers
/// - Command pool for frame command buffers handed out to callers

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use gpu_allocator::AllocationError;
use obsidian_hal::{hal_err, hal_error, Error, Result};
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};

const SOURCE: &str = "obsidian::vulkan";

/// Device-level state owned by [`VulkanBackend`](crate::VulkanBackend)
///
/// Destruction is done by `VulkanBackend::drop`, which controls the order
/// (allocator before device, device before instance).
pub(crate) struct GpuContext {
    /// Vulkan logical device
    pub(crate) device: ash::Device,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop so it is dropped BEFORE the device is destroyed
    pub(crate) allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Graphics queue (submission, presentation and transfers)
    pub(crate) graphics_queue: vk::Queue,

    /// Graphics queue family index
    pub(crate) graphics_queue_family: u32,

    /// Command pool for one-shot transfers (TRANSIENT + RESET_COMMAND_BUFFER)
    pub(crate) upload_command_pool: vk::CommandPool,

    /// Signaled when a one-shot transfer has completed
    pub(crate) upload_fence: vk::Fence,

    /// Command pool for caller-recorded frame command buffers
    pub(crate) frame_command_pool: Mutex<vk::CommandPool>,
}

impl GpuContext {
    /// Lock the allocator, a poisoned lock is reported as a backend failure
    pub(crate) fn allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| hal_err!(BackendError, SOURCE, "GPU allocator lock poisoned"))
    }

    /// Record a command buffer with `record`, submit it to the graphics queue
    /// and block until it has executed
    pub(crate) fn one_shot<F>(&self, what: &str, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(self.upload_command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffers = self
                .device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| vk_error(&format!("Failed to allocate command buffer for {}", what), e))?;
            let command_buffer = command_buffers[0];

            let result = self.submit_one_shot(what, command_buffer, record);
            self.device.free_command_buffers(self.upload_command_pool, &command_buffers);
            result
        }
    }

    unsafe fn submit_one_shot<F>(&self, what: &str, command_buffer: vk::CommandBuffer, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        self.device
            .begin_command_buffer(command_buffer, &begin_info)
            .map_err(|e| vk_error(&format!("Failed to begin command buffer for {}", what), e))?;

        record(&self.device, command_buffer);

        self.device
            .end_command_buffer(command_buffer)
            .map_err(|e| vk_error(&format!("Failed to end command buffer for {}", what), e))?;

        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

        self.device
            .reset_fences(&[self.upload_fence])
            .map_err(|e| vk_error(&format!("Failed to reset upload fence for {}", what), e))?;

        self.device
            .queue_submit(self.graphics_queue, &[submit_info], self.upload_fence)
            .map_err(|e| vk_error(&format!("Failed to submit {}", what), e))?;

        self.device
            .wait_for_fences(&[self.upload_fence], true, u64::MAX)
            .map_err(|e| vk_error(&format!("Failed to wait for {}", what), e))
    }
}

/// Map a failed Vulkan call to the HAL error taxonomy, logging it
pub(crate) fn vk_error(context: &str, result: vk::Result) -> Error {
    match result {
        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
            hal_error!(SOURCE, "{}: out of memory ({:?})", context, result);
            Error::OutOfMemory
        }
        vk::Result::ERROR_DEVICE_LOST => {
            hal_error!(SOURCE, "{}: device lost", context);
            Error::DeviceLost
        }
        vk::Result::TIMEOUT => hal_err!(Timeout, SOURCE, "{}: timed out", context),
        _ => hal_err!(BackendError, SOURCE, "{}: {:?}", context, result),
    }
}

/// Map a gpu-allocator failure to the HAL error taxonomy, logging it
pub(crate) fn allocation_error(context: &str, size: u64, error: AllocationError) -> Error {
    match error {
        AllocationError::OutOfMemory => {
            let size_mb = size as f64 / (1024.0 * 1024.0);
            hal_error!(SOURCE, "Out of GPU memory for {} ({:.2} MB)", context, size_mb);
            Error::OutOfMemory
        }
        other => hal_err!(BackendError, SOURCE, "Failed to allocate memory for {}: {}", context, other),
    }
}
