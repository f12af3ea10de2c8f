/// Window surfaces and device bring-up from a window

use ash::vk;
use obsidian_hal::obsidian::{DeviceConfig, RenderDevice};
use obsidian_hal::{hal_err, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::vulkan_backend::VulkanBackend;

const SOURCE: &str = "obsidian::vulkan";

/// Create a native surface for `window`
///
/// Pass the result to `RenderDevice::create_surface`, which takes ownership.
pub fn create_window_surface<W>(backend: &VulkanBackend, window: &W) -> Result<vk::SurfaceKHR>
where
    W: HasDisplayHandle + HasWindowHandle,
{
    unsafe { create_window_surface_raw(&backend.entry, &backend.instance, window) }
}

pub(crate) unsafe fn create_window_surface_raw<W>(
    entry: &ash::Entry,
    instance: &ash::Instance,
    window: &W,
) -> Result<vk::SurfaceKHR>
where
    W: HasDisplayHandle + HasWindowHandle,
{
    let display_handle = window
        .display_handle()
        .map_err(|e| hal_err!(InitializationFailed, SOURCE, "Failed to get display handle: {}", e))?;
    let window_handle = window
        .window_handle()
        .map_err(|e| hal_err!(InitializationFailed, SOURCE, "Failed to get window handle: {}", e))?;

    ash_window::create_surface(entry, instance, display_handle.as_raw(), window_handle.as_raw(), None)
        .map_err(|e| hal_err!(InitializationFailed, SOURCE, "Failed to create window surface: {:?}", e))
}

/// Create a Vulkan backend for `window` and wrap it into a [`RenderDevice`]
///
/// The window is only used to select a queue family that can present;
/// surfaces are created separately with [`create_window_surface`].
pub fn create_render_device<W>(window: &W, config: DeviceConfig) -> Result<RenderDevice<VulkanBackend>>
where
    W: HasDisplayHandle + HasWindowHandle,
{
    let backend = VulkanBackend::new(window, &config)?;
    RenderDevice::new(backend, config)
}
