/*!
# Obsidian HAL Vulkan

Vulkan backend for the Obsidian HAL.

[`VulkanBackend`] implements the core `Backend` trait on top of `ash`,
with memory managed by `gpu-allocator`. All uploads go through the single
graphics queue, which must also be able to present.

```no_run
use obsidian_hal::obsidian::DeviceConfig;
use obsidian_hal_vulkan::{create_render_device, create_window_surface};

# fn run(window: &winit::window::Window) -> obsidian_hal::Result<()> {
let mut device = create_render_device(window, DeviceConfig::default())?;
let native = create_window_surface(device.backend(), window)?;
let size = window.inner_size();
let _surface = device.create_surface("main", native, size.width, size.height)?;
# Ok(())
# }
```

Enable the `vulkan-validation` feature to compile in the Khronos validation
layer support and the [`debug`] module.
*/

mod vulkan_context;
mod vulkan_format;
mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_render_pass;
mod vulkan_sampler;
mod vulkan_sync;
mod vulkan_swapchain;
mod vulkan_backend;
mod surface;

#[cfg(feature = "vulkan-validation")]
pub mod debug;

pub use surface::{create_render_device, create_window_surface};
pub use vulkan_backend::VulkanBackend;
pub use vulkan_buffer::Buffer;
pub use vulkan_swapchain::Swapchain;
pub use vulkan_texture::Image;

#[cfg(feature = "vulkan-validation")]
pub use debug::{print_validation_stats_report, validation_stats, ValidationStats};
