/*!
# Obsidian HAL

Platform-agnostic core of the Obsidian graphics hardware-abstraction layer.

GPU resources are exposed as opaque, typed IDs into resource tables owned by a
[`RenderDevice`](graphics_device::RenderDevice). The device drives a native
[`Backend`](graphics_device::Backend) (see the `obsidian_hal_vulkan` crate) and
implements everything that does not depend on the native API:

- **Resource tables**: generation-checked IDs, stale IDs are always rejected
- **Buffers**: vertex, index and uniform buffers, static (staged to
  device-local memory) or dynamic (host-visible, updated in place)
- **Textures**: sampled, depth-stencil and render-target images, plus samplers
- **Framebuffers**: attachment-compatible render-pass formats and framebuffers
- **Surfaces**: multi-buffered acquire / submit / present state machine with
  swapchain recreation
*/

// Internal modules
mod error;
pub mod log;
pub mod config;
pub mod resource_table;
pub mod graphics_device;

pub use error::{Error, Result};

// Main obsidian namespace module
pub mod obsidian {
    // Error types
    pub use crate::error::{Error, Result};

    // Configuration
    pub use crate::config::{DebugSeverity, DeviceConfig, PresentMode};

    // IDs
    pub use crate::resource_table::{
        invalid_id, FramebufferFormatId, FramebufferId, IndexBufferId, ResourceTable, SamplerId,
        SurfaceId, TextureId, UniformBufferId, VertexBufferId,
    };

    // Device facade and all resource types
    pub use crate::graphics_device::*;

    // Logging sub-module (types and functions, macros are exported at the crate root)
    pub mod log {
        pub use crate::log::{
            log, log_detailed, min_severity, reset_logger, set_logger, set_min_severity,
            DefaultLogger, LogEntry, LogSeverity, Logger,
        };
    }
}
