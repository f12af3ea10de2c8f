//! Device configuration
//!
//! [`DeviceConfig`] is consumed once, by the backend constructor and by
//! [`RenderDevice::new`](crate::graphics_device::RenderDevice::new).

use crate::log::LogSeverity;

/// Minimum severity of validation-layer messages forwarded to the logger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    /// Show all messages (verbose, info, warning, error)
    All,
    /// Show warnings and errors only
    WarningsAndAbove,
    /// Show errors only
    ErrorsOnly,
}

impl DebugSeverity {
    /// Severity used for the hal logger when forwarding validation messages
    pub fn min_log_severity(self) -> LogSeverity {
        match self {
            DebugSeverity::All => LogSeverity::Trace,
            DebugSeverity::WarningsAndAbove => LogSeverity::Warn,
            DebugSeverity::ErrorsOnly => LogSeverity::Error,
        }
    }
}

/// Preferred presentation mode, honored when the surface supports it
///
/// `Fifo` is always available and is the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentMode {
    /// Vsync, never tears
    Fifo,
    /// Triple-buffered low latency, falls back to Fifo
    Mailbox,
    /// No vsync, may tear
    Immediate,
}

/// Device bring-up and frame-pacing configuration
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Application name reported to the driver
    pub app_name: String,
    /// Application version as (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Enable the validation layers (needs the `vulkan-validation` feature)
    pub enable_validation: bool,
    /// Validation message filter
    pub debug_severity: DebugSeverity,
    /// Number of frames the CPU may record ahead of the GPU
    pub max_frames_in_flight: u32,
    /// Upper bound for in-flight fence waits, in nanoseconds
    pub fence_timeout_ns: u64,
    /// Preferred swapchain present mode
    pub present_mode_preference: PresentMode,
    /// Prefer an sRGB swapchain format when available
    pub prefer_srgb_surface: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            app_name: "Obsidian Application".to_string(),
            app_version: (1, 0, 0),
            enable_validation: cfg!(debug_assertions),
            debug_severity: DebugSeverity::WarningsAndAbove,
            max_frames_in_flight: 3,
            fence_timeout_ns: 5_000_000_000,
            present_mode_preference: PresentMode::Fifo,
            prefer_srgb_surface: true,
        }
    }
}
