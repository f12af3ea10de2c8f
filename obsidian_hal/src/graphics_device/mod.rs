/// Graphics device module - the device facade, its backend trait and every
/// resource kind it manages

// Module declarations
pub mod backend;
pub mod render_device;
pub mod buffer;
pub mod texture;
pub mod sampler;
pub mod frame_buffer;
pub mod frame_sync;
pub mod surface;

// Re-export the facade and the backend seam
pub use render_device::*;
pub use backend::*;

// Re-export resource types
pub use buffer::*;
pub use texture::*;
pub use sampler::*;
pub use frame_buffer::*;
pub use frame_sync::FrameState;
pub use surface::*;

// Recording backend for tests (no GPU required)
#[cfg(test)]
pub(crate) mod mock_backend;
