//! RenderDevice - the resource facade
//!
//! Owns one backend and one resource table per resource kind. Every public
//! operation takes or returns opaque IDs; native objects never leave the
//! device except through [`native_framebuffer`](RenderDevice::native_framebuffer)
//! for command recording.

use slotmap::Key;

use crate::config::DeviceConfig;
use crate::error::Result;
use crate::graphics_device::backend::Backend;
use crate::graphics_device::buffer::BufferEntry;
use crate::graphics_device::frame_buffer::{FramebufferEntry, FramebufferFormatEntry};
use crate::graphics_device::sampler::SamplerEntry;
use crate::graphics_device::surface::Surface;
use crate::graphics_device::texture::{release_texture, TextureEntry};
use crate::resource_table::{
    FramebufferFormatId, FramebufferId, IndexBufferId, ResourceTable, SamplerId, SurfaceId,
    TextureId, UniformBufferId, VertexBufferId,
};
use crate::{hal_bail, hal_error, hal_info, hal_warn};

const SOURCE: &str = "obsidian::device";

/// GPU resource facade over a [`Backend`]
///
/// All mutating operations take `&mut self`: the device is driven from a
/// single control thread, callers that need shared access wrap it in a lock.
///
/// Dropping the device waits for the GPU to go idle, then destroys every
/// resource still alive and logs a warning for each of them.
pub struct RenderDevice<B: Backend> {
    pub(crate) backend: B,
    pub(crate) config: DeviceConfig,
    pub(crate) vertex_buffers: ResourceTable<VertexBufferId, BufferEntry<B>>,
    pub(crate) index_buffers: ResourceTable<IndexBufferId, BufferEntry<B>>,
    pub(crate) uniform_buffers: ResourceTable<UniformBufferId, BufferEntry<B>>,
    pub(crate) textures: ResourceTable<TextureId, TextureEntry<B>>,
    pub(crate) samplers: ResourceTable<SamplerId, SamplerEntry<B>>,
    pub(crate) framebuffer_formats: ResourceTable<FramebufferFormatId, FramebufferFormatEntry<B>>,
    pub(crate) framebuffers: ResourceTable<FramebufferId, FramebufferEntry<B>>,
    pub(crate) surfaces: ResourceTable<SurfaceId, Surface<B>>,
}

/// Number of live resources per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceCounts {
    pub vertex_buffers: usize,
    pub index_buffers: usize,
    pub uniform_buffers: usize,
    pub textures: usize,
    pub samplers: usize,
    pub framebuffer_formats: usize,
    pub framebuffers: usize,
    pub surfaces: usize,
}

impl<B: Backend> RenderDevice<B> {
    /// Wrap a backend into a device
    ///
    /// # Errors
    ///
    /// `ConfigurationError` if `max_frames_in_flight` or `fence_timeout_ns`
    /// is zero.
    pub fn new(backend: B, config: DeviceConfig) -> Result<Self> {
        if config.max_frames_in_flight == 0 {
            hal_bail!(ConfigurationError, SOURCE, "max_frames_in_flight must be >= 1");
        }
        if config.fence_timeout_ns == 0 {
            hal_bail!(ConfigurationError, SOURCE, "fence_timeout_ns must be > 0");
        }

        hal_info!(
            SOURCE,
            "Render device ready: {} ({}), {} frames in flight",
            backend.device_name(),
            backend.vendor(),
            config.max_frames_in_flight
        );

        Ok(Self {
            backend,
            config,
            vertex_buffers: ResourceTable::new("vertex buffer"),
            index_buffers: ResourceTable::new("index buffer"),
            uniform_buffers: ResourceTable::new("uniform buffer"),
            textures: ResourceTable::new("texture"),
            samplers: ResourceTable::new("sampler"),
            framebuffer_formats: ResourceTable::new("framebuffer format"),
            framebuffers: ResourceTable::new("framebuffer"),
            surfaces: ResourceTable::new("surface"),
        })
    }

    /// Backend this device runs on
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Physical device name
    pub fn device_name(&self) -> String {
        self.backend.device_name()
    }

    /// Physical device vendor
    pub fn vendor(&self) -> String {
        self.backend.vendor()
    }

    /// Block until the GPU has finished all submitted work
    pub fn wait_idle(&mut self) -> Result<()> {
        self.backend.wait_idle()
    }

    pub fn resource_counts(&self) -> ResourceCounts {
        ResourceCounts {
            vertex_buffers: self.vertex_buffers.len(),
            index_buffers: self.index_buffers.len(),
            uniform_buffers: self.uniform_buffers.len(),
            textures: self.textures.len(),
            samplers: self.samplers.len(),
            framebuffer_formats: self.framebuffer_formats.len(),
            framebuffers: self.framebuffers.len(),
            surfaces: self.surfaces.len(),
        }
    }

    /// Destroy everything still alive, surfaces first
    fn sweep_leaked_resources(&mut self) {
        for (id, surface) in self.surfaces.drain() {
            hal_warn!(SOURCE, "Surface '{}' ({:?}) was not destroyed", surface.name, id);
            self.teardown_surface(surface);
        }
        for (id, entry) in self.framebuffers.drain() {
            hal_warn!(SOURCE, "Framebuffer {:?} was not destroyed", id);
            self.backend.destroy_framebuffer(entry.native);
        }
        for (id, entry) in self.framebuffer_formats.drain() {
            hal_warn!(SOURCE, "Framebuffer format {:?} was not destroyed", id);
            self.backend.destroy_render_pass(entry.render_pass);
        }
        for (id, entry) in self.textures.drain() {
            hal_warn!(SOURCE, "Texture {:?} was not destroyed", id);
            release_texture(&mut self.backend, entry);
        }
        for (id, entry) in self.samplers.drain() {
            hal_warn!(SOURCE, "Sampler {:?} was not destroyed", id);
            self.backend.destroy_sampler(entry.native);
        }
        sweep_buffers(&mut self.backend, &mut self.vertex_buffers);
        sweep_buffers(&mut self.backend, &mut self.index_buffers);
        sweep_buffers(&mut self.backend, &mut self.uniform_buffers);
    }
}

fn sweep_buffers<B: Backend, K: Key>(backend: &mut B, table: &mut ResourceTable<K, BufferEntry<B>>) {
    for (id, entry) in table.drain() {
        hal_warn!(SOURCE, "{:?} buffer {:?} was not destroyed", entry.info.kind, id);
        backend.destroy_buffer(entry.native);
    }
}

impl<B: Backend> Drop for RenderDevice<B> {
    fn drop(&mut self) {
        if let Err(e) = self.backend.wait_idle() {
            hal_error!(SOURCE, "wait_idle failed during teardown: {}", e);
        }
        self.sweep_leaked_resources();
        hal_info!(SOURCE, "Render device destroyed");
    }
}

#[cfg(test)]
#[path = "render_device_tests.rs"]
mod tests;
