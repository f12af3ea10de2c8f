//! Vertex, index and uniform buffers
//!
//! Static buffers are uploaded once through a staging buffer into
//! device-local memory and are immutable afterwards. Dynamic buffers live in
//! host-visible, host-coherent memory and are updated in place through their
//! mapped pointer.

use slotmap::Key;

use crate::error::Result;
use crate::graphics_device::backend::{Backend, MemoryLocation, NativeBufferDesc, NativeBufferUsage};
use crate::graphics_device::RenderDevice;
use crate::resource_table::{IndexBufferId, ResourceTable, UniformBufferId, VertexBufferId};
use crate::{hal_bail, hal_debug};

const SOURCE: &str = "obsidian::buffer";

/// Update frequency of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Written once at creation, device-local
    Static,
    /// Updated from the CPU, host-visible
    Dynamic,
}

/// Kind of buffer, selects the native usage bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
    Uniform,
}

impl BufferKind {
    fn native_usage(self) -> NativeBufferUsage {
        match self {
            BufferKind::Vertex => NativeBufferUsage::VERTEX,
            BufferKind::Index => NativeBufferUsage::INDEX,
            BufferKind::Uniform => NativeBufferUsage::UNIFORM,
        }
    }
}

/// Properties of a live buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferInfo {
    pub kind: BufferKind,
    pub usage: BufferUsage,
    pub size: u64,
}

pub(crate) struct BufferEntry<B: Backend> {
    pub(crate) native: B::Buffer,
    pub(crate) info: BufferInfo,
}

// ============================================================================
// Shared implementation
// ============================================================================

fn create_buffer_entry<B: Backend>(
    backend: &mut B,
    kind: BufferKind,
    usage: BufferUsage,
    size: u64,
    data: Option<&[u8]>,
) -> Result<BufferEntry<B>> {
    if size == 0 {
        hal_bail!(ConfigurationError, SOURCE, "{:?} buffer size must be > 0", kind);
    }
    if let Some(data) = data {
        if data.len() as u64 > size {
            hal_bail!(
                ConfigurationError,
                SOURCE,
                "{:?} buffer initial data ({} bytes) exceeds its size ({} bytes)",
                kind, data.len(), size
            );
        }
    }

    let native = match usage {
        BufferUsage::Dynamic => {
            let mut buffer = backend.create_buffer(&NativeBufferDesc {
                size,
                usage: kind.native_usage(),
                location: MemoryLocation::CpuToGpu,
            })?;
            if let Some(data) = data {
                if let Err(e) = backend.write_buffer(&mut buffer, 0, data) {
                    backend.destroy_buffer(buffer);
                    return Err(e);
                }
            }
            buffer
        }
        BufferUsage::Static => {
            let data = match data {
                Some(data) if !data.is_empty() => data,
                _ => hal_bail!(
                    ConfigurationError,
                    SOURCE,
                    "Static {:?} buffer requires non-empty initial data",
                    kind
                ),
            };
            staged_upload(backend, kind, size, data)?
        }
    };

    Ok(BufferEntry {
        native,
        info: BufferInfo { kind, usage, size },
    })
}

/// Copy bytes into a fresh host-visible staging buffer
pub(crate) fn stage_bytes<B: Backend>(backend: &mut B, data: &[u8]) -> Result<B::Buffer> {
    let mut staging = backend.create_buffer(&NativeBufferDesc {
        size: data.len() as u64,
        usage: NativeBufferUsage::TRANSFER_SRC,
        location: MemoryLocation::CpuToGpu,
    })?;
    if let Err(e) = backend.write_buffer(&mut staging, 0, data) {
        backend.destroy_buffer(staging);
        return Err(e);
    }
    Ok(staging)
}

/// Staging buffer -> device-local buffer, blocking until the copy is done
fn staged_upload<B: Backend>(
    backend: &mut B,
    kind: BufferKind,
    size: u64,
    data: &[u8],
) -> Result<B::Buffer> {
    let staging = stage_bytes(backend, data)?;

    let buffer = match backend.create_buffer(&NativeBufferDesc {
        size,
        usage: kind.native_usage() | NativeBufferUsage::TRANSFER_DST,
        location: MemoryLocation::GpuOnly,
    }) {
        Ok(buffer) => buffer,
        Err(e) => {
            backend.destroy_buffer(staging);
            return Err(e);
        }
    };

    let copied = backend.copy_buffer(&staging, &buffer, data.len() as u64);
    backend.destroy_buffer(staging);
    match copied {
        Ok(()) => Ok(buffer),
        Err(e) => {
            backend.destroy_buffer(buffer);
            Err(e)
        }
    }
}

fn update_buffer_entry<B: Backend, K: Key>(
    backend: &mut B,
    table: &mut ResourceTable<K, BufferEntry<B>>,
    id: K,
    offset: u64,
    data: &[u8],
) -> Result<()> {
    let entry = table.get_mut(id)?;
    if entry.info.usage == BufferUsage::Static {
        hal_bail!(
            ResourceStateError,
            SOURCE,
            "{:?} buffer {:?} is static and cannot be updated",
            entry.info.kind, id
        );
    }
    let end = offset.checked_add(data.len() as u64);
    match end {
        Some(end) if end <= entry.info.size => {}
        _ => hal_bail!(
            ResourceStateError,
            SOURCE,
            "Update of {} bytes at offset {} exceeds {:?} buffer {:?} capacity ({} bytes)",
            data.len(), offset, entry.info.kind, id, entry.info.size
        ),
    }
    if data.is_empty() {
        return Ok(());
    }
    backend.write_buffer(&mut entry.native, offset, data)
}

fn destroy_buffer_entry<B: Backend, K: Key>(
    backend: &mut B,
    table: &mut ResourceTable<K, BufferEntry<B>>,
    id: K,
) -> Result<()> {
    let entry = table.remove(id)?;
    hal_debug!(SOURCE, "Destroyed {:?} buffer {:?}", entry.info.kind, id);
    backend.destroy_buffer(entry.native);
    Ok(())
}

// ============================================================================
// RenderDevice operations
// ============================================================================

impl<B: Backend> RenderDevice<B> {
    // ===== VERTEX BUFFERS =====

    /// Create a vertex buffer of `size` bytes
    ///
    /// # Arguments
    ///
    /// * `usage` - Static buffers need `data` and are immutable afterwards
    /// * `size` - Capacity in bytes (> 0)
    /// * `data` - Initial contents, written at offset 0 (at most `size` bytes)
    pub fn create_vertex_buffer(
        &mut self,
        usage: BufferUsage,
        size: u64,
        data: Option<&[u8]>,
    ) -> Result<VertexBufferId> {
        let entry = create_buffer_entry(&mut self.backend, BufferKind::Vertex, usage, size, data)?;
        let id = self.vertex_buffers.insert(entry);
        hal_debug!(SOURCE, "Created vertex buffer {:?} ({:?}, {} bytes)", id, usage, size);
        Ok(id)
    }

    /// Create a vertex buffer sized and filled from a slice of vertices
    pub fn create_vertex_buffer_from<T: bytemuck::Pod>(
        &mut self,
        usage: BufferUsage,
        vertices: &[T],
    ) -> Result<VertexBufferId> {
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        self.create_vertex_buffer(usage, bytes.len() as u64, Some(bytes))
    }

    /// Write `data` at byte `offset` of a dynamic vertex buffer
    pub fn update_vertex_buffer(&mut self, id: VertexBufferId, offset: u64, data: &[u8]) -> Result<()> {
        update_buffer_entry(&mut self.backend, &mut self.vertex_buffers, id, offset, data)
    }

    /// Typed variant of [`update_vertex_buffer`](Self::update_vertex_buffer)
    pub fn update_vertex_buffer_from<T: bytemuck::Pod>(
        &mut self,
        id: VertexBufferId,
        offset: u64,
        vertices: &[T],
    ) -> Result<()> {
        self.update_vertex_buffer(id, offset, bytemuck::cast_slice(vertices))
    }

    pub fn destroy_vertex_buffer(&mut self, id: VertexBufferId) -> Result<()> {
        destroy_buffer_entry(&mut self.backend, &mut self.vertex_buffers, id)
    }

    pub fn vertex_buffer_info(&self, id: VertexBufferId) -> Result<BufferInfo> {
        Ok(self.vertex_buffers.get(id)?.info)
    }

    // ===== INDEX BUFFERS =====

    /// Create an index buffer of `size` bytes
    pub fn create_index_buffer(
        &mut self,
        usage: BufferUsage,
        size: u64,
        data: Option<&[u8]>,
    ) -> Result<IndexBufferId> {
        let entry = create_buffer_entry(&mut self.backend, BufferKind::Index, usage, size, data)?;
        let id = self.index_buffers.insert(entry);
        hal_debug!(SOURCE, "Created index buffer {:?} ({:?}, {} bytes)", id, usage, size);
        Ok(id)
    }

    /// Create an index buffer sized and filled from a slice of indices
    pub fn create_index_buffer_from<T: bytemuck::Pod>(
        &mut self,
        usage: BufferUsage,
        indices: &[T],
    ) -> Result<IndexBufferId> {
        let bytes: &[u8] = bytemuck::cast_slice(indices);
        self.create_index_buffer(usage, bytes.len() as u64, Some(bytes))
    }

    pub fn update_index_buffer(&mut self, id: IndexBufferId, offset: u64, data: &[u8]) -> Result<()> {
        update_buffer_entry(&mut self.backend, &mut self.index_buffers, id, offset, data)
    }

    pub fn update_index_buffer_from<T: bytemuck::Pod>(
        &mut self,
        id: IndexBufferId,
        offset: u64,
        indices: &[T],
    ) -> Result<()> {
        self.update_index_buffer(id, offset, bytemuck::cast_slice(indices))
    }

    pub fn destroy_index_buffer(&mut self, id: IndexBufferId) -> Result<()> {
        destroy_buffer_entry(&mut self.backend, &mut self.index_buffers, id)
    }

    pub fn index_buffer_info(&self, id: IndexBufferId) -> Result<BufferInfo> {
        Ok(self.index_buffers.get(id)?.info)
    }

    // ===== UNIFORM BUFFERS =====

    /// Create a uniform buffer of `size` bytes
    pub fn create_uniform_buffer(
        &mut self,
        usage: BufferUsage,
        size: u64,
        data: Option<&[u8]>,
    ) -> Result<UniformBufferId> {
        let entry = create_buffer_entry(&mut self.backend, BufferKind::Uniform, usage, size, data)?;
        let id = self.uniform_buffers.insert(entry);
        hal_debug!(SOURCE, "Created uniform buffer {:?} ({:?}, {} bytes)", id, usage, size);
        Ok(id)
    }

    /// Create a uniform buffer holding one value
    pub fn create_uniform_buffer_from<T: bytemuck::Pod>(
        &mut self,
        usage: BufferUsage,
        value: &T,
    ) -> Result<UniformBufferId> {
        let bytes: &[u8] = bytemuck::bytes_of(value);
        self.create_uniform_buffer(usage, bytes.len() as u64, Some(bytes))
    }

    pub fn update_uniform_buffer(&mut self, id: UniformBufferId, offset: u64, data: &[u8]) -> Result<()> {
        update_buffer_entry(&mut self.backend, &mut self.uniform_buffers, id, offset, data)
    }

    pub fn update_uniform_buffer_from<T: bytemuck::Pod>(
        &mut self,
        id: UniformBufferId,
        offset: u64,
        value: &T,
    ) -> Result<()> {
        self.update_uniform_buffer(id, offset, bytemuck::bytes_of(value))
    }

    pub fn destroy_uniform_buffer(&mut self, id: UniformBufferId) -> Result<()> {
        destroy_buffer_entry(&mut self.backend, &mut self.uniform_buffers, id)
    }

    pub fn uniform_buffer_info(&self, id: UniformBufferId) -> Result<BufferInfo> {
        Ok(self.uniform_buffers.get(id)?.info)
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
