//! Opaque-ID-indexed resource tables
//!
//! Every GPU resource owned by a [`RenderDevice`](crate::graphics_device::RenderDevice)
//! lives in a [`ResourceTable`] and is addressed from the outside by a typed key.
//! Keys are index + generation pairs (provided by `slotmap`): once an entry is
//! removed, its key is rejected by every later lookup, even after the slot has
//! been reused by a new entry.
//!
//! Each key type reserves one `INVALID` value, the slotmap null key
//! (`Key::null()` / `Default::default()`), which never refers to a live entry.

use slotmap::{new_key_type, Key, SlotMap};

use crate::error::Result;
use crate::hal_err;

// ===== KEY TYPES =====

new_key_type! {
    /// ID of a vertex buffer
    pub struct VertexBufferId;

    /// ID of an index buffer
    pub struct IndexBufferId;

    /// ID of a uniform buffer
    pub struct UniformBufferId;

    /// ID of a texture (owned image or wrapped swapchain image)
    pub struct TextureId;

    /// ID of a sampler
    pub struct SamplerId;

    /// ID of a framebuffer format (compiled render pass)
    pub struct FramebufferFormatId;

    /// ID of a framebuffer
    pub struct FramebufferId;

    /// ID of a presentable surface
    pub struct SurfaceId;
}

/// Reserved "no resource" value for any key type
///
/// # Example
///
/// ```
/// use obsidian_hal::obsidian::{invalid_id, SurfaceId};
/// use slotmap::Key;
///
/// let id: SurfaceId = invalid_id();
/// assert!(id.is_null());
/// ```
pub fn invalid_id<K: Key>() -> K {
    K::null()
}

// ===== RESOURCE TABLE =====

/// Container owning every live resource of one kind
///
/// The table never destroys anything on its own: entries leave it only
/// through [`remove`](Self::remove) or [`drain`](Self::drain).
pub struct ResourceTable<K: Key, T> {
    entries: SlotMap<K, T>,
    /// Resource kind, used in lookup error messages
    kind: &'static str,
}

impl<K: Key, T> ResourceTable<K, T> {
    /// Create an empty table for resources of the given kind
    pub fn new(kind: &'static str) -> Self {
        Self {
            entries: SlotMap::with_key(),
            kind,
        }
    }

    /// Resource kind name
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Insert a resource and return its new ID
    pub fn insert(&mut self, value: T) -> K {
        self.entries.insert(value)
    }

    /// Borrow a live resource
    pub fn get(&self, id: K) -> Result<&T> {
        let kind = self.kind;
        self.entries.get(id).ok_or_else(|| lookup_failure(kind, id))
    }

    /// Mutably borrow a live resource
    pub fn get_mut(&mut self, id: K) -> Result<&mut T> {
        let kind = self.kind;
        self.entries.get_mut(id).ok_or_else(|| lookup_failure(kind, id))
    }

    /// Remove a resource, returning ownership of it to the caller
    pub fn remove(&mut self, id: K) -> Result<T> {
        let kind = self.kind;
        self.entries.remove(id).ok_or_else(|| lookup_failure(kind, id))
    }

    /// True if `id` refers to a live resource
    pub fn contains(&self, id: K) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of live resources
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table holds no resource
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(id, resource)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> + '_ {
        self.entries.iter()
    }

    /// IDs of every live resource
    pub fn ids(&self) -> Vec<K> {
        self.entries.keys().collect()
    }

    /// Remove every resource (device teardown)
    pub fn drain(&mut self) -> Vec<(K, T)> {
        self.entries.drain().collect()
    }
}

fn lookup_failure<K: Key>(kind: &str, id: K) -> crate::Error {
    if id.is_null() {
        hal_err!(LookupFailure, "obsidian::resource", "INVALID {} id", kind)
    } else {
        hal_err!(
            LookupFailure,
            "obsidian::resource",
            "{} {:?} does not exist (never created or already destroyed)",
            kind,
            id.data()
        )
    }
}

#[cfg(test)]
#[path = "resource_table_tests.rs"]
mod tests;
