//! Per-frame synchronization primitives of a surface
//!
//! [`FrameSlots`] holds one synchronization triple per frame in flight.
//! [`ImagesInFlight`] remembers, per swapchain image, which slot last
//! rendered into it, so an image is never handed out while that slot's
//! fence is still pending. The two structures are sized independently:
//! slots by `max_frames_in_flight`, images by the swapchain.

use crate::error::Result;
use crate::graphics_device::backend::Backend;

/// Position of a surface in the acquire / submit / present cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameState {
    Idle,
    AcquiringImage,
    ImageAcquired,
    Submitted,
    Presenting,
}

/// Synchronization triple of one frame in flight
pub(crate) struct FrameSlot<B: Backend> {
    /// Signaled by the swapchain when the acquired image is ready
    pub(crate) image_available: B::Semaphore,
    /// Signaled by the queue when rendering is done
    pub(crate) render_finished: B::Semaphore,
    /// Signaled when the GPU has finished the slot's submission
    pub(crate) in_flight: B::Fence,
}

pub(crate) struct FrameSlots<B: Backend> {
    slots: Vec<FrameSlot<B>>,
}

impl<B: Backend> FrameSlots<B> {
    /// Create `count` triples, fences signaled so the first wait returns
    pub(crate) fn new(backend: &mut B, count: u32) -> Result<Self> {
        let mut slots = FrameSlots { slots: Vec::with_capacity(count as usize) };
        for _ in 0..count {
            match create_slot(backend) {
                Ok(slot) => slots.slots.push(slot),
                Err(e) => {
                    slots.destroy(backend);
                    return Err(e);
                }
            }
        }
        Ok(slots)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn get(&self, index: usize) -> &FrameSlot<B> {
        &self.slots[index]
    }

    /// Swap slot `index` for a fresh triple (fence signaled)
    ///
    /// The old objects are destroyed; the device must be idle.
    pub(crate) fn replace(&mut self, backend: &mut B, index: usize) -> Result<()> {
        let fresh = create_slot(backend)?;
        let old = std::mem::replace(&mut self.slots[index], fresh);
        backend.destroy_semaphore(old.image_available);
        backend.destroy_semaphore(old.render_finished);
        backend.destroy_fence(old.in_flight);
        Ok(())
    }

    pub(crate) fn destroy(self, backend: &mut B) {
        for slot in self.slots {
            backend.destroy_semaphore(slot.image_available);
            backend.destroy_semaphore(slot.render_finished);
            backend.destroy_fence(slot.in_flight);
        }
    }
}

fn create_slot<B: Backend>(backend: &mut B) -> Result<FrameSlot<B>> {
    let image_available = backend.create_semaphore()?;
    let render_finished = match backend.create_semaphore() {
        Ok(s) => s,
        Err(e) => {
            backend.destroy_semaphore(image_available);
            return Err(e);
        }
    };
    let in_flight = match backend.create_fence(true) {
        Ok(f) => f,
        Err(e) => {
            backend.destroy_semaphore(image_available);
            backend.destroy_semaphore(render_finished);
            return Err(e);
        }
    };
    Ok(FrameSlot { image_available, render_finished, in_flight })
}

/// Slot that last submitted work for each swapchain image
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImagesInFlight {
    owners: Vec<Option<usize>>,
}

impl ImagesInFlight {
    pub(crate) fn new(image_count: usize) -> Self {
        Self { owners: vec![None; image_count] }
    }

    /// Forget every owner and resize to a new image count
    pub(crate) fn reset(&mut self, image_count: usize) {
        self.owners.clear();
        self.owners.resize(image_count, None);
    }

    pub(crate) fn owner(&self, image_index: u32) -> Option<usize> {
        self.owners.get(image_index as usize).copied().flatten()
    }

    pub(crate) fn set_owner(&mut self, image_index: u32, slot: usize) {
        if let Some(owner) = self.owners.get_mut(image_index as usize) {
            *owner = Some(slot);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.owners.len()
    }
}
