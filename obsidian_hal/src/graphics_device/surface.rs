//! Presentable surfaces and the per-frame synchronization state machine
//!
//! A surface owns a swapchain, one wrapped texture and one framebuffer per
//! swapchain image, a presentable framebuffer format, and
//! `max_frames_in_flight` synchronization triples. Frames go through
//!
//! ```text
//! Idle -> AcquiringImage -> ImageAcquired -> Submitted -> Presenting -> Idle
//! ```
//!
//! driven by [`acquire_next_image`](RenderDevice::acquire_next_image),
//! [`submit`](RenderDevice::submit) and [`present`](RenderDevice::present).
//! A call made in the wrong state fails with `ResourceStateError` and
//! changes nothing.

use slotmap::Key;

use crate::config::{DeviceConfig, PresentMode};
use crate::error::Result;
use crate::graphics_device::backend::{
    AcquireResult, Backend, PresentResult, SurfaceCapabilities, SwapchainDesc, SwapchainInfo,
};
use crate::graphics_device::frame_buffer::FramebufferAttachmentDesc;
use crate::graphics_device::frame_sync::{FrameSlots, FrameState, ImagesInFlight};
use crate::graphics_device::texture::{release_texture, DataFormat};
use crate::graphics_device::RenderDevice;
use crate::resource_table::{FramebufferFormatId, FramebufferId, SurfaceId, TextureId};
use crate::{hal_bail, hal_debug, hal_err, hal_info, hal_trace, hal_warn};

const SOURCE: &str = "obsidian::surface";

// ============================================================================
// Public types
// ============================================================================

/// Image handed out by a successful acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiredFrame {
    /// Swapchain image to render into
    pub image_index: u32,
    /// Frame-in-flight slot used by this frame
    pub frame_slot: usize,
    /// Framebuffer wrapping the acquired image
    pub framebuffer: FramebufferId,
}

/// Result of [`RenderDevice::acquire_next_image`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image is ready for rendering
    Ready(AcquiredFrame),
    /// The swapchain was out of date and has been rebuilt; acquire again
    SwapchainRecreated,
    /// The surface has a zero-sized extent (minimized window); nothing to
    /// render until it is resized
    Unavailable,
}

/// Result of [`RenderDevice::present`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// The swapchain was suboptimal or out of date and has been rebuilt
    SwapchainRecreated,
}

/// Snapshot of a surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceInfo {
    pub name: String,
    /// Window size as last reported by the caller
    pub window_size: (u32, u32),
    /// Swapchain extent
    pub framebuffer_size: (u32, u32),
    pub format: DataFormat,
    pub present_mode: PresentMode,
    pub image_count: usize,
    pub max_frames_in_flight: u32,
    pub current_frame: usize,
    pub state: FrameState,
}

// ============================================================================
// Internal state
// ============================================================================

pub(crate) struct Surface<B: Backend> {
    pub(crate) name: String,
    window_size: (u32, u32),
    framebuffer_size: (u32, u32),
    native: B::NativeSurface,
    swapchain: B::Swapchain,
    format: DataFormat,
    present_mode: PresentMode,
    framebuffer_format: FramebufferFormatId,
    images: Vec<TextureId>,
    framebuffers: Vec<FramebufferId>,
    slots: FrameSlots<B>,
    images_in_flight: ImagesInFlight,
    current_frame: usize,
    state: FrameState,
    acquired_image: Option<u32>,
    /// Swapchain must be rebuilt before the next acquisition
    needs_recreate: bool,
}

/// Swapchain parameters for the given capabilities, `None` for a zero extent
pub fn choose_swapchain(
    caps: &SurfaceCapabilities,
    window_size: (u32, u32),
    config: &DeviceConfig,
) -> Result<Option<SwapchainDesc>> {
    let preferred: &[DataFormat] = if config.prefer_srgb_surface {
        &[DataFormat::B8G8R8A8_SRGB, DataFormat::R8G8B8A8_SRGB]
    } else {
        &[DataFormat::B8G8R8A8_UNORM, DataFormat::R8G8B8A8_UNORM]
    };
    let format = preferred
        .iter()
        .copied()
        .find(|f| caps.formats.contains(f))
        .or_else(|| caps.formats.iter().copied().find(|f| !f.is_depth()))
        .ok_or_else(|| hal_err!(ConfigurationError, SOURCE, "Surface reports no usable color format"))?;

    let present_mode = if caps.present_modes.contains(&config.present_mode_preference) {
        config.present_mode_preference
    } else {
        PresentMode::Fifo
    };

    let (width, height) = match caps.current_extent {
        Some(extent) => extent,
        None if window_size.0 == 0 || window_size.1 == 0 => return Ok(None),
        None => (
            window_size.0.clamp(caps.min_extent.0, caps.max_extent.0.max(caps.min_extent.0)),
            window_size.1.clamp(caps.min_extent.1, caps.max_extent.1.max(caps.min_extent.1)),
        ),
    };
    if width == 0 || height == 0 {
        return Ok(None);
    }

    let mut image_count = caps.min_image_count.max(1) + 1;
    if caps.max_image_count > 0 {
        image_count = image_count.min(caps.max_image_count);
    }

    Ok(Some(SwapchainDesc { format, width, height, image_count, present_mode }))
}

// ============================================================================
// RenderDevice operations
// ============================================================================

impl<B: Backend> RenderDevice<B> {
    /// Create a presentable surface from a native surface
    ///
    /// The device takes ownership of `native` and destroys it with the
    /// surface, or right away if creation fails.
    pub fn create_surface(
        &mut self,
        name: &str,
        native: B::NativeSurface,
        width: u32,
        height: u32,
    ) -> Result<SurfaceId> {
        if !self.find_surface(name).is_null() {
            self.backend.destroy_native_surface(native);
            hal_bail!(ConfigurationError, SOURCE, "Surface '{}' already exists", name);
        }

        let desc = match self
            .backend
            .surface_capabilities(&native)
            .and_then(|caps| choose_swapchain(&caps, (width, height), &self.config))
        {
            Ok(Some(desc)) => desc,
            Ok(None) => {
                self.backend.destroy_native_surface(native);
                hal_bail!(
                    ConfigurationError,
                    SOURCE,
                    "Surface '{}' has a zero extent ({}x{})",
                    name, width, height
                );
            }
            Err(e) => {
                self.backend.destroy_native_surface(native);
                return Err(e);
            }
        };

        let (swapchain, info) = match self.backend.create_swapchain(&native, &desc, None) {
            Ok(created) => created,
            Err(e) => {
                self.backend.destroy_native_surface(native);
                return Err(e);
            }
        };

        let framebuffer_format = match self
            .create_framebuffer_format_internal(&[FramebufferAttachmentDesc::color(info.format)], true)
        {
            Ok(id) => id,
            Err(e) => {
                self.backend.destroy_swapchain(swapchain);
                self.backend.destroy_native_surface(native);
                return Err(e);
            }
        };

        let (images, framebuffers) = match self.create_swapchain_targets(&info, framebuffer_format) {
            Ok(targets) => targets,
            Err(e) => {
                self.release_surface_format(framebuffer_format);
                self.backend.destroy_swapchain(swapchain);
                self.backend.destroy_native_surface(native);
                return Err(e);
            }
        };

        let slots = match FrameSlots::new(&mut self.backend, self.config.max_frames_in_flight) {
            Ok(slots) => slots,
            Err(e) => {
                self.release_swapchain_targets(images, framebuffers);
                self.release_surface_format(framebuffer_format);
                self.backend.destroy_swapchain(swapchain);
                self.backend.destroy_native_surface(native);
                return Err(e);
            }
        };

        let image_count = images.len();
        let id = self.surfaces.insert(Surface {
            name: name.to_string(),
            window_size: (width, height),
            framebuffer_size: (info.width, info.height),
            native,
            swapchain,
            format: info.format,
            present_mode: info.present_mode,
            framebuffer_format,
            images,
            framebuffers,
            slots,
            images_in_flight: ImagesInFlight::new(image_count),
            current_frame: 0,
            state: FrameState::Idle,
            acquired_image: None,
            needs_recreate: false,
        });

        hal_info!(
            SOURCE,
            "Created surface '{}' {:?}: {}x{} {:?} {:?}, {} images, {} frames in flight",
            name, id, info.width, info.height, info.format, info.present_mode,
            image_count, self.config.max_frames_in_flight
        );
        Ok(id)
    }

    /// Find a surface by name, `INVALID` if there is none
    pub fn find_surface(&self, name: &str) -> SurfaceId {
        self.surfaces
            .iter()
            .find(|(_, surface)| surface.name == name)
            .map(|(id, _)| id)
            .unwrap_or_default()
    }

    /// Window size of a surface
    pub fn surface_size(&self, id: SurfaceId) -> Result<(u32, u32)> {
        Ok(self.surfaces.get(id)?.window_size)
    }

    /// Swapchain extent of a surface
    pub fn surface_framebuffer_size(&self, id: SurfaceId) -> Result<(u32, u32)> {
        Ok(self.surfaces.get(id)?.framebuffer_size)
    }

    /// Presentable framebuffer format of a surface
    pub fn surface_framebuffer_format(&self, id: SurfaceId) -> Result<FramebufferFormatId> {
        Ok(self.surfaces.get(id)?.framebuffer_format)
    }

    /// Framebuffer wrapping swapchain image `image_index`
    pub fn surface_framebuffer(&self, id: SurfaceId, image_index: u32) -> Result<FramebufferId> {
        let surface = self.surfaces.get(id)?;
        surface
            .framebuffers
            .get(image_index as usize)
            .copied()
            .ok_or_else(|| {
                hal_err!(
                    ConfigurationError,
                    SOURCE,
                    "Surface '{}' has {} images, index {} is out of range",
                    surface.name, surface.framebuffers.len(), image_index
                )
            })
    }

    /// Wrapped swapchain textures of a surface
    pub fn surface_images(&self, id: SurfaceId) -> Result<Vec<TextureId>> {
        Ok(self.surfaces.get(id)?.images.clone())
    }

    pub fn surface_frame_state(&self, id: SurfaceId) -> Result<FrameState> {
        Ok(self.surfaces.get(id)?.state)
    }

    pub fn surface_info(&self, id: SurfaceId) -> Result<SurfaceInfo> {
        let surface = self.surfaces.get(id)?;
        Ok(SurfaceInfo {
            name: surface.name.clone(),
            window_size: surface.window_size,
            framebuffer_size: surface.framebuffer_size,
            format: surface.format,
            present_mode: surface.present_mode,
            image_count: surface.images.len(),
            max_frames_in_flight: surface.slots.len() as u32,
            current_frame: surface.current_frame,
            state: surface.state,
        })
    }

    /// Destroy a surface and everything it owns, after the GPU went idle
    pub fn destroy_surface(&mut self, id: SurfaceId) -> Result<()> {
        self.surfaces.get(id)?;
        self.backend.wait_idle()?;
        let surface = self.surfaces.remove(id)?;
        hal_info!(SOURCE, "Destroying surface '{}' {:?}", surface.name, id);
        self.teardown_surface(surface);
        Ok(())
    }

    // ===== FRAME CYCLE =====

    /// Acquire the next swapchain image (only from `Idle`)
    ///
    /// Waits for the current slot's fence, then for the fence of the slot
    /// that last used the acquired image if it is still pending. Waits are
    /// bounded by `DeviceConfig::fence_timeout_ns`.
    pub fn acquire_next_image(&mut self, id: SurfaceId) -> Result<AcquireOutcome> {
        let timeout = self.config.fence_timeout_ns;
        let surface = self.surfaces.get_mut(id)?;
        if surface.state != FrameState::Idle {
            hal_bail!(
                ResourceStateError,
                SOURCE,
                "acquire_next_image on surface '{}' in state {:?} (expected Idle)",
                surface.name, surface.state
            );
        }

        if surface.needs_recreate {
            return if self.recreate_swapchain(id)? {
                Ok(AcquireOutcome::SwapchainRecreated)
            } else {
                Ok(AcquireOutcome::Unavailable)
            };
        }

        surface.state = FrameState::AcquiringImage;
        let slot_index = surface.current_frame;

        if let Err(e) = self.backend.wait_fence(&surface.slots.get(slot_index).in_flight, timeout) {
            surface.state = FrameState::Idle;
            return Err(e);
        }

        let acquired = self.backend.acquire_next_image(
            &surface.swapchain,
            &surface.slots.get(slot_index).image_available,
            timeout,
        );
        let image_index = match acquired {
            Ok(AcquireResult::Acquired { image_index, suboptimal }) => {
                if suboptimal {
                    hal_trace!(SOURCE, "Surface '{}' is suboptimal, recreating after present", surface.name);
                }
                image_index
            }
            Ok(AcquireResult::OutOfDate) => {
                surface.state = FrameState::Idle;
                hal_debug!(SOURCE, "Surface '{}' out of date on acquire", surface.name);
                return if self.recreate_swapchain(id)? {
                    Ok(AcquireOutcome::SwapchainRecreated)
                } else {
                    Ok(AcquireOutcome::Unavailable)
                };
            }
            Err(e) => {
                surface.state = FrameState::Idle;
                return Err(e);
            }
        };

        let framebuffer = match surface.framebuffers.get(image_index as usize) {
            Some(fb) => *fb,
            None => {
                surface.state = FrameState::Idle;
                hal_bail!(
                    BackendError,
                    SOURCE,
                    "Swapchain returned image {} but surface '{}' has {} images",
                    image_index, surface.name, surface.framebuffers.len()
                );
            }
        };

        if let Some(owner) = surface.images_in_flight.owner(image_index) {
            if owner != slot_index {
                let fence = &surface.slots.get(owner).in_flight;
                let waited = match self.backend.fence_signaled(fence) {
                    Ok(true) => Ok(()),
                    Ok(false) => self.backend.wait_fence(fence, timeout),
                    Err(e) => Err(e),
                };
                if let Err(e) = waited {
                    surface.state = FrameState::Idle;
                    return Err(e);
                }
            }
        }

        surface.images_in_flight.set_owner(image_index, slot_index);
        surface.acquired_image = Some(image_index);
        surface.state = FrameState::ImageAcquired;

        Ok(AcquireOutcome::Ready(AcquiredFrame {
            image_index,
            frame_slot: slot_index,
            framebuffer,
        }))
    }

    /// Submit the frame's command buffers (only from `ImageAcquired`)
    ///
    /// The submission waits for the acquired image and signals the slot's
    /// render-finished semaphore and in-flight fence.
    ///
    /// # Errors
    ///
    /// A backend failure abandons the frame: the surface returns to `Idle`,
    /// the slot gets fresh synchronization objects and the swapchain is
    /// rebuilt on the next acquisition (or by `resize_surface`).
    pub fn submit(&mut self, id: SurfaceId, command_buffers: &[B::CommandBuffer]) -> Result<()> {
        let surface = self.surfaces.get_mut(id)?;
        if surface.state != FrameState::ImageAcquired {
            hal_bail!(
                ResourceStateError,
                SOURCE,
                "submit on surface '{}' in state {:?} (expected ImageAcquired)",
                surface.name, surface.state
            );
        }

        let slot_index = surface.current_frame;
        let slot = surface.slots.get(slot_index);
        let submitted = self.backend.reset_fence(&slot.in_flight).and_then(|()| {
            self.backend.submit(
                command_buffers,
                &slot.image_available,
                &slot.render_finished,
                &slot.in_flight,
            )
        });

        if let Err(e) = submitted {
            self.abandon_frame(id, slot_index);
            return Err(e);
        }

        self.surfaces.get_mut(id)?.state = FrameState::Submitted;
        Ok(())
    }

    /// Present the acquired image (only from `Submitted`)
    ///
    /// Advances to the next frame slot. A suboptimal or out-of-date
    /// swapchain is rebuilt before returning.
    pub fn present(&mut self, id: SurfaceId) -> Result<PresentOutcome> {
        let surface = self.surfaces.get_mut(id)?;
        let image_index = match (surface.state, surface.acquired_image) {
            (FrameState::Submitted, Some(image_index)) => image_index,
            (state, _) => hal_bail!(
                ResourceStateError,
                SOURCE,
                "present on surface '{}' in state {:?} (expected Submitted)",
                surface.name, state
            ),
        };

        surface.state = FrameState::Presenting;
        let presented = self.backend.present(
            &surface.swapchain,
            image_index,
            &surface.slots.get(surface.current_frame).render_finished,
        );
        surface.acquired_image = None;
        surface.state = FrameState::Idle;

        let result = presented?;
        surface.current_frame = (surface.current_frame + 1) % surface.slots.len();

        match result {
            PresentResult::Presented => Ok(PresentOutcome::Presented),
            PresentResult::Suboptimal | PresentResult::OutOfDate => {
                hal_debug!(SOURCE, "Surface '{}' {:?} on present", surface.name, result);
                self.recreate_swapchain(id)?;
                Ok(PresentOutcome::SwapchainRecreated)
            }
        }
    }

    // ===== RECONFIGURATION =====

    /// Record a new window size and rebuild the swapchain (only from `Idle`)
    ///
    /// A zero-sized window defers the rebuild until the next acquisition
    /// after a non-zero resize.
    pub fn resize_surface(&mut self, id: SurfaceId, width: u32, height: u32) -> Result<()> {
        let surface = self.surfaces.get_mut(id)?;
        if surface.state != FrameState::Idle {
            hal_bail!(
                ResourceStateError,
                SOURCE,
                "resize_surface on surface '{}' in state {:?} (expected Idle)",
                surface.name, surface.state
            );
        }
        surface.window_size = (width, height);
        if width == 0 || height == 0 {
            surface.needs_recreate = true;
            hal_debug!(SOURCE, "Surface '{}' minimized, swapchain rebuild deferred", surface.name);
            return Ok(());
        }
        self.recreate_swapchain(id)?;
        Ok(())
    }

    /// Change the number of frames in flight (only from `Idle`)
    ///
    /// Waits idle and rebuilds every synchronization triple.
    pub fn set_max_frames_in_flight(&mut self, id: SurfaceId, count: u32) -> Result<()> {
        if count == 0 {
            hal_bail!(ConfigurationError, SOURCE, "max_frames_in_flight must be >= 1");
        }
        let surface = self.surfaces.get(id)?;
        if surface.state != FrameState::Idle {
            hal_bail!(
                ResourceStateError,
                SOURCE,
                "set_max_frames_in_flight on surface '{}' in state {:?} (expected Idle)",
                surface.name, surface.state
            );
        }

        self.backend.wait_idle()?;
        let slots = FrameSlots::new(&mut self.backend, count)?;
        let surface = self.surfaces.get_mut(id)?;
        let old = std::mem::replace(&mut surface.slots, slots);
        let image_count = surface.images.len();
        surface.images_in_flight.reset(image_count);
        surface.current_frame = 0;
        hal_info!(SOURCE, "Surface '{}' now has {} frames in flight", surface.name, count);
        old.destroy(&mut self.backend);
        Ok(())
    }

    // ===== INTERNALS =====

    /// Drop a frame whose submission failed
    ///
    /// The slot's fence was reset with nothing left to signal it and its
    /// image-available semaphore is still pending, so the slot is rebuilt.
    /// The acquired image is released with the swapchain on the next rebuild.
    fn abandon_frame(&mut self, id: SurfaceId, slot_index: usize) {
        if let Err(e) = self.backend.wait_idle() {
            hal_warn!(SOURCE, "Wait idle after failed submit: {}", e);
        }
        let Ok(surface) = self.surfaces.get_mut(id) else {
            return;
        };
        surface.acquired_image = None;
        surface.state = FrameState::Idle;
        surface.needs_recreate = true;
        if let Err(e) = surface.slots.replace(&mut self.backend, slot_index) {
            hal_warn!(SOURCE, "Surface '{}' keeps frame slot {} after failed submit: {}", surface.name, slot_index, e);
        }
        hal_debug!(SOURCE, "Surface '{}' abandoned frame in slot {}", surface.name, slot_index);
    }

    /// Rebuild the swapchain and everything bound to it
    ///
    /// Returns `false` when the surface has a zero extent: the rebuild stays
    /// pending.
    fn recreate_swapchain(&mut self, id: SurfaceId) -> Result<bool> {
        self.backend.wait_idle()?;

        let surface = self.surfaces.get_mut(id)?;
        let caps = self.backend.surface_capabilities(&surface.native)?;
        let desc = match choose_swapchain(&caps, surface.window_size, &self.config)? {
            Some(desc) => desc,
            None => {
                surface.needs_recreate = true;
                hal_debug!(SOURCE, "Surface '{}' has a zero extent, rebuild pending", surface.name);
                return Ok(false);
            }
        };

        // From here on the surface has no targets until the rebuild succeeds
        surface.needs_recreate = true;
        let old_images = std::mem::take(&mut surface.images);
        let old_framebuffers = std::mem::take(&mut surface.framebuffers);
        self.release_swapchain_targets(old_images, old_framebuffers);

        let surface = self.surfaces.get_mut(id)?;
        let (swapchain, info) =
            self.backend
                .create_swapchain(&surface.native, &desc, Some(&surface.swapchain))?;
        let old_swapchain = std::mem::replace(&mut surface.swapchain, swapchain);
        self.backend.destroy_swapchain(old_swapchain);

        let surface = self.surfaces.get_mut(id)?;
        let mut format_id = surface.framebuffer_format;
        if info.format != surface.format {
            hal_info!(
                SOURCE,
                "Surface '{}' format changed {:?} -> {:?}",
                surface.name, surface.format, info.format
            );
            let new_format = self
                .create_framebuffer_format_internal(&[FramebufferAttachmentDesc::color(info.format)], true)?;
            self.release_surface_format(format_id);
            format_id = new_format;
            let surface = self.surfaces.get_mut(id)?;
            surface.framebuffer_format = format_id;
            surface.format = info.format;
        }

        let (images, framebuffers) = self.create_swapchain_targets(&info, format_id)?;
        let surface = self.surfaces.get_mut(id)?;
        let image_count = images.len();
        surface.images = images;
        surface.framebuffers = framebuffers;
        surface.framebuffer_size = (info.width, info.height);
        surface.present_mode = info.present_mode;
        surface.images_in_flight.reset(image_count);
        surface.needs_recreate = false;

        hal_info!(
            SOURCE,
            "Swapchain of surface '{}' recreated: {}x{}, {} images",
            surface.name, info.width, info.height, image_count
        );
        Ok(true)
    }

    /// Wrap every swapchain image and build one framebuffer per image
    fn create_swapchain_targets(
        &mut self,
        info: &SwapchainInfo<B::ImageHandle>,
        format: FramebufferFormatId,
    ) -> Result<(Vec<TextureId>, Vec<FramebufferId>)> {
        let mut images = Vec::with_capacity(info.images.len());
        let mut framebuffers = Vec::with_capacity(info.images.len());
        for handle in &info.images {
            let built = self
                .wrap_swapchain_image(*handle, info.format, info.width, info.height)
                .and_then(|texture| {
                    images.push(texture);
                    self.create_framebuffer_internal(&[texture], format, true)
                });
            match built {
                Ok(framebuffer) => framebuffers.push(framebuffer),
                Err(e) => {
                    self.release_swapchain_targets(images, framebuffers);
                    return Err(e);
                }
            }
        }
        Ok((images, framebuffers))
    }

    fn release_swapchain_targets(&mut self, images: Vec<TextureId>, framebuffers: Vec<FramebufferId>) {
        for framebuffer in framebuffers {
            if let Err(e) = self.release_framebuffer(framebuffer) {
                hal_warn!(SOURCE, "Swapchain framebuffer already gone: {}", e);
            }
        }
        for image in images {
            match self.textures.remove(image) {
                Ok(entry) => release_texture(&mut self.backend, entry),
                Err(e) => hal_warn!(SOURCE, "Swapchain texture already gone: {}", e),
            }
        }
    }

    fn release_surface_format(&mut self, format: FramebufferFormatId) {
        if let Err(e) = self.release_framebuffer_format(format) {
            hal_warn!(SOURCE, "Surface framebuffer format already gone: {}", e);
        }
    }

    /// Destroy everything a surface owns (surface already out of its table)
    pub(crate) fn teardown_surface(&mut self, surface: Surface<B>) {
        self.release_swapchain_targets(surface.images, surface.framebuffers);
        self.release_surface_format(surface.framebuffer_format);
        surface.slots.destroy(&mut self.backend);
        self.backend.destroy_swapchain(surface.swapchain);
        self.backend.destroy_native_surface(surface.native);
    }
}

#[cfg(test)]
#[path = "surface_tests.rs"]
mod tests;
