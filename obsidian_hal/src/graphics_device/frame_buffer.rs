//! Framebuffer formats and framebuffers
//!
//! A framebuffer format is an ordered list of attachment descriptors compiled
//! into a native render pass. Framebuffers bind concrete textures to one
//! format and must match it attachment by attachment.

use crate::error::Result;
use crate::graphics_device::backend::{AttachmentPlan, Backend, ImageLayout, LoadOp, StoreOp};
use crate::graphics_device::texture::{DataFormat, SampleCount, TextureUsage};
use crate::graphics_device::RenderDevice;
use crate::resource_table::{FramebufferFormatId, FramebufferId, TextureId};
use crate::{hal_bail, hal_debug};

const SOURCE: &str = "obsidian::framebuffer";

/// How an attachment is bound to the framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentRole {
    Color,
    Depth,
    DepthStencil,
}

impl AttachmentRole {
    /// Depth and DepthStencil share the single depth slot of a subpass
    pub fn is_depth_type(self) -> bool {
        match self {
            AttachmentRole::Color => false,
            AttachmentRole::Depth | AttachmentRole::DepthStencil => true,
        }
    }

    fn texture_usage(self) -> TextureUsage {
        match self {
            AttachmentRole::Color => TextureUsage::COLOR_ATTACHMENT,
            AttachmentRole::Depth | AttachmentRole::DepthStencil => {
                TextureUsage::DEPTH_STENCIL_ATTACHMENT
            }
        }
    }
}

/// One attachment of a framebuffer format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferAttachmentDesc {
    pub format: DataFormat,
    pub samples: SampleCount,
    pub role: AttachmentRole,
}

impl FramebufferAttachmentDesc {
    pub fn color(format: DataFormat) -> Self {
        Self { format, samples: SampleCount::S1, role: AttachmentRole::Color }
    }

    pub fn depth_stencil(format: DataFormat) -> Self {
        Self { format, samples: SampleCount::S1, role: AttachmentRole::DepthStencil }
    }
}

/// Properties of a live framebuffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramebufferInfo {
    pub format: FramebufferFormatId,
    pub attachments: Vec<TextureId>,
    pub width: u32,
    pub height: u32,
}

/// Native objects needed to record a render pass into a framebuffer
pub struct NativeFramebuffer<'a, B: Backend> {
    pub framebuffer: &'a B::Framebuffer,
    pub render_pass: &'a B::RenderPass,
    pub width: u32,
    pub height: u32,
}

pub(crate) struct FramebufferFormatEntry<B: Backend> {
    pub(crate) attachments: Vec<FramebufferAttachmentDesc>,
    pub(crate) plan: Vec<AttachmentPlan>,
    pub(crate) render_pass: B::RenderPass,
    pub(crate) surface_owned: bool,
}

pub(crate) struct FramebufferEntry<B: Backend> {
    pub(crate) format: FramebufferFormatId,
    pub(crate) attachments: Vec<TextureId>,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) native: B::Framebuffer,
    pub(crate) surface_owned: bool,
}

/// Validate attachments and resolve the fixed load/store policy
///
/// Color attachments are cleared and stored, ending shader-readable
/// (offscreen) or presentable (surface). Depth attachments are cleared and
/// discarded. Stencil is never loaded nor stored.
pub fn plan_attachments(
    attachments: &[FramebufferAttachmentDesc],
    presentable: bool,
) -> Result<Vec<AttachmentPlan>> {
    if attachments.is_empty() {
        hal_bail!(ConfigurationError, SOURCE, "Framebuffer format needs at least one attachment");
    }
    let depth_count = attachments.iter().filter(|a| a.role.is_depth_type()).count();
    if depth_count > 1 {
        hal_bail!(
            ConfigurationError,
            SOURCE,
            "Framebuffer format has {} depth attachments, at most one is allowed",
            depth_count
        );
    }

    attachments
        .iter()
        .enumerate()
        .map(|(index, attachment)| {
            let format = attachment.format;
            match attachment.role {
                AttachmentRole::Color if format.is_depth() => hal_bail!(
                    ConfigurationError,
                    SOURCE,
                    "Attachment {}: color role with depth format {:?}",
                    index, format
                ),
                AttachmentRole::Depth | AttachmentRole::DepthStencil if !format.is_depth() => hal_bail!(
                    ConfigurationError,
                    SOURCE,
                    "Attachment {}: {:?} role with color format {:?}",
                    index, attachment.role, format
                ),
                AttachmentRole::DepthStencil if !format.has_stencil() => hal_bail!(
                    ConfigurationError,
                    SOURCE,
                    "Attachment {}: DepthStencil role with format {:?} that has no stencil",
                    index, format
                ),
                _ => {}
            }

            let (store_op, final_layout) = match attachment.role {
                AttachmentRole::Color if presentable => (StoreOp::Store, ImageLayout::PresentSrc),
                AttachmentRole::Color => (StoreOp::Store, ImageLayout::ShaderReadOnly),
                AttachmentRole::Depth | AttachmentRole::DepthStencil => {
                    (StoreOp::DontCare, ImageLayout::DepthStencilAttachment)
                }
            };

            Ok(AttachmentPlan {
                format,
                samples: attachment.samples,
                role: attachment.role,
                load_op: LoadOp::Clear,
                store_op,
                stencil_load_op: LoadOp::DontCare,
                stencil_store_op: StoreOp::DontCare,
                initial_layout: ImageLayout::Undefined,
                final_layout,
            })
        })
        .collect()
}

impl<B: Backend> RenderDevice<B> {
    // ===== FRAMEBUFFER FORMATS =====

    /// Create an offscreen framebuffer format
    pub fn create_framebuffer_format(
        &mut self,
        attachments: &[FramebufferAttachmentDesc],
    ) -> Result<FramebufferFormatId> {
        self.create_framebuffer_format_internal(attachments, false)
    }

    pub(crate) fn create_framebuffer_format_internal(
        &mut self,
        attachments: &[FramebufferAttachmentDesc],
        surface_owned: bool,
    ) -> Result<FramebufferFormatId> {
        let plan = plan_attachments(attachments, surface_owned)?;
        let render_pass = self.backend.create_render_pass(&plan)?;
        let id = self.framebuffer_formats.insert(FramebufferFormatEntry {
            attachments: attachments.to_vec(),
            plan,
            render_pass,
            surface_owned,
        });
        hal_debug!(
            SOURCE,
            "Created framebuffer format {:?} ({} attachments{})",
            id,
            attachments.len(),
            if surface_owned { ", presentable" } else { "" }
        );
        Ok(id)
    }

    /// Resolved load/store policy of a framebuffer format
    pub fn framebuffer_format_plan(&self, id: FramebufferFormatId) -> Result<Vec<AttachmentPlan>> {
        Ok(self.framebuffer_formats.get(id)?.plan.clone())
    }

    /// Attachment descriptors a framebuffer format was created from
    pub fn framebuffer_format_attachments(
        &self,
        id: FramebufferFormatId,
    ) -> Result<Vec<FramebufferAttachmentDesc>> {
        Ok(self.framebuffer_formats.get(id)?.attachments.clone())
    }

    /// Destroy a framebuffer format no framebuffer uses anymore
    pub fn destroy_framebuffer_format(&mut self, id: FramebufferFormatId) -> Result<()> {
        let entry = self.framebuffer_formats.get(id)?;
        if entry.surface_owned {
            hal_bail!(ResourceStateError, SOURCE, "Framebuffer format {:?} is owned by a surface", id);
        }
        let users = self.framebuffers.iter().filter(|(_, fb)| fb.format == id).count();
        if users > 0 {
            hal_bail!(
                ResourceStateError,
                SOURCE,
                "Framebuffer format {:?} is still used by {} framebuffer(s)",
                id, users
            );
        }
        self.release_framebuffer_format(id)
    }

    pub(crate) fn release_framebuffer_format(&mut self, id: FramebufferFormatId) -> Result<()> {
        let entry = self.framebuffer_formats.remove(id)?;
        self.backend.destroy_render_pass(entry.render_pass);
        hal_debug!(SOURCE, "Destroyed framebuffer format {:?}", id);
        Ok(())
    }

    // ===== FRAMEBUFFERS =====

    /// Bind textures to a framebuffer format
    ///
    /// Attachments are matched in order: same count, same formats, matching
    /// usage bits, identical width and height.
    pub fn create_framebuffer(
        &mut self,
        attachments: &[TextureId],
        format: FramebufferFormatId,
    ) -> Result<FramebufferId> {
        self.create_framebuffer_internal(attachments, format, false)
    }

    pub(crate) fn create_framebuffer_internal(
        &mut self,
        attachments: &[TextureId],
        format: FramebufferFormatId,
        surface_owned: bool,
    ) -> Result<FramebufferId> {
        let format_entry = self.framebuffer_formats.get(format)?;
        if attachments.len() != format_entry.attachments.len() {
            hal_bail!(
                ConfigurationError,
                SOURCE,
                "Framebuffer has {} attachments, format {:?} declares {}",
                attachments.len(), format, format_entry.attachments.len()
            );
        }

        let mut extent: Option<(u32, u32)> = None;
        let mut views = Vec::with_capacity(attachments.len());
        for (index, (texture_id, declared)) in
            attachments.iter().zip(&format_entry.attachments).enumerate()
        {
            let texture = self.textures.get(*texture_id)?;
            let info = &texture.info;
            match extent {
                None => extent = Some((info.width, info.height)),
                Some((w, h)) if (w, h) != (info.width, info.height) => hal_bail!(
                    ConfigurationError,
                    SOURCE,
                    "Attachment {} is {}x{}, expected {}x{}",
                    index, info.width, info.height, w, h
                ),
                Some(_) => {}
            }
            if info.format != declared.format {
                hal_bail!(
                    ConfigurationError,
                    SOURCE,
                    "Attachment {} has format {:?}, format declares {:?}",
                    index, info.format, declared.format
                );
            }
            if info.samples != declared.samples {
                hal_bail!(
                    ConfigurationError,
                    SOURCE,
                    "Attachment {} has {:?} samples, format declares {:?}",
                    index, info.samples, declared.samples
                );
            }
            if !info.usage.contains(declared.role.texture_usage()) {
                hal_bail!(
                    ConfigurationError,
                    SOURCE,
                    "Attachment {} usage {:?} lacks {:?} for role {:?}",
                    index, info.usage, declared.role.texture_usage(), declared.role
                );
            }
            views.push(&texture.view);
        }

        let (width, height) = extent.unwrap_or((0, 0));
        let native = self
            .backend
            .create_framebuffer(&format_entry.render_pass, &views, width, height)?;
        let id = self.framebuffers.insert(FramebufferEntry {
            format,
            attachments: attachments.to_vec(),
            width,
            height,
            native,
            surface_owned,
        });
        hal_debug!(SOURCE, "Created framebuffer {:?} ({}x{})", id, width, height);
        Ok(id)
    }

    pub fn framebuffer_info(&self, id: FramebufferId) -> Result<FramebufferInfo> {
        let entry = self.framebuffers.get(id)?;
        Ok(FramebufferInfo {
            format: entry.format,
            attachments: entry.attachments.clone(),
            width: entry.width,
            height: entry.height,
        })
    }

    /// Native framebuffer and render pass, for command recording
    pub fn native_framebuffer(&self, id: FramebufferId) -> Result<NativeFramebuffer<'_, B>> {
        let entry = self.framebuffers.get(id)?;
        let format = self.framebuffer_formats.get(entry.format)?;
        Ok(NativeFramebuffer {
            framebuffer: &entry.native,
            render_pass: &format.render_pass,
            width: entry.width,
            height: entry.height,
        })
    }

    pub fn destroy_framebuffer(&mut self, id: FramebufferId) -> Result<()> {
        if self.framebuffers.get(id)?.surface_owned {
            hal_bail!(ResourceStateError, SOURCE, "Framebuffer {:?} is owned by a surface", id);
        }
        self.release_framebuffer(id)
    }

    pub(crate) fn release_framebuffer(&mut self, id: FramebufferId) -> Result<()> {
        let entry = self.framebuffers.remove(id)?;
        self.backend.destroy_framebuffer(entry.native);
        hal_debug!(SOURCE, "Destroyed framebuffer {:?}", id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "frame_buffer_tests.rs"]
mod tests;
