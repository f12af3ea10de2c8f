/// RenderPass / Framebuffer - compiled framebuffer formats and their framebuffers

use ash::vk;
use obsidian_hal::obsidian::AttachmentPlan;
use obsidian_hal::{hal_bail, Result};

use crate::vulkan_context::{vk_error, GpuContext};
use crate::vulkan_format::{
    format_to_vk, image_layout_to_vk, load_op_to_vk, sample_count_to_vk, store_op_to_vk,
    subpass_layout,
};

const SOURCE: &str = "obsidian::vulkan::render_pass";

/// One graphics subpass writing every attachment of the plan
pub(crate) fn create_render_pass(ctx: &GpuContext, plan: &[AttachmentPlan]) -> Result<vk::RenderPass> {
    let mut attachments = Vec::with_capacity(plan.len());
    let mut color_attachment_refs = Vec::new();
    let mut depth_attachment_ref: Option<vk::AttachmentReference> = None;

    for (index, attachment) in plan.iter().enumerate() {
        attachments.push(
            vk::AttachmentDescription::default()
                .format(format_to_vk(attachment.format))
                .samples(sample_count_to_vk(attachment.samples))
                .load_op(load_op_to_vk(attachment.load_op))
                .store_op(store_op_to_vk(attachment.store_op))
                .stencil_load_op(load_op_to_vk(attachment.stencil_load_op))
                .stencil_store_op(store_op_to_vk(attachment.stencil_store_op))
                .initial_layout(image_layout_to_vk(attachment.initial_layout))
                .final_layout(image_layout_to_vk(attachment.final_layout)),
        );

        let reference = vk::AttachmentReference::default()
            .attachment(index as u32)
            .layout(subpass_layout(attachment.role));

        if attachment.role.is_depth_type() {
            if depth_attachment_ref.is_some() {
                hal_bail!(BackendError, SOURCE, "Render pass with more than one depth attachment");
            }
            depth_attachment_ref = Some(reference);
        } else {
            color_attachment_refs.push(reference);
        }
    }

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_attachment_refs);

    if let Some(ref depth_ref) = depth_attachment_ref {
        subpass = subpass.depth_stencil_attachment(depth_ref);
    }

    // Include depth stages when a depth attachment is present
    let (stage_mask, access_mask) = if depth_attachment_ref.is_some() {
        (
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )
    } else {
        (
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        )
    };

    let dependency = vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(stage_mask)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(stage_mask)
        .dst_access_mask(access_mask);

    let render_pass_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass))
        .dependencies(std::slice::from_ref(&dependency));

    unsafe {
        ctx.device
            .create_render_pass(&render_pass_info, None)
            .map_err(|e| vk_error("Failed to create render pass", e))
    }
}

pub(crate) fn create_framebuffer(
    ctx: &GpuContext,
    render_pass: vk::RenderPass,
    views: &[&vk::ImageView],
    width: u32,
    height: u32,
) -> Result<vk::Framebuffer> {
    let attachments: Vec<vk::ImageView> = views.iter().map(|view| **view).collect();

    let create_info = vk::FramebufferCreateInfo::default()
        .render_pass(render_pass)
        .attachments(&attachments)
        .width(width)
        .height(height)
        .layers(1);

    unsafe {
        ctx.device
            .create_framebuffer(&create_info, None)
            .map_err(|e| vk_error(&format!("Failed to create {}x{} framebuffer", width, height), e))
    }
}
