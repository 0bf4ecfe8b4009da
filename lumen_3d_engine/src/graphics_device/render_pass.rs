/// RenderPass trait - describes how a pass loads, stores and transitions its attachments

use crate::graphics_device::{TextureFormat, SampleCount, ImageLayout, PipelineStage, Access};

/// Render pass trait
///
/// The backend object holds the native handle; the queries let pipeline and
/// framebuffer creation check compatibility.
pub trait RenderPass: Send + Sync {
    /// Number of color attachments in the single subpass
    fn color_attachment_count(&self) -> usize;

    /// Whether the subpass has a depth attachment
    fn has_depth_attachment(&self) -> bool;
}

/// Descriptor for a single attachment in a render pass
#[derive(Debug, Clone, Copy)]
pub struct AttachmentOps {
    /// Pixel format
    pub format: TextureFormat,
    /// Number of samples
    pub samples: SampleCount,
    /// Load operation (what to do with existing content)
    pub load_op: LoadOp,
    /// Store operation (what to do with rendered content)
    pub store_op: StoreOp,
    /// Layout the attachment is in when the pass begins
    pub initial_layout: ImageLayout,
    /// Layout the pass leaves the attachment in
    pub final_layout: ImageLayout,
}

/// Load operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    /// Load existing content
    Load,
    /// Clear the content
    Clear,
    /// Don't care about existing content
    DontCare,
}

/// Store operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// Store the rendered content
    Store,
    /// Don't care about storing the content
    DontCare,
}

/// Which side of the subpass an external dependency sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyDirection {
    /// EXTERNAL -> subpass 0 (work recorded before this pass)
    Incoming,
    /// subpass 0 -> EXTERNAL (work recorded after this pass)
    Outgoing,
}

/// Execution and memory dependency between this pass and its neighbours
#[derive(Debug, Clone, Copy)]
pub struct SubpassDependency {
    pub direction: DependencyDirection,
    pub src_stage: PipelineStage,
    pub dst_stage: PipelineStage,
    pub src_access: Access,
    pub dst_access: Access,
}

/// Descriptor for creating a single-subpass render pass
#[derive(Debug, Clone)]
pub struct RenderPassDesc {
    /// Color attachments (framebuffer order: colors first, depth last)
    pub color_attachments: Vec<AttachmentOps>,
    /// Optional depth attachment
    pub depth_attachment: Option<AttachmentOps>,
    /// External dependencies
    pub dependencies: Vec<SubpassDependency>,
}
