/// Render module - the deferred pass chain and its frame orchestrator
///
/// Pass order per frame: depth -> G -> compose -> forward -> bloom -> post.

pub mod frame_buffer_bundle;
pub mod pass_support;
pub mod push_constants;
pub mod light_data;
pub mod scene;

pub mod depth_pass;
pub mod g_pass;
pub mod compose_pass;
pub mod forward_pass;
pub mod bloom_pass;
pub mod post_pass;

pub mod render_system;

#[cfg(test)]
pub mod test_support;

pub use frame_buffer_bundle::*;
pub use pass_support::*;
pub use push_constants::*;
pub use light_data::*;
pub use scene::*;
pub use depth_pass::DepthPass;
pub use g_pass::GPass;
pub use compose_pass::ComposePass;
pub use forward_pass::ForwardPass;
pub use bloom_pass::BloomPass;
pub use post_pass::PostPass;
pub use render_system::*;
