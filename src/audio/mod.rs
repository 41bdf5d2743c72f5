pub mod render;
pub mod writer;

pub use render::{RenderReport, render_file};
pub use writer::{BlockWriter, timestamped_output};
