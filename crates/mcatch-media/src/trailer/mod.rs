//! Trailer assembly and rendering.

pub mod assembler;
pub mod render;

pub use assembler::assemble_cut_list;
pub use render::{concat_list, render_trailer, segment_command};
