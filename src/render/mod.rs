//! Rendering module for montage.
//!
//! Stacks source images into a single sheet and writes it as PNG.

mod compose;
mod png;

pub use compose::{compose, sheet_height};
pub use png::write_png;
