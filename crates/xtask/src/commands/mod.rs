//! Command implementations for xtask
//!
//! Each command is a separate module that implements its own CLI args and execution logic.

mod fuzz;
mod render;

pub use fuzz::Fuzz;
pub use render::Render;
