//! Checkpointing and training history helpers.

mod checkpoint;
mod history;

pub use checkpoint::*;
pub use history::*;
