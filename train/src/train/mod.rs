//! Training loops of the two models.

pub mod face;
pub mod mask;
