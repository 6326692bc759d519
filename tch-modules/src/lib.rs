//! Network modules and loss functions for the mask classifier and the face detector.

mod common;

pub mod backbone;
pub mod bce_loss;
pub mod classifying_detector;
pub mod cross_entropy;
pub mod l2_loss;
pub mod mask_classifier;
pub mod metrics;

pub use backbone::*;
pub use bce_loss::*;
pub use classifying_detector::*;
pub use cross_entropy::*;
pub use l2_loss::*;
pub use mask_classifier::*;
pub use metrics::*;
