//! Training pipelines of the mask classifier and the face detector.

pub mod common;
pub mod config;
pub mod constants;
pub mod data;
pub mod logging;
pub mod model;
pub mod train;
pub mod utils;
