//! Dataset ingestion, sample building and batching.

mod augment;
mod directory;
mod image;
mod sample;
mod split;
mod voc;

pub use self::image::*;
pub use augment::*;
pub use directory::*;
pub use sample::*;
pub use split::*;
pub use voc::*;
