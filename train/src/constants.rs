//! Values shared by the mask classifier and the face detector.

/// Side length of the square network input.
pub const IMAGE_SIZE: usize = 224;
/// Number of color channels of the network input.
pub const IMAGE_CHANNELS: usize = 3;
/// Seed of every random number generator in training.
pub const RANDOM_STATE: u64 = 694_201_337;
/// Fraction of samples held out for validation.
pub const VALIDATION_SPLIT: f64 = 0.2;
