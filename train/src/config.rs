//! Training program configuration format.

use crate::{common::*, constants};

fn open_json5<T, P>(path: P) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    let config = json5::from_str(&text)
        .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
    Ok(config)
}

/// The face detector training configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceDetectorConfig {
    /// The checkpoint file written on every validation loss improvement.
    pub output: PathBuf,
    /// The dataset directory containing `images/` and `annotations/`.
    pub input: PathBuf,
    pub network: Network,
    /// Optional pretrained weights loaded into the backbone and frozen.
    pub backbone_weights: Option<PathBuf>,
    pub epochs: usize,
    /// Emit one sample per object instead of one per image.
    pub duplicate: bool,
    pub image_size: usize,
    pub image_channels: usize,
    pub seed: u64,
    pub test_size: R64,
    pub batch_size: NonZeroUsize,
    pub learning_rate: R64,
    pub loss: DetectorLossInit,
    #[serde(with = "tch_serde::serde_device")]
    pub device: Device,
}

impl FaceDetectorConfig {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        open_json5(path)
    }

    pub fn image_dir(&self) -> PathBuf {
        self.input.join("images")
    }

    pub fn annotation_dir(&self) -> PathBuf {
        self.input.join("annotations")
    }
}

impl Default for FaceDetectorConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("models/phase1/checkpoint"),
            input: PathBuf::from("data/kaggle/andrewmvd"),
            network: Network::default(),
            backbone_weights: None,
            epochs: 10,
            duplicate: false,
            image_size: constants::IMAGE_SIZE,
            image_channels: constants::IMAGE_CHANNELS,
            seed: constants::RANDOM_STATE,
            test_size: r64(constants::VALIDATION_SPLIT),
            batch_size: default_batch_size(),
            learning_rate: r64(1e-4),
            loss: DetectorLossInit::default(),
            device: Device::cuda_if_available(),
        }
    }
}

/// Command line options of the face detector trainer.
///
/// Each given flag overrides the configuration file, which overrides the defaults.
#[derive(Debug, Clone, PartialEq, StructOpt)]
pub struct FaceDetectorArgs {
    #[structopt(long)]
    /// optional json5 configuration file
    pub config: Option<PathBuf>,
    #[structopt(long)]
    /// the checkpoint output path
    pub output: Option<PathBuf>,
    #[structopt(long)]
    /// the dataset directory with images/ and annotations/
    pub input: Option<PathBuf>,
    #[structopt(long)]
    /// the backbone network, one of vgg16, vgg19, resnet18, resnet50, mobilenetv2, densenet121
    pub network: Option<String>,
    #[structopt(long)]
    /// the number of epochs
    pub epochs: Option<usize>,
    #[structopt(long)]
    /// emit one sample per object instead of one per image
    pub duplicate: bool,
}

impl FaceDetectorArgs {
    /// Resolves the effective configuration.
    pub fn into_config(self) -> Result<FaceDetectorConfig> {
        let Self {
            config,
            output,
            input,
            network,
            epochs,
            duplicate,
        } = self;

        let mut config = match config {
            Some(path) => FaceDetectorConfig::open(path)?,
            None => FaceDetectorConfig::default(),
        };
        if let Some(output) = output {
            config.output = output;
        }
        if let Some(input) = input {
            config.input = input;
        }
        if let Some(network) = network {
            config.network = Network::from_name(&network)?;
        }
        if let Some(epochs) = epochs {
            config.epochs = epochs;
        }
        if duplicate {
            config.duplicate = true;
        }

        Ok(config)
    }
}

/// The mask classifier training configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskClassifierConfig {
    /// The checkpoint file to load from, or to train into.
    pub output: PathBuf,
    /// Directory with one sub-directory per class.
    pub training_dir: PathBuf,
    /// Validation images laid out like `training_dir`.
    pub validation_dir: Option<PathBuf>,
    #[serde(default = "default_image_size")]
    pub image_size: usize,
    #[serde(default = "default_image_channels")]
    pub image_channels: usize,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    /// Maximum number of validation batches per epoch.
    #[serde(default = "default_validation_steps")]
    pub validation_steps: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: NonZeroUsize,
    #[serde(default = "default_mask_learning_rate")]
    pub learning_rate: R64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "AugmentationConfig::training")]
    pub training_augmentation: AugmentationConfig,
    #[serde(default = "AugmentationConfig::testing")]
    pub testing_augmentation: AugmentationConfig,
    #[serde(with = "tch_serde::serde_device", default = "default_device")]
    pub device: Device,
}

impl MaskClassifierConfig {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        open_json5(path)
    }

    /// The options of the checkpointed training loop.
    pub fn training_options(&self) -> MaskTrainingOptions {
        MaskTrainingOptions {
            epochs: self.epochs,
            validation_steps: self.validation_steps,
            learning_rate: self.learning_rate,
            device: self.device,
        }
    }
}

/// Command line options of the mask classifier trainer.
#[derive(Debug, Clone, PartialEq, StructOpt)]
pub struct MaskClassifierArgs {
    #[structopt(long, default_value = "mask-classifier.json5")]
    /// json5 configuration file
    pub config: PathBuf,
}

/// Hyperparameters of the mask classifier fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskTrainingOptions {
    pub epochs: usize,
    pub validation_steps: usize,
    pub learning_rate: R64,
    pub device: Device,
}

impl Default for MaskTrainingOptions {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            validation_steps: default_validation_steps(),
            learning_rate: default_mask_learning_rate(),
            device: default_device(),
        }
    }
}

/// Random image transformations applied by the data providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentationConfig {
    /// Multiplier applied to the raw `0..255` pixel values.
    pub rescale: R64,
    /// Maximum rotation in degrees.
    pub rotation_range: R64,
    /// Maximum horizontal shift as a fraction of the width.
    pub width_shift_range: R64,
    /// Maximum vertical shift as a fraction of the height.
    pub height_shift_range: R64,
    /// Maximum shear angle in degrees.
    pub shear_range: R64,
    /// Zoom factors are sampled from `[1 - zoom_range, 1 + zoom_range]`.
    pub zoom_range: R64,
    pub horizontal_flip: bool,
    pub fill_mode: FillMode,
}

impl AugmentationConfig {
    /// Rescaling with random rotation, shift, shear, zoom and flips.
    pub fn training() -> Self {
        Self {
            rescale: r64(1.0 / 255.0),
            rotation_range: r64(40.0),
            width_shift_range: r64(0.2),
            height_shift_range: r64(0.2),
            shear_range: r64(0.2),
            zoom_range: r64(0.2),
            horizontal_flip: true,
            fill_mode: FillMode::Nearest,
        }
    }

    /// Rescaling only.
    pub fn testing() -> Self {
        Self {
            rescale: r64(1.0 / 255.0),
            rotation_range: r64(0.0),
            width_shift_range: r64(0.0),
            height_shift_range: r64(0.0),
            shear_range: r64(0.0),
            zoom_range: r64(0.0),
            horizontal_flip: false,
            fill_mode: FillMode::Nearest,
        }
    }

    /// Returns true if no geometric transformation is configured.
    pub fn is_rescale_only(&self) -> bool {
        self.rotation_range == 0.0
            && self.width_shift_range == 0.0
            && self.height_shift_range == 0.0
            && self.shear_range == 0.0
            && self.zoom_range == 0.0
            && !self.horizontal_flip
    }
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self::testing()
    }
}

/// How pixels outside the source image are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    /// Repeat the closest border pixel.
    Nearest,
    /// Fill with zeros.
    Constant,
    /// Mirror the image at the border.
    Reflect,
}

impl FillMode {
    /// The padding mode code of `grid_sampler`.
    pub fn padding_mode(&self) -> i64 {
        match self {
            Self::Constant => 0,
            Self::Nearest => 1,
            Self::Reflect => 2,
        }
    }
}

fn default_image_size() -> usize {
    constants::IMAGE_SIZE
}

fn default_image_channels() -> usize {
    constants::IMAGE_CHANNELS
}

fn default_epochs() -> usize {
    10
}

fn default_validation_steps() -> usize {
    10
}

fn default_batch_size() -> NonZeroUsize {
    NonZeroUsize::new(32).unwrap()
}

fn default_mask_learning_rate() -> R64 {
    r64(1e-3)
}

fn default_seed() -> u64 {
    constants::RANDOM_STATE
}

fn default_device() -> Device {
    Device::cuda_if_available()
}
