//! Labeled image batches read from a class-per-directory layout.

use super::{augment::Augmentation, image::load_image, split::batch_indexes};
use crate::{common::*, config::AugmentationConfig};

/// File extensions recognized as images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "ppm", "tif", "tiff"];

/// How class indexes are turned into targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassMode {
    /// `[batch, 1]` targets with values `0` or `1`. Requires exactly two classes.
    Binary,
    /// `[batch, num_classes]` one-hot targets.
    Categorical,
}

/// Options of [DirectoryIterator::flow_from_directory].
#[derive(Debug, Clone, PartialEq)]
pub struct FlowOptions {
    pub image_size: usize,
    pub image_channels: usize,
    pub augmentation: AugmentationConfig,
    pub seed: u64,
    pub class_mode: ClassMode,
    pub batch_size: usize,
}

/// A labeled mini-batch.
#[derive(Debug)]
pub struct Batch {
    /// `[batch, channels, size, size]`
    pub images: Tensor,
    pub labels: Tensor,
}

/// Iterates over the images of a class-per-directory dataset in shuffled batches.
#[derive(Debug)]
pub struct DirectoryIterator {
    classes: LabelEncoder,
    files: Vec<(PathBuf, usize)>,
    image_size: usize,
    image_channels: usize,
    class_mode: ClassMode,
    batch_size: usize,
    augmentation: Augmentation,
    rng: StdRng,
}

impl DirectoryIterator {
    /// Indexes every image under the sub-directories of `dir`.
    ///
    /// Sub-directory names are the class names, indexed in alphabetical order.
    pub fn flow_from_directory<P>(dir: P, options: FlowOptions) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let dir = dir.as_ref();
        let FlowOptions {
            image_size,
            image_channels,
            augmentation,
            seed,
            class_mode,
            batch_size,
        } = options;

        ensure!(batch_size > 0, "batch_size must be positive");
        ensure!(
            image_channels == 1 || image_channels == 3,
            "image_channels must be 1 or 3, but get {}",
            image_channels
        );

        ensure!(dir.is_dir(), "directory '{}' does not exist", dir.display());

        let class_dirs: Vec<(String, PathBuf)> = glob_sorted(dir, "*")?
            .into_iter()
            .filter(|path| path.is_dir())
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?.to_owned();
                Some((name, path))
            })
            .collect();

        let classes = LabelEncoder::fit(class_dirs.iter().map(|(name, _)| name));
        ensure!(
            classes.num_classes() > 0,
            "no class directory found in '{}'",
            dir.display()
        );
        if class_mode == ClassMode::Binary {
            ensure!(
                classes.num_classes() == 2,
                "binary class mode expects 2 classes in '{}', but found {}",
                dir.display(),
                classes.num_classes()
            );
        }

        let mut files = vec![];
        for (name, path) in class_dirs {
            let index = classes.encode(&name)?;
            let images = glob_sorted(&path, "*")?
                .into_iter()
                .filter(|path| path.is_file() && is_image_file(path));
            files.extend(images.map(|path| (path, index)));
        }
        files.sort_by(|(lhs, _), (rhs, _)| lhs.cmp(rhs));

        info!(
            "found {} images belonging to {} classes in '{}'",
            files.len(),
            classes.num_classes(),
            dir.display()
        );

        Ok(Self {
            classes,
            files,
            image_size,
            image_channels,
            class_mode,
            batch_size,
            augmentation: Augmentation::new(&augmentation)?,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn classes(&self) -> &LabelEncoder {
        &self.classes
    }

    pub fn num_samples(&self) -> usize {
        self.files.len()
    }

    /// Number of batches per epoch.
    pub fn num_batches(&self) -> usize {
        (self.files.len() + self.batch_size - 1) / self.batch_size
    }

    /// Reshuffles the samples and returns the batches of one epoch.
    pub fn epoch(&mut self) -> EpochBatches<'_> {
        let batches = batch_indexes(self.files.len(), self.batch_size, &mut self.rng);
        EpochBatches {
            iter: self,
            batches: batches.into_iter(),
        }
    }

    fn load_batch(&mut self, indexes: &[usize]) -> Result<Batch> {
        let images: Vec<_> = indexes
            .iter()
            .map(|&index| -> Result<_> {
                let (path, _) = &self.files[index];
                let image = load_image(path, self.image_size, self.image_channels)?;
                self.augmentation.forward(&image, &mut self.rng)
            })
            .try_collect()?;
        let images = Tensor::stack(&images, 0);

        let class_indexes = indexes.iter().map(|&index| self.files[index].1);
        let batch_size = indexes.len() as i64;
        let labels = match self.class_mode {
            ClassMode::Binary => {
                let labels: Vec<f32> = class_indexes.map(|index| index as f32).collect();
                Tensor::of_slice(&labels).view([batch_size, 1])
            }
            ClassMode::Categorical => {
                let num_classes = self.classes.num_classes();
                let names: Vec<_> = class_indexes
                    .filter_map(|index| self.classes.decode(index))
                    .collect();
                let labels = self.classes.one_hot(names)?;
                Tensor::of_slice(&labels).view([batch_size, num_classes as i64])
            }
        };

        Ok(Batch { images, labels })
    }
}

/// The batches of one epoch, loaded lazily.
#[derive(Debug)]
pub struct EpochBatches<'a> {
    iter: &'a mut DirectoryIterator,
    batches: std::vec::IntoIter<Vec<usize>>,
}

impl Iterator for EpochBatches<'_> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let indexes = self.batches.next()?;
        Some(self.iter.load_batch(&indexes))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.batches.size_hint()
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Lists the entries of `dir` matching `pattern`, sorted by path.
pub(crate) fn glob_sorted(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&dir.display().to_string()),
        pattern
    );
    let mut paths: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("invalid glob pattern '{}'", pattern))?
        .try_collect()
        .with_context(|| format!("failed to list '{}'", dir.display()))?;
    paths.sort();
    Ok(paths)
}
