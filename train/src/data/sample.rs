//! Face detector samples and the in-memory dataset built from them.

use super::{image::load_image, split::SplitIndexes, voc::AnnotationRecord};
use crate::common::*;

/// One (image, label, boundary) triple.
#[derive(Debug)]
pub struct Sample {
    /// `[channels, size, size]` pixels in `0..=1`.
    pub image: Tensor,
    pub label: String,
    /// `[xmin, ymin, xmax, ymax]` relative to the original image size.
    pub boundary: [f64; 4],
}

/// How annotation records are turned into samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleOptions {
    pub image_size: usize,
    pub image_channels: usize,
    /// Emit one sample per object. Otherwise only the first object of each
    /// image is used.
    pub duplicate: bool,
}

/// Decodes the image of every record and derives its samples.
///
/// Records without objects contribute no sample.
pub fn build_samples(records: &[AnnotationRecord], options: SampleOptions) -> Result<Vec<Sample>> {
    let SampleOptions {
        image_size,
        image_channels,
        duplicate,
    } = options;
    let target = image_size as f64;

    let mut samples = vec![];

    for record in records {
        let image = load_image(&record.image_file, image_size, image_channels)? / 255.0;
        let image_size = record.size.clone().cast::<f64>();
        let num_objects = if duplicate { record.objects.len() } else { 1 };

        for object in record.objects.iter().take(num_objects) {
            let ratio = object.to_ratio(&image_size, target);
            samples.push(Sample {
                image: image.shallow_clone(),
                label: ratio.class,
                boundary: ratio.rect.xyxy(),
            });
        }
    }

    Ok(samples)
}

/// Stacked samples with one-hot encoded labels.
#[derive(Debug)]
pub struct FaceDataset {
    /// `[n, channels, size, size]`
    pub images: Tensor,
    /// `[n, num_classes]` one-hot rows.
    pub labels: Tensor,
    /// `[n, 4]`
    pub boundaries: Tensor,
    pub encoder: LabelEncoder,
}

impl FaceDataset {
    /// Fits the label encoder on `samples` and stacks them.
    pub fn new(samples: Vec<Sample>) -> Result<Self> {
        ensure!(!samples.is_empty(), "no sample to build the dataset");

        let encoder = LabelEncoder::fit(samples.iter().map(|sample| &sample.label));
        let num_samples = samples.len() as i64;
        let num_classes = encoder.num_classes() as i64;

        let mut images = Vec::with_capacity(samples.len());
        let mut labels = Vec::with_capacity(samples.len());
        let mut boundaries = Vec::with_capacity(samples.len() * 4);
        for Sample {
            image,
            label,
            boundary,
        } in samples
        {
            images.push(image);
            labels.push(label);
            boundaries.extend(boundary);
        }

        let one_hot = encoder.one_hot(&labels)?;
        ensure!(
            label::check_one_hot(&one_hot, encoder.num_classes())? == labels.len(),
            "one-hot rows do not match the number of samples"
        );
        let images = Tensor::stack(&images, 0);
        let labels = Tensor::of_slice(&one_hot).view([num_samples, num_classes]);
        let boundaries = Tensor::of_slice(&boundaries)
            .to_kind(Kind::Float)
            .view([num_samples, 4]);

        Ok(Self {
            images,
            labels,
            boundaries,
            encoder,
        })
    }

    pub fn len(&self) -> usize {
        self.images.size()[0] as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_classes(&self) -> usize {
        self.encoder.num_classes()
    }

    /// Selects the rows at `indexes` from images, labels and boundaries alike.
    pub fn select(&self, indexes: &[usize]) -> Self {
        let index = Tensor::of_slice(&indexes.iter().map(|&index| index as i64).collect_vec())
            .to_device(self.images.device());

        Self {
            images: self.images.index_select(0, &index),
            labels: self.labels.index_select(0, &index),
            boundaries: self.boundaries.index_select(0, &index),
            encoder: self.encoder.clone(),
        }
    }

    /// Splits into the `(train, test)` partitions.
    pub fn split(&self, indexes: &SplitIndexes) -> (Self, Self) {
        (self.select(&indexes.train), self.select(&indexes.test))
    }

    /// Training targets keyed by head.
    pub fn targets(&self) -> HeadTargets {
        [
            (Head::Boundary, self.boundaries.shallow_clone()),
            (Head::Classification, self.labels.shallow_clone()),
        ]
        .into_iter()
        .collect()
    }

    pub fn to_device(&self, device: Device) -> Self {
        Self {
            images: self.images.to_device(device),
            labels: self.labels.to_device(device),
            boundaries: self.boundaries.to_device(device),
            encoder: self.encoder.clone(),
        }
    }
}
