//! Class-labeled bounding boxes and class name encoding.

use anyhow::{ensure, format_err, Result};
use bbox::{Rect, HW, TLBR};
use indexmap::{IndexMap, IndexSet};
use num_traits::Num;

/// A rectangle annotated with a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label<R, C>
where
    R: Rect,
{
    pub rect: R,
    pub class: C,
}

impl<T, C> Label<TLBR<T>, C>
where
    T: Copy + Num + PartialOrd,
    C: Clone,
{
    /// Converts the pixel box to ratio units, see [TLBR::to_ratio].
    pub fn to_ratio(&self, image_size: &HW<T>, target: T) -> Self {
        Label {
            rect: self.rect.to_ratio(image_size, target),
            class: self.class.clone(),
        }
    }
}

/// Maps class names to dense indexes in alphabetical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    classes: IndexSet<String>,
}

impl LabelEncoder {
    /// Collects the distinct class names and sorts them.
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes: IndexSet<String> = labels
            .into_iter()
            .map(|label| label.as_ref().to_owned())
            .collect();
        classes.sort();
        Self { classes }
    }

    pub fn classes(&self) -> &IndexSet<String> {
        &self.classes
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn encode(&self, label: &str) -> Result<usize> {
        self.classes
            .get_index_of(label)
            .ok_or_else(|| format_err!("unknown class '{}'", label))
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get_index(index).map(String::as_str)
    }

    pub fn transform<I, S>(&self, labels: I) -> Result<Vec<usize>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        labels
            .into_iter()
            .map(|label| self.encode(label.as_ref()))
            .collect()
    }

    /// Encodes labels into row-major one-hot vectors of width [Self::num_classes].
    pub fn one_hot<I, S>(&self, labels: I) -> Result<Vec<f32>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let num_classes = self.num_classes();
        let indexes = self.transform(labels)?;
        let mut encoded = vec![0f32; indexes.len() * num_classes];

        for (row, index) in indexes.into_iter().enumerate() {
            encoded[row * num_classes + index] = 1.0;
        }

        Ok(encoded)
    }
}

/// Counts the occurrences of each class, keyed in alphabetical order.
pub fn class_counts<I, S>(labels: I) -> IndexMap<String, usize>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts = IndexMap::new();
    for label in labels {
        *counts.entry(label.as_ref().to_owned()).or_insert(0) += 1;
    }
    counts.sort_keys();
    counts
}

/// Checks that a one-hot buffer has the expected shape.
pub fn check_one_hot(encoded: &[f32], num_classes: usize) -> Result<usize> {
    ensure!(num_classes > 0, "number of classes must be positive");
    ensure!(
        encoded.len() % num_classes == 0,
        "one-hot buffer length {} is not a multiple of {}",
        encoded.len(),
        num_classes
    );
    Ok(encoded.len() / num_classes)
}
