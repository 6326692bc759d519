//! Console logging setup and training summaries.

use crate::common::*;
use std::env;
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` is honored if set, otherwise messages at `INFO` and above are shown.
pub fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true).compact();
    let filter_layer = {
        let filter = EnvFilter::from_default_env();
        if env::var("RUST_LOG").is_err() {
            filter.add_directive(LevelFilter::INFO.into())
        } else {
            filter
        }
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

/// Parameter counts of a variable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParameterCount {
    pub trainable: usize,
    pub non_trainable: usize,
}

impl ParameterCount {
    pub fn total(&self) -> usize {
        self.trainable + self.non_trainable
    }
}

/// Counts trainable and frozen parameters of `vs`.
pub fn count_parameters(vs: &nn::VarStore) -> ParameterCount {
    vs.variables()
        .values()
        .fold(ParameterCount::default(), |mut count, tensor| {
            let numel = tensor.numel();
            if tensor.requires_grad() {
                count.trainable += numel;
            } else {
                count.non_trainable += numel;
            }
            count
        })
}

/// Logs every variable with its shape, followed by the parameter counts.
pub fn log_summary(name: &str, vs: &nn::VarStore) -> ParameterCount {
    let variables = vs.variables();
    info!("model: {}", name);

    variables
        .iter()
        .sorted_by(|(lhs, _), (rhs, _)| lhs.cmp(rhs))
        .for_each(|(var_name, tensor)| {
            debug!("{}\t{:?}\ttrainable: {}", var_name, tensor.size(), tensor.requires_grad());
        });

    let count = count_parameters(vs);
    info!(
        "total params: {}\ttrainable params: {}\tnon-trainable params: {}",
        count.total(),
        count.trainable,
        count.non_trainable
    );
    count
}

/// Logs sample counts and the class distribution.
pub fn log_dataset_stats(
    num_images: usize,
    num_labels: usize,
    num_boundaries: usize,
    class_counts: &IndexMap<String, usize>,
) {
    let classes = class_counts
        .iter()
        .map(|(class, count)| format!("{}: {}", class, count))
        .join(", ");
    info!(
        "images: {}, labels: {}, boundaries: {}, classes: {{{}}}",
        num_images, num_labels, num_boundaries, classes
    );
}
