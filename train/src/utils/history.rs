//! Per-epoch training records.

use crate::common::*;

/// Prefix of metrics computed on validation data.
pub const VALIDATION_PREFIX: &str = "val_";

/// Metrics of one epoch, such as `loss`, `accuracy` and `val_loss`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EpochLog {
    pub epoch: usize,
    pub metrics: IndexMap<String, f64>,
}

impl EpochLog {
    pub fn new(epoch: usize) -> Self {
        Self {
            epoch,
            metrics: IndexMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    pub fn insert<S>(&mut self, name: S, value: f64)
    where
        S: Into<String>,
    {
        self.metrics.insert(name.into(), value);
    }

    /// Adds the `metrics` computed on training data.
    pub fn extend_training(&mut self, metrics: IndexMap<String, f64>) {
        self.metrics.extend(metrics);
    }

    /// Adds the `metrics` computed on validation data with the `val_` prefix.
    pub fn extend_validation(&mut self, metrics: IndexMap<String, f64>) {
        self.metrics.extend(
            metrics
                .into_iter()
                .map(|(name, value)| (format!("{}{}", VALIDATION_PREFIX, name), value)),
        );
    }
}

impl Display for EpochLog {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "epoch: {}", self.epoch)?;
        for (name, value) in &self.metrics {
            write!(f, "\t{}: {:.5}", name, value)?;
        }
        Ok(())
    }
}

/// The logs of all finished epochs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct History {
    pub epochs: Vec<EpochLog>,
}

impl History {
    pub fn push(&mut self, log: EpochLog) {
        self.epochs.push(log);
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn last(&self) -> Option<&EpochLog> {
        self.epochs.last()
    }

    /// The values of one metric over the epochs that recorded it.
    pub fn metric(&self, name: &str) -> Vec<f64> {
        self.epochs.iter().filter_map(|log| log.get(name)).collect()
    }

    /// Writes the history as pretty-printed JSON.
    pub fn save<P>(&self, path: P) -> Result<()>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)
            .with_context(|| format!("failed to write history file '{}'", path.display()))?;
        Ok(())
    }
}

/// Sample-weighted running means of batch metrics.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeanMetrics {
    sums: IndexMap<String, (f64, usize)>,
}

impl MeanMetrics {
    /// Records `value` averaged over `count` samples.
    pub fn add<S>(&mut self, name: S, value: f64, count: usize)
    where
        S: Into<String>,
    {
        let (sum, total) = self.sums.entry(name.into()).or_insert((0.0, 0));
        *sum += value * count as f64;
        *total += count;
    }

    pub fn compute(&self) -> IndexMap<String, f64> {
        self.sums
            .iter()
            .filter(|(_, (_, total))| *total > 0)
            .map(|(name, &(sum, total))| (name.clone(), sum / total as f64))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn means_are_weighted_by_samples() {
        let mut metrics = MeanMetrics::default();
        metrics.add("loss", 1.0, 3);
        metrics.add("loss", 3.0, 1);
        metrics.add("accuracy", 0.5, 2);

        let means = metrics.compute();
        assert_abs_diff_eq!(means["loss"], 1.5);
        assert_abs_diff_eq!(means["accuracy"], 0.5);
        assert_eq!(means.keys().collect_vec(), ["loss", "accuracy"]);
    }

    #[test]
    fn validation_metrics_are_prefixed() {
        let mut log = EpochLog::new(1);
        log.extend_training([("loss".to_string(), 0.5)].into_iter().collect());
        log.extend_validation([("loss".to_string(), 0.25)].into_iter().collect());

        assert_eq!(log.get("loss"), Some(0.5));
        assert_eq!(log.get("val_loss"), Some(0.25));
        assert_eq!(log.to_string(), "epoch: 1\tloss: 0.50000\tval_loss: 0.25000");
    }

    #[test]
    fn history_save() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("history.json");

        let mut history = History::default();
        let mut log = EpochLog::new(1);
        log.insert("loss", 0.75);
        history.push(log);
        history.save(&path)?;

        let loaded: History = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(loaded, history);
        assert_eq!(loaded.metric("loss"), [0.75]);
        Ok(())
    }
}
