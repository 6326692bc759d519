//! Dataset preparation and checkpointed training of the face detector.

use crate::{
    common::*,
    config::FaceDetectorConfig,
    data::{self, FaceDataset, SampleOptions},
    logging,
    model::FaceDetectorModel,
    utils::{Checkpointable, EpochLog, History, MeanMetrics, ModelCheckpoint},
};

/// Number of samples printed at debug level after loading.
const PREVIEW_SAMPLES: usize = 3;

/// The outcome of a face detector training run.
#[derive(Debug)]
pub struct FaceDetectorRun {
    pub model: FaceDetectorModel,
    pub history: History,
    pub encoder: LabelEncoder,
    pub num_train: usize,
    pub num_test: usize,
}

/// Reads the annotations and images under `config.input` into a dataset.
pub fn load_dataset(config: &FaceDetectorConfig) -> Result<FaceDataset> {
    let annotation_dir = config.annotation_dir();
    info!("loading annotations from '{}'", annotation_dir.display());
    let records = data::load_annotations(&annotation_dir, config.image_dir())?;

    let samples = data::build_samples(
        &records,
        SampleOptions {
            image_size: config.image_size,
            image_channels: config.image_channels,
            duplicate: config.duplicate,
        },
    )?;

    let counts = label::class_counts(samples.iter().map(|sample| &sample.label));
    samples.iter().take(PREVIEW_SAMPLES).for_each(|sample| {
        debug!("label: {}\tboundary: {:?}", sample.label, sample.boundary);
    });

    let dataset = FaceDataset::new(samples)?;
    logging::log_dataset_stats(
        dataset.images.size()[0] as usize,
        dataset.labels.size()[0] as usize,
        dataset.boundaries.size()[0] as usize,
        &counts,
    );
    debug!("classes: {}", dataset.encoder.classes().iter().join(", "));
    Ok(dataset)
}

/// Trains on `train` for `epochs` epochs of shuffled mini-batches and
/// validates on `test` after each one.
pub fn fit(
    model: &mut FaceDetectorModel,
    train: &FaceDataset,
    test: &FaceDataset,
    epochs: usize,
    batch_size: usize,
    rng: &mut StdRng,
    checkpoint: &mut ModelCheckpoint,
) -> Result<History> {
    let device = model.device();
    let mut history = History::default();

    for epoch in 1..=epochs {
        let _span = info_span!("epoch", epoch).entered();
        let mut log = EpochLog::new(epoch);

        let mut metrics = MeanMetrics::default();
        for indexes in data::batch_indexes(train.len(), batch_size, rng) {
            let batch = train.select(&indexes).to_device(device);
            let output = model.train_step(&batch.images, &batch.targets())?;
            output
                .metrics()
                .into_iter()
                .for_each(|(name, value)| metrics.add(name, value, indexes.len()));
        }
        log.extend_training(metrics.compute());
        log.extend_validation(evaluate(model, test, batch_size)?);

        info!("{}", log);
        checkpoint.on_epoch_end(&log, model.var_store())?;
        history.push(log);
    }

    Ok(history)
}

/// Computes the sample-weighted metrics over `dataset` in order.
pub fn evaluate(
    model: &FaceDetectorModel,
    dataset: &FaceDataset,
    batch_size: usize,
) -> Result<IndexMap<String, f64>> {
    let device = model.device();
    let mut metrics = MeanMetrics::default();
    let indexes: Vec<_> = (0..dataset.len()).collect();

    for chunk in indexes.chunks(batch_size.max(1)) {
        let batch = dataset.select(chunk).to_device(device);
        let output = model.evaluate(&batch.images, &batch.targets())?;
        output
            .metrics()
            .into_iter()
            .for_each(|(name, value)| metrics.add(name, value, chunk.len()));
    }

    Ok(metrics.compute())
}

/// Loads the dataset, splits it, and trains a detector with checkpointing.
pub fn run(config: &FaceDetectorConfig) -> Result<FaceDetectorRun> {
    tch::manual_seed(config.seed as i64);
    config
        .network
        .check_input(config.image_size, config.image_channels)?;

    let dataset = load_dataset(config)?;
    let split = data::train_test_split(dataset.len(), config.test_size.raw(), config.seed)?;
    let (train, test) = dataset.split(&split);
    info!(
        "training samples: {}, test samples: {}",
        train.len(),
        test.len()
    );

    let mut model = FaceDetectorModel::new(
        config.network,
        dataset.num_classes(),
        config.image_size,
        config.image_channels,
        config.loss.clone(),
        config.device,
    )?;
    if let Some(weights) = &config.backbone_weights {
        model.load_backbone_weights(weights)?;
    }
    model.prepare(config.learning_rate.raw())?;

    let mut checkpoint = ModelCheckpoint::new(&config.output);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let history = fit(
        &mut model,
        &train,
        &test,
        config.epochs,
        config.batch_size.get(),
        &mut rng,
        &mut checkpoint,
    )?;

    save_run_files(config, &history)?;

    Ok(FaceDetectorRun {
        model,
        history,
        encoder: dataset.encoder.clone(),
        num_train: train.len(),
        num_test: test.len(),
    })
}

/// Writes the effective configuration and the history next to the checkpoint.
fn save_run_files(config: &FaceDetectorConfig, history: &History) -> Result<()> {
    let config_file = config.output.with_extension("config.json");
    let history_file = config.output.with_extension("history.json");

    if let Some(dir) = config.output.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }

    let text = serde_json::to_string_pretty(config)?;
    fs::write(&config_file, text)
        .with_context(|| format!("failed to write config file '{}'", config_file.display()))?;
    history.save(&history_file)?;
    Ok(())
}
