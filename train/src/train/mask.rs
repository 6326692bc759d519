//! Build-or-load training of the mask classifier.

use crate::{
    common::*,
    config::{AugmentationConfig, MaskClassifierConfig, MaskTrainingOptions},
    data::{Batch, ClassMode, DirectoryIterator, FlowOptions},
    model::MaskClassifierModel,
    utils::{
        try_load_checkpoint, BuildOutcome, Checkpointable, EpochLog, History, LoadOutcome,
        MeanMetrics, ModelCheckpoint,
    },
};

/// Describes the training backend.
pub fn version() -> String {
    format!(
        "Mask classifier: {} {} (libtorch), CUDA: {}, cuDNN: {}, GPU(s): {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        tch::Cuda::is_available(),
        tch::Cuda::cudnn_is_available(),
        tch::Cuda::device_count()
    )
}

/// Binary-labeled batches of augmented training images.
pub fn training_generator<P>(
    dir: P,
    size: usize,
    channels: usize,
    augmentation: &AugmentationConfig,
    batch_size: usize,
    seed: u64,
) -> Result<DirectoryIterator>
where
    P: AsRef<Path>,
{
    DirectoryIterator::flow_from_directory(
        dir,
        FlowOptions {
            image_size: size,
            image_channels: channels,
            augmentation: augmentation.clone(),
            seed,
            class_mode: ClassMode::Binary,
            batch_size,
        },
    )
}

/// Binary-labeled batches of rescaled validation images.
pub fn testing_generator<P>(
    dir: P,
    size: usize,
    channels: usize,
    augmentation: &AugmentationConfig,
    batch_size: usize,
    seed: u64,
) -> Result<DirectoryIterator>
where
    P: AsRef<Path>,
{
    training_generator(dir, size, channels, augmentation, batch_size, seed)
}

/// Loads the model saved at `path`, or trains a new one and checkpoints it there.
///
/// The returned model is prepared for further training in both cases.
pub fn build<P>(
    path: P,
    size: usize,
    channels: usize,
    training: &mut DirectoryIterator,
    validation: Option<&mut DirectoryIterator>,
    options: &MaskTrainingOptions,
) -> Result<BuildOutcome<MaskClassifierModel>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let learning_rate = options.learning_rate.raw();

    let model = MaskClassifierModel::new(size, channels, options.device)?;
    if let LoadOutcome::Loaded(mut model) = try_load_checkpoint(model, path) {
        model.prepare(learning_rate)?;
        return Ok(BuildOutcome::Loaded(model));
    }

    let mut model = MaskClassifierModel::new(size, channels, options.device)?;
    model.prepare(learning_rate)?;

    let mut checkpoint = ModelCheckpoint::new(path);
    let history = fit(&mut model, training, validation, options, &mut checkpoint)?;

    Ok(BuildOutcome::Trained { model, history })
}

/// Trains for `options.epochs` epochs, validating on at most
/// `options.validation_steps` batches after each one.
pub fn fit(
    model: &mut MaskClassifierModel,
    training: &mut DirectoryIterator,
    mut validation: Option<&mut DirectoryIterator>,
    options: &MaskTrainingOptions,
    checkpoint: &mut ModelCheckpoint,
) -> Result<History> {
    let device = model.device();
    let mut history = History::default();

    for epoch in 1..=options.epochs {
        let _span = info_span!("epoch", epoch).entered();
        let mut log = EpochLog::new(epoch);

        let mut metrics = MeanMetrics::default();
        for batch in training.epoch() {
            let Batch { images, labels } = batch?;
            let count = labels.size()[0] as usize;
            let output = model.train_step(&images.to_device(device), &labels.to_device(device))?;
            metrics.add("loss", output.loss, count);
            metrics.add("accuracy", output.accuracy, count);
        }
        log.extend_training(metrics.compute());

        if let Some(validation) = validation.as_mut() {
            let mut metrics = MeanMetrics::default();
            for batch in validation.epoch().take(options.validation_steps) {
                let Batch { images, labels } = batch?;
                let count = labels.size()[0] as usize;
                let output = model.evaluate(&images.to_device(device), &labels.to_device(device));
                metrics.add("loss", output.loss, count);
                metrics.add("accuracy", output.accuracy, count);
            }
            log.extend_validation(metrics.compute());
        }

        info!("{}", log);
        checkpoint.on_epoch_end(&log, model.var_store())?;
        history.push(log);
    }

    Ok(history)
}

/// Builds the data providers described by `config` and runs [build].
pub fn run(config: &MaskClassifierConfig) -> Result<BuildOutcome<MaskClassifierModel>> {
    let MaskClassifierConfig {
        ref output,
        ref training_dir,
        ref validation_dir,
        image_size,
        image_channels,
        batch_size,
        seed,
        ref training_augmentation,
        ref testing_augmentation,
        ..
    } = *config;

    info!("{}", version());
    tch::manual_seed(seed as i64);

    let mut training = training_generator(
        training_dir,
        image_size,
        image_channels,
        training_augmentation,
        batch_size.get(),
        seed,
    )?;
    let mut validation = validation_dir
        .as_ref()
        .map(|dir| {
            testing_generator(
                dir,
                image_size,
                image_channels,
                testing_augmentation,
                batch_size.get(),
                seed,
            )
        })
        .transpose()?;

    build(
        output,
        image_size,
        image_channels,
        &mut training,
        validation.as_mut(),
        &config.training_options(),
    )
}
