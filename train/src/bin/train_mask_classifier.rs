use anyhow::{Context, Result};
use facemask_train::{
    config::{MaskClassifierArgs, MaskClassifierConfig},
    logging,
    train::mask,
    utils::BuildOutcome,
};
use structopt::StructOpt;
use tracing::info;

pub fn main() -> Result<()> {
    logging::init_tracing();

    // parse arguments
    let MaskClassifierArgs { config } = MaskClassifierArgs::from_args();
    let config = MaskClassifierConfig::open(&config)
        .with_context(|| format!("failed to load config file '{}'", config.display()))?;

    // start training program
    match mask::run(&config)? {
        BuildOutcome::Loaded(_) => {
            info!("loaded mask classifier from '{}'", config.output.display());
        }
        BuildOutcome::Trained { history, .. } => {
            info!(
                "trained mask classifier for {} epochs, best model at '{}'",
                history.len(),
                config.output.display()
            );
        }
    }

    Ok(())
}
