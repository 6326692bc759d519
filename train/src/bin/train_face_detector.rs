use anyhow::Result;
use facemask_train::{config::FaceDetectorArgs, logging, train::face};
use structopt::StructOpt;
use tracing::info;

pub fn main() -> Result<()> {
    logging::init_tracing();

    // parse arguments
    let config = FaceDetectorArgs::from_args().into_config()?;
    info!("training {} face detector on '{}'", config.network, config.input.display());

    // start training program
    let run = face::run(&config)?;
    if let Some(log) = run.history.last() {
        info!("finished {}", log);
    }

    Ok(())
}
