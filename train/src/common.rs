//! Common imports from external crates.

pub use anyhow::{bail, ensure, format_err, Context, Result};
pub use bbox::{prelude::*, HW, TLBR};
pub use image::{imageops::FilterType, DynamicImage};
pub use indexmap::{IndexMap, IndexSet};
pub use itertools::Itertools;
pub use label::{Label, LabelEncoder};
pub use noisy_float::prelude::*;
pub use rand::{prelude::*, rngs::StdRng, seq::SliceRandom};
pub use serde::{Deserialize, Serialize};
pub use std::{
    collections::BTreeMap,
    fmt::{self, Debug, Display, Formatter},
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};
pub use structopt::StructOpt;
pub use tch::{
    nn::{self, ModuleT as _, OptimizerConfig as _},
    Device, IndexOp, Kind, Reduction, Tensor,
};
pub use tch_modules::{
    BceLoss, ClassifyingDetector, ClassifyingDetectorInit, DetectorLoss, DetectorLossInit,
    DetectorOutput, Head, HeadTargets, MaskClassifier, MaskClassifierInit, Network,
};
pub use tracing::{debug, info, info_span, warn};
