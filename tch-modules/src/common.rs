pub use anyhow::{bail, ensure, format_err, Context, Result};
pub use itertools::Itertools;
pub use noisy_float::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::{
    borrow::Borrow,
    fmt::{self, Display, Formatter},
    ops::RangeInclusive,
    path::Path,
    str::FromStr,
};
pub use strum::{AsRefStr, EnumString, EnumVariantNames, VariantNames};
pub use tch::{
    nn::{self, Module as _, ModuleT as _, OptimizerConfig as _},
    vision, Device, IndexOp, Kind, Reduction, Tensor,
};
