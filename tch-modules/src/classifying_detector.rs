use crate::{
    backbone::{Network, BACKBONE_FEATURES},
    bce_loss::BceLoss,
    common::*,
    cross_entropy::CrossEntropyLoss,
    l2_loss::L2Loss,
};
use std::collections::BTreeMap;

/// Name of the bounding box regression head.
pub const BOUNDARY_HEAD: &str = "boundary";
/// Name of the class prediction head.
pub const CLASSIFICATION_HEAD: &str = "classification";

/// The output branches of the classifying detector.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Head {
    Boundary,
    Classification,
}

impl Head {
    pub const ALL: [Head; 2] = [Head::Boundary, Head::Classification];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Boundary => BOUNDARY_HEAD,
            Self::Classification => CLASSIFICATION_HEAD,
        }
    }
}

impl Display for Head {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-head training targets.
pub type HeadTargets = BTreeMap<Head, Tensor>;

/// A backbone shared by a bounding box regressor and a multi-class classifier.
#[derive(Debug, Clone)]
pub struct ClassifyingDetectorInit {
    pub network: Network,
    pub num_classes: usize,
    /// Side length of the square input images.
    pub input_size: usize,
    pub input_channels: usize,
    pub features: usize,
    pub boundary_hidden: Vec<usize>,
    pub classification_hidden: Vec<usize>,
    pub dropout: f64,
}

impl ClassifyingDetectorInit {
    pub fn new(network: Network, num_classes: usize) -> Self {
        Self {
            network,
            num_classes,
            input_size: 224,
            input_channels: 3,
            features: BACKBONE_FEATURES,
            boundary_hidden: vec![128, 64, 32],
            classification_hidden: vec![512, 512],
            dropout: 0.5,
        }
    }

    pub fn build<'p, P>(self, path: P) -> Result<ClassifyingDetector>
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self {
            network,
            num_classes,
            input_size,
            input_channels,
            features,
            boundary_hidden,
            classification_hidden,
            dropout,
        } = self;

        ensure!(num_classes > 0, "num_classes must be positive");
        ensure!(features > 0, "features must be positive");
        network.check_input(input_size, input_channels)?;

        let backbone = network.build(path / "backbone", features);

        let boundary = {
            let path = path / BOUNDARY_HEAD;
            let (seq, in_c) = boundary_hidden.iter().enumerate().fold(
                (nn::seq_t(), features),
                |(seq, in_c), (index, &out_c)| {
                    let fc = nn::linear(
                        &path / format!("fc{}", index),
                        in_c as i64,
                        out_c as i64,
                        Default::default(),
                    );
                    (seq.add(fc).add_fn(|xs| xs.relu()), out_c)
                },
            );
            seq.add(nn::linear(&path / "output", in_c as i64, 4, Default::default()))
                .add_fn(|xs| xs.sigmoid())
        };

        let classification = {
            let path = path / CLASSIFICATION_HEAD;
            let (seq, in_c) = classification_hidden.iter().enumerate().fold(
                (nn::seq_t(), features),
                |(seq, in_c), (index, &out_c)| {
                    let fc = nn::linear(
                        &path / format!("fc{}", index),
                        in_c as i64,
                        out_c as i64,
                        Default::default(),
                    );
                    let seq = seq
                        .add(fc)
                        .add_fn(|xs| xs.relu())
                        .add_fn_t(move |xs, train| xs.dropout(dropout, train));
                    (seq, out_c)
                },
            );
            seq.add(nn::linear(
                &path / "output",
                in_c as i64,
                num_classes as i64,
                Default::default(),
            ))
        };

        Ok(ClassifyingDetector {
            network,
            num_classes,
            backbone,
            boundary,
            classification,
        })
    }
}

#[derive(Debug)]
pub struct ClassifyingDetector {
    network: Network,
    num_classes: usize,
    backbone: Box<dyn nn::ModuleT>,
    boundary: nn::SequentialT,
    classification: nn::SequentialT,
}

impl ClassifyingDetector {
    pub fn network(&self) -> Network {
        self.network
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Runs both heads on `[batch, 3, h, w]` images.
    pub fn forward_t(&self, xs: &Tensor, train: bool) -> DetectorOutput {
        let features = self.backbone.forward_t(xs, train).relu();
        let boundary = self.boundary.forward_t(&features, train);
        let classification = self.classification.forward_t(&features, train);

        DetectorOutput {
            boundary,
            classification,
        }
    }
}

/// The outputs of [ClassifyingDetector].
#[derive(Debug)]
pub struct DetectorOutput {
    /// `[batch, 4]` boxes in `[xmin, ymin, xmax, ymax]` ratio units.
    pub boundary: Tensor,
    /// `[batch, num_classes]` class logits.
    pub classification: Tensor,
}

impl DetectorOutput {
    pub fn head(&self, head: Head) -> &Tensor {
        match head {
            Head::Boundary => &self.boundary,
            Head::Classification => &self.classification,
        }
    }
}

/// Loss function applied to a single head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadLoss {
    MeanSquaredError,
    BinaryCrossentropy,
    CategoricalCrossentropy,
}

impl HeadLoss {
    fn forward(&self, input: &Tensor, target: &Tensor) -> Tensor {
        match self {
            Self::MeanSquaredError => L2Loss::new(Reduction::Mean).forward(input, target),
            Self::BinaryCrossentropy => BceLoss::new(Reduction::Mean).forward(input, target),
            Self::CategoricalCrossentropy => {
                CrossEntropyLoss::new(false, Reduction::Mean).forward(input, target)
            }
        }
    }
}

/// Per-head loss functions and their weighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorLossInit {
    pub losses: BTreeMap<Head, HeadLoss>,
    pub weights: BTreeMap<Head, R64>,
}

impl Default for DetectorLossInit {
    fn default() -> Self {
        Self {
            losses: [
                (Head::Boundary, HeadLoss::MeanSquaredError),
                (Head::Classification, HeadLoss::CategoricalCrossentropy),
            ]
            .into_iter()
            .collect(),
            weights: [(Head::Boundary, r64(1.0)), (Head::Classification, r64(1.0))]
                .into_iter()
                .collect(),
        }
    }
}

impl DetectorLossInit {
    pub fn build(self) -> Result<DetectorLoss> {
        let Self { losses, weights } = self;

        let heads: BTreeMap<_, _> = Head::ALL
            .iter()
            .map(|&head| -> Result<_> {
                let loss = *losses
                    .get(&head)
                    .ok_or_else(|| format_err!("missing loss function for head '{}'", head))?;
                let weight = weights.get(&head).map(|weight| weight.raw()).unwrap_or(1.0);
                ensure!(weight >= 0.0, "loss weight of head '{}' must be non-negative", head);
                Ok((head, (loss, weight)))
            })
            .try_collect()?;

        Ok(DetectorLoss { heads })
    }
}

#[derive(Debug)]
pub struct DetectorLoss {
    heads: BTreeMap<Head, (HeadLoss, f64)>,
}

/// The weighted total and the unweighted per-head losses.
#[derive(Debug)]
pub struct DetectorLossOutput {
    pub total: Tensor,
    pub heads: BTreeMap<Head, Tensor>,
}

impl DetectorLoss {
    pub fn forward(
        &self,
        output: &DetectorOutput,
        targets: &HeadTargets,
    ) -> Result<DetectorLossOutput> {
        let heads: BTreeMap<_, _> = self
            .heads
            .iter()
            .map(|(&head, &(loss_fn, _))| -> Result<_> {
                let target = targets
                    .get(&head)
                    .ok_or_else(|| format_err!("missing target for head '{}'", head))?;
                Ok((head, loss_fn.forward(output.head(head), target)))
            })
            .try_collect()?;

        let total = self
            .heads
            .iter()
            .map(|(head, &(_, weight))| &heads[head] * weight)
            .reduce(|lhs, rhs| lhs + rhs)
            .ok_or_else(|| format_err!("no head to compute loss"))?;

        Ok(DetectorLossOutput { total, heads })
    }
}
