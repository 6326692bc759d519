//! Networks bundled with their parameters, losses and optimizers.

use crate::{common::*, logging, utils::Checkpointable};
use tch_modules::{binary_accuracy, categorical_accuracy, load_pretrained, DetectorLossOutput};

fn build_adam(vs: &nn::VarStore, learning_rate: f64) -> Result<nn::Optimizer> {
    ensure!(learning_rate > 0.0, "learning rate must be positive");
    let opt = nn::Adam::default().build(vs, learning_rate)?;
    Ok(opt)
}

/// Loss and accuracy of a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskStepOutput {
    pub loss: f64,
    pub accuracy: f64,
}

/// The binary mask classifier.
pub struct MaskClassifierModel {
    vs: nn::VarStore,
    net: MaskClassifier,
    loss: BceLoss,
    optimizer: Option<nn::Optimizer>,
}

impl MaskClassifierModel {
    pub fn new(image_size: usize, image_channels: usize, device: Device) -> Result<Self> {
        let vs = nn::VarStore::new(device);
        let net = MaskClassifierInit::new(image_size, image_channels).build(&vs.root())?;

        Ok(Self {
            vs,
            net,
            loss: BceLoss::new(Reduction::Mean),
            optimizer: None,
        })
    }

    /// Attaches an Adam optimizer and logs the model summary.
    pub fn prepare(&mut self, learning_rate: f64) -> Result<()> {
        self.optimizer = Some(build_adam(&self.vs, learning_rate)?);
        logging::log_summary("mask classifier", &self.vs);
        Ok(())
    }

    pub fn is_prepared(&self) -> bool {
        self.optimizer.is_some()
    }

    pub fn device(&self) -> Device {
        self.vs.device()
    }

    /// Sigmoid scores of `[batch, channels, size, size]` images.
    pub fn predict(&self, images: &Tensor) -> Tensor {
        tch::no_grad(|| self.net.forward_t(images, false))
    }

    /// Runs one optimization step on a batch.
    pub fn train_step(&mut self, images: &Tensor, labels: &Tensor) -> Result<MaskStepOutput> {
        let optimizer = self
            .optimizer
            .as_mut()
            .ok_or_else(|| format_err!("the model must be prepared before training"))?;

        let output = self.net.forward_t(images, true);
        let loss = self.loss.forward(&output, labels);
        optimizer.backward_step(&loss);

        Ok(MaskStepOutput {
            loss: f64::from(&loss),
            accuracy: binary_accuracy(&output.detach(), labels),
        })
    }

    pub fn evaluate(&self, images: &Tensor, labels: &Tensor) -> MaskStepOutput {
        tch::no_grad(|| {
            let output = self.net.forward_t(images, false);
            let loss = self.loss.forward(&output, labels);
            MaskStepOutput {
                loss: f64::from(&loss),
                accuracy: binary_accuracy(&output, labels),
            }
        })
    }
}

impl Debug for MaskClassifierModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaskClassifierModel")
            .field("net", &self.net)
            .field("prepared", &self.is_prepared())
            .finish()
    }
}

impl Checkpointable for MaskClassifierModel {
    fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    fn var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.vs
    }
}

/// Weighted total loss, per-head losses and classification accuracy of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorStepOutput {
    pub loss: f64,
    pub head_losses: BTreeMap<Head, f64>,
    pub accuracy: f64,
}

impl DetectorStepOutput {
    fn new(losses: &DetectorLossOutput, output: &DetectorOutput, targets: &HeadTargets) -> Result<Self> {
        let labels = targets
            .get(&Head::Classification)
            .ok_or_else(|| format_err!("missing target for head '{}'", Head::Classification))?;

        Ok(Self {
            loss: f64::from(&losses.total),
            head_losses: losses
                .heads
                .iter()
                .map(|(&head, loss)| (head, f64::from(loss)))
                .collect(),
            accuracy: categorical_accuracy(&output.classification.detach(), labels),
        })
    }

    /// Keyed like `loss`, `boundary_loss` and `classification_accuracy`.
    pub fn metrics(&self) -> IndexMap<String, f64> {
        let mut metrics = IndexMap::new();
        metrics.insert("loss".to_string(), self.loss);
        for (head, loss) in &self.head_losses {
            metrics.insert(format!("{}_loss", head), *loss);
        }
        metrics.insert(format!("{}_accuracy", Head::Classification), self.accuracy);
        metrics
    }
}

/// The dual-head face detector.
pub struct FaceDetectorModel {
    vs: nn::VarStore,
    net: ClassifyingDetector,
    loss: DetectorLoss,
    optimizer: Option<nn::Optimizer>,
}

impl FaceDetectorModel {
    pub fn new(
        network: Network,
        num_classes: usize,
        image_size: usize,
        image_channels: usize,
        loss: DetectorLossInit,
        device: Device,
    ) -> Result<Self> {
        let vs = nn::VarStore::new(device);
        let net = ClassifyingDetectorInit {
            input_size: image_size,
            input_channels: image_channels,
            ..ClassifyingDetectorInit::new(network, num_classes)
        }
        .build(&vs.root())?;
        let loss = loss.build()?;

        Ok(Self {
            vs,
            net,
            loss,
            optimizer: None,
        })
    }

    /// Copies pretrained weights into the backbone and freezes them.
    ///
    /// Must be called before [Self::prepare].
    pub fn load_backbone_weights<P>(&mut self, file: P) -> Result<usize>
    where
        P: AsRef<Path>,
    {
        ensure!(
            self.optimizer.is_none(),
            "backbone weights must be loaded before the model is prepared"
        );
        let file = file.as_ref();
        let copied = load_pretrained(&self.vs, "backbone", file)?;
        info!(
            "loaded {} pretrained {} tensors from '{}'",
            copied,
            self.net.network(),
            file.display()
        );
        Ok(copied)
    }

    /// Attaches an Adam optimizer and logs the model summary.
    pub fn prepare(&mut self, learning_rate: f64) -> Result<()> {
        self.optimizer = Some(build_adam(&self.vs, learning_rate)?);
        logging::log_summary(&format!("{} classifying detector", self.net.network()), &self.vs);
        Ok(())
    }

    pub fn num_classes(&self) -> usize {
        self.net.num_classes()
    }

    pub fn device(&self) -> Device {
        self.vs.device()
    }

    pub fn predict(&self, images: &Tensor) -> DetectorOutput {
        tch::no_grad(|| self.net.forward_t(images, false))
    }

    /// Runs one optimization step on a batch.
    pub fn train_step(&mut self, images: &Tensor, targets: &HeadTargets) -> Result<DetectorStepOutput> {
        let optimizer = self
            .optimizer
            .as_mut()
            .ok_or_else(|| format_err!("the model must be prepared before training"))?;

        let output = self.net.forward_t(images, true);
        let losses = self.loss.forward(&output, targets)?;
        optimizer.backward_step(&losses.total);

        DetectorStepOutput::new(&losses, &output, targets)
    }

    pub fn evaluate(&self, images: &Tensor, targets: &HeadTargets) -> Result<DetectorStepOutput> {
        tch::no_grad(|| {
            let output = self.net.forward_t(images, false);
            let losses = self.loss.forward(&output, targets)?;
            DetectorStepOutput::new(&losses, &output, targets)
        })
    }
}

impl Debug for FaceDetectorModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaceDetectorModel")
            .field("net", &self.net)
            .field("loss", &self.loss)
            .field("prepared", &self.optimizer.is_some())
            .finish()
    }
}

impl Checkpointable for FaceDetectorModel {
    fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    fn var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.vs
    }
}
