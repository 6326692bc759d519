use crate::common::*;

/// Width of the feature vector every backbone produces.
pub const BACKBONE_FEATURES: usize = 512;

/// Input sizes accepted by networks whose classifier expects a 7x7 feature map.
const FIXED_INPUT_SIZES: RangeInclusive<usize> = 224..=255;
/// Smallest input size accepted by globally pooled networks.
const MIN_POOLED_INPUT_SIZE: usize = 32;

/// The feature extraction network shared by the detector heads.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    EnumString,
    EnumVariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Network {
    Vgg16,
    Vgg19,
    ResNet18,
    ResNet50,
    MobileNetV2,
    DenseNet121,
}

impl Network {
    /// Looks up a network by name, rejecting unknown names.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::from_str(name).map_err(|_| {
            format_err!(
                "unknown network '{}', expect one of {}",
                name,
                Self::VARIANTS.join(", ")
            )
        })
    }

    /// Checks that square `size` x `size` images with `channels` channels fit the network.
    pub fn check_input(self, size: usize, channels: usize) -> Result<()> {
        ensure!(
            channels == 3,
            "network '{}' expects 3 input channels, but get {}",
            self,
            channels
        );

        match self {
            Self::Vgg16 | Self::Vgg19 | Self::DenseNet121 => ensure!(
                FIXED_INPUT_SIZES.contains(&size),
                "network '{}' expects an image size in {}..={}, but get {}",
                self,
                FIXED_INPUT_SIZES.start(),
                FIXED_INPUT_SIZES.end(),
                size
            ),
            Self::ResNet18 | Self::ResNet50 | Self::MobileNetV2 => ensure!(
                size >= MIN_POOLED_INPUT_SIZE,
                "network '{}' expects an image size of at least {}, but get {}",
                self,
                MIN_POOLED_INPUT_SIZE,
                size
            ),
        }

        Ok(())
    }

    /// Builds the network under `path`, emitting `features` values per image.
    pub fn build<'p, P>(self, path: P, features: usize) -> Box<dyn nn::ModuleT>
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let features = features as i64;

        match self {
            Self::Vgg16 => Box::new(vision::vgg::vgg16(path, features)),
            Self::Vgg19 => Box::new(vision::vgg::vgg19(path, features)),
            Self::ResNet18 => Box::new(vision::resnet::resnet18(path, features)),
            Self::ResNet50 => Box::new(vision::resnet::resnet50(path, features)),
            Self::MobileNetV2 => Box::new(vision::mobilenet::v2(path, features)),
            Self::DenseNet121 => Box::new(vision::densenet::densenet121(path, features)),
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::Vgg16
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Copies pretrained weights into the variables under `prefix` and freezes them.
///
/// Tensors are matched by name relative to `prefix`. Tensors whose shape
/// differs, such as the replaced final layer, keep their initial values and
/// stay trainable. Returns the number of copied tensors.
pub fn load_pretrained<P>(vs: &nn::VarStore, prefix: &str, file: P) -> Result<usize>
where
    P: AsRef<Path>,
{
    let file = file.as_ref();
    let pretrained = Tensor::load_multi(file)
        .with_context(|| format!("failed to load pretrained weights '{}'", file.display()))?;
    let mut variables = vs.variables();

    let copied = tch::no_grad(|| {
        pretrained
            .into_iter()
            .filter_map(|(name, src)| {
                let var = variables.get_mut(&format!("{}.{}", prefix, name))?;
                (var.size() == src.size()).then(|| {
                    var.copy_(&src);
                    let _ = var.set_requires_grad(false);
                })
            })
            .count()
    });

    ensure!(
        copied > 0,
        "no tensor in '{}' matches the '{}' variables",
        file.display(),
        prefix
    );
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_names() -> Result<()> {
        assert_eq!(Network::from_name("vgg16")?, Network::Vgg16);
        assert_eq!(Network::from_name("resnet50")?, Network::ResNet50);
        assert_eq!(Network::from_name("mobilenetv2")?, Network::MobileNetV2);
        assert_eq!(Network::default().to_string(), "vgg16");
        Ok(())
    }

    #[test]
    fn unknown_network_is_rejected() {
        let err = Network::from_name("alexnet").unwrap_err();
        let msg = format!("{}", err);
        assert!(msg.contains("alexnet"));
        assert!(msg.contains("vgg16"));
    }

    #[test]
    fn input_shape_checks() {
        assert!(Network::Vgg16.check_input(224, 3).is_ok());
        assert!(Network::Vgg19.check_input(255, 3).is_ok());
        assert!(Network::DenseNet121.check_input(224, 3).is_ok());
        assert!(Network::ResNet18.check_input(32, 3).is_ok());
        assert!(Network::MobileNetV2.check_input(128, 3).is_ok());

        let err = Network::Vgg16.check_input(128, 3).unwrap_err();
        assert!(format!("{}", err).contains("224..=255"));
        assert!(Network::Vgg19.check_input(256, 3).is_err());
        assert!(Network::DenseNet121.check_input(64, 3).is_err());
        assert!(Network::ResNet50.check_input(16, 3).is_err());

        for network in [Network::Vgg16, Network::ResNet18, Network::MobileNetV2] {
            assert!(network.check_input(224, 1).is_err());
        }
    }

    #[test]
    fn resnet18_features() {
        let vs = nn::VarStore::new(Device::Cpu);
        let backbone = Network::ResNet18.build(&vs.root() / "backbone", BACKBONE_FEATURES);
        let input = Tensor::rand(&[1, 3, 64, 64], (Kind::Float, Device::Cpu));
        let output = backbone.forward_t(&input, false);
        assert_eq!(output.size(), [1, BACKBONE_FEATURES as i64]);
    }

    #[test]
    fn pretrained_weights_are_copied_and_frozen() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("resnet18.ot");

        // pretrained file with a different final layer width
        let src_vs = nn::VarStore::new(Device::Cpu);
        let _ = Network::ResNet18.build(&src_vs.root(), 1000);
        src_vs.save(&file)?;

        let vs = nn::VarStore::new(Device::Cpu);
        let _ = Network::ResNet18.build(&vs.root() / "backbone", BACKBONE_FEATURES);
        let copied = load_pretrained(&vs, "backbone", &file)?;

        let variables = vs.variables();
        let src_variables = src_vs.variables();
        assert_eq!(copied, src_variables.len() - 2);
        assert!(variables["backbone.conv1.weight"].equal(&src_variables["conv1.weight"]));
        assert!(!variables["backbone.conv1.weight"].requires_grad());
        assert!(variables["backbone.fc.weight"].requires_grad());
        Ok(())
    }
}
