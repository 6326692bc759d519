use crate::common::*;

/// Filter counts of the stacked convolution and max-pooling blocks.
pub const MASK_CLASSIFIER_FILTERS: [usize; 4] = [64, 64, 128, 128];

/// The binary mask/no-mask classifier network.
#[derive(Debug, Clone)]
pub struct MaskClassifierInit {
    pub input_size: usize,
    pub input_channels: usize,
    pub filters: Vec<usize>,
    pub kernel_size: usize,
    pub dropout: f64,
    pub hidden: usize,
    pub outputs: usize,
}

impl MaskClassifierInit {
    pub fn new(input_size: usize, input_channels: usize) -> Self {
        Self {
            input_size,
            input_channels,
            filters: MASK_CLASSIFIER_FILTERS.to_vec(),
            kernel_size: 3,
            dropout: 0.5,
            hidden: 512,
            outputs: 1,
        }
    }

    /// Spatial side length after all convolution and pooling blocks.
    pub fn feature_size(&self) -> Result<usize> {
        let Self {
            input_size,
            kernel_size,
            ref filters,
            ..
        } = *self;

        filters.iter().try_fold(input_size, |size, _| {
            ensure!(
                size >= kernel_size,
                "input size {} is too small for {} convolution blocks",
                input_size,
                filters.len()
            );
            let size = (size - kernel_size + 1) / 2;
            ensure!(
                size > 0,
                "input size {} is too small for {} convolution blocks",
                input_size,
                filters.len()
            );
            Ok(size)
        })
    }

    pub fn build<'p, P>(self, path: P) -> Result<MaskClassifier>
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let feature_size = self.feature_size()?;

        let Self {
            input_channels,
            filters,
            kernel_size,
            dropout,
            hidden,
            outputs,
            ..
        } = self;

        ensure!(input_channels > 0, "input_channels must be positive");
        ensure!(
            (0.0..1.0).contains(&dropout),
            "dropout must be in range of [0, 1)"
        );

        let convs: Vec<_> = filters
            .iter()
            .scan(input_channels, |in_c, &out_c| {
                let in_c = std::mem::replace(in_c, out_c);
                Some((in_c, out_c))
            })
            .enumerate()
            .map(|(index, (in_c, out_c))| {
                nn::conv2d(
                    path / format!("conv{}", index),
                    in_c as i64,
                    out_c as i64,
                    kernel_size as i64,
                    Default::default(),
                )
            })
            .collect();

        let last_c = *filters.last().unwrap_or(&input_channels);
        let flat_size = last_c * feature_size * feature_size;
        let hidden_fc = nn::linear(
            path / "fc1",
            flat_size as i64,
            hidden as i64,
            Default::default(),
        );
        let output_fc = nn::linear(path / "fc2", hidden as i64, outputs as i64, Default::default());

        Ok(MaskClassifier {
            convs,
            dropout,
            hidden_fc,
            output_fc,
        })
    }
}

#[derive(Debug)]
pub struct MaskClassifier {
    convs: Vec<nn::Conv2D>,
    dropout: f64,
    hidden_fc: nn::Linear,
    output_fc: nn::Linear,
}

impl nn::ModuleT for MaskClassifier {
    /// Maps `[batch, channels, size, size]` images to `[batch, outputs]` sigmoid scores.
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let Self {
            ref convs,
            dropout,
            ref hidden_fc,
            ref output_fc,
        } = *self;

        let xs = convs.iter().fold(xs.shallow_clone(), |xs, conv| {
            xs.apply(conv).relu().max_pool2d_default(2)
        });

        xs.dropout(dropout, train)
            .flat_view()
            .apply(hidden_fc)
            .relu()
            .apply(output_fc)
            .sigmoid()
    }
}
