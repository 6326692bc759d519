use crate::common::*;

/// Clipping bound applied to probabilities before taking logarithms.
pub const PROBABILITY_EPSILON: f64 = 1e-7;

/// Binary cross entropy on sigmoid probabilities.
#[derive(Debug)]
pub struct BceLoss {
    reduction: Reduction,
}

impl BceLoss {
    pub fn new(reduction: Reduction) -> Self {
        Self { reduction }
    }

    pub fn forward(&self, input: &Tensor, target: &Tensor) -> Tensor {
        // assume [batch_size, n_outputs] shape
        debug_assert_eq!(
            input.size2().unwrap(),
            target.size2().unwrap(),
            "input and target tensors must have equal shape"
        );
        debug_assert!(
            bool::from(target.ge(0.0).logical_and(&target.le(1.0)).all()),
            "target values must be in range of [0.0, 1.0]"
        );

        // return zero tensor if (1) input is empty and (2) using mean reduction
        if input.numel() == 0 && self.reduction == Reduction::Mean {
            return Tensor::zeros(&[], (Kind::Float, input.device())).set_requires_grad(false);
        }

        let input = input.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
        input.binary_cross_entropy::<Tensor>(target, None, self.reduction)
    }
}
