use crate::common::*;

/// Fraction of sigmoid outputs that fall on the target side of `0.5`.
pub fn binary_accuracy(input: &Tensor, target: &Tensor) -> f64 {
    if input.numel() == 0 {
        return 0.0;
    }
    let predicted = input.gt(0.5).to_kind(Kind::Float);
    f64::from(predicted.eq_tensor(target).to_kind(Kind::Float).mean(Kind::Float))
}

/// Fraction of rows whose highest score matches the one-hot target.
pub fn categorical_accuracy(input: &Tensor, target: &Tensor) -> f64 {
    if input.numel() == 0 {
        return 0.0;
    }
    let (_, predicted) = input.max_dim(-1, false);
    let (_, expected) = target.max_dim(-1, false);
    f64::from(predicted.eq_tensor(&expected).to_kind(Kind::Float).mean(Kind::Float))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn binary_accuracy_thresholds_at_half() {
        let input = Tensor::of_slice(&[0.9f32, 0.2, 0.6, 0.4]).view([4, 1]);
        let target = Tensor::of_slice(&[1f32, 0.0, 0.0, 0.0]).view([4, 1]);
        assert_abs_diff_eq!(binary_accuracy(&input, &target), 0.75, epsilon = 1e-6);
    }

    #[test]
    fn categorical_accuracy_uses_argmax() {
        let input = Tensor::of_slice(&[3.0f32, 1.0, 0.0, 5.0]).view([2, 2]);
        let target = Tensor::of_slice(&[1f32, 0.0, 1.0, 0.0]).view([2, 2]);
        assert_abs_diff_eq!(categorical_accuracy(&input, &target), 0.5, epsilon = 1e-6);
    }
}
