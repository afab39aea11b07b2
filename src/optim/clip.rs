//! Gradient clipping

use crate::Tensor;
use std::collections::HashSet;

/// Rescale gradients so their global L2 norm is at most `max_norm`
///
/// Returns the norm measured before clipping. Parameters without a
/// gradient buffer are ignored, and a tensor listed more than once counts
/// once.
pub fn clip_grad_norm(params: &[Tensor], max_norm: f32) -> f32 {
    let mut seen = HashSet::new();
    let params: Vec<&Tensor> = params.iter().filter(|p| seen.insert(p.id())).collect();

    let total_norm = params
        .iter()
        .filter_map(|param| param.grad())
        .map(|grad| grad.iter().map(|g| g * g).sum::<f32>())
        .sum::<f32>()
        .sqrt();

    if total_norm > max_norm {
        let scale = max_norm / (total_norm + 1e-6);
        for param in params {
            param.scale_grad(scale);
        }
        tracing::debug!(total_norm, max_norm, "clipped gradients");
    }

    total_norm
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    #[test]
    fn test_clip_rescales_to_max_norm() {
        let a = Tensor::from_vec(vec![0.0, 0.0], true);
        let b = Tensor::from_vec(vec![0.0], true);
        a.set_grad(arr1(&[3.0, 0.0]).into_dyn()).unwrap();
        b.set_grad(arr1(&[4.0]).into_dyn()).unwrap();

        let norm = clip_grad_norm(&[a.clone(), b.clone()], 1.0);
        assert_abs_diff_eq!(norm, 5.0);

        let ga = a.grad().unwrap();
        let gb = b.grad().unwrap();
        let clipped = (ga[0] * ga[0] + gb[0] * gb[0]).sqrt();
        assert_abs_diff_eq!(clipped, 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(ga[0] / gb[0], 0.75, epsilon = 1e-6);
    }

    #[test]
    fn test_clip_counts_repeated_handle_once() {
        let a = Tensor::from_vec(vec![0.0, 0.0], true);
        a.set_grad(arr1(&[3.0, 4.0]).into_dyn()).unwrap();

        let norm = clip_grad_norm(&[a.clone(), a.clone()], 1.0);
        assert_abs_diff_eq!(norm, 5.0, epsilon = 1e-6);

        let grad = a.grad().unwrap();
        assert_abs_diff_eq!(grad[0], 0.6, epsilon = 1e-5);
        assert_abs_diff_eq!(grad[1], 0.8, epsilon = 1e-5);
    }

    #[test]
    fn test_clip_leaves_small_gradients() {
        let a = Tensor::from_vec(vec![0.0, 0.0], true);
        a.set_grad(arr1(&[0.3, 0.4]).into_dyn()).unwrap();

        let norm = clip_grad_norm(&[a.clone()], 1.0);
        assert_abs_diff_eq!(norm, 0.5, epsilon = 1e-6);
        assert_eq!(a.grad().unwrap(), arr1(&[0.3, 0.4]).into_dyn());
    }

    #[test]
    fn test_clip_without_grads() {
        let a = Tensor::from_vec(vec![1.0], true);
        assert_abs_diff_eq!(clip_grad_norm(&[a.clone()], 1.0), 0.0);
        assert!(a.grad().is_none());
    }
}
