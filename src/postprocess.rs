use ndarray::Array1;
use ordered_float::OrderedFloat;

/// Applies softmax to a 1D array (slice) and returns a new Array1<f32>.
pub fn softmax(slice: &Array1<f32>) -> Array1<f32> {
    let max_val = slice.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exp_vals: Array1<f32> = slice.mapv(|x| (x - max_val).exp());
    let sum_exp: f32 = exp_vals.sum();
    exp_vals.mapv(|v| v / sum_exp)
}

/// Index and value of the largest entry; the first one wins a tie.
pub fn argmax_and_max(values: &Array1<f32>) -> (usize, f32) {
    values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(max_idx, max_val), (i, &val)| {
            if val > max_val { (i, val) } else { (max_idx, max_val) }
        })
}

/// Turn raw model output into a probability distribution.
///
/// Classifier heads usually end in a softmax already; their output is passed
/// through. Anything else is treated as logits.
pub fn to_probabilities(output: &Array1<f32>) -> Array1<f32> {
    let in_unit_range = output.iter().all(|&v| (0.0..=1.0).contains(&v));
    let sums_to_one = (output.sum() - 1.0).abs() < 1e-3;
    if in_unit_range && sums_to_one {
        output.clone()
    } else {
        softmax(output)
    }
}

/// The `k` most probable class indices, highest first. Equal probabilities
/// keep index order.
pub fn top_k(probabilities: &Array1<f32>, k: usize) -> Vec<(usize, f32)> {
    let mut indexed: Vec<(usize, f32)> = probabilities.iter().copied().enumerate().collect();
    indexed.sort_by_key(|&(_, p)| std::cmp::Reverse(OrderedFloat(p)));
    indexed.truncate(k);
    indexed
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&array![1.0, 2.0, 3.0, -4.0]);
        assert_relative_eq!(probs.sum(), 1.0, epsilon = 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_argmax_tie_picks_first() {
        assert_eq!(argmax_and_max(&array![0.1, 0.4, 0.4, 0.1]), (1, 0.4));
    }

    #[test]
    fn test_probabilities_pass_through() {
        let probs = array![0.1, 0.7, 0.2];
        assert_eq!(to_probabilities(&probs), probs);

        let logits = array![2.0, -1.0, 0.5];
        let converted = to_probabilities(&logits);
        assert_relative_eq!(converted.sum(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_top_k_orders_descending() {
        let ranked = top_k(&array![0.1, 0.5, 0.3, 0.1], 3);
        assert_eq!(ranked, vec![(1, 0.5), (2, 0.3), (0, 0.1)]);
    }
}
