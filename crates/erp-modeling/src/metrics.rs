//! Classification metrics

/// Balanced accuracy over binary labels: the mean of the per-class recall
/// rates. A class absent from `y_true` contributes a rate of 0.0.
pub fn balanced_accuracy(y_true: &[u8], y_pred: &[u8]) -> f64 {
    let mut true_pos = 0usize;
    let mut pos = 0usize;
    let mut true_neg = 0usize;
    let mut neg = 0usize;

    for (&truth, &pred) in y_true.iter().zip(y_pred) {
        if truth == 1 {
            pos += 1;
            if pred == 1 {
                true_pos += 1;
            }
        } else {
            neg += 1;
            if pred == 0 {
                true_neg += 1;
            }
        }
    }

    let tpr = if pos > 0 {
        true_pos as f64 / pos as f64
    } else {
        0.0
    };
    let tnr = if neg > 0 {
        true_neg as f64 / neg as f64
    } else {
        0.0
    };
    (tpr + tnr) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_prediction() {
        let y = [0, 1, 0, 1, 1];
        assert_eq!(balanced_accuracy(&y, &y), 1.0);
    }

    #[test]
    fn test_all_wrong() {
        let y_true = [0, 1, 0, 1];
        let y_pred = [1, 0, 1, 0];
        assert_eq!(balanced_accuracy(&y_true, &y_pred), 0.0);
    }

    #[test]
    fn test_majority_on_imbalanced_set() {
        // 4 negatives, 1 positive, constant-negative prediction:
        // TNR = 1, TPR = 0
        let y_true = [0, 0, 0, 0, 1];
        let y_pred = [0, 0, 0, 0, 0];
        assert_eq!(balanced_accuracy(&y_true, &y_pred), 0.5);
    }

    #[test]
    fn test_absent_class_rate_is_zero() {
        // Only negatives present and predicted correctly: (0 + 1) / 2
        let y_true = [0, 0, 0];
        let y_pred = [0, 0, 0];
        assert_eq!(balanced_accuracy(&y_true, &y_pred), 0.5);
    }
}
