//! Classifiers for the binary trial-labeling task
//!
//! A logistic model trained by full-batch gradient descent with class-balanced
//! sample weights, plus the majority-class baseline it is compared against.
//! Inputs are standardized inside the model so callers pass raw feature rows.

use crate::metrics;
use erp_core::{modeling_error, ErpResult, ModelingConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const LEARNING_RATE: f64 = 0.1;
const STD_EPSILON: f64 = 1e-12;

/// Per-column standardization fitted on training data
#[derive(Debug, Clone)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit column means and population stds; a near-zero std is replaced
    /// by 1.0 so constant columns pass through centered.
    pub fn fit(rows: &[Vec<f64>]) -> ErpResult<Self> {
        let n_rows = rows.len();
        if n_rows == 0 {
            return Err(modeling_error!("cannot fit scaler on an empty matrix"));
        }
        let n_cols = rows[0].len();

        let mut means = vec![0.0; n_cols];
        for row in rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        for mean in &mut means {
            *mean /= n_rows as f64;
        }

        let mut stds = vec![0.0; n_cols];
        for row in rows {
            for ((std, value), mean) in stds.iter_mut().zip(row).zip(&means) {
                *std += (value - mean).powi(2);
            }
        }
        for std in &mut stds {
            *std = (*std / n_rows as f64).sqrt();
            if *std < STD_EPSILON {
                *std = 1.0;
            }
        }

        Ok(StandardScaler { means, stds })
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(&self.means)
            .zip(&self.stds)
            .map(|((value, mean), std)| (value - mean) / std)
            .collect()
    }
}

/// A fitted binary classifier over numeric feature rows
pub trait Predictor {
    fn fit(&mut self, rows: &[Vec<f64>], labels: &[u8]) -> ErpResult<()>;
    fn predict(&self, rows: &[Vec<f64>]) -> Vec<u8>;
    fn name(&self) -> &'static str;

    /// Balanced accuracy of this predictor on a held-out set
    fn score(&self, rows: &[Vec<f64>], labels: &[u8]) -> f64 {
        metrics::balanced_accuracy(labels, &self.predict(rows))
    }
}

/// L2-regularized logistic regression with class-balanced sample weights
#[derive(Debug, Clone)]
pub struct LogisticModel {
    l2_penalty: f64,
    max_iterations: usize,
    seed: u64,
    scaler: Option<StandardScaler>,
    weights: Vec<f64>,
    bias: f64,
}

impl LogisticModel {
    pub fn new(config: &ModelingConfig) -> Self {
        LogisticModel {
            l2_penalty: config.l2_penalty,
            max_iterations: config.max_iterations,
            seed: config.random_seed,
            scaler: None,
            weights: Vec::new(),
            bias: 0.0,
        }
    }

    fn decision(&self, row: &[f64]) -> f64 {
        let z: f64 = self
            .weights
            .iter()
            .zip(row)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias;
        sigmoid(z)
    }
}

impl Predictor for LogisticModel {
    fn fit(&mut self, rows: &[Vec<f64>], labels: &[u8]) -> ErpResult<()> {
        if rows.is_empty() || rows[0].is_empty() {
            return Err(modeling_error!("cannot train on an empty matrix"));
        }
        let n_pos = labels.iter().filter(|&&y| y == 1).count();
        let n_neg = labels.len() - n_pos;
        if n_pos == 0 || n_neg == 0 {
            return Err(modeling_error!(
                "training partition contains a single class ({} positive of {} rows)",
                n_pos,
                labels.len()
            ));
        }

        let scaler = StandardScaler::fit(rows)?;
        let scaled: Vec<Vec<f64>> = rows.iter().map(|row| scaler.transform(row)).collect();
        self.scaler = Some(scaler);

        // Balanced class weights: n / (2 * n_c)
        let n = labels.len() as f64;
        let weight_pos = n / (2.0 * n_pos as f64);
        let weight_neg = n / (2.0 * n_neg as f64);

        let n_cols = scaled[0].len();
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.weights = (0..n_cols).map(|_| rng.gen_range(-0.01..0.01)).collect();
        self.bias = 0.0;

        for _ in 0..self.max_iterations {
            let mut grad_w = vec![0.0; n_cols];
            let mut grad_b = 0.0;

            for (row, &label) in scaled.iter().zip(labels) {
                let sample_weight = if label == 1 { weight_pos } else { weight_neg };
                let error = sample_weight * (self.decision(row) - label as f64);
                for (g, x) in grad_w.iter_mut().zip(row) {
                    *g += error * x;
                }
                grad_b += error;
            }

            for (w, g) in self.weights.iter_mut().zip(&grad_w) {
                *w -= LEARNING_RATE * (g / n + self.l2_penalty * *w);
            }
            self.bias -= LEARNING_RATE * grad_b / n;
        }

        Ok(())
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Vec<u8> {
        let scaler = match &self.scaler {
            Some(scaler) => scaler,
            None => return vec![0; rows.len()],
        };
        rows.iter()
            .map(|row| u8::from(self.decision(&scaler.transform(row)) >= 0.5))
            .collect()
    }

    fn name(&self) -> &'static str {
        "logistic"
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Constant predictor emitting the most frequent training label.
/// Ties resolve to the negative class.
#[derive(Debug, Clone, Default)]
pub struct MajorityBaseline {
    majority: u8,
}

impl Predictor for MajorityBaseline {
    fn fit(&mut self, _rows: &[Vec<f64>], labels: &[u8]) -> ErpResult<()> {
        if labels.is_empty() {
            return Err(modeling_error!("cannot fit baseline on empty labels"));
        }
        let n_pos = labels.iter().filter(|&&y| y == 1).count();
        self.majority = u8::from(n_pos * 2 > labels.len());
        Ok(())
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Vec<u8> {
        vec![self.majority; rows.len()]
    }

    fn name(&self) -> &'static str {
        "majority"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_model() -> LogisticModel {
        LogisticModel::new(&ModelingConfig {
            n_splits: 5,
            random_seed: 42,
            l2_penalty: 1e-3,
            max_iterations: 500,
        })
    }

    /// Linearly separable cloud around x = ±2
    fn separable_data() -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            let jitter = (i as f64) * 0.01;
            rows.push(vec![-2.0 + jitter, 1.0]);
            labels.push(0);
            rows.push(vec![2.0 - jitter, 1.0]);
            labels.push(1);
        }
        (rows, labels)
    }

    #[test]
    fn test_scaler_moments() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0], vec![5.0, 10.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();

        let scaled: Vec<Vec<f64>> = rows.iter().map(|r| scaler.transform(r)).collect();
        let mean0: f64 = scaled.iter().map(|r| r[0]).sum::<f64>() / 3.0;
        assert!(mean0.abs() < 1e-12);
        // Constant column is centered, not inflated
        assert!(scaled.iter().all(|r| r[1] == 0.0));
    }

    #[test]
    fn test_logistic_separates_clean_data() {
        let (rows, labels) = separable_data();
        let mut model = default_model();
        model.fit(&rows, &labels).unwrap();
        assert_eq!(model.predict(&rows), labels);
        assert_eq!(model.score(&rows, &labels), 1.0);
    }

    #[test]
    fn test_logistic_is_deterministic() {
        let (rows, labels) = separable_data();
        let mut a = default_model();
        let mut b = default_model();
        a.fit(&rows, &labels).unwrap();
        b.fit(&rows, &labels).unwrap();
        assert_eq!(a.weights, b.weights);
        assert_eq!(a.bias, b.bias);
    }

    #[test]
    fn test_single_class_training_rejected() {
        let rows = vec![vec![1.0], vec![2.0]];
        let mut model = default_model();
        assert!(model.fit(&rows, &[1, 1]).is_err());
    }

    #[test]
    fn test_majority_baseline() {
        let rows = vec![vec![0.0]; 5];
        let mut baseline = MajorityBaseline::default();
        baseline.fit(&rows, &[0, 0, 0, 1, 1]).unwrap();
        assert_eq!(baseline.predict(&rows), vec![0; 5]);

        // Tie resolves to the negative class
        baseline.fit(&rows[..4], &[0, 0, 1, 1]).unwrap();
        assert_eq!(baseline.predict(&rows[..2]), vec![0, 0]);
    }
}
