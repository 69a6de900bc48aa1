//! ERP-Modeling: Cross-validated classification over trial feature tables
//!
//! Reads the feature table back as untyped text, infers numeric feature
//! columns, and evaluates a logistic model against a majority-class baseline
//! under subject-grouped k-fold cross-validation.

pub mod crossval;
pub mod metrics;
pub mod model;

pub use crossval::{
    fold_metrics_csv, infer_feature_columns, CrossValidator, FoldRecord, ModelingSummary,
    EXCLUDED_COLUMNS,
};
pub use metrics::balanced_accuracy;
pub use model::{LogisticModel, MajorityBaseline, Predictor, StandardScaler};
