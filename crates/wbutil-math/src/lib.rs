#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! wbutil math library
//!
//! Statistics and small classifiers built on `wbutil-core`.

pub mod data;
pub mod naive_bayes;
pub mod stat;
pub mod tree;

mod proptests;

// Re-exports for convenience
pub use naive_bayes::{Domain, NaiveBayes};
pub use stat::{ConfusionMatrix, Summary, mean, median, std, variance};
pub use tree::{DecisionTree, FeatureSpec, Test, TreeParams, Value};
