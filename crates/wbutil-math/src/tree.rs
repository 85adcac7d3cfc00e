//! Decision trees that branch on information gain.
//!
//! Discrete features branch once per observed value. Continuous features
//! branch in two at the observed value that maximizes information gain.
//! The label is always the last column and is always discrete.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write as _};
use std::path::Path;

use serde::{Deserialize, Serialize};
use wbutil_core::{Error, Result};

use crate::data;

// ============================================================================
// Features, values and tests
// ============================================================================

/// A named column, flagged when its cells are real numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    /// Column name
    pub name: String,
    /// Whether cells parse as `f64`
    pub continuous: bool,
}

impl FeatureSpec {
    /// A categorical feature.
    pub fn discrete(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            continuous: false,
        }
    }

    /// A real-valued feature.
    pub fn continuous(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            continuous: true,
        }
    }

    fn parse(&self, cell: &str) -> Result<Value> {
        if self.continuous {
            cell.trim()
                .parse::<f64>()
                .map(Value::Continuous)
                .map_err(|e| Error::parse(cell, format!("{} is continuous: {e}", self.name)))
        } else {
            Ok(Value::Discrete(cell.to_string()))
        }
    }
}

impl From<&str> for FeatureSpec {
    fn from(name: &str) -> Self {
        Self::discrete(name)
    }
}

/// A parsed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Categorical value
    Discrete(String),
    /// Real value
    Continuous(f64),
}

/// Predicate guarding a branch.
#[derive(Debug, Clone, PartialEq)]
pub enum Test {
    /// Cell equals the value
    Equals(String),
    /// Cell is strictly greater than the split point
    Greater(f64),
    /// Cell is less than or equal to the split point
    AtMost(f64),
}

impl Test {
    /// Whether `value` passes this test.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Test::Equals(expected), Value::Discrete(v)) => expected == v,
            (Test::Greater(split), Value::Continuous(v)) => v > split,
            (Test::AtMost(split), Value::Continuous(v)) => v <= split,
            _ => false,
        }
    }
}

impl fmt::Display for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Test::Equals(v) => write!(f, "= {v}"),
            Test::Greater(split) => write!(f, "> {split}"),
            Test::AtMost(split) => write!(f, "<= {split}"),
        }
    }
}

/// Stopping criteria for tree growth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeParams {
    /// A node branches only when it holds more instances than this
    pub min_samples: usize,
    /// A node branches only when the best split gains more than this
    pub min_gain: f64,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            min_samples: 10,
            min_gain: 1e-5,
        }
    }
}

// ============================================================================
// Tree structure
// ============================================================================

struct Sample {
    values: Vec<Value>,
    label: String,
}

#[derive(Debug, Clone)]
struct Node {
    prediction: String,
    split: Option<Split>,
}

#[derive(Debug, Clone)]
struct Split {
    feature: usize,
    branches: Vec<(Test, Node)>,
}

/// A trained decision tree.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    features: Vec<FeatureSpec>,
    params: TreeParams,
    root_majority: String,
    root: Node,
}

impl DecisionTree {
    /// Train with default [`TreeParams`].
    pub fn train<S: AsRef<str>>(features: Vec<FeatureSpec>, rows: &[Vec<S>]) -> Result<Self> {
        Self::train_with(features, rows, TreeParams::default())
    }

    /// Train a tree on `rows`, whose last column is the label.
    pub fn train_with<S: AsRef<str>>(
        features: Vec<FeatureSpec>,
        rows: &[Vec<S>],
        params: TreeParams,
    ) -> Result<Self> {
        let Some(label) = features.last() else {
            return Err(Error::validation_field("features", "no features given"));
        };
        if label.continuous {
            return Err(Error::validation_field(
                "features",
                format!("label column {} cannot be continuous", label.name),
            ));
        }
        if rows.is_empty() {
            return Err(Error::EmptyInput {
                operation: "decision tree training",
            });
        }

        let samples = rows
            .iter()
            .enumerate()
            .map(|(n, row)| {
                if row.len() != features.len() {
                    return Err(Error::validation_field(
                        "rows",
                        format!(
                            "row {n} has {} cells, expected {}",
                            row.len(),
                            features.len()
                        ),
                    ));
                }
                let Some((label, cells)) = row.split_last() else {
                    return Err(Error::validation_field("rows", format!("row {n} is empty")));
                };
                let values = features
                    .iter()
                    .zip(cells)
                    .map(|(spec, cell)| spec.parse(cell.as_ref()))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Sample {
                    values,
                    label: label.as_ref().to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let refs: Vec<&Sample> = samples.iter().collect();
        let root_majority = majority(&refs);
        let builder = Builder {
            features: &features,
            params,
            root_majority: &root_majority,
        };
        let root = builder.build(&refs);

        let tree = Self {
            features,
            params,
            root_majority,
            root,
        };
        tracing::debug!(
            instances = samples.len(),
            depth = tree.depth(),
            leaves = tree.leaf_count(),
            "Trained decision tree"
        );
        Ok(tree)
    }

    /// Train from a CSV file with default [`TreeParams`].
    ///
    /// When `features` is `None` the first row names the features, all
    /// discrete. Otherwise every row is data.
    pub fn from_csv(
        path: impl AsRef<Path>,
        delimiter: u8,
        features: Option<Vec<FeatureSpec>>,
    ) -> Result<Self> {
        Self::from_csv_with(path, delimiter, features, TreeParams::default())
    }

    /// Train from a CSV file with explicit [`TreeParams`].
    pub fn from_csv_with(
        path: impl AsRef<Path>,
        delimiter: u8,
        features: Option<Vec<FeatureSpec>>,
        params: TreeParams,
    ) -> Result<Self> {
        let rows = data::read_rows(path, delimiter)?;
        let (features, rows) = match features {
            Some(features) => (features, rows),
            None => {
                let (header, rows) = data::split_header(rows)?;
                (header.into_iter().map(FeatureSpec::discrete).collect(), rows)
            }
        };
        Self::train_with(features, &rows, params)
    }

    /// Feature specs, label last.
    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    /// Stopping criteria the tree was grown with.
    pub fn params(&self) -> TreeParams {
        self.params
    }

    /// Most frequent label in the training data.
    pub fn root_majority(&self) -> &str {
        &self.root_majority
    }

    /// The label the root would give as a leaf.
    pub fn prediction(&self) -> &str {
        &self.root.prediction
    }

    /// Predict the label of `instance`.
    ///
    /// The instance holds one cell per feature, optionally followed by a
    /// label that is ignored.
    pub fn classify<S: AsRef<str>>(&self, instance: &[S]) -> Result<String> {
        let width = self.features.len() - 1;
        if instance.len() != width && instance.len() != width + 1 {
            return Err(Error::validation_field(
                "instance",
                format!("expected {width} or {} cells, got {}", width + 1, instance.len()),
            ));
        }
        let values = self
            .features
            .iter()
            .zip(instance)
            .take(width)
            .map(|(spec, cell)| spec.parse(cell.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut node = &self.root;
        while let Some(split) = &node.split {
            let value = &values[split.feature];
            match split.branches.iter().find(|(test, _)| test.accepts(value)) {
                Some((_, child)) => node = child,
                None => {
                    let cells: Vec<&str> = instance.iter().map(AsRef::as_ref).collect();
                    return Err(Error::NoBranch {
                        instance: format!("({})", cells.join(", ")),
                    });
                }
            }
        }
        Ok(node.prediction.clone())
    }

    /// Longest root-to-leaf path, in edges.
    pub fn depth(&self) -> usize {
        fn depth(node: &Node) -> usize {
            match &node.split {
                None => 0,
                Some(split) => {
                    1 + split
                        .branches
                        .iter()
                        .map(|(_, child)| depth(child))
                        .max()
                        .unwrap_or(0)
                }
            }
        }
        depth(&self.root)
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        fn leaves(node: &Node) -> usize {
            match &node.split {
                None => 1,
                Some(split) => split.branches.iter().map(|(_, child)| leaves(child)).sum(),
            }
        }
        leaves(&self.root)
    }

    /// Render the tree as a Graphviz DOT digraph.
    ///
    /// Inner nodes are labelled by feature, leaves by prediction and edges
    /// by the branch test.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph {\n");
        let mut next_id = 0usize;
        self.write_dot(&self.root, &mut out, &mut next_id);
        out.push_str("}\n");
        out
    }

    fn write_dot(&self, node: &Node, out: &mut String, next_id: &mut usize) -> usize {
        let id = *next_id;
        *next_id += 1;
        let label = match &node.split {
            Some(split) => self.features[split.feature].name.as_str(),
            None => node.prediction.as_str(),
        };
        let _ = writeln!(out, "\tn{id} [label=\"{}\"]", escape(label));
        if let Some(split) = &node.split {
            for (test, child) in &split.branches {
                let child_id = self.write_dot(child, out, next_id);
                let _ = writeln!(
                    out,
                    "\tn{id} -> n{child_id} [label=\"{}\"]",
                    escape(&test.to_string())
                );
            }
        }
        id
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

// ============================================================================
// Training
// ============================================================================

struct Builder<'a> {
    features: &'a [FeatureSpec],
    params: TreeParams,
    root_majority: &'a str,
}

impl Builder<'_> {
    fn build(&self, samples: &[&Sample]) -> Node {
        let prediction = self.prediction(samples);
        if samples.len() <= self.params.min_samples {
            return Node {
                prediction,
                split: None,
            };
        }

        let split = self.best_feature(samples).and_then(|(feature, tests, gain)| {
            if gain <= self.params.min_gain {
                return None;
            }
            tracing::trace!(
                feature = %self.features[feature].name,
                gain,
                instances = samples.len(),
                "Splitting node"
            );
            let branches = tests
                .into_iter()
                .filter_map(|test| {
                    let subset: Vec<&Sample> = samples
                        .iter()
                        .copied()
                        .filter(|s| test.accepts(&s.values[feature]))
                        .collect();
                    if subset.is_empty() {
                        None
                    } else {
                        Some((test, self.build(&subset)))
                    }
                })
                .collect();
            Some(Split { feature, branches })
        });

        Node { prediction, split }
    }

    /// Most frequent label, or the root majority when the top two tie.
    fn prediction(&self, samples: &[&Sample]) -> String {
        let mut counts: Vec<(&str, usize)> = label_counts(samples).into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        match counts.as_slice() {
            [(only, _)] => (*only).to_string(),
            [(first, a), (_, b), ..] if a > b => (*first).to_string(),
            _ => self.root_majority.to_string(),
        }
    }

    /// The feature with the highest gain, its branch tests and that gain.
    ///
    /// Ties go to the earlier feature.
    fn best_feature(&self, samples: &[&Sample]) -> Option<(usize, Vec<Test>, f64)> {
        let mut best: Option<(usize, Vec<Test>, f64)> = None;
        for feature in 0..self.features.len() - 1 {
            let tests = self.tests(samples, feature);
            let gain = information_gain(samples, feature, &tests);
            if best.as_ref().is_none_or(|(_, _, g)| gain > *g) {
                best = Some((feature, tests, gain));
            }
        }
        best
    }

    fn tests(&self, samples: &[&Sample], feature: usize) -> Vec<Test> {
        if self.features[feature].continuous {
            match best_split(samples, feature) {
                Some(split) => vec![Test::Greater(split), Test::AtMost(split)],
                None => Vec::new(),
            }
        } else {
            samples
                .iter()
                .filter_map(|s| match &s.values[feature] {
                    Value::Discrete(v) => Some(v.as_str()),
                    Value::Continuous(_) => None,
                })
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(|v| Test::Equals(v.to_string()))
                .collect()
        }
    }
}

/// The observed value of a continuous feature that maximizes gain.
///
/// Candidates are scanned in ascending order; ties go to the smaller value.
fn best_split(samples: &[&Sample], feature: usize) -> Option<f64> {
    let mut candidates: Vec<f64> = samples
        .iter()
        .filter_map(|s| match s.values[feature] {
            Value::Continuous(v) => Some(v),
            Value::Discrete(_) => None,
        })
        .collect();
    candidates.sort_by(f64::total_cmp);
    candidates.dedup();

    let mut best: Option<(f64, f64)> = None;
    for split in candidates {
        let tests = [Test::Greater(split), Test::AtMost(split)];
        let gain = information_gain(samples, feature, &tests);
        if best.is_none_or(|(_, g)| gain > g) {
            best = Some((split, gain));
        }
    }
    best.map(|(split, _)| split)
}

fn label_counts<'a>(samples: &[&'a Sample]) -> BTreeMap<&'a str, usize> {
    let mut counts = BTreeMap::new();
    for sample in samples {
        *counts.entry(sample.label.as_str()).or_insert(0) += 1;
    }
    counts
}

/// First label with the highest count.
fn majority(samples: &[&Sample]) -> String {
    let mut best: Option<(&str, usize)> = None;
    for (label, count) in label_counts(samples) {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label.to_string()).unwrap_or_default()
}

/// `H(Y) = -Σ p log2 p`, with `0 log 0 = 0`.
fn entropy(samples: &[&Sample]) -> f64 {
    let n = samples.len() as f64;
    label_counts(samples)
        .values()
        .map(|&c| {
            let p = c as f64 / n;
            if p > 0.0 { -p * p.log2() } else { 0.0 }
        })
        .sum()
}

/// `IG = H(Y) - Σ P(branch) H(Y | branch)` over the partition `tests` induces.
fn information_gain(samples: &[&Sample], feature: usize, tests: &[Test]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let n = samples.len() as f64;
    let conditional: f64 = tests
        .iter()
        .map(|test| {
            let subset: Vec<&Sample> = samples
                .iter()
                .copied()
                .filter(|s| test.accepts(&s.values[feature]))
                .collect();
            if subset.is_empty() {
                0.0
            } else {
                subset.len() as f64 / n * entropy(&subset)
            }
        })
        .sum();
    entropy(samples) - conditional
}
