//! Categorical naive Bayes classifier.
//!
//! Predicts `argmax[y] P(y) * Π P(x_i | y)` from value counts collected at
//! training time. All cells are treated as categorical strings; an optional
//! per-column [`Domain`] normalizes cells before they are counted or looked up.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use wbutil_core::{Error, Result};

use crate::data;

/// Per-column cell transform (e.g. trimming or case folding).
pub type Domain = fn(&str) -> String;

type ValueCounts = BTreeMap<String, BTreeMap<String, u64>>;

/// A naive Bayes model trained on labelled rows.
#[derive(Clone)]
pub struct NaiveBayes {
    features: Vec<String>,
    label_index: usize,
    domains: Vec<Option<Domain>>,
    instances: usize,
    // feature -> value -> label -> count
    counts: BTreeMap<String, ValueCounts>,
    priors: BTreeMap<String, u64>,
}

impl NaiveBayes {
    /// Train a model on `rows`, whose columns are named by `features`.
    ///
    /// `label_index` selects the label column; negative values count from
    /// the right (`-1` is the last column).
    pub fn new<S: AsRef<str>>(
        features: Vec<String>,
        rows: &[Vec<S>],
        label_index: isize,
    ) -> Result<Self> {
        let domains = vec![None; features.len()];
        Self::train(features, rows, label_index, domains)
    }

    /// Train a model, applying `domains[i]` to every cell of column `i`.
    pub fn with_domains<S: AsRef<str>>(
        features: Vec<String>,
        rows: &[Vec<S>],
        label_index: isize,
        domains: Vec<Domain>,
    ) -> Result<Self> {
        if domains.len() != features.len() {
            return Err(Error::validation_field(
                "domains",
                format!(
                    "expected {} domains, got {}",
                    features.len(),
                    domains.len()
                ),
            ));
        }
        let domains = domains.into_iter().map(Some).collect();
        Self::train(features, rows, label_index, domains)
    }

    /// Train a model from a CSV file whose first row holds the feature names.
    pub fn from_csv(path: impl AsRef<Path>, label_index: isize) -> Result<Self> {
        let rows = data::read_rows(path, data::DEFAULT_DELIMITER)?;
        let (features, rows) = data::split_header(rows)?;
        Self::new(features, &rows, label_index)
    }

    fn train<S: AsRef<str>>(
        features: Vec<String>,
        rows: &[Vec<S>],
        label_index: isize,
        domains: Vec<Option<Domain>>,
    ) -> Result<Self> {
        let label_index = resolve_index(label_index, features.len())?;
        let mut model = Self {
            counts: features
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != label_index)
                .map(|(_, f)| (f.clone(), BTreeMap::new()))
                .collect(),
            features,
            label_index,
            domains,
            instances: rows.len(),
            priors: BTreeMap::new(),
        };

        for (n, row) in rows.iter().enumerate() {
            if row.len() != model.features.len() {
                return Err(Error::validation_field(
                    "rows",
                    format!(
                        "row {n} has {} cells, expected {}",
                        row.len(),
                        model.features.len()
                    ),
                ));
            }
            let row: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, cell)| model.apply_domain(i, cell.as_ref()))
                .collect();
            let label = row[label_index].clone();

            for (i, value) in row.into_iter().enumerate() {
                if i == label_index {
                    continue;
                }
                let feature = &model.features[i];
                if let Some(by_value) = model.counts.get_mut(feature) {
                    *by_value
                        .entry(value)
                        .or_default()
                        .entry(label.clone())
                        .or_default() += 1;
                }
            }
            *model.priors.entry(label).or_default() += 1;
        }

        tracing::debug!(
            instances = model.instances,
            labels = model.priors.len(),
            label = %model.label(),
            "Trained naive Bayes model"
        );
        Ok(model)
    }

    fn apply_domain(&self, column: usize, cell: &str) -> String {
        match self.domains.get(column).copied().flatten() {
            Some(domain) => domain(cell),
            None => cell.to_string(),
        }
    }

    /// Feature (column) names, label included.
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Name of the label column.
    pub fn label(&self) -> &str {
        &self.features[self.label_index]
    }

    /// Index of the label column.
    pub fn label_index(&self) -> usize {
        self.label_index
    }

    /// Observed labels with their training counts.
    pub fn labels(&self) -> &BTreeMap<String, u64> {
        &self.priors
    }

    /// Number of training instances.
    pub fn instances(&self) -> usize {
        self.instances
    }

    /// `P(feature = value | class)` from the training counts.
    ///
    /// Returns 0 when `class` never occurs alongside `feature`.
    pub fn probability(&self, feature: &str, value: &str, class: &str) -> f64 {
        let Some(by_value) = self.counts.get(feature) else {
            return 0.0;
        };
        let count = by_value
            .get(value)
            .and_then(|by_label| by_label.get(class))
            .copied()
            .unwrap_or(0);
        let total: u64 = by_value
            .values()
            .filter_map(|by_label| by_label.get(class))
            .sum();
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64
        }
    }

    /// Predict the label of an unlabelled instance.
    ///
    /// Cells are paired with feature names in order and the label column is
    /// skipped, so an instance may either keep a placeholder in the label
    /// position or, when the label is the last column, omit it. Ties go to
    /// the label that sorts last.
    pub fn predict<S: AsRef<str>>(&self, instance: &[S]) -> (Option<String>, f64) {
        let cells: Vec<(&str, String)> = self
            .features
            .iter()
            .zip(instance)
            .enumerate()
            .filter(|(i, _)| *i != self.label_index)
            .map(|(i, (feature, cell))| (feature.as_str(), self.apply_domain(i, cell.as_ref())))
            .collect();

        let mut best: (Option<String>, f64) = (None, 0.0);
        for (label, count) in &self.priors {
            let mut prob = *count as f64 / self.instances as f64;
            for (feature, value) in &cells {
                prob *= self.probability(feature, value, label);
            }
            if prob >= best.1 {
                best = (Some(label.clone()), prob);
            }
        }
        best
    }

    /// Predict the label of `instance` and describe the result.
    pub fn prediction_report<S: AsRef<str>>(&self, instance: &[S]) -> String {
        let (label, probability) = self.predict(instance);
        let tuple = instance
            .iter()
            .map(|cell| format!("'{}'", cell.as_ref()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Prediction:\n    Tuple:       ({tuple})\n    Label:       \"{}\"\n    Probability: {probability:.6}",
            label.as_deref().unwrap_or("None"),
        )
    }
}

fn resolve_index(index: isize, width: usize) -> Result<usize> {
    let resolved = if index < 0 {
        width.checked_sub(index.unsigned_abs())
    } else {
        Some(index as usize)
    };
    match resolved {
        Some(i) if i < width => Ok(i),
        _ => Err(Error::validation_field(
            "label_index",
            format!("{index} is out of range for {width} features"),
        )),
    }
}

impl fmt::Display for NaiveBayes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let features = self
            .features
            .iter()
            .enumerate()
            .map(|(i, name)| {
                if i == self.label_index {
                    format!("*{name}")
                } else {
                    name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "NaiveBayes({features})")
    }
}

impl fmt::Debug for NaiveBayes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NaiveBayes")
            .field("features", &self.features)
            .field("label_index", &self.label_index)
            .field("instances", &self.instances)
            .field("priors", &self.priors)
            .finish()
    }
}
