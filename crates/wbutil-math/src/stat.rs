//! Descriptive statistics and binary classifier metrics.

use std::fmt;

use wbutil_core::{Error, Result};

// ============================================================================
// Descriptive statistics
// ============================================================================

/// Arithmetic mean.
///
/// ```
/// assert_eq!(wbutil_math::stat::mean(&[1.0, 2.0, 3.0, 4.0]).unwrap(), 2.5);
/// ```
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(Error::EmptyInput { operation: "mean" });
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median: the middle value, or the mean of the two middle values when
/// there is an even number of them.
///
/// ```
/// use wbutil_math::stat::median;
///
/// assert_eq!(median(&[4.0, 6.0, 1.0]).unwrap(), 4.0);
/// assert_eq!(median(&[1.0, 1.0, 2.0, 3.0]).unwrap(), 1.5);
/// ```
pub fn median(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(Error::EmptyInput {
            operation: "median",
        });
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Ok(sorted[mid])
    } else {
        mean(&sorted[mid - 1..=mid])
    }
}

/// Population variance (average squared distance to the mean).
pub fn variance(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(Error::EmptyInput {
            operation: "variance",
        });
    }
    let avg = mean(values)?;
    let squared: Vec<f64> = values.iter().map(|v| (avg - v).powi(2)).collect();
    mean(&squared)
}

/// Population standard deviation (square root of [`variance`]).
pub fn std(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(Error::EmptyInput { operation: "std" });
    }
    Ok(variance(values)?.sqrt())
}

/// Mean, median, variance, and standard deviation in one pass over the API.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Summary {
    /// Number of values.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Median.
    pub median: f64,
    /// Population variance.
    pub variance: f64,
    /// Population standard deviation.
    pub std: f64,
}

impl Summary {
    /// Summarize `values`.
    pub fn of(values: &[f64]) -> Result<Self> {
        let variance = variance(values)?;
        Ok(Self {
            count: values.len(),
            mean: mean(values)?,
            median: median(values)?,
            variance,
            std: variance.sqrt(),
        })
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "count:    {}", self.count)?;
        writeln!(f, "mean:     {}", self.mean)?;
        writeln!(f, "median:   {}", self.median)?;
        writeln!(f, "variance: {}", self.variance)?;
        write!(f, "std:      {}", self.std)
    }
}

// ============================================================================
// ConfusionMatrix
// ============================================================================

/// Tracks the performance of a binary classifier.
///
/// Ratio metrics return `None` while their denominator is zero.
///
/// ```
/// use wbutil_math::stat::ConfusionMatrix;
///
/// let mut m = ConfusionMatrix::new("win", "lose");
/// m.updates([("win", "win"), ("win", "lose")]).unwrap();
/// assert_eq!(m.accuracy(), Some(0.5));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConfusionMatrix<L> {
    positive: L,
    negative: L,
    tp: u64,
    fp: u64,
    tn: u64,
    fn_: u64,
}

impl<L> ConfusionMatrix<L>
where
    L: PartialEq + fmt::Debug,
{
    /// An empty matrix for the given positive and negative labels.
    pub fn new(positive: L, negative: L) -> Self {
        Self {
            positive,
            negative,
            tp: 0,
            fp: 0,
            tn: 0,
            fn_: 0,
        }
    }

    /// Record one prediction against its true label.
    ///
    /// Fails with [`Error::UnknownLabel`] if either label is neither the
    /// positive nor the negative label.
    pub fn update(&mut self, actual: &L, predicted: &L) -> Result<()> {
        for label in [actual, predicted] {
            if !self.is_known(label) {
                return Err(Error::UnknownLabel {
                    label: format!("{label:?}"),
                });
            }
        }

        let correct = predicted == actual;
        if *predicted == self.positive {
            if correct {
                self.tp += 1;
            } else {
                self.fp += 1;
            }
        } else if correct {
            self.tn += 1;
        } else {
            self.fn_ += 1;
        }
        Ok(())
    }

    /// Record a batch of `(actual, predicted)` pairs.
    pub fn updates<I>(&mut self, results: I) -> Result<()>
    where
        I: IntoIterator<Item = (L, L)>,
    {
        for (actual, predicted) in results {
            self.update(&actual, &predicted)?;
        }
        Ok(())
    }

    fn is_known(&self, label: &L) -> bool {
        *label == self.positive || *label == self.negative
    }

    /// The positive label.
    pub fn positive(&self) -> &L {
        &self.positive
    }

    /// The negative label.
    pub fn negative(&self) -> &L {
        &self.negative
    }

    /// True positives: actual and prediction both positive.
    pub fn true_positives(&self) -> u64 {
        self.tp
    }

    /// False positives: predicted positive for a negative instance.
    pub fn false_positives(&self) -> u64 {
        self.fp
    }

    /// True negatives: actual and prediction both negative.
    pub fn true_negatives(&self) -> u64 {
        self.tn
    }

    /// False negatives: predicted negative for a positive instance.
    pub fn false_negatives(&self) -> u64 {
        self.fn_
    }

    /// Number of predictions recorded.
    pub fn len(&self) -> u64 {
        self.tp + self.fp + self.tn + self.fn_
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (TP + TN) / total
    pub fn accuracy(&self) -> Option<f64> {
        ratio(self.tp + self.tn, self.len())
    }

    /// (FP + FN) / total, i.e. 1 - accuracy
    pub fn error(&self) -> Option<f64> {
        ratio(self.fp + self.fn_, self.len())
    }

    /// True positive recognition rate: TP / (TP + FN)
    pub fn sensitivity(&self) -> Option<f64> {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// True negative recognition rate: TN / (TN + FP)
    pub fn specificity(&self) -> Option<f64> {
        ratio(self.tn, self.tn + self.fp)
    }

    /// Share of positive predictions that were correct: TP / (TP + FP)
    pub fn precision(&self) -> Option<f64> {
        ratio(self.tp, self.tp + self.fp)
    }

    /// Share of positive instances labelled positive (same as sensitivity).
    pub fn recall(&self) -> Option<f64> {
        self.sensitivity()
    }

    /// Balanced F measure: 2PR / (P + R)
    pub fn f1(&self) -> Option<f64> {
        let p = self.precision()?;
        let r = self.recall()?;
        if p + r == 0.0 {
            return None;
        }
        Some(2.0 * p * r / (p + r))
    }
}

fn ratio(num: u64, den: u64) -> Option<f64> {
    (den != 0).then(|| num as f64 / den as f64)
}

impl<L: fmt::Display> fmt::Display for ConfusionMatrix<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Actual \\ Predicted | {} | {}",
            self.positive, self.negative
        )?;
        writeln!(f, "    {} | {} | {}", self.positive, self.tp, self.fn_)?;
        write!(f, "    {} | {} | {}", self.negative, self.fp, self.tn)
    }
}
