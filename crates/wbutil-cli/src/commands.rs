//! Implementations of the `wbutil` commands.
//!
//! Each command takes its inputs explicitly and returns data or writes to a
//! caller-supplied writer, so `main` only wires up stdin and stdout.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use wbutil_core::{Error, Pipeline, Printer, Result, Sink, UniqExt};
use wbutil_math::{DecisionTree, FeatureSpec, NaiveBayes, Summary, TreeParams, data};

use crate::config::WbutilConfig;

// ============================================================================
// stats
// ============================================================================

/// Parse whitespace-separated numbers.
pub fn parse_numbers(input: impl BufRead) -> Result<Vec<f64>> {
    let mut numbers = Vec::new();
    for line in input.lines() {
        for token in line?.split_whitespace() {
            let value = token
                .parse::<f64>()
                .map_err(|e| Error::parse(token, e.to_string()))?;
            numbers.push(value);
        }
    }
    Ok(numbers)
}

/// Summarize each file on a worker pool, keeping input order.
///
/// Reads are retried according to the `[retry]` settings; a file that still
/// cannot be read fails the whole command.
pub async fn stats_files(
    files: Vec<PathBuf>,
    config: &WbutilConfig,
) -> Result<Vec<(PathBuf, Summary)>> {
    let policy = config.retry.policy::<String>();
    let pipeline = Pipeline::new(move |path: PathBuf| summarize_file(&path, &policy))
        .with_workers(config.pipeline.workers)
        .with_capacity(config.pipeline.capacity);

    let results = pipeline.map(files.clone()).await?;
    files
        .into_iter()
        .zip(results)
        .map(|(path, summary)| summary.map(|s| (path, s)))
        .collect()
}

fn summarize_file(path: &Path, policy: &wbutil_core::RetryPolicy<String>) -> Result<Summary> {
    let text = policy
        .run(|| std::fs::read_to_string(path))
        .map_err(|e| Error::operation_with_source(format!("cannot read {}", path.display()), e))?;
    let numbers = parse_numbers(text.as_bytes())?;
    tracing::debug!(path = %path.display(), count = numbers.len(), "Summarizing file");
    Summary::of(&numbers)
}

// ============================================================================
// uniq
// ============================================================================

/// Copy lines from `input` to `out`, skipping lines already written.
///
/// Returns the number of lines written.
pub fn uniq_lines(input: impl BufRead, out: impl Write) -> Result<usize> {
    let mut printer = Printer::new(out);
    let mut failure = None;
    let mut written = 0;
    let lines = input.lines().map_while(|line| match line {
        Ok(line) => Some(line),
        Err(e) => {
            failure = Some(e);
            None
        }
    });
    for line in lines.uniq() {
        printer.send(line);
        if printer.error().is_some() {
            break;
        }
        written += 1;
    }
    if let Some(e) = failure {
        return Err(e.into());
    }
    printer.into_result()?;
    Ok(written)
}

// ============================================================================
// bayes
// ============================================================================

/// Train on `path` and describe the prediction for `instance`.
pub fn bayes(
    path: &Path,
    instance: &[String],
    label_index: isize,
    config: &WbutilConfig,
) -> Result<String> {
    let rows = data::read_rows(path, config.csv.delimiter_byte()?)?;
    let (features, rows) = data::split_header(rows)?;
    let model = NaiveBayes::new(features, &rows, label_index)?;
    tracing::info!(model = %model, instances = model.instances(), "Trained naive Bayes");
    Ok(model.prediction_report(instance))
}

// ============================================================================
// tree
// ============================================================================

/// Train a decision tree on `path`, marking `continuous` columns as real.
pub fn tree(
    path: &Path,
    continuous: &[String],
    params: TreeParams,
    config: &WbutilConfig,
) -> Result<DecisionTree> {
    let rows = data::read_rows(path, config.csv.delimiter_byte()?)?;
    let (header, rows) = data::split_header(rows)?;

    if let Some(unknown) = continuous.iter().find(|name| !header.contains(name)) {
        return Err(Error::validation_field(
            "continuous",
            format!("{unknown} is not a column of {}", path.display()),
        ));
    }
    let features = header
        .into_iter()
        .map(|name| {
            if continuous.contains(&name) {
                FeatureSpec::continuous(name)
            } else {
                FeatureSpec::discrete(name)
            }
        })
        .collect();

    DecisionTree::train_with(features, &rows, params)
}
