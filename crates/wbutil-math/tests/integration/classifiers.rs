use std::path::PathBuf;

use tempfile::TempDir;
use wbutil_math::{ConfusionMatrix, DecisionTree, FeatureSpec, NaiveBayes, Summary};

const TENNIS: &str = "\
outlook,temperature,humidity,wind,play
sunny,hot,high,weak,no
sunny,hot,high,strong,no
overcast,hot,high,weak,yes
rain,mild,high,weak,yes
rain,cool,normal,weak,yes
rain,cool,normal,strong,no
overcast,cool,normal,strong,yes
sunny,mild,high,weak,no
sunny,cool,normal,weak,yes
rain,mild,normal,weak,yes
sunny,mild,normal,strong,yes
overcast,mild,high,strong,yes
overcast,hot,normal,weak,yes
rain,mild,high,strong,no
";

fn write_tennis(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("tennis.csv");
    std::fs::write(&path, TENNIS).unwrap();
    path
}

fn rows() -> Vec<Vec<String>> {
    TENNIS
        .lines()
        .skip(1)
        .map(|line| line.split(',').map(String::from).collect())
        .collect()
}

#[test]
fn test_naive_bayes_scores_training_data() {
    let dir = TempDir::new().unwrap();
    let model = NaiveBayes::from_csv(write_tennis(&dir), -1).unwrap();
    assert_eq!(model.to_string(), "NaiveBayes(outlook, temperature, humidity, wind, *play)");

    let mut matrix = ConfusionMatrix::new("yes".to_string(), "no".to_string());
    for row in rows() {
        let (predicted, _) = model.predict(&row[..4]);
        matrix.update(&row[4], &predicted.unwrap()).unwrap();
    }

    assert_eq!(matrix.len(), 14);
    assert!(matrix.accuracy().unwrap() > 0.8);
    assert!(matrix.to_string().starts_with("Actual \\ Predicted | yes | no"));
}

#[test]
fn test_fully_grown_tree_is_perfect_on_training_data() {
    let dir = TempDir::new().unwrap();
    let path = write_tennis(&dir);
    let params = wbutil_math::TreeParams {
        min_samples: 0,
        ..Default::default()
    };
    let tree = DecisionTree::from_csv_with(&path, b',', None, params).unwrap();

    let mut matrix = ConfusionMatrix::new("yes".to_string(), "no".to_string());
    for row in rows() {
        let predicted = tree.classify(&row).unwrap();
        matrix.update(&row[4], &predicted).unwrap();
    }

    assert_eq!(matrix.accuracy(), Some(1.0));
    assert_eq!(matrix.f1(), Some(1.0));
    assert!(tree.to_dot().contains("label=\"outlook\""));
}

#[test]
fn test_tree_on_continuous_column_matches_summary() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scores.csv");
    let text: String = (1..=30)
        .map(|x| format!("{x},{}\n", if x > 12 { "pass" } else { "fail" }))
        .collect();
    std::fs::write(&path, text).unwrap();

    let features = vec![FeatureSpec::continuous("score"), FeatureSpec::discrete("result")];
    let tree = DecisionTree::from_csv(&path, b',', Some(features)).unwrap();
    assert_eq!(tree.classify(&["12"]).unwrap(), "fail");
    assert_eq!(tree.classify(&["12.5"]).unwrap(), "pass");

    let scores: Vec<f64> = (1..=30).map(f64::from).collect();
    let summary = Summary::of(&scores).unwrap();
    assert_eq!(summary.median, 15.5);
    assert_eq!(tree.classify(&[summary.median.to_string()]).unwrap(), "pass");
}
