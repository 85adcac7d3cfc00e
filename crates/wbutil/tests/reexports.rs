//! Smoke tests for the umbrella re-exports.

#![allow(clippy::unwrap_used)]

use wbutil::{Chain, Pipeline, RetryPolicy, UniqExt};

#[test]
fn test_core_reexports() {
    let chain = Chain::new().then(|x: i32| x + 1).then(|x| x * 10);
    assert_eq!(chain.call(1), 20);

    let words: Vec<_> = ["a", "b", "a"].into_iter().uniq().collect();
    assert_eq!(words, vec!["a", "b"]);

    let value = RetryPolicy::new(2)
        .run(|| Ok::<_, std::io::Error>(7))
        .unwrap();
    assert_eq!(value, 7);
}

#[cfg(feature = "math")]
#[test]
fn test_math_reexport() {
    assert_eq!(wbutil::math::mean(&[2.0, 4.0]).unwrap(), 3.0);
}

#[tokio::test]
async fn test_pipeline_reexport() {
    let pipeline = Pipeline::new(|x: u32| x * x).with_workers(2);
    let squares = pipeline.map(vec![1, 2, 3]).await.unwrap();
    assert!(pipeline.is_stopped());
    assert_eq!(squares, vec![1, 4, 9]);
}
