//! Retried operations running inside a pipeline.

use std::time::Duration;

use wbutil_core::{Error, Pipeline, RetryPolicy};

use crate::common::Flaky;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pipeline_with_retrying_func() {
    let flaky = Flaky::new(2);
    let f = flaky.clone();
    let pipeline = Pipeline::new(move |x: u32| {
        RetryPolicy::new(5)
            .with_wait(Duration::from_millis(1))
            .run(|| f.call(x * 3))
    })
    .with_workers(1);

    let results = pipeline.map(vec![1, 2, 3]).await.unwrap();
    let values: Vec<u32> = results.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(values, vec![3, 6, 9]);
    assert_eq!(flaky.calls(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pipeline_surfaces_exhausted_retries() {
    let flaky = Flaky::new(100);
    let f = flaky.clone();
    let pipeline = Pipeline::new(move |x: u32| RetryPolicy::new(2).run(|| f.call(x)));

    let results = pipeline.map(vec![7]).await.unwrap();
    assert!(matches!(
        results[0],
        Err(Error::RetriesExhausted { attempts: 2, .. })
    ));
}

#[tokio::test]
async fn test_pipeline_keyed_lookup_out_of_order() {
    let pipeline = Pipeline::new(|s: &'static str| s.len());
    pipeline.start().unwrap();

    let a = pipeline.put("a", Some("first".into())).await.unwrap();
    let b = pipeline.put("bbb", Some("second".into())).await.unwrap();

    assert_eq!(pipeline.get(&b, None).await.unwrap(), 3);
    assert_eq!(pipeline.get(&a, None).await.unwrap(), 1);
    pipeline.shutdown().await.unwrap();
}
