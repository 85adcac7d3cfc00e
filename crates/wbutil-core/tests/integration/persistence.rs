//! Sinks, cached construction, and file-backed maps working together.

use std::collections::BTreeMap;

use tempfile::TempDir;
use wbutil_core::coroutine::{broadcast, map_sink, Sink};
use wbutil_core::{PersistentDict, UniqExt, save_obj};

#[test]
fn test_broadcast_into_persistent_dict() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("counts.json");

    let mut dict: PersistentDict<u32> = PersistentDict::new(&path);
    let mut seen = Vec::new();
    {
        let mut guard = dict.autosave();
        let targets: Vec<Box<dyn Sink<String> + '_>> = vec![
            Box::new(|word: String| *guard.entry(word).or_insert(0) += 1),
            Box::new(map_sink(|word: String| word.len(), |n: usize| seen.push(n))),
        ];
        let mut fan = broadcast(targets);
        for word in ["to", "be", "or", "not", "to", "be"] {
            fan.send(word.to_string());
        }
    }

    assert_eq!(seen, vec![2, 2, 2, 3, 2, 2]);
    let loaded: PersistentDict<u32> = PersistentDict::from_path(&path).unwrap();
    assert_eq!(loaded.get("to"), Some(&2));
    assert_eq!(loaded.get("not"), Some(&1));
}

#[test]
fn test_save_obj_caches_derived_data() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vocab.json");
    let words = ["b", "a", "b", "c", "a"];

    let vocab: Vec<String> = save_obj(&path, || {
        words.iter().map(|w| w.to_string()).uniq().collect()
    })
    .unwrap();
    assert_eq!(vocab, vec!["b", "a", "c"]);

    let cached: Vec<String> = save_obj(&path, || unreachable!("constructor must not rerun")).unwrap();
    assert_eq!(cached, vocab);
}

#[test]
fn test_persistent_dict_roundtrips_nested_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested.json");

    let mut dict: PersistentDict<BTreeMap<String, f64>> = PersistentDict::new(&path);
    dict.insert(
        "scores".to_string(),
        BTreeMap::from([("alice".to_string(), 0.5), ("bob".to_string(), 0.75)]),
    );
    dict.save().unwrap();

    let loaded: PersistentDict<BTreeMap<String, f64>> = PersistentDict::from_path(&path).unwrap();
    assert_eq!(loaded["scores"]["bob"], 0.75);
}
