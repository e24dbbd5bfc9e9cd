// tests/false_positives.rs

use std::fs;
use std::path::PathBuf;

use chat_sentry::store::FalsePositiveStore;

fn temp_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("chat-sentry-fp-{tag}-{}.json", uuid::Uuid::new_v4()))
}

#[test]
fn add_is_idempotent_for_exact_duplicates() {
    let path = temp_path("dedup");
    let store = FalsePositiveStore::new(&path);

    store.add("kappa kappa kappa");
    store.add("kappa kappa kappa");
    store.add("different message");

    let all = store.get_all();
    assert_eq!(all.len(), 2);
    assert_eq!(
        all.iter().filter(|m| *m == "kappa kappa kappa").count(),
        1
    );

    let _ = fs::remove_file(path);
}

#[test]
fn entries_survive_reload() {
    let path = temp_path("reload");
    {
        let store = FalsePositiveStore::new(&path);
        store.add("learned one");
        store.add("learned two");
    }

    let reloaded = FalsePositiveStore::new(&path);
    assert_eq!(reloaded.get_all(), vec!["learned one", "learned two"]);

    let _ = fs::remove_file(path);
}

#[test]
fn corrupt_file_degrades_to_empty_list() {
    let path = temp_path("corrupt");
    fs::write(&path, "not json at all").expect("write garbage");

    let store = FalsePositiveStore::new(&path);
    assert!(store.get_all().is_empty());
    store.add("still works");
    assert_eq!(store.get_all().len(), 1);

    let _ = fs::remove_file(path);
}
