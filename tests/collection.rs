use loyalty_store::{Collection, Error, Outcome, Reward, WriteQueues};
use std::sync::Arc;
use tempfile::TempDir;

fn rewards(dir: &TempDir) -> Collection<Reward> {
    Collection::builder(dir.path().join("rewards.json"))
        .queues(Arc::new(WriteQueues::new()))
        .build()
        .unwrap()
}

// ---- reads ------------------------------------------------------------------

#[test]
fn missing_file_loads_as_default() {
    let dir = TempDir::new().unwrap();
    let col = rewards(&dir);
    assert!(col.load().unwrap().is_empty());
    // again: loading never creates the file
    assert!(col.load().unwrap().is_empty());
    assert!(!col.path().exists());

    let fallback = vec![Reward::new(1, 10)];
    assert_eq!(col.load_or(fallback.clone()).unwrap(), fallback);
}

#[test]
fn empty_file_loads_as_default() {
    let dir = TempDir::new().unwrap();
    let col = rewards(&dir);
    std::fs::write(col.path(), b"").unwrap();
    assert!(col.load().unwrap().is_empty());
}

#[test]
fn malformed_file_is_a_parse_failure() {
    let dir = TempDir::new().unwrap();
    let col = rewards(&dir);
    std::fs::write(col.path(), b"[{\"id\": 1, \"cost\": ").unwrap();
    let err = col.load().unwrap_err();
    assert!(matches!(err, Error::Deserialize(_)), "got {err:?}");
}

#[test]
fn wrong_shape_is_a_parse_failure() {
    let dir = TempDir::new().unwrap();
    let col = rewards(&dir);
    std::fs::write(col.path(), b"{\"id\": 1, \"cost\": 5}").unwrap();
    assert!(matches!(col.load(), Err(Error::Deserialize(_))));
}

#[test]
fn corrupt_file_is_not_overwritten_by_transact() {
    let dir = TempDir::new().unwrap();
    let col = rewards(&dir);
    std::fs::write(col.path(), b"not json").unwrap();

    let res: Result<(), Error> = col.transact(|items| {
        items.push(Reward::new(1, 1));
        Ok(Outcome::Modified(()))
    });
    assert!(matches!(res, Err(Error::Deserialize(_))));
    assert_eq!(std::fs::read(col.path()).unwrap(), b"not json");
}

#[test]
fn failed_prepare_skips_the_load() {
    let dir = TempDir::new().unwrap();
    let col = rewards(&dir);
    std::fs::write(col.path(), b"not json").unwrap();

    let res: Result<(), Error> = col.transact_with(
        || Err(Error::Config("no such thing".into())),
        |(), _items| Ok(Outcome::Modified(())),
    );
    assert!(matches!(res, Err(Error::Config(_))), "got {res:?}");
    assert_eq!(std::fs::read(col.path()).unwrap(), b"not json");
}

#[test]
fn prepared_value_reaches_the_cycle() {
    let dir = TempDir::new().unwrap();
    let col = rewards(&dir);
    let n: usize = col
        .transact_with(
            || Ok::<_, Error>(Reward::new(3, 30)),
            |reward, items| {
                items.push(reward);
                Ok(Outcome::Modified(items.len()))
            },
        )
        .unwrap();
    assert_eq!(n, 1);
    assert_eq!(col.load().unwrap(), vec![Reward::new(3, 30)]);
}

// ---- writes -----------------------------------------------------------------

#[test]
fn save_then_load_roundtrip() {
    let dir = TempDir::new().unwrap();
    let col = rewards(&dir);
    let items = vec![
        Reward::new(1, 500)
            .with_detail("title", "Free coffee")
            .with_detail("image", "/img/coffee.png"),
        Reward::new(2, 1200).with_detail("tags", serde_json::json!(["food", "lunch"])),
    ];
    col.save(&items).unwrap();
    assert_eq!(col.load().unwrap(), items);
}

#[test]
fn unchanged_outcome_skips_the_write() {
    let dir = TempDir::new().unwrap();
    let col = rewards(&dir);
    let n: usize = col
        .transact(|items| Ok::<_, Error>(Outcome::Unchanged(items.len())))
        .unwrap();
    assert_eq!(n, 0);
    assert!(!col.path().exists());
}

#[test]
fn error_from_closure_skips_the_write() {
    let dir = TempDir::new().unwrap();
    let col = rewards(&dir);
    col.save(&[Reward::new(1, 5)]).unwrap();

    let res: Result<(), Error> = col.transact(|items| {
        items.clear();
        Err(Error::Config("changed my mind".into()))
    });
    assert!(res.is_err());
    assert_eq!(col.load().unwrap(), vec![Reward::new(1, 5)]);
}

#[test]
fn pretty_and_compact_output() {
    let dir = TempDir::new().unwrap();
    let pretty = Collection::<Reward>::open(dir.path().join("pretty.json")).unwrap();
    pretty.save(&[Reward::new(1, 5)]).unwrap();
    let raw = std::fs::read_to_string(pretty.path()).unwrap();
    assert!(raw.contains("\n  "));

    let compact = Collection::<Reward>::builder(dir.path().join("compact.json"))
        .pretty(false)
        .build()
        .unwrap();
    compact.save(&[Reward::new(1, 5)]).unwrap();
    let raw = std::fs::read_to_string(compact.path()).unwrap();
    assert!(!raw.contains('\n'));
}

#[test]
fn path_without_file_name_is_rejected() {
    let err = Collection::<Reward>::open("/").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn relative_path_is_resolved_once_at_build() {
    let cwd = std::env::current_dir().unwrap();
    let plain = Collection::<Reward>::open("data/relative.json").unwrap();
    let dotted = Collection::<Reward>::open("./data/./relative.json").unwrap();
    assert!(plain.path().is_absolute());
    assert_eq!(plain.path(), cwd.join("data").join("relative.json"));
    assert_eq!(plain.path(), dotted.path());
    // building touches nothing on disk
    assert!(!cwd.join("data").join("relative.json").exists());
}

#[test]
fn debug_impls_dont_panic() {
    let dir = TempDir::new().unwrap();
    let col = rewards(&dir);
    let dbg = format!("{col:?}");
    assert!(dbg.contains("Collection"));
    assert!(dbg.contains("path"));

    let builder = Collection::<Reward>::builder(dir.path().join("x.json"));
    assert!(format!("{builder:?}").contains("CollectionBuilder"));
}
