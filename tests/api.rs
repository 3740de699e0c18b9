use json_storage::{Error, MemoryBackend, Storage};
use serde::ser::{Error as _, Serialize, Serializer};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

const FILE: &str = "/virtual/.app-rc.json";

fn root(backend: &Arc<MemoryBackend>) -> Storage {
    Storage::open(backend.clone(), FILE).unwrap()
}

fn named(backend: &Arc<MemoryBackend>, name: &str) -> Storage {
    Storage::with_name(backend.clone(), FILE, name, false).unwrap()
}

/// Stand-in for something that can't be stored, like a callback.
struct Callback;

impl Serialize for Callback {
    fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
        Err(S::Error::custom("callables are not JSON"))
    }
}

// ---- construction -----------------------------------------------------------

#[test]
fn empty_path_is_rejected() {
    let backend = Arc::new(MemoryBackend::new());
    let err = Storage::open(backend.clone(), "").unwrap_err();
    assert_eq!(err, Error::MissingPath);
    assert_eq!(backend.subscriber_count(), 0);
}

#[test]
fn accessors() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    assert_eq!(store.name(), Some("app"));
    assert_eq!(store.path(), std::path::Path::new(FILE));
    assert!(!store.options().lodash_path);
    assert!(root(&backend).name().is_none());
}

#[test]
fn existed_reflects_state_at_build_time() {
    let backend = Arc::new(MemoryBackend::new());
    let first = named(&backend, "app");
    assert!(!first.existed());
    first.set("k", 1).unwrap();
    assert!(!first.existed());

    assert!(named(&backend, "app").existed());
    assert!(!named(&backend, "other").existed());
}

// ---- get / set --------------------------------------------------------------

#[test]
fn set_then_get_round_trips() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");

    let nested = json!({"list": [1, "two", null], "flag": false});
    assert_eq!(store.set("nested", &nested).unwrap(), nested);
    store.set("name", "demo").unwrap();
    store.set("ratio", 0.5).unwrap();

    assert_eq!(store.get("nested").unwrap(), Some(nested));
    assert_eq!(store.get("name").unwrap(), Some(json!("demo")));
    assert_eq!(store.get("ratio").unwrap(), Some(json!(0.5)));
    assert_eq!(store.get("missing").unwrap(), None);
}

#[test]
fn set_stores_null_as_present() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    store.set("nothing", Value::Null).unwrap();
    assert!(store.has("nothing").unwrap());
    assert_eq!(store.get("nothing").unwrap(), Some(Value::Null));
}

#[test]
fn flat_keys_are_never_split() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    store.set("a.b", 1).unwrap();
    assert_eq!(store.get("a.b").unwrap(), Some(json!(1)));
    assert_eq!(store.get_path("a.b").unwrap(), None);
    assert_eq!(
        backend.contents(FILE).unwrap(),
        json!({"app": {"a.b": 1}})
    );
}

#[test]
fn extend_merges_shallowly_and_later_keys_win() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    store.set("keep", 1).unwrap();
    store.set("over", "old").unwrap();
    store.set("deep", json!({"x": 1, "y": 2})).unwrap();

    let written = store
        .extend(json!({"over": "new", "deep": {"x": 10}, "added": true}))
        .unwrap();
    assert_eq!(written.len(), 3);

    let mut keys = store.keys().unwrap();
    keys.sort();
    assert_eq!(keys, vec!["added", "deep", "keep", "over"]);
    assert_eq!(store.get("over").unwrap(), Some(json!("new")));
    assert_eq!(store.get("deep").unwrap(), Some(json!({"x": 10})));
    assert_eq!(store.get("keep").unwrap(), Some(json!(1)));
}

#[test]
fn extend_accepts_plain_maps() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    let entries: HashMap<&str, i32> = HashMap::from([("a", 1), ("b", 2)]);
    store.extend(&entries).unwrap();
    assert_eq!(store.len().unwrap(), 2);
}

#[test]
fn extend_rejects_non_objects() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    let err = store.extend(vec![1, 2]).unwrap_err();
    assert!(matches!(err, Error::InvalidArgumentType(_)));
    assert_eq!(backend.contents(FILE), None);
}

#[test]
fn get_all_is_an_independent_copy() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    store.set("a", json!({"b": 1})).unwrap();

    let mut all = store.get_all().unwrap();
    all.insert("a".into(), json!("mutated"));
    all.insert("extra".into(), json!(true));

    assert_eq!(store.get("a").unwrap(), Some(json!({"b": 1})));
    assert!(!store.has("extra").unwrap());
}

#[test]
fn keys_len_iter() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    assert!(store.is_empty().unwrap());
    assert!(store.keys().unwrap().is_empty());

    store.set("x", 10).unwrap();
    store.set("y", 20).unwrap();
    assert_eq!(store.len().unwrap(), 2);
    assert_eq!(store.keys().unwrap(), vec!["x", "y"]);

    let mut entries = store.iter().unwrap();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        entries,
        vec![("x".to_string(), json!(10)), ("y".to_string(), json!(20))]
    );
}

// ---- paths ------------------------------------------------------------------

#[test]
fn set_path_then_get_path() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");

    assert_eq!(store.set_path("a.b.c", "v").unwrap(), json!("v"));
    assert_eq!(store.get_path("a.b.c").unwrap(), Some(json!("v")));
    assert_eq!(store.get("a").unwrap(), Some(json!({"b": {"c": "v"}})));
}

#[test]
fn set_path_keeps_siblings_in_the_namespace() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    store.set("a", json!({"keep": 1})).unwrap();
    store.set_path("a.added", 2).unwrap();
    store.set_path("list[0]", "first").unwrap();
    store.set_path("list[1]", "second").unwrap();

    assert_eq!(store.get("a").unwrap(), Some(json!({"keep": 1, "added": 2})));
    assert_eq!(store.get("list").unwrap(), Some(json!(["first", "second"])));
    assert_eq!(store.get_path("list[1]").unwrap(), Some(json!("second")));
}

#[test]
fn set_path_overwrites_or_appends_array_elements() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    store.set("list", json!([1, 2])).unwrap();
    store.set_path("list[0]", 10).unwrap();
    store.set_path("list[2]", 3).unwrap();
    assert_eq!(store.get("list").unwrap(), Some(json!([10, 2, 3])));
}

#[test]
fn set_path_rejects_indices_past_the_end() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    store.set("list", json!([1])).unwrap();
    let before = backend.contents(FILE);

    for path in ["list[18446744073709551615]", "list[3000000]", "list[2]"] {
        assert!(
            matches!(store.set_path(path, 1), Err(Error::InvalidPath(_))),
            "{path}"
        );
    }
    assert!(matches!(
        store.set_path("fresh[4].name", "x"),
        Err(Error::InvalidPath(_))
    ));

    assert_eq!(backend.contents(FILE), before);
    assert_eq!(store.get("list").unwrap(), Some(json!([1])));
    assert!(!store.has("fresh").unwrap());
}

#[test]
fn get_path_tolerates_missing_levels() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    store.set("scalar", 1).unwrap();
    assert_eq!(store.get_path("nope.deeper.still").unwrap(), None);
    assert_eq!(store.get_path("scalar.inner").unwrap(), None);
    assert_eq!(store.get_path("").unwrap(), None);
}

#[test]
fn set_path_rejects_bad_paths_before_writing() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    assert!(matches!(store.set_path("", 1), Err(Error::InvalidPath(_))));
    assert!(matches!(store.set_path("a[0", 1), Err(Error::InvalidPath(_))));
    assert_eq!(backend.contents(FILE), None);
}

// ---- delete -----------------------------------------------------------------

#[test]
fn delete_removes_and_persists() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    store.set("a", 1).unwrap();
    store.set("b", 2).unwrap();

    assert_eq!(store.delete("a").unwrap(), Some(json!(1)));
    assert_eq!(store.delete("a").unwrap(), None);
    assert!(!store.has("a").unwrap());
    assert_eq!(backend.contents(FILE).unwrap(), json!({"app": {"b": 2}}));
}

// ---- defaults / merge -------------------------------------------------------

#[test]
fn defaults_fill_an_empty_store() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    let result = store.defaults(json!({"x": 1})).unwrap();
    assert_eq!(Value::Object(result), json!({"x": 1}));
    assert_eq!(backend.contents(FILE).unwrap(), json!({"app": {"x": 1}}));
}

#[test]
fn defaults_never_override_existing_values() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    store.set("x", 2).unwrap();
    let result = store.defaults(json!({"x": 1, "y": {"z": 3}})).unwrap();
    assert_eq!(Value::Object(result), json!({"x": 2, "y": {"z": 3}}));
    assert_eq!(store.get("x").unwrap(), Some(json!(2)));
}

#[test]
fn defaults_returns_a_copy() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    let mut result = store.defaults(json!({"x": 1})).unwrap();
    result.insert("x".into(), json!(99));
    assert_eq!(store.get("x").unwrap(), Some(json!(1)));
}

#[test]
fn merge_is_deep_and_source_wins() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    store
        .set("server", json!({"host": "localhost", "port": 80, "tls": {"on": false}}))
        .unwrap();

    let result = store
        .merge(json!({"server": {"port": 8080, "tls": {"cert": "a.pem"}}, "debug": true}))
        .unwrap();

    let expected = json!({
        "server": {"host": "localhost", "port": 8080, "tls": {"on": false, "cert": "a.pem"}},
        "debug": true,
    });
    assert_eq!(Value::Object(result), expected);
    assert_eq!(Value::Object(store.get_all().unwrap()), expected);
}

#[test]
fn defaults_and_merge_reject_non_objects() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");

    for bad in [json!(1), json!("str"), json!([1, 2]), Value::Null, json!(true)] {
        assert!(matches!(
            store.defaults(&bad),
            Err(Error::InvalidArgumentType(_))
        ));
        assert!(matches!(store.merge(&bad), Err(Error::InvalidArgumentType(_))));
    }
    assert_eq!(backend.contents(FILE), None);
}

// ---- value validation -------------------------------------------------------

#[test]
fn unrepresentable_values_are_rejected_before_writing() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    store.set("keep", 1).unwrap();
    let before = backend.contents(FILE);

    assert!(matches!(
        store.set("cb", Callback),
        Err(Error::InvalidValueType(_))
    ));
    assert!(matches!(
        store.set_path("a.cb", Callback),
        Err(Error::InvalidValueType(_))
    ));
    let tuple_keys: HashMap<(u8, u8), u8> = HashMap::from([((1, 2), 3)]);
    assert!(matches!(
        store.set("map", &tuple_keys),
        Err(Error::InvalidValueType(_))
    ));
    let mut entries = HashMap::new();
    entries.insert("cb", Callback);
    assert!(matches!(
        store.extend(&entries),
        Err(Error::InvalidValueType(_))
    ));

    assert_eq!(backend.contents(FILE), before);
    assert!(!store.has("cb").unwrap());
}

#[test]
fn scalar_map_keys_are_stored_as_strings() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    let by_port: HashMap<u16, &str> = HashMap::from([(8080, "http")]);
    let by_flag: HashMap<bool, u8> = HashMap::from([(true, 1)]);

    assert_eq!(store.set("ports", &by_port).unwrap(), json!({"8080": "http"}));
    assert_eq!(store.set("flags", &by_flag).unwrap(), json!({"true": 1}));
    assert_eq!(store.get_path("ports.8080").unwrap(), Some(json!("http")));
}

// ---- save -------------------------------------------------------------------

#[test]
fn save_writes_current_view_unchanged() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    store.set("a", 1).unwrap();
    let before = backend.contents(FILE);
    store.save().unwrap();
    assert_eq!(backend.contents(FILE), before);
}

#[test]
fn save_on_empty_namespace_creates_it() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    store.save().unwrap();
    assert_eq!(backend.contents(FILE).unwrap(), json!({"app": {}}));
}

// ---- root storage -----------------------------------------------------------

#[test]
fn root_storage_sees_the_whole_document() {
    let backend = Arc::new(MemoryBackend::new());
    named(&backend, "app").set("k", 1).unwrap();

    let all = root(&backend);
    assert_eq!(all.get("app").unwrap(), Some(json!({"k": 1})));
    all.set("top", true).unwrap();
    assert_eq!(
        backend.contents(FILE).unwrap(),
        json!({"app": {"k": 1}, "top": true})
    );
}

#[test]
fn non_object_documents_read_as_empty() {
    let backend = Arc::new(MemoryBackend::new());
    backend.put_silently(FILE, json!([1, 2, 3]));
    let store = named(&backend, "app");
    assert!(store.is_empty().unwrap());
    store.set("k", 1).unwrap();
    assert_eq!(backend.contents(FILE).unwrap(), json!({"app": {"k": 1}}));
}

#[test]
fn non_object_namespace_reads_as_empty() {
    let backend = Arc::new(MemoryBackend::new());
    backend.put_silently(FILE, json!({"app": "scalar"}));
    let store = named(&backend, "app");
    assert!(!store.existed());
    assert_eq!(store.get("anything").unwrap(), None);
}

// ---- debug ------------------------------------------------------------------

#[test]
fn debug_impls_dont_panic() {
    let backend = Arc::new(MemoryBackend::new());
    let store = named(&backend, "app");
    let dbg = format!("{:?}", store);
    assert!(dbg.contains("Storage"));
    assert!(dbg.contains("app"));

    let builder = Storage::builder(backend.clone(), FILE).name("x");
    assert!(format!("{:?}", builder).contains("StorageBuilder"));
    assert!(format!("{:?}", backend).contains("MemoryBackend"));
}
