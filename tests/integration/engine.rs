//! Engine scenarios against in-memory storage and a stubbed network

use inhouse::asset::{AssetContext, Attributes, CacheEntry};
use inhouse::error::{InhouseError, InhouseResult};
use inhouse::fetch::Fetcher;
use inhouse::render::Renderer;
use inhouse::storage::{MemoryStorage, Storage};
use inhouse::{AssetManager, Status};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Default)]
struct StubFetcher {
    bodies: Mutex<HashMap<String, Vec<u8>>>,
    calls: AtomicUsize,
}

impl StubFetcher {
    fn serving(bodies: &[(&str, &str)]) -> Arc<Self> {
        let stub = Self::default();
        for (url, body) in bodies {
            stub.serve(url, body);
        }
        Arc::new(stub)
    }

    fn serve(&self, url: &str, body: &str) {
        self.bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), body.as_bytes().to_vec());
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetcher for StubFetcher {
    fn get(&self, url: &str) -> InhouseResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| InhouseError::fetch(url, "status code 404"))
    }
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl Renderer for Recorder {
    fn write(&mut self, _entry: &CacheEntry, src: &str) {
        self.0.lock().unwrap().push(src.to_string());
    }

    fn raw(&mut self, code: &str) {
        self.0.lock().unwrap().push(code.to_string());
    }
}

fn engine(root: &Path, storage: &Arc<MemoryStorage>, fetcher: &Arc<StubFetcher>) -> AssetManager {
    let ctx = AssetContext::new("inhouse", root, root.join("public"));
    AssetManager::new(ctx, storage.clone(), fetcher.clone())
}

#[test]
fn second_call_in_one_process_is_loaded_without_io() {
    let temp = TempDir::new().unwrap();
    let storage = Arc::new(MemoryStorage::new("/storage"));
    let fetcher = StubFetcher::serving(&[("https://cdn.example.com/lib.js", "var x=1;")]);
    let mut manager = engine(temp.path(), &storage, &fetcher);

    let status = manager.internalize("https://cdn.example.com/lib.js", false, Attributes::new());
    assert_eq!(status, Status::Internalized);
    assert_eq!(
        storage.get("inhouse/cdn.example.com/lib.js").unwrap(),
        b"var x=1;"
    );
    assert!(manager
        .cache_map_snapshot()
        .contains_key("https://cdn.example.com/lib.js"));

    let status = manager.internalize("https://cdn.example.com/lib.js", false, Attributes::new());
    assert_eq!(status, Status::Loaded);
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(manager.loaded(), vec!["https://cdn.example.com/lib.js"]);
}

#[test]
fn two_processes_share_one_cache() {
    let temp = TempDir::new().unwrap();
    let storage = Arc::new(MemoryStorage::new("/storage"));
    let fetcher = StubFetcher::serving(&[("https://cdn.example.com/lib.js", "var x=1;")]);

    let mut first = engine(temp.path(), &storage, &fetcher);
    assert_eq!(
        first.internalize("https://cdn.example.com/lib.js", false, Attributes::new()),
        Status::Internalized
    );
    first.flush().unwrap();
    drop(first);

    fetcher.serve("https://cdn.example.com/lib.js", "changed upstream");

    let mut second = engine(temp.path(), &storage, &fetcher);
    assert_eq!(
        second.internalize("https://cdn.example.com/lib.js", false, Attributes::new()),
        Status::InCache
    );
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(
        storage.get("inhouse/cdn.example.com/lib.js").unwrap(),
        b"var x=1;"
    );
}

#[test]
fn dev_mode_reinternalizes_changed_local_file() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("resources/js/app.js");
    fs::create_dir_all(file.parent().unwrap()).unwrap();
    fs::write(&file, "let version = 1;").unwrap();
    let source = file.to_string_lossy().to_string();

    let storage = Arc::new(MemoryStorage::new("/storage"));
    let fetcher = StubFetcher::serving(&[]);

    let mut first = engine(temp.path(), &storage, &fetcher).with_dev_mode(true);
    assert_eq!(first.internalize(&source, false, Attributes::new()), Status::Internalized);
    first.flush().unwrap();
    drop(first);

    let mut unchanged = engine(temp.path(), &storage, &fetcher).with_dev_mode(true);
    assert_eq!(unchanged.internalize(&source, false, Attributes::new()), Status::InCache);
    drop(unchanged);

    fs::write(&file, "let version = 2;").unwrap();

    let mut changed = engine(temp.path(), &storage, &fetcher).with_dev_mode(true);
    assert_eq!(changed.internalize(&source, false, Attributes::new()), Status::Internalized);
    assert_eq!(
        storage.get("inhouse/resources/js/app.js").unwrap(),
        b"let version = 2;"
    );
}

#[test]
fn unresolvable_reference_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let storage = Arc::new(MemoryStorage::new("/storage"));
    let fetcher = StubFetcher::serving(&[]);
    let recorder = Recorder::default();
    let mut manager = engine(temp.path(), &storage, &fetcher).with_renderer(Box::new(recorder.clone()));

    let status = manager.internalize("not/a/real/path.js", true, Attributes::new());

    assert_eq!(status, Status::Invalid);
    assert!(storage.paths().is_empty());
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(recorder.lines(), vec!["/not/a/real/path.js".to_string()]);
    assert!(!manager.flush().unwrap());
}

#[test]
fn block_is_stored_without_wrapper() {
    let temp = TempDir::new().unwrap();
    let storage = Arc::new(MemoryStorage::new("/storage"));
    let fetcher = StubFetcher::serving(&[]);
    let mut manager = engine(temp.path(), &storage, &fetcher);

    let status = manager.internalize_block("app.js", "<script>console.log(1)</script>", false, true);
    assert_eq!(status, Status::Internalized);

    let hash = inhouse::asset::content_hash(b"console.log(1)");
    let path = inhouse::asset::with_hash("inhouse/app.js", &hash);
    assert!(path.contains(&hash));
    assert_eq!(storage.get(&path).unwrap(), b"console.log(1)");
}

#[test]
fn remapped_named_asset_replaces_old_file_in_dev_mode() {
    let temp = TempDir::new().unwrap();
    let storage = Arc::new(MemoryStorage::new("/storage"));
    let fetcher = StubFetcher::serving(&[
        ("https://cdn.test/react@1.js", "react one"),
        ("https://cdn.test/react@2.js", "react two"),
    ]);

    let mut first = engine(temp.path(), &storage, &fetcher).with_dev_mode(true);
    first.map("react", "https://cdn.test/react@1.js", Attributes::new());
    assert_eq!(first.internalize("react", false, Attributes::new()), Status::Internalized);
    first.flush().unwrap();
    drop(first);
    assert!(storage.exists("inhouse/cdn.test/react@1.js"));

    let mut second = engine(temp.path(), &storage, &fetcher).with_dev_mode(true);
    second.map("react", "https://cdn.test/react@2.js", Attributes::new());
    assert_eq!(second.internalize("react", false, Attributes::new()), Status::Internalized);
    second.flush().unwrap();

    assert!(!storage.exists("inhouse/cdn.test/react@1.js"));
    assert_eq!(storage.get("inhouse/cdn.test/react@2.js").unwrap(), b"react two");
    assert_eq!(
        second.cache_map_snapshot()["react"].asset_path,
        "https://cdn.test/react@2.js"
    );
}

#[test]
fn public_file_is_served_in_place() {
    let temp = TempDir::new().unwrap();
    let public = temp.path().join("public/css");
    fs::create_dir_all(&public).unwrap();
    fs::write(public.join("site.css"), "body{}").unwrap();

    let storage = Arc::new(MemoryStorage::new("/storage"));
    let fetcher = StubFetcher::serving(&[]);
    let recorder = Recorder::default();
    let mut manager = engine(temp.path(), &storage, &fetcher).with_renderer(Box::new(recorder.clone()));

    let status = manager.internalize("css/site.css", true, Attributes::new());

    assert_eq!(status, Status::PublicFile);
    assert!(storage.paths().is_empty());
    assert_eq!(recorder.lines(), vec!["/css/site.css".to_string()]);
}
