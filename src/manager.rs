//! The internalization engine
//!
//! `AssetManager` decides, per asset reference, whether to reuse a cached
//! copy, fetch or copy a fresh one, or fall back to the reference as given.
//! One manager is meant to live for one request or process: its loaded set
//! guarantees at most one attempt per asset name, and its cache map is
//! flushed once at teardown.
//!
//! No failure is returned to the caller. Every error on the internalization
//! path is logged and folded into `Status::Invalid` with a fallback render.

use crate::archive::{Archiver, Unarchiver};
use crate::asset::hash::is_hashed_variant;
use crate::asset::{
    content_hash, with_hash, AssetContext, AssetOverrides, Attributes, CacheEntry, CacheMap,
    NamedAsset, NamedAssetRegistry, SourceKind, Status, StoredEntry,
};
use crate::config::schema::Config;
use crate::error::{InhouseError, InhouseResult};
use crate::events::{CacheListener, EventLog, NoopListener};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::render::{cache_buster_token, HtmlRenderer, NullRenderer, RenderOptions, Renderer};
use crate::storage::{collect_files, relative_path, LocalStorage, Storage};
use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};

static OPENING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\A\s*<(script|style)\b[^>]*>").expect("valid regex"));

static CLOSING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)</(script|style)\s*>\s*\z").expect("valid regex"));

static LEADING_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A(?:[\t ]*(?:\r?\n|\r))+").expect("valid regex"));

/// Strip a single outer `<script>`/`<style>` wrapper, leading blank lines and
/// the first line's indentation from a code block.
pub fn sanitize_block(code: &str) -> String {
    let code = OPENING_TAG.replace(code, "");
    let code = CLOSING_TAG.replace(&code, "");
    let code = LEADING_BLANK_LINES.replace(&code, "");

    let indent: String = code
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect();

    let dedented: Vec<&str> = code
        .lines()
        .map(|line| line.strip_prefix(indent.as_str()).unwrap_or(line))
        .collect();

    dedented.join("\n").trim_end().to_string()
}

/// Asset internalization engine
pub struct AssetManager {
    ctx: AssetContext,
    storage: Arc<dyn Storage>,
    fetcher: Arc<dyn Fetcher>,
    renderer: Box<dyn Renderer>,
    archiver: Box<dyn Archiver>,
    listener: Arc<dyn CacheListener>,
    map: CacheMap,
    named: NamedAssetRegistry,
    loaded: IndexSet<String>,
    dev_mode: bool,
    force_url_cache: bool,
    temp_dir: Option<PathBuf>,
}

impl AssetManager {
    /// Create a manager with the given collaborators.
    ///
    /// Output is discarded until a renderer is installed with
    /// [`with_renderer`](Self::with_renderer).
    pub fn new(ctx: AssetContext, storage: Arc<dyn Storage>, fetcher: Arc<dyn Fetcher>) -> Self {
        let sidecar = CacheMap::sidecar_path(ctx.resolver.base());
        let map = CacheMap::new(storage.clone(), sidecar, true);

        Self {
            ctx,
            storage,
            fetcher,
            renderer: Box::new(NullRenderer),
            archiver: Box::new(Unarchiver::new()),
            listener: Arc::new(NoopListener),
            map,
            named: NamedAssetRegistry::new(),
            loaded: IndexSet::new(),
            dev_mode: false,
            force_url_cache: true,
            temp_dir: None,
        }
    }

    /// Wire the default collaborators from configuration: local disk storage,
    /// HTTP fetching, HTML to stdout, the JSON-lines event log and the
    /// configured named assets.
    pub fn from_config(config: &Config) -> Self {
        let project_root = config.project_root();
        let ctx = AssetContext::new(&config.cache.path, &project_root, config.public_dir());

        let storage = Arc::new(LocalStorage::new(config.disk_root(), config.cache.url.clone()));

        let timeout = match config.cache.fetch_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let fetcher = Arc::new(HttpFetcher::new(config.cache.verify_tls, timeout));

        let cache_buster = config.output.version_file.as_ref().and_then(|file| {
            let file = config.resolve(file);
            match cache_buster_token(&file) {
                Ok(token) => Some(token),
                Err(e) => {
                    warn!("No cache-busting token: {}", e);
                    None
                }
            }
        });
        let renderer = HtmlRenderer::new(
            std::io::stdout(),
            RenderOptions {
                nonce: config.output.nonce.clone(),
                cache_buster,
                relative_paths: config.output.relative_paths,
                app_url: config.output.app_url.clone(),
            },
        );

        let named = config.named.clone();
        let overrides = move |registry: &mut NamedAssetRegistry| {
            for (key, asset) in &named {
                registry.replace(key, &asset.source, asset.attributes.clone());
            }
        };

        let mut manager = Self::new(ctx, storage, fetcher)
            .with_cache_map(config.cache.cache_map)
            .with_renderer(Box::new(renderer))
            .with_listener(Arc::new(EventLog::new(config)))
            .with_overrides(Box::new(overrides))
            .with_force_url_cache(config.cache.force_url_cache)
            .with_dev_mode(config.cache.dev_mode);

        manager.temp_dir = config.paths.temp_dir.as_ref().map(|dir| config.resolve(dir));
        manager
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_archiver(mut self, archiver: Box<dyn Archiver>) -> Self {
        self.archiver = archiver;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn CacheListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Install a named asset override hook (runs once, before first use)
    pub fn with_overrides(mut self, overrides: Box<dyn AssetOverrides>) -> Self {
        self.named = NamedAssetRegistry::new().with_overrides(overrides);
        self
    }

    /// Enable or disable persistence of the cache map sidecar
    pub fn with_cache_map(mut self, enabled: bool) -> Self {
        let sidecar = self.map.sidecar().to_string();
        self.map = CacheMap::new(self.storage.clone(), sidecar, enabled);
        self
    }

    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    /// Whether URLs are internalized while in dev mode
    pub fn with_force_url_cache(mut self, force: bool) -> Self {
        self.force_url_cache = force;
        self
    }

    /// Staging directory for archive extraction
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn set_dev_mode(&mut self, dev_mode: bool) {
        self.dev_mode = dev_mode;
    }

    pub fn dev_mode(&self) -> bool {
        self.dev_mode
    }

    pub fn context(&self) -> &AssetContext {
        &self.ctx
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Register a named asset alias; the first registration of a key wins
    pub fn map(&mut self, name: &str, source: &str, attributes: Attributes) {
        self.named.map(name, source, attributes);
    }

    /// All named assets in registration order
    pub fn named_assets(&mut self) -> &IndexMap<String, NamedAsset> {
        self.named.all()
    }

    pub fn clear_named(&mut self) {
        self.named.clear();
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains(name)
    }

    pub fn mark_loaded(&mut self, name: &str) {
        self.loaded.insert(name.to_string());
    }

    /// Names handled so far, in order
    pub fn loaded(&self) -> Vec<&str> {
        self.loaded.iter().map(String::as_str).collect()
    }

    pub fn clear_loaded(&mut self) {
        self.loaded.clear();
    }

    /// Every entry in the persisted cache map
    pub fn cache_map_snapshot(&mut self) -> &BTreeMap<String, StoredEntry> {
        self.map.snapshot()
    }

    /// Public URL of the cached copy of `reference`; a mapped entry's
    /// recorded location wins over the freshly resolved one
    pub fn url(&mut self, reference: &str) -> String {
        let entry = self.build_entry(reference, Attributes::new());
        match self.map.lookup(entry.name()) {
            Some(cached) => self.storage.url(cached.disk_path()),
            None => self.storage.url(entry.disk_path()),
        }
    }

    /// Write the cache map if it changed. Returns whether anything was written.
    pub fn flush(&mut self) -> InhouseResult<bool> {
        self.map.flush()
    }

    /// Internalize a URL or local asset
    pub fn internalize(&mut self, reference: &str, render: bool, attributes: Attributes) -> Status {
        let entry = self.build_entry(reference, attributes);

        if self.is_loaded(entry.name()) {
            debug!("{} already loaded", entry.name());
            return Status::Loaded;
        }
        self.mark_loaded(entry.name());

        if let Some(mapped) = self.map.lookup(entry.name()) {
            if !self.dev_mode {
                self.render_cached(render, &mapped);
                return Status::InCache;
            }

            let changed = if mapped.is_url() {
                mapped.source() != entry.source()
            } else {
                mapped.content_hash() != entry.content_hash()
            };

            if changed {
                debug!("{} changed since it was cached, replacing", entry.name());
                return self.fetch_and_store(entry, render, Some(mapped));
            }

            self.render_cached(render, &mapped);
            return Status::InCache;
        }

        if !entry.is_url() && !self.ctx.is_under_project(entry.source()) {
            if entry.exists_on_disk(self.storage.as_ref()) {
                self.render_cached(render, &entry);
                return Status::InCache;
            }

            debug!("{} is outside the project, serving as given", entry.reference());
            self.render_fallback(render, &entry);
            return Status::Invalid;
        }

        if !self.dev_mode && entry.exists_on_disk(self.storage.as_ref()) {
            self.render_cached(render, &entry);
            self.map.put(&entry);
            return Status::InCache;
        }

        if self.dev_mode && entry.is_url() && !self.force_url_cache {
            self.render_fallback(render, &entry);
            return Status::Disabled;
        }

        if entry.kind(&self.ctx) == SourceKind::Public {
            self.render_public(render, &entry);
            return Status::PublicFile;
        }

        self.fetch_and_store(entry, render, None)
    }

    /// Internalize an inline code block under `name`.
    ///
    /// Uncacheable blocks are echoed verbatim once per process. Cacheable
    /// blocks are stored under a content-hashed file name, and older hashed
    /// variants of the same name are removed.
    pub fn internalize_block(&mut self, name: &str, code: &str, render: bool, cacheable: bool) -> Status {
        let mut entry = self.build_entry(name, Attributes::new());

        if self.is_loaded(entry.name()) {
            return Status::Loaded;
        }

        if !cacheable {
            self.mark_loaded(entry.name());
            self.renderer.raw(code);
            return Status::Disabled;
        }

        let clean = sanitize_block(code);
        let hash = content_hash(clean.as_bytes());
        let unhashed = entry.disk_path().to_string();
        let path = with_hash(&unhashed, &hash);

        self.mark_loaded(entry.name());

        if self.dev_mode {
            self.renderer.raw(code);
            return Status::Disabled;
        }

        entry.set_disk_path(path.clone());
        entry.set_content_hash(hash);

        if let Some(mapped) = self.map.lookup(entry.name()) {
            if mapped.disk_path() == path {
                self.render_cached(render, &mapped);
                return Status::InCache;
            }
        }

        if self.storage.exists(&path) {
            self.render_cached(render, &entry);
            self.map.put(&entry);
            return Status::InCache;
        }

        if let Err(e) = self.storage.put(&path, clean.as_bytes()) {
            warn!("Failed to cache code block {}: {}", name, e);
            self.renderer.raw(code);
            return Status::Invalid;
        }

        self.delete_stale_variants(&unhashed, &path);

        self.render_cached(render, &entry);
        self.map.put(&entry);
        self.listener.asset_cached(&entry);
        info!("Internalized code block {} as {}", name, path);

        Status::Internalized
    }

    /// Download or copy an archive and extract it into the cache under `output_dir`
    pub fn internalize_archive(&mut self, reference: &str, output_dir: &str) -> Status {
        let mut entry = self.build_entry(reference, Attributes::new());
        let path = self.ctx.resolver.resolve(output_dir);

        if self.is_loaded(entry.name()) {
            return Status::Loaded;
        }
        self.mark_loaded(entry.name());

        if self.map.lookup(entry.name()).is_some() {
            return Status::InCache;
        }

        entry.set_disk_path(path.clone());

        let staging = match self.staging_dir() {
            Ok(staging) => staging,
            Err(e) => {
                warn!("Cannot stage archive {}: {}", reference, e);
                return Status::Invalid;
            }
        };

        let archive = if entry.is_url() {
            if self.storage.exists(&path) && !self.dev_mode {
                self.map.put(&entry);
                return Status::InCache;
            }

            let content = match self.fetcher.get(entry.source()) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Failed to download archive {}: {}", reference, e);
                    return Status::Invalid;
                }
            };

            let target = staging.path().join(archive_file_name(entry.source()));
            if let Err(e) = fs::write(&target, content) {
                warn!("Failed to stage archive {}: {}", reference, e);
                return Status::Invalid;
            }
            target
        } else if Path::new(entry.source()).is_file() {
            if self.storage.exists(&path) && !self.dev_mode {
                self.map.put(&entry);
                return Status::InCache;
            }

            let target = staging.path().join(archive_file_name(entry.source()));
            if let Err(e) = fs::copy(entry.source(), &target) {
                warn!("Failed to stage archive {}: {}", reference, e);
                return Status::Invalid;
            }
            target
        } else {
            debug!("{} is neither a URL nor a local archive", reference);
            return Status::Invalid;
        };

        if let Err(e) = self.archiver.unarchive(&archive, staging.path()) {
            warn!("Failed to extract {}: {}", reference, e);
            return Status::Invalid;
        }

        if let Err(e) = self.copy_tree(staging.path(), &path, Some(&archive)) {
            warn!("Failed to cache archive {}: {}", reference, e);
            return Status::Invalid;
        }

        self.map.put(&entry);
        self.listener.asset_cached(&entry);
        info!("Internalized archive {} into {}", reference, path);

        Status::Internalized
    }

    /// Copy a local directory into the cache under `output_dir`
    pub fn internalize_directory(&mut self, reference: &str, output_dir: &str) -> Status {
        let mut entry = self.build_entry(reference, Attributes::new());
        let path = self.ctx.resolver.resolve(output_dir);

        if self.is_loaded(entry.name()) {
            return Status::Loaded;
        }
        self.mark_loaded(entry.name());

        if self.map.lookup(entry.name()).is_some() {
            return Status::InCache;
        }

        entry.set_disk_path(path.clone());

        if self.storage.exists(&path) && !self.dev_mode {
            self.map.put(&entry);
            return Status::InCache;
        }

        let source = PathBuf::from(entry.source());
        if !source.is_dir() {
            debug!("{} is not a directory", reference);
            return Status::Invalid;
        }

        if let Err(e) = self.copy_tree(&source, &path, None) {
            warn!("Failed to cache directory {}: {}", reference, e);
            return Status::Invalid;
        }

        self.map.put(&entry);
        self.listener.asset_cached(&entry);
        info!("Internalized directory {} into {}", reference, path);

        Status::Internalized
    }

    /// Resolve a named alias and merge attributes: alias defaults first,
    /// call-site attributes override.
    fn build_entry(&mut self, reference: &str, attributes: Attributes) -> CacheEntry {
        let (source, mut merged) = match self.named.get(reference) {
            Some(named) => (named.source.clone(), named.attributes.clone()),
            None => (reference.to_string(), Attributes::new()),
        };
        merged.extend(attributes);

        CacheEntry::build(&self.ctx, reference, &source, merged)
    }

    /// Fetch or read the source and store it; `replaced` is the stale map
    /// entry being superseded, whose file is deleted once the write succeeds.
    fn fetch_and_store(&mut self, mut entry: CacheEntry, render: bool, replaced: Option<CacheEntry>) -> Status {
        let content = match entry.content(self.fetcher.as_ref()) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to load {}: {}", entry.reference(), e);
                self.render_fallback(render, &entry);
                return Status::Invalid;
            }
        };

        if let Err(e) = self.storage.put(entry.disk_path(), &content) {
            warn!("{}", e);
            self.render_fallback(render, &entry);
            return Status::Invalid;
        }

        if let Some(old) = replaced {
            if old.disk_path() != entry.disk_path() {
                if let Err(e) = self.storage.delete(old.disk_path()) {
                    warn!("Failed to delete stale copy {}: {}", old.disk_path(), e);
                }
            }
            self.map.remove(&old);
        }

        if !entry.is_url() {
            entry.set_content_hash(content_hash(&content));
        }

        self.render_cached(render, &entry);
        self.map.put(&entry);
        self.listener.asset_cached(&entry);
        info!("Internalized {} as {}", entry.reference(), entry.disk_path());

        Status::Internalized
    }

    /// Delete every hashed sibling of `unhashed` except `keep`
    fn delete_stale_variants(&self, unhashed: &str, keep: &str) {
        let dir = unhashed.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");

        let files = match self.storage.list_files(dir) {
            Ok(files) => files,
            Err(e) => {
                warn!("Failed to list {}: {}", dir, e);
                return;
            }
        };

        for file in files {
            if file != keep && is_hashed_variant(unhashed, &file) {
                debug!("Deleting stale block {}", file);
                if let Err(e) = self.storage.delete(&file) {
                    warn!("Failed to delete {}: {}", file, e);
                }
            }
        }
    }

    /// Put every file below `source` into storage under `dest`
    fn copy_tree(&self, source: &Path, dest: &str, skip: Option<&Path>) -> InhouseResult<()> {
        for file in collect_files(source)? {
            if skip.is_some_and(|skip| skip == file.as_path()) {
                continue;
            }

            let Some(relative) = relative_path(source, &file) else {
                continue;
            };
            let contents = fs::read(&file).map_err(|e| InhouseError::Read {
                path: file.clone(),
                source: e,
            })?;
            self.storage.put(&format!("{}/{}", dest, relative), &contents)?;
        }
        Ok(())
    }

    fn staging_dir(&self) -> InhouseResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("inhouse-");

        match &self.temp_dir {
            Some(dir) => {
                fs::create_dir_all(dir)
                    .map_err(|e| InhouseError::io(format!("creating {}", dir.display()), e))?;
                builder
                    .tempdir_in(dir)
                    .map_err(|e| InhouseError::io("creating staging directory", e))
            }
            None => builder
                .tempdir()
                .map_err(|e| InhouseError::io("creating staging directory", e)),
        }
    }

    fn render_cached(&mut self, render: bool, entry: &CacheEntry) {
        if render {
            let src = self.storage.url(entry.disk_path());
            self.renderer.write(entry, &src);
        }
    }

    fn render_public(&mut self, render: bool, entry: &CacheEntry) {
        if render {
            let src = match relative_path(&self.ctx.public_dir, Path::new(entry.source())) {
                Some(relative) => format!("/{}", relative),
                None => entry.reference().to_string(),
            };
            self.renderer.write(entry, &src);
        }
    }

    fn render_fallback(&mut self, render: bool, entry: &CacheEntry) {
        if render {
            let src = if entry.is_url() {
                entry.source().to_string()
            } else {
                format!("/{}", entry.reference().trim_start_matches('/'))
            };
            self.renderer.write(entry, &src);
        }
    }
}

impl Drop for AssetManager {
    fn drop(&mut self) {
        if let Err(e) = self.map.flush() {
            warn!("Failed to save cache map {}: {}", self.map.sidecar(), e);
        }
    }
}

/// File name to stage a downloaded or copied archive under
fn archive_file_name(source: &str) -> String {
    let trimmed = source.split(['?', '#']).next().unwrap_or(source);
    trimmed
        .rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .filter(|name| !name.contains(':'))
        .unwrap_or("archive")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubFetcher {
        bodies: HashMap<String, Vec<u8>>,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn new(bodies: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                bodies: bodies
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.as_bytes().to_vec()))
                    .collect(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl Fetcher for StubFetcher {
        fn get(&self, url: &str) -> InhouseResult<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| InhouseError::fetch(url, "status code 404"))
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Renderer for Recorder {
        fn write(&mut self, _entry: &CacheEntry, src: &str) {
            self.0.lock().unwrap().push(src.to_string());
        }

        fn raw(&mut self, code: &str) {
            self.0.lock().unwrap().push(format!("raw:{}", code));
        }
    }

    /// Reads from memory, refuses every write
    struct ReadOnlyStorage(MemoryStorage);

    impl Storage for ReadOnlyStorage {
        fn exists(&self, path: &str) -> bool {
            self.0.exists(path)
        }

        fn get(&self, path: &str) -> InhouseResult<Vec<u8>> {
            self.0.get(path)
        }

        fn put(&self, path: &str, _contents: &[u8]) -> InhouseResult<()> {
            Err(InhouseError::write(path, "read-only file system"))
        }

        fn delete(&self, path: &str) -> InhouseResult<()> {
            self.0.delete(path)
        }

        fn delete_directory(&self, dir: &str) -> InhouseResult<()> {
            self.0.delete_directory(dir)
        }

        fn url(&self, path: &str) -> String {
            self.0.url(path)
        }

        fn list_files(&self, dir: &str) -> InhouseResult<Vec<String>> {
            self.0.list_files(dir)
        }
    }

    fn manager(root: &Path, storage: Arc<MemoryStorage>, fetcher: Arc<StubFetcher>) -> AssetManager {
        let ctx = AssetContext::new("inhouse", root, root.join("public"));
        AssetManager::new(ctx, storage, fetcher)
    }

    #[test]
    fn sanitize_strips_wrapper_and_indent() {
        assert_eq!(sanitize_block("<script>console.log(1)</script>"), "console.log(1)");
        assert_eq!(
            sanitize_block("\n  <style media=\"all\">\n\n    body {\n      color: red;\n    }\n  </style>\n"),
            "body {\n  color: red;\n}"
        );
        assert_eq!(sanitize_block("let a = 1;"), "let a = 1;");
    }

    #[test]
    fn archive_file_names() {
        assert_eq!(archive_file_name("https://x.test/pkg/bundle.zip?v=2"), "bundle.zip");
        assert_eq!(archive_file_name("/srv/app/files/dist.tar.gz"), "dist.tar.gz");
        assert_eq!(archive_file_name("https://x.test"), "archive");
    }

    #[test]
    fn url_is_fetched_once() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = Arc::new(MemoryStorage::new("/storage"));
        let fetcher = StubFetcher::new(&[("https://cdn.example.com/lib.js", "var x=1;")]);
        let mut manager = manager(temp.path(), storage.clone(), fetcher.clone());

        let url = "https://cdn.example.com/lib.js";
        assert_eq!(manager.internalize(url, false, Attributes::new()), Status::Internalized);
        assert_eq!(manager.internalize(url, false, Attributes::new()), Status::Loaded);

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(storage.get("inhouse/cdn.example.com/lib.js").unwrap(), b"var x=1;");
        assert_eq!(manager.loaded(), vec![url]);
    }

    #[test]
    fn fetch_failure_is_invalid_with_fallback() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = Arc::new(MemoryStorage::new("/storage"));
        let recorder = Recorder::default();
        let mut manager = manager(temp.path(), storage.clone(), StubFetcher::new(&[]))
            .with_renderer(Box::new(recorder.clone()));

        let status = manager.internalize("https://cdn.example.com/gone.js", true, Attributes::new());

        assert_eq!(status, Status::Invalid);
        assert!(storage.paths().is_empty());
        assert_eq!(*recorder.0.lock().unwrap(), vec!["https://cdn.example.com/gone.js"]);
    }

    #[test]
    fn write_failure_is_invalid_with_fallback() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = Arc::new(ReadOnlyStorage(MemoryStorage::new("/storage")));
        let recorder = Recorder::default();
        let url = "https://cdn.example.com/lib.js";
        let fetcher = StubFetcher::new(&[(url, "var x=1;")]);
        let ctx = AssetContext::new("inhouse", temp.path(), temp.path().join("public"));
        let mut manager = AssetManager::new(ctx, storage.clone(), fetcher)
            .with_renderer(Box::new(recorder.clone()));

        assert_eq!(manager.internalize(url, true, Attributes::new()), Status::Invalid);

        assert!(!storage.exists("inhouse/cdn.example.com/lib.js"));
        assert_eq!(*recorder.0.lock().unwrap(), vec![url]);
        assert!(manager.cache_map_snapshot().is_empty());
        assert!(!manager.flush().unwrap());
    }

    #[test]
    fn urls_sharing_the_project_root_name_are_cached_apart() {
        let storage = Arc::new(MemoryStorage::new("/storage"));
        let nested = "https://cdn.test/app/x.js";
        let flat = "https://cdn.test/appx.js";
        let fetcher = StubFetcher::new(&[(nested, "nested"), (flat, "flat")]);
        let ctx = AssetContext::new("inhouse", "/app", "/app/public");
        let mut manager = AssetManager::new(ctx, storage.clone(), fetcher.clone());

        assert_eq!(manager.internalize(nested, false, Attributes::new()), Status::Internalized);
        assert_eq!(manager.internalize(flat, false, Attributes::new()), Status::Internalized);

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(storage.get("inhouse/cdn.test/app/x.js").unwrap(), b"nested");
        assert_eq!(storage.get("inhouse/cdn.test/appx.js").unwrap(), b"flat");
    }

    #[test]
    fn cached_render_uses_storage_url() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = Arc::new(MemoryStorage::new("/storage"));
        let recorder = Recorder::default();
        let fetcher = StubFetcher::new(&[("https://cdn.example.com/a.css", "a{}")]);
        let mut manager = manager(temp.path(), storage, fetcher).with_renderer(Box::new(recorder.clone()));

        manager.internalize("https://cdn.example.com/a.css", true, Attributes::new());
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["/storage/inhouse/cdn.example.com/a.css"]
        );
    }

    #[test]
    fn public_file_is_not_copied() {
        let temp = tempfile::TempDir::new().unwrap();
        let public = temp.path().join("public/css/site.css");
        fs::create_dir_all(public.parent().unwrap()).unwrap();
        fs::write(&public, "body{}").unwrap();

        let storage = Arc::new(MemoryStorage::new("/storage"));
        let recorder = Recorder::default();
        let mut manager = manager(temp.path(), storage.clone(), StubFetcher::new(&[]))
            .with_renderer(Box::new(recorder.clone()));

        assert_eq!(
            manager.internalize("css/site.css", true, Attributes::new()),
            Status::PublicFile
        );
        assert!(storage.paths().is_empty());
        assert_eq!(*recorder.0.lock().unwrap(), vec!["/css/site.css"]);
    }

    #[test]
    fn local_file_is_copied_with_hash() {
        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("resources/js/app.js");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "let a;").unwrap();

        let storage = Arc::new(MemoryStorage::new("/storage"));
        let mut manager = manager(temp.path(), storage.clone(), StubFetcher::new(&[]));
        let source = file.to_string_lossy().to_string();

        assert_eq!(manager.internalize(&source, false, Attributes::new()), Status::Internalized);
        assert_eq!(storage.get("inhouse/resources/js/app.js").unwrap(), b"let a;");
        assert_eq!(
            manager.cache_map_snapshot()[&source].content_hash,
            content_hash(b"let a;")
        );
    }

    #[test]
    fn outside_project_is_invalid() {
        let temp = tempfile::TempDir::new().unwrap();
        let project = temp.path().join("app");
        fs::create_dir_all(&project).unwrap();
        let outside = temp.path().join("secret.js");
        fs::write(&outside, "nope").unwrap();

        let storage = Arc::new(MemoryStorage::new("/storage"));
        let mut manager = manager(&project, storage.clone(), StubFetcher::new(&[]));

        let status = manager.internalize(&outside.to_string_lossy(), false, Attributes::new());
        assert_eq!(status, Status::Invalid);
        assert!(storage.paths().is_empty());
    }

    #[test]
    fn existing_copy_heals_the_map() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = Arc::new(MemoryStorage::new("/storage"));
        storage.put("inhouse/cdn.example.com/lib.js", b"var x=1;").unwrap();
        let fetcher = StubFetcher::new(&[]);
        let mut manager = manager(temp.path(), storage, fetcher.clone());

        let url = "https://cdn.example.com/lib.js";
        assert_eq!(manager.internalize(url, false, Attributes::new()), Status::InCache);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert!(manager.cache_map_snapshot().contains_key(url));
    }

    #[test]
    fn dev_mode_without_forced_url_cache_is_disabled() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = Arc::new(MemoryStorage::new("/storage"));
        let fetcher = StubFetcher::new(&[("https://cdn.example.com/lib.js", "var x=1;")]);
        let mut manager = manager(temp.path(), storage.clone(), fetcher.clone())
            .with_dev_mode(true)
            .with_force_url_cache(false);

        let status = manager.internalize("https://cdn.example.com/lib.js", false, Attributes::new());
        assert_eq!(status, Status::Disabled);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert!(storage.paths().is_empty());
    }

    #[test]
    fn named_attributes_merge_under_call_site() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = Arc::new(MemoryStorage::new("/storage"));
        let fetcher = StubFetcher::new(&[("https://cdn.example.com/vue.js", "vue")]);
        let mut manager = manager(temp.path(), storage, fetcher);

        let mut defaults = Attributes::new();
        defaults.insert("defer".into(), true.into());
        defaults.insert("integrity".into(), "sha384-old".into());
        manager.map("vue", "https://cdn.example.com/vue.js", defaults);

        let mut call_site = Attributes::new();
        call_site.insert("integrity".into(), "sha384-new".into());
        assert_eq!(manager.internalize("vue", false, call_site), Status::Internalized);

        let stored = &manager.cache_map_snapshot()["vue"];
        assert_eq!(stored.asset_disk_path, "inhouse/cdn.example.com/vue.js");
        assert_eq!(stored.attributes["integrity"].to_string(), "sha384-new");
        assert_eq!(stored.attributes["defer"].to_string(), "true");
    }

    #[test]
    fn uncacheable_block_echoes_once() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = Arc::new(MemoryStorage::new("/storage"));
        let recorder = Recorder::default();
        let mut manager = manager(temp.path(), storage.clone(), StubFetcher::new(&[]))
            .with_renderer(Box::new(recorder.clone()));

        assert_eq!(manager.internalize_block("inline.js", "x()", true, false), Status::Disabled);
        assert_eq!(manager.internalize_block("inline.js", "x()", true, false), Status::Loaded);
        assert_eq!(*recorder.0.lock().unwrap(), vec!["raw:x()"]);
        assert!(storage.paths().is_empty());
    }

    #[test]
    fn changed_block_replaces_old_variant() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = Arc::new(MemoryStorage::new("/storage"));

        {
            let mut first = manager(temp.path(), storage.clone(), StubFetcher::new(&[]));
            assert_eq!(
                first.internalize_block("app.js", "<script>one()</script>", false, true),
                Status::Internalized
            );
        }

        let mut second = manager(temp.path(), storage.clone(), StubFetcher::new(&[]));
        assert_eq!(
            second.internalize_block("app.js", "<script>two()</script>", false, true),
            Status::Internalized
        );

        let blocks: Vec<_> = storage
            .paths()
            .into_iter()
            .filter(|p| p.starts_with("inhouse/app-"))
            .collect();
        assert_eq!(
            blocks,
            vec![with_hash("inhouse/app.js", &content_hash(b"two()"))]
        );
        assert_eq!(
            second.url("app.js"),
            format!("/storage/{}", with_hash("inhouse/app.js", &content_hash(b"two()")))
        );
    }

    #[test]
    fn dev_mode_block_is_not_cached() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = Arc::new(MemoryStorage::new("/storage"));
        let mut manager = manager(temp.path(), storage.clone(), StubFetcher::new(&[])).with_dev_mode(true);

        assert_eq!(
            manager.internalize_block("app.js", "<script>a()</script>", false, true),
            Status::Disabled
        );
        assert!(storage.paths().is_empty());
    }

    #[test]
    fn directory_is_copied() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("vendor/icons");
        fs::create_dir_all(dir.join("svg")).unwrap();
        fs::write(dir.join("svg/a.svg"), "<svg/>").unwrap();
        fs::write(dir.join("icons.css"), ".i{}").unwrap();

        let storage = Arc::new(MemoryStorage::new("/storage"));
        let mut manager = manager(temp.path(), storage.clone(), StubFetcher::new(&[]));
        let source = dir.to_string_lossy().to_string();

        assert_eq!(manager.internalize_directory(&source, "icons"), Status::Internalized);
        assert_eq!(storage.get("inhouse/icons/svg/a.svg").unwrap(), b"<svg/>");
        assert_eq!(storage.get("inhouse/icons/icons.css").unwrap(), b".i{}");
        assert_eq!(manager.internalize_directory(&source, "icons"), Status::Loaded);
    }

    #[test]
    fn missing_directory_is_invalid() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = Arc::new(MemoryStorage::new("/storage"));
        let mut manager = manager(temp.path(), storage, StubFetcher::new(&[]));

        assert_eq!(manager.internalize_directory("no/such/dir", "x"), Status::Invalid);
    }

    #[test]
    fn archive_url_is_extracted() {
        use std::io::Write;

        let temp = tempfile::TempDir::new().unwrap();
        let zip_path = temp.path().join("bundle.zip");
        {
            let mut writer = zip::ZipWriter::new(fs::File::create(&zip_path).unwrap());
            writer
                .start_file("dist/lib.js", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"export {}").unwrap();
            writer.finish().unwrap();
        }
        let bytes = fs::read(&zip_path).unwrap();

        let url = "https://cdn.example.com/bundle.zip";
        let fetcher = Arc::new(StubFetcher {
            bodies: HashMap::from([(url.to_string(), bytes)]),
            calls: AtomicUsize::new(0),
        });
        let storage = Arc::new(MemoryStorage::new("/storage"));
        let mut manager = manager(temp.path(), storage.clone(), fetcher)
            .with_temp_dir(temp.path().join("staging"));

        assert_eq!(manager.internalize_archive(url, "bundle"), Status::Internalized);
        assert_eq!(storage.get("inhouse/bundle/dist/lib.js").unwrap(), b"export {}");
        assert!(!storage.exists("inhouse/bundle/bundle.zip"));
        assert_eq!(manager.cache_map_snapshot()[url].asset_disk_path, "inhouse/bundle");
    }

    #[test]
    fn non_archive_is_invalid() {
        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("notes.txt");
        fs::write(&file, "plain").unwrap();

        let storage = Arc::new(MemoryStorage::new("/storage"));
        let mut manager = manager(temp.path(), storage.clone(), StubFetcher::new(&[]));

        assert_eq!(
            manager.internalize_archive(&file.to_string_lossy(), "notes"),
            Status::Invalid
        );
        assert!(storage.paths().is_empty());
    }

    #[test]
    fn drop_flushes_the_map() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = Arc::new(MemoryStorage::new("/storage"));
        let fetcher = StubFetcher::new(&[("https://cdn.example.com/lib.js", "var x=1;")]);

        {
            let mut manager = manager(temp.path(), storage.clone(), fetcher);
            manager.internalize("https://cdn.example.com/lib.js", false, Attributes::new());
        }

        assert!(storage.exists("inhouse.map.json"));
    }

    #[test]
    fn url_points_at_the_cached_copy() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = Arc::new(MemoryStorage::new("https://app.test/storage"));
        let mut manager = manager(temp.path(), storage, StubFetcher::new(&[]));

        assert_eq!(
            manager.url("https://cdn.example.com/lib.js?v=3"),
            "https://app.test/storage/inhouse/cdn.example.com/lib.js"
        );
    }
}
