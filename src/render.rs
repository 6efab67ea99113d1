//! HTML tag output for internalized assets
//!
//! The manager decides *what* source to point at; a `Renderer` turns that
//! into markup. `HtmlRenderer` picks a tag by file extension.

use crate::asset::{is_url, AttrValue, Attributes, CacheEntry};
use crate::error::{InhouseError, InhouseResult};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::warn;

/// Emits markup for assets
pub trait Renderer: Send {
    /// Emit the tag for `entry`, pointing at `src`
    fn write(&mut self, entry: &CacheEntry, src: &str);

    /// Emit raw code verbatim (uncached code blocks)
    fn raw(&mut self, code: &str);
}

/// Discards all output
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn write(&mut self, _entry: &CacheEntry, _src: &str) {}

    fn raw(&mut self, _code: &str) {}
}

/// Tag family selected from a file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Script,
    Style,
    Image,
    Media,
    Object,
    Track,
}

impl TagKind {
    /// Tag for the extension of `path`, ignoring any query string
    pub fn for_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let file = path.rsplit('/').next().unwrap_or(path);
        let (_, extension) = file.rsplit_once('.')?;

        match extension.to_ascii_lowercase().as_str() {
            "js" | "mjs" => Some(Self::Script),
            "css" => Some(Self::Style),
            "jpg" | "jpeg" | "png" | "webp" | "gif" | "svg" => Some(Self::Image),
            "mp3" | "ogg" | "wav" | "mp4" | "webm" | "avi" => Some(Self::Media),
            "pdf" => Some(Self::Object),
            "vtt" => Some(Self::Track),
            _ => None,
        }
    }

    fn render(&self, src: &str, args: &str) -> String {
        let src = escape_quotes(src);
        match self {
            Self::Script => format!("<script src=\"{}\"{}></script>", src, args),
            Self::Style => format!("<link href=\"{}\" rel=\"stylesheet\" type=\"text/css\"{}>", src, args),
            Self::Image => format!("<img src=\"{}\"{}>", src, args),
            Self::Media => format!("<source src=\"{}\"{}>", src, args),
            Self::Object => format!("<object data=\"{}\"{}></object>", src, args),
            Self::Track => format!("<track src=\"{}\"{}>", src, args),
        }
    }
}

fn escape_quotes(value: &str) -> String {
    value.replace('"', "&quot;")
}

/// Rendering options
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// CSP nonce added unless the call site sets one
    pub nonce: Option<String>,
    /// Query token appended to local URLs
    pub cache_buster: Option<String>,
    /// Strip `app_url` from rendered URLs
    pub relative_paths: bool,
    /// Application origin
    pub app_url: Option<String>,
}

/// Cache-busting token: first 12 hex chars of the SHA-256 of `path`'s contents
pub fn cache_buster_token(path: &Path) -> InhouseResult<String> {
    let contents = fs::read(path).map_err(|e| InhouseError::Io {
        context: format!("reading version file {}", path.display()),
        source: e,
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&contents);
    let result = hasher.finalize();

    Ok(hex::encode(&result[..6]))
}

/// Writes one HTML tag per asset to `out`
pub struct HtmlRenderer<W: Write + Send> {
    out: W,
    options: RenderOptions,
}

impl<W: Write + Send> HtmlRenderer<W> {
    /// Create a renderer writing to `out`
    pub fn new(out: W, options: RenderOptions) -> Self {
        Self { out, options }
    }

    /// Consume the renderer, returning the sink
    pub fn into_inner(self) -> W {
        self.out
    }

    /// URL to put in the tag for `src`
    pub fn asset_src(&self, src: &str) -> String {
        let mut src = src.to_string();

        if !is_url(&src) {
            if let Some(token) = &self.options.cache_buster {
                let separator = if src.contains('?') { '&' } else { '?' };
                src = format!("{}{}{}", src, separator, token);
            }
        }

        if self.options.relative_paths {
            if let Some(app_url) = &self.options.app_url {
                let app_url = app_url.trim_end_matches('/');
                if let Some(rest) = src.strip_prefix(app_url) {
                    if rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') {
                        src = format!("/{}", rest.trim_start_matches('/'));
                    }
                }
            }
        }

        src
    }

    /// Attribute string, each attribute prefixed by a space
    pub fn attributes(&self, attributes: &Attributes) -> String {
        let mut attributes = attributes.clone();
        if let Some(nonce) = &self.options.nonce {
            attributes
                .entry("nonce".to_string())
                .or_insert_with(|| AttrValue::Text(nonce.clone()));
        }

        let mut args = String::new();
        for (key, value) in &attributes {
            match value {
                AttrValue::Flag(false) => {}
                AttrValue::Flag(true) => {
                    args.push(' ');
                    args.push_str(key);
                }
                AttrValue::Text(text) if text.is_empty() => {
                    args.push(' ');
                    args.push_str(key);
                }
                AttrValue::Text(text) => {
                    args.push_str(&format!(" {}=\"{}\"", key, escape_quotes(text)));
                }
            }
        }
        args
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
            warn!("Failed to write asset output: {}", e);
        }
    }
}

impl<W: Write + Send> Renderer for HtmlRenderer<W> {
    fn write(&mut self, entry: &CacheEntry, src: &str) {
        let Some(kind) = TagKind::for_path(src) else {
            return;
        };

        let tag = kind.render(&self.asset_src(src), &self.attributes(entry.attributes()));
        self.emit(&tag);
        self.emit("\n");
    }

    fn raw(&mut self, code: &str) {
        self.emit(code);
    }
}
