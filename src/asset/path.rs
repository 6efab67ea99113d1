//! Cache path resolution
//!
//! Maps an asset's logical source (URL, absolute local path or relative
//! resource) onto a stable path inside the cache tree.

use super::entry::is_url;

/// Scheme markers and characters removed from every reference
const STRIPPED: &[&str] = &[
    "http://", "https://", "://", "<", ">", ":", "\"", "|", "\0", "*", "`", ";", "'", "+",
];

/// Derives on-disk cache paths for asset references
#[derive(Debug, Clone)]
pub struct PathResolver {
    /// Cache base prefix, always ending in `/`
    base: String,
    /// Project root prefix stripped from absolute local references
    project_root: String,
}

impl PathResolver {
    /// Create a resolver for a cache base prefix and a project root
    pub fn new(base: &str, project_root: &str) -> Self {
        let base = base.trim_matches('/');
        let base = if base.is_empty() {
            String::new()
        } else {
            format!("{}/", base)
        };

        Self {
            base,
            project_root: project_root.trim_end_matches(['/', '\\']).to_string(),
        }
    }

    /// Cache base prefix (empty or ending in `/`)
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Resolve a reference to its path on disk, relative to the storage root
    pub fn resolve(&self, reference: &str) -> String {
        format!("{}{}", self.base, self.clean(reference))
    }

    /// Strip the project root, scheme markers, unsafe characters and the
    /// query string, normalizing separators to `/`.
    ///
    /// Empty, `.` and `..` segments are dropped so the result can never
    /// climb out of the cache base.
    pub fn clean(&self, reference: &str) -> String {
        let mut cleaned = if is_url(reference) {
            reference.to_string()
        } else {
            self.strip_root(reference).to_string()
        };

        for marker in STRIPPED {
            cleaned = cleaned.replace(marker, "");
        }

        if let Some(query) = cleaned.find('?') {
            cleaned.truncate(query);
        }

        cleaned
            .replace('\\', "/")
            .split('/')
            .filter(|segment| !matches!(*segment, "" | "." | ".."))
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Drop a leading project root, matched on a segment boundary only
    fn strip_root<'a>(&self, reference: &'a str) -> &'a str {
        if self.project_root.is_empty() {
            return reference;
        }
        match reference.strip_prefix(self.project_root.as_str()) {
            Some("") => "",
            Some(rest) if rest.starts_with(['/', '\\']) => rest,
            _ => reference,
        }
    }
}
