//! Template scanning for batch internalization
//!
//! Finds `@inhouse(...)`, `@inhouseArchive(...)` and `@inhouseDirectory(...)`
//! directives in template files. Arguments are parsed as literals only:
//! quoted strings, `true`/`false`, `null`, numbers and `['key' => literal]`
//! arrays. A directive with any other argument (a variable, a function call,
//! an interpolated string) cannot be internalized ahead of time; it is
//! reported as skipped and never evaluated.

use crate::asset::{AttrValue, Attributes};
use crate::error::InhouseResult;
use crate::storage::collect_files;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@(inhouseArchive|inhouseDirectory|inhouse)\s*\(").expect("valid regex")
});

/// Which engine operation a directive calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    Asset,
    Archive,
    Directory,
}

impl DirectiveKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "inhouse" => Some(Self::Asset),
            "inhouseArchive" => Some(Self::Archive),
            "inhouseDirectory" => Some(Self::Directory),
            _ => None,
        }
    }

    /// Directive name as written in templates
    pub fn directive(&self) -> &'static str {
        match self {
            Self::Asset => "@inhouse",
            Self::Archive => "@inhouseArchive",
            Self::Directory => "@inhouseDirectory",
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.directive())
    }
}

/// A literal argument value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Bool(bool),
    Null,
    Number(String),
    /// Array entries; positional entries have no key
    Array(Vec<(Option<String>, Literal)>),
}

impl Literal {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Bool(_) => "boolean",
            Self::Null => "null",
            Self::Number(_) => "number",
            Self::Array(_) => "array",
        }
    }
}

/// What to internalize for one directive
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Request {
    Asset {
        reference: String,
        attributes: Attributes,
    },
    Archive {
        reference: String,
        output: String,
    },
    Directory {
        reference: String,
        output: String,
    },
}

impl Request {
    /// The asset reference the directive names
    pub fn reference(&self) -> &str {
        match self {
            Self::Asset { reference, .. }
            | Self::Archive { reference, .. }
            | Self::Directory { reference, .. } => reference,
        }
    }

    pub fn kind(&self) -> DirectiveKind {
        match self {
            Self::Asset { .. } => DirectiveKind::Asset,
            Self::Archive { .. } => DirectiveKind::Archive,
            Self::Directory { .. } => DirectiveKind::Directory,
        }
    }
}

/// A statically internalizable directive
#[derive(Debug, Clone, Serialize)]
pub struct Directive {
    pub file: PathBuf,
    pub line: usize,
    pub request: Request,
}

/// A directive that cannot be internalized ahead of time
#[derive(Debug, Clone, Serialize)]
pub struct Skipped {
    pub file: PathBuf,
    pub line: usize,
    pub kind: DirectiveKind,
    pub reason: String,
}

/// Result of scanning a set of template directories
#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub files: usize,
    pub directives: Vec<Directive>,
    pub skipped: Vec<Skipped>,
}

/// Template files below `root` whose names end in one of `extensions`
pub fn template_files(root: &Path, extensions: &[String]) -> InhouseResult<Vec<PathBuf>> {
    if !root.is_dir() {
        debug!("View path {} does not exist", root.display());
        return Ok(Vec::new());
    }

    Ok(collect_files(root)?
        .into_iter()
        .filter(|file| {
            let name = file.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            extensions.iter().any(|ext| name.ends_with(ext.as_str()))
        })
        .collect())
}

/// Scan every template under `view_paths`
pub fn scan(view_paths: &[PathBuf], extensions: &[String]) -> InhouseResult<ScanReport> {
    let mut report = ScanReport::default();

    for dir in view_paths {
        for file in template_files(dir, extensions)? {
            report.files += 1;

            let source = match fs::read_to_string(&file) {
                Ok(source) => source,
                Err(e) => {
                    warn!("Skipping unreadable template {}: {}", file.display(), e);
                    continue;
                }
            };

            let (directives, skipped) = scan_source(&file, &source);
            report.directives.extend(directives);
            report.skipped.extend(skipped);
        }
    }

    debug!(
        "Scanned {} templates: {} directives, {} skipped",
        report.files,
        report.directives.len(),
        report.skipped.len()
    );
    Ok(report)
}

/// Find the directives in one template's source
pub fn scan_source(file: &Path, source: &str) -> (Vec<Directive>, Vec<Skipped>) {
    let mut directives = Vec::new();
    let mut skipped = Vec::new();

    for captures in DIRECTIVE.captures_iter(source) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let Some(kind) = DirectiveKind::from_name(name.as_str()) else {
            continue;
        };
        let line = source[..whole.start()].matches('\n').count() + 1;

        let result = split_arguments(&source[whole.end()..])
            .ok_or_else(|| "unterminated argument list".to_string())
            .and_then(|args| {
                args.iter()
                    .map(|arg| parse_literal(arg))
                    .collect::<Result<Vec<_>, _>>()
            })
            .and_then(|args| build_request(kind, args));

        match result {
            Ok(request) => directives.push(Directive {
                file: file.to_path_buf(),
                line,
                request,
            }),
            Err(reason) => skipped.push(Skipped {
                file: file.to_path_buf(),
                line,
                kind,
                reason,
            }),
        }
    }

    (directives, skipped)
}

/// Split the text following an opening parenthesis into top-level
/// arguments, up to the matching closing parenthesis.
fn split_arguments(text: &str) -> Option<Vec<&str>> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' if depth == 0 => {
                let last = text[start..i].trim();
                if !last.is_empty() || !args.is_empty() {
                    args.push(last);
                }
                return Some(args);
            }
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                args.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    None
}

/// Parse a single argument as a literal
pub fn parse_literal(text: &str) -> Result<Literal, String> {
    let mut parser = LiteralParser::new(text);
    let value = parser.value()?;
    parser.skip_whitespace();
    if !parser.at_end() {
        return Err(format!("not a literal: {}", text.trim()));
    }
    Ok(value)
}

fn build_request(kind: DirectiveKind, args: Vec<Literal>) -> Result<Request, String> {
    let mut args = args.into_iter();

    let reference = match args.next() {
        Some(Literal::Str(reference)) if !reference.is_empty() => reference,
        Some(other) => return Err(format!("expected a string reference, found {}", other.type_name())),
        None => return Err("missing asset reference".to_string()),
    };

    match kind {
        DirectiveKind::Asset => {
            // The render flag is irrelevant ahead of time
            let _render = args.next();
            let attributes = match args.next() {
                None | Some(Literal::Null) => Attributes::new(),
                Some(Literal::Array(entries)) => attributes_from(entries)?,
                Some(other) => {
                    return Err(format!("expected attribute array, found {}", other.type_name()))
                }
            };
            Ok(Request::Asset {
                reference,
                attributes,
            })
        }
        DirectiveKind::Archive | DirectiveKind::Directory => {
            let output = match args.next() {
                Some(Literal::Str(output)) => output,
                Some(other) => {
                    return Err(format!("expected a string output directory, found {}", other.type_name()))
                }
                None => return Err("missing output directory".to_string()),
            };
            Ok(if kind == DirectiveKind::Archive {
                Request::Archive { reference, output }
            } else {
                Request::Directory { reference, output }
            })
        }
    }
}

fn attributes_from(entries: Vec<(Option<String>, Literal)>) -> Result<Attributes, String> {
    let mut attributes = Attributes::new();

    for (key, value) in entries {
        let value = match value {
            Literal::Str(text) | Literal::Number(text) => AttrValue::Text(text),
            Literal::Bool(flag) => AttrValue::Flag(flag),
            Literal::Null => continue,
            Literal::Array(_) => return Err("nested array in attributes".to_string()),
        };

        match (key, value) {
            (Some(key), value) => {
                attributes.insert(key, value);
            }
            // `['defer']` names a bare attribute
            (None, AttrValue::Text(name)) => {
                attributes.insert(name, AttrValue::Flag(true));
            }
            (None, AttrValue::Flag(_)) => return Err("attribute without a name".to_string()),
        }
    }

    Ok(attributes)
}

struct LiteralParser<'a> {
    text: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: &str) -> bool {
        let end = self.pos + expected.chars().count();
        if end > self.chars.len() {
            return false;
        }
        let found: String = self.chars[self.pos..end].iter().collect();
        if found == expected {
            self.pos = end;
            true
        } else {
            false
        }
    }

    fn non_literal(&self) -> String {
        format!("not a literal: {}", self.text.trim())
    }

    fn value(&mut self) -> Result<Literal, String> {
        self.skip_whitespace();

        match self.peek() {
            Some('\'') | Some('"') => self.string().map(Literal::Str),
            Some('[') => self.array(),
            Some(c) if c == '-' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_ascii_alphabetic() => self.keyword(),
            _ => Err(self.non_literal()),
        }
    }

    fn keyword(&mut self) -> Result<Literal, String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }

        let word: String = self.chars[start..self.pos].iter().collect();
        match word.to_ascii_lowercase().as_str() {
            "true" => Ok(Literal::Bool(true)),
            "false" => Ok(Literal::Bool(false)),
            "null" => Ok(Literal::Null),
            _ => Err(self.non_literal()),
        }
    }

    fn number(&mut self) -> Result<Literal, String> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }

        let mut digits = 0;
        let mut dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits += 1;
            } else if c == '.' && !dot {
                dot = true;
            } else {
                break;
            }
            self.pos += 1;
        }

        if digits == 0 {
            return Err(self.non_literal());
        }
        Ok(Literal::Number(self.chars[start..self.pos].iter().collect()))
    }

    fn string(&mut self) -> Result<String, String> {
        let Some(quote) = self.peek() else {
            return Err(self.non_literal());
        };
        self.pos += 1;

        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;

            if c == quote {
                return Ok(out);
            }

            if c == '\\' {
                let Some(next) = self.peek() else { break };
                self.pos += 1;
                match (quote, next) {
                    (_, '\\') => out.push('\\'),
                    (q, n) if n == q => out.push(n),
                    ('"', 'n') => out.push('\n'),
                    ('"', 't') => out.push('\t'),
                    ('"', '$') => out.push('$'),
                    (_, n) => {
                        out.push('\\');
                        out.push(n);
                    }
                }
                continue;
            }

            if quote == '"' && c == '$' {
                return Err(format!("interpolated string: {}", self.text.trim()));
            }
            out.push(c);
        }

        Err(format!("unterminated string: {}", self.text.trim()))
    }

    fn array(&mut self) -> Result<Literal, String> {
        self.pos += 1;
        let mut entries = Vec::new();

        loop {
            self.skip_whitespace();
            if self.eat("]") {
                return Ok(Literal::Array(entries));
            }

            let first = self.value()?;
            self.skip_whitespace();

            if self.eat("=>") {
                let key = match first {
                    Literal::Str(key) | Literal::Number(key) => key,
                    other => return Err(format!("array key cannot be {}", other.type_name())),
                };
                let value = self.value()?;
                entries.push((Some(key), value));
            } else {
                entries.push((None, first));
            }

            self.skip_whitespace();
            if self.eat(",") {
                continue;
            }
            if self.eat("]") {
                return Ok(Literal::Array(entries));
            }
            return Err(self.non_literal());
        }
    }
}
