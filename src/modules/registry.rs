//! Format registry
//!
//! Adapters announce the path patterns they understand together with a
//! priority. Resolving a URI picks the highest-priority pattern that matches
//! the whole URI; ties go to the earliest registration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use regex::Regex;

use crate::engines::storage::formats::Record;
use crate::engines::{EngineError, EngineResult};
use crate::modules::io::fasta;

/// Priority given to patterns that do not ask for one
pub const DEFAULT_PRIORITY: u32 = 10;

/// A path regex and its resolution priority
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    pub regex: &'static str,
    pub priority: u32,
}

impl PathPattern {
    pub fn new(regex: &'static str, priority: u32) -> Self {
        Self { regex, priority }
    }
}

/// File format capability plugged into a [`FormatRegistry`]
pub trait FormatAdapter: Send + Sync {
    /// Get the format name
    fn format_name(&self) -> &'static str;

    /// Patterns this adapter answers to
    fn path_patterns(&self) -> Vec<PathPattern>;

    /// Strip any scheme marker and return the file path, if `uri` is ours
    fn match_path(&self, uri: &str) -> Option<PathBuf>;

    fn load(&self, path: &Path) -> EngineResult<Vec<Record>>;

    fn dump(&self, records: &[Record], path: &Path) -> EngineResult<()>;

    fn delete(&self, path: &Path) -> EngineResult<()>;
}

struct Registration {
    pattern: Regex,
    priority: u32,
    adapter: Arc<dyn FormatAdapter>,
}

/// Ordered collection of adapters and their path patterns
#[derive(Default)]
pub struct FormatRegistry {
    entries: Vec<Registration>,
}

impl FormatRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every format this crate ships
    pub fn with_builtin_formats() -> EngineResult<Self> {
        let mut registry = Self::new();
        fasta::register(&mut registry)?;
        Ok(registry)
    }

    /// Register all patterns of `adapter`
    pub fn register(&mut self, adapter: Arc<dyn FormatAdapter>) -> EngineResult<()> {
        for pattern in adapter.path_patterns() {
            let regex = Regex::new(&format!("^(?:{})$", pattern.regex))?;
            log::debug!(
                "Registered {} pattern {} at priority {}",
                adapter.format_name(),
                pattern.regex,
                pattern.priority
            );
            self.entries.push(Registration {
                pattern: regex,
                priority: pattern.priority,
                adapter: adapter.clone(),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the adapter for `uri` and the file path it refers to
    pub fn resolve(&self, uri: &str) -> EngineResult<Resource> {
        let mut best: Option<&Registration> = None;
        for entry in self.entries.iter().filter(|e| e.pattern.is_match(uri)) {
            if best.map_or(true, |b| entry.priority > b.priority) {
                best = Some(entry);
            }
        }

        let entry = best.ok_or_else(|| EngineError::UnresolvedResource(uri.to_string()))?;
        let path = entry
            .adapter
            .match_path(uri)
            .ok_or_else(|| EngineError::UnresolvedResource(uri.to_string()))?;

        log::debug!(
            "Resolved {} as {} at priority {}",
            uri,
            entry.adapter.format_name(),
            entry.priority
        );

        Ok(Resource {
            adapter: entry.adapter.clone(),
            priority: entry.priority,
            path,
        })
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| {
                (e.adapter.format_name(), e.pattern.as_str(), e.priority)
            }))
            .finish()
    }
}

/// A resolved URI: the adapter to use and the path to use it on
#[derive(Clone)]
pub struct Resource {
    adapter: Arc<dyn FormatAdapter>,
    priority: u32,
    path: PathBuf,
}

impl Resource {
    pub fn format_name(&self) -> &'static str {
        self.adapter.format_name()
    }

    /// Priority of the pattern that matched
    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> EngineResult<Vec<Record>> {
        self.adapter.load(&self.path)
    }

    pub fn dump(&self, records: &[Record]) -> EngineResult<()> {
        self.adapter.dump(records, &self.path)
    }

    pub fn delete(&self) -> EngineResult<()> {
        self.adapter.delete(&self.path)
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("format", &self.adapter.format_name())
            .field("priority", &self.priority)
            .field("path", &self.path)
            .finish()
    }
}

static DEFAULT_REGISTRY: OnceLock<RwLock<FormatRegistry>> = OnceLock::new();

/// Process-wide registry, seeded with the built-in formats on first use
pub fn default_registry() -> &'static RwLock<FormatRegistry> {
    DEFAULT_REGISTRY.get_or_init(|| {
        let registry = FormatRegistry::with_builtin_formats().unwrap_or_else(|e| {
            log::error!("Failed to register built-in formats: {}", e);
            FormatRegistry::new()
        });
        RwLock::new(registry)
    })
}

/// Resolve `uri` against the process-wide registry
pub fn resolve(uri: &str) -> EngineResult<Resource> {
    default_registry().read().resolve(uri)
}
