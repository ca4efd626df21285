//! Script registry built from a directory scan.
//!
//! [`ScriptRegistry`] is an immutable `name -> descriptor` snapshot. A
//! reload never mutates a snapshot; [`RegistryHandle`] builds a fresh one
//! and swaps it in atomically, so readers always see a complete map.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::annotation::parse_script;
use super::descriptor::{ScriptDescriptor, ScriptMetadata};
use super::naming::derive_script_name;
use super::query::TagFilter;
use crate::error::{ParseError, ScriptError};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Immutable mapping from script name to descriptor.
#[derive(Debug, Clone, Default)]
pub struct ScriptRegistry {
    root: PathBuf,
    scripts: HashMap<String, ScriptDescriptor>,
}

impl ScriptRegistry {
    /// Scan `root` recursively and parse every regular file.
    ///
    /// Files that fail to parse are logged and left out; the scan itself
    /// never fails. A missing or unreadable root yields an empty registry.
    pub fn build(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        tracing::info!(directory = %root.display(), "Getting scripts from directory");

        let mut files = Vec::new();
        collect_files(&root, &mut files);

        let mut scripts = HashMap::new();
        for path in files {
            match load_script(&root, &path) {
                Ok(descriptor) => {
                    tracing::info!(
                        name = %descriptor.name,
                        path = %path.display(),
                        "Adding script"
                    );
                    if let Some(previous) = scripts.insert(descriptor.name.clone(), descriptor) {
                        tracing::info!(
                            name = %previous.name,
                            replaced = %previous.filename.display(),
                            by = %path.display(),
                            "Script name collision, later file replaces earlier one"
                        );
                    }
                }
                Err(ParseError::NotExecutable { path }) => {
                    tracing::warn!(path = %path.display(), "File is not executable, ignoring");
                }
                Err(err) => {
                    tracing::error!(path = %path.display(), error = %err, "Skipping script");
                }
            }
        }

        tracing::info!(count = scripts.len(), "Script registry built");
        Self { root, scripts }
    }

    /// Directory this snapshot was scanned from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ScriptDescriptor> {
        self.scripts.get(name)
    }

    /// Like [`get`](Self::get) but with a [`ScriptError::NotFound`] for the
    /// adapter layer to translate.
    pub fn require(&self, name: &str) -> Result<&ScriptDescriptor, ScriptError> {
        self.get(name)
            .ok_or_else(|| ScriptError::NotFound(name.to_string()))
    }

    /// All names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.scripts.keys().cloned().collect();
        names.sort();
        names
    }

    /// Metadata for every script selected by `filter`, keyed by name.
    pub fn query(&self, filter: &TagFilter) -> BTreeMap<String, ScriptMetadata> {
        self.scripts
            .iter()
            .filter(|(_, descriptor)| filter.matches(&descriptor.tags))
            .map(|(name, descriptor)| (name.clone(), descriptor.metadata()))
            .collect()
    }

    /// Names of every script selected by `filter`, sorted.
    pub fn query_names(&self, filter: &TagFilter) -> Vec<String> {
        let mut names: Vec<_> = self
            .scripts
            .iter()
            .filter(|(_, descriptor)| filter.matches(&descriptor.tags))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

fn load_script(root: &Path, path: &Path) -> Result<ScriptDescriptor, ParseError> {
    let name = derive_script_name(root, path).ok_or_else(|| ParseError::InvalidName {
        path: path.to_path_buf(),
    })?;
    parse_script(&name, path)
}

/// Depth-first walk in sorted order, collecting regular files.
///
/// Symlinks to files are followed; symlinked directories are not.
fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(directory = %dir.display(), error = %err, "Cannot read directory");
            return;
        }
    };

    let mut entries: Vec<_> = entries.filter_map(Result::ok).collect();
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            collect_files(&path, out);
        } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
            out.push(path);
        }
    }
}

// ---------------------------------------------------------------------------
// Swappable handle
// ---------------------------------------------------------------------------

/// Owner of the current registry snapshot for one script directory.
///
/// Dropping the handle tears the registry down.
#[derive(Debug)]
pub struct RegistryHandle {
    root: PathBuf,
    current: RwLock<Arc<ScriptRegistry>>,
}

impl RegistryHandle {
    /// Scan `root` and wrap the result.
    pub async fn load(root: impl Into<PathBuf>) -> Result<Self, ScriptError> {
        let root = root.into();
        let registry = build_off_executor(root.clone()).await?;
        Ok(Self {
            root,
            current: RwLock::new(Arc::new(registry)),
        })
    }

    /// Wrap an already built registry.
    pub fn from_registry(registry: ScriptRegistry) -> Self {
        Self {
            root: registry.root().to_path_buf(),
            current: RwLock::new(Arc::new(registry)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The snapshot in effect right now.
    pub async fn current(&self) -> Arc<ScriptRegistry> {
        Arc::clone(&*self.current.read().await)
    }

    /// Rescan the directory and swap the new snapshot in.
    ///
    /// Callers still holding the previous snapshot keep using it.
    pub async fn reload(&self) -> Result<Arc<ScriptRegistry>, ScriptError> {
        let fresh = Arc::new(build_off_executor(self.root.clone()).await?);
        *self.current.write().await = Arc::clone(&fresh);
        tracing::info!(directory = %self.root.display(), count = fresh.len(), "Scripts reloaded");
        Ok(fresh)
    }
}

async fn build_off_executor(root: PathBuf) -> Result<ScriptRegistry, ScriptError> {
    tokio::task::spawn_blocking(move || ScriptRegistry::build(root))
        .await
        .map_err(|err| ScriptError::Io(std::io::Error::other(err)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
