//! Selection service
//!
//! Loads forest documents, applies selection changes under the configured
//! not-found policy, and writes documents back.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::{NotFoundPolicy, Settings};
use crate::domain::{
    apply_selection, find, normalize, toggle_selection, try_apply_selection, violations,
    DomainError, ForestDocument, Node, NodeId, SelectionArena,
};
use crate::infrastructure::traits::FileSystem;

/// Where a loaded forest came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForestSource {
    File(PathBuf),
    /// Built-in sample forest, nothing to write back to
    Sample,
}

/// Service for loading, changing and saving selection forests.
pub struct SelectionService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl SelectionService {
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// Resolve the forest to work on: explicit file, configured file, or the sample forest.
    pub fn open(&self, file: Option<&Path>) -> ApplicationResult<(Vec<Node>, ForestSource)> {
        self.open_with(file, self.settings.normalize_on_load)
    }

    /// Like [`open`](Self::open) with an explicit normalization choice.
    pub fn open_with(
        &self,
        file: Option<&Path>,
        normalize_nodes: bool,
    ) -> ApplicationResult<(Vec<Node>, ForestSource)> {
        let path = file
            .map(Path::to_path_buf)
            .or_else(|| self.settings.forest_file.clone());
        match path {
            Some(path) => {
                let forest = self.read_document(&path, normalize_nodes)?;
                Ok((forest, ForestSource::File(path)))
            }
            None => {
                debug!("open: no document given, using sample forest");
                Ok((Node::sample_forest(), ForestSource::Sample))
            }
        }
    }

    /// Read and parse a TOML forest document.
    ///
    /// Duplicate ids are rejected. Inconsistent parents are re-derived from their
    /// leaves when `normalize_on_load` is set.
    pub fn load(&self, path: &Path) -> ApplicationResult<Vec<Node>> {
        self.read_document(path, self.settings.normalize_on_load)
    }

    #[instrument(level = "debug", skip(self))]
    fn read_document(&self, path: &Path, normalize_nodes: bool) -> ApplicationResult<Vec<Node>> {
        if !self.fs.exists(path) {
            let missing = io::Error::new(io::ErrorKind::NotFound, "no such file");
            return Err(io_context("read forest", path, missing));
        }
        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| io_context("read forest", path, e))?;
        let doc: ForestDocument =
            toml::from_str(&content).map_err(|e| ApplicationError::InvalidDocument {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        // Validates id uniqueness
        let arena = SelectionArena::from_forest(&doc.nodes)?;
        debug!("load: {} nodes, depth {}", arena.len(), arena.depth());

        if !normalize_nodes {
            return Ok(doc.nodes);
        }
        let found = violations(&doc.nodes);
        if found.is_empty() {
            return Ok(doc.nodes);
        }
        for violation in &found {
            warn!("normalizing {}", violation);
        }
        Ok(normalize(&doc.nodes))
    }

    /// Write a forest as a TOML document, creating parent directories as needed.
    #[instrument(level = "debug", skip(self, forest))]
    pub fn save(&self, path: &Path, forest: &[Node]) -> ApplicationResult<()> {
        let doc = ForestDocument {
            nodes: forest.to_vec(),
        };
        let content = toml::to_string_pretty(&doc).map_err(|e| ApplicationError::InvalidDocument {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.fs
            .ensure_parent(path)
            .map_err(|e| io_context("create parent", path, e))?;
        self.fs
            .write(path, &content)
            .map_err(|e| io_context("write forest", path, e))
    }

    /// Set `id` to `checked` and propagate.
    #[instrument(level = "debug", skip(self, forest))]
    pub fn apply(&self, forest: &[Node], id: &NodeId, checked: bool) -> ApplicationResult<Vec<Node>> {
        match self.settings.not_found {
            NotFoundPolicy::Ignore => Ok(apply_selection(forest, id, checked).into_owned()),
            NotFoundPolicy::Error => Ok(try_apply_selection(forest, id, checked)?),
        }
    }

    /// Flip the selection of `id` and propagate.
    #[instrument(level = "debug", skip(self, forest))]
    pub fn toggle(&self, forest: &[Node], id: &NodeId) -> ApplicationResult<Vec<Node>> {
        if self.settings.not_found == NotFoundPolicy::Error && find(forest, id).is_none() {
            return Err(DomainError::TargetNotFound(id.clone()).into());
        }
        Ok(toggle_selection(forest, id).into_owned())
    }

    /// Ids of all selected leaves, in document order.
    pub fn selected_leaves(&self, forest: &[Node]) -> ApplicationResult<Vec<NodeId>> {
        Ok(SelectionArena::from_forest(forest)?.selected_leaves())
    }
}

fn io_context(action: &str, path: &Path, source: io::Error) -> ApplicationError {
    ApplicationError::OperationFailed {
        context: format!("{}: {}", action, path.display()),
        source: Box::new(source),
    }
}
