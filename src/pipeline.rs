//! Plumbing shared by analyses: typed per-commit inputs, configuration options, merge and
//! commit-gating policies, and the explicit analysis registry.

use crate::diff::{Blob, FileDiff, TreeChange};
use crate::error::{ChurnError, Result};
use gix::ObjectId;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dependency {
    Commit,
    FileDiff,
    TreeChanges,
    BlobCache,
    Day,
    Author,
}

impl Dependency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dependency::Commit => "commit",
            Dependency::FileDiff => "file_diff",
            Dependency::TreeChanges => "changes",
            Dependency::BlobCache => "blob_cache",
            Dependency::Day => "day",
            Dependency::Author => "author",
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMeta {
    pub id: ObjectId,
    pub parent_count: usize,
}

impl CommitMeta {
    pub fn is_merge(&self) -> bool {
        self.parent_count > 1
    }
}

/// Everything an analysis needs to consume one commit.
#[derive(Debug, Clone)]
pub struct CommitDeps {
    pub commit: CommitMeta,
    pub file_diffs: HashMap<String, FileDiff>,
    pub changes: Vec<TreeChange>,
    pub blobs: HashMap<ObjectId, Blob>,
    pub day: u32,
    pub author: usize,
}

impl CommitDeps {
    pub fn builder() -> CommitDepsBuilder {
        CommitDepsBuilder::default()
    }
}

#[derive(Debug, Default)]
pub struct CommitDepsBuilder {
    commit: Option<CommitMeta>,
    file_diffs: Option<HashMap<String, FileDiff>>,
    changes: Option<Vec<TreeChange>>,
    blobs: Option<HashMap<ObjectId, Blob>>,
    day: Option<u32>,
    author: Option<usize>,
}

impl CommitDepsBuilder {
    pub fn commit(mut self, id: ObjectId, parent_count: usize) -> Self {
        self.commit = Some(CommitMeta { id, parent_count });
        self
    }

    pub fn file_diffs(mut self, file_diffs: HashMap<String, FileDiff>) -> Self {
        self.file_diffs = Some(file_diffs);
        self
    }

    pub fn file_diff(mut self, path: impl Into<String>, diff: FileDiff) -> Self {
        self.file_diffs.get_or_insert_with(HashMap::new).insert(path.into(), diff);
        self
    }

    pub fn changes(mut self, changes: Vec<TreeChange>) -> Self {
        self.changes = Some(changes);
        self
    }

    pub fn change(mut self, change: TreeChange) -> Self {
        self.changes.get_or_insert_with(Vec::new).push(change);
        self
    }

    pub fn blobs(mut self, blobs: HashMap<ObjectId, Blob>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    pub fn blob(mut self, hash: ObjectId, blob: Blob) -> Self {
        self.blobs.get_or_insert_with(HashMap::new).insert(hash, blob);
        self
    }

    pub fn day(mut self, day: u32) -> Self {
        self.day = Some(day);
        self
    }

    pub fn author(mut self, author: usize) -> Self {
        self.author = Some(author);
        self
    }

    pub fn build(self) -> Result<CommitDeps> {
        Ok(CommitDeps {
            commit: self.commit.ok_or(ChurnError::MissingDependency("commit"))?,
            file_diffs: self.file_diffs.ok_or(ChurnError::MissingDependency("file_diff"))?,
            changes: self.changes.ok_or(ChurnError::MissingDependency("changes"))?,
            blobs: self.blobs.ok_or(ChurnError::MissingDependency("blob_cache"))?,
            day: self.day.ok_or(ChurnError::MissingDependency("day"))?,
            author: self.author.ok_or(ChurnError::MissingDependency("author"))?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationOptionType {
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigValue {
    Bool(bool),
}

/// A knob an analysis exposes to the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationOption {
    pub name: &'static str,
    pub description: &'static str,
    pub flag: &'static str,
    pub kind: ConfigurationOptionType,
    pub default: ConfigValue,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    values: BTreeMap<&'static str, ConfigValue>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: ConfigValue) -> Self {
        self.values.insert(name, value);
        self
    }

    pub fn set(&mut self, name: &'static str, value: ConfigValue) {
        self.values.insert(name, value);
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ConfigValue::Bool(b)) => Some(*b),
            None => None,
        }
    }
}

/// Values produced by the driver that are only stable once the history walk is done.
#[derive(Debug, Clone, Default)]
pub struct Facts {
    pub reversed_people_dict: Vec<String>,
}

/// How the state of rejoining branches folds into the surviving one.
pub trait MergePolicy<S> {
    fn merge(&self, into: &mut S, branches: &[&S]);
}

/// Keeps the surviving branch's state as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMerger;

impl<S> MergePolicy<S> for NoopMerger {
    fn merge(&self, _into: &mut S, _branches: &[&S]) {}
}

/// Decides whether a commit is consumed at all.
pub trait CommitGate {
    /// Records the commit and reports whether it passes.
    fn should_consume(&mut self, commit: &CommitMeta) -> bool;
    /// Reports whether the commit would pass right now, without recording it.
    fn would_consume(&self, commit: &CommitMeta) -> bool;
    fn reset(&mut self);
}

/// Lets every regular commit through and each merge commit through once.
///
/// The traversal presents a merge once per parent diff; only the first view counts.
#[derive(Debug, Clone, Default)]
pub struct OneShotMergeGate {
    merges: HashSet<ObjectId>,
}

impl CommitGate for OneShotMergeGate {
    fn should_consume(&mut self, commit: &CommitMeta) -> bool {
        if !commit.is_merge() {
            return true;
        }
        self.merges.insert(commit.id)
    }

    fn would_consume(&self, commit: &CommitMeta) -> bool {
        !commit.is_merge() || !self.merges.contains(&commit.id)
    }

    fn reset(&mut self) {
        self.merges.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Created,
    Initialized,
    Consuming,
    Finalized,
}

/// A finalized analysis result that can be rendered.
pub trait Report {
    fn write_text(&self, writer: &mut dyn Write) -> Result<()>;
    fn write_binary(&self, writer: &mut dyn Write) -> Result<()>;
    fn to_json(&self) -> Result<serde_json::Value>;
}

/// An analysis at the end of the pipeline: it consumes commits and provides nothing to
/// other analyses.
pub trait LeafPipelineItem {
    fn name(&self) -> &'static str;
    fn flag(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn requires(&self) -> &'static [Dependency];
    fn provides(&self) -> &'static [Dependency] {
        &[]
    }
    fn list_configuration_options(&self) -> Vec<ConfigurationOption>;
    fn configure(&mut self, config: &Config);
    fn initialize(&mut self) -> Result<()>;
    /// Whether `consume` would take a view of this commit; lets the driver skip building it.
    fn would_consume(&self, _commit: &CommitMeta) -> bool {
        true
    }
    fn consume(&mut self, deps: &CommitDeps) -> Result<()>;
    fn fork(&self, n: usize) -> Vec<Box<dyn LeafPipelineItem>>;
    fn finalize(&mut self, facts: &Facts) -> Result<Box<dyn Report>>;
}

/// Known analyses, looked up by their command line flag.
#[derive(Default)]
pub struct Registry {
    items: Vec<Box<dyn LeafPipelineItem>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every analysis shipped with the crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(crate::churn::ChurnAnalysis::default()));
        registry
    }

    pub fn register(&mut self, item: Box<dyn LeafPipelineItem>) {
        self.items.retain(|existing| existing.flag() != item.flag());
        self.items.push(item);
    }

    pub fn items(&self) -> impl Iterator<Item = &Box<dyn LeafPipelineItem>> {
        self.items.iter()
    }

    pub fn take(&mut self, flag: &str) -> Result<Box<dyn LeafPipelineItem>> {
        let index = self
            .items
            .iter()
            .position(|item| item.flag() == flag)
            .ok_or_else(|| ChurnError::UnknownAnalysis(flag.to_string()))?;
        Ok(self.items.remove(index))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
