use crate::diff::{Blob, ChangeEntry, FileDiff, TreeChange};
use crate::error::{ChurnError, Result};
use crate::model::DateRange;
use crate::pipeline::CommitDeps;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use gix::object::tree::diff::ChangeDetached;
use gix::{discover, ObjectId, Repository};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// A commit selected for analysis, with what the day and identity steps need.
#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub id: ObjectId,
    pub parents: Vec<ObjectId>,
    pub timestamp: DateTime<Utc>,
    pub author_name: String,
    pub author_email: String,
}

pub struct GitRepo {
    repo: Repository,
    path: PathBuf,
}

impl GitRepo {
    /// Open a repository at `path`, or current dir if `None`
    pub fn open<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let repo_path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or(std::env::current_dir()?);

        let repo = discover(&repo_path)?;
        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();

        Ok(Self { repo, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn resolve_range(&self, since: Option<&str>, until: Option<&str>) -> Result<DateRange> {
        let mut range = DateRange::new();

        let since_dt = since.map(|s| self.parse_commit_or_date(s)).transpose()?;
        let until_dt = until.map(|u| self.parse_commit_or_date(u)).transpose()?;

        if let (Some(s), Some(u)) = (since_dt, until_dt) {
            if s > u {
                return Err(ChurnError::InvalidDate(format!(
                    "Invalid range: since ({}) is after until ({})",
                    s, u
                )));
            }
        }

        if let Some(s) = since_dt {
            range = range.with_since(s);
        }
        if let Some(u) = until_dt {
            range = range.with_until(u);
        }

        Ok(range)
    }

    fn parse_commit_or_date(&self, input: &str) -> Result<DateTime<Utc>> {
        // RFC3339
        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(dt.with_timezone(&Utc));
        }

        // YYYY-MM-DD
        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            if let Some(datetime) = date.and_hms_opt(0, 0, 0) {
                return Ok(Utc.from_utc_datetime(&datetime));
            }
        }

        // Relative duration (e.g., "90days", "2weeks ago")
        let trimmed = input.trim();
        let relative = trimmed.strip_suffix("ago").unwrap_or(trimmed).trim();
        if let Ok(duration) = humantime::parse_duration(relative) {
            let target = SystemTime::now()
                .checked_sub(duration)
                .ok_or_else(|| ChurnError::InvalidDate(format!("Duration overflow for '{input}'")))?;
            return Ok(DateTime::<Utc>::from(target));
        }

        // Fallback to Git ref
        let id = self
            .repo
            .rev_parse_single(input)
            .map_err(|e| ChurnError::Parse(format!("Invalid commit or date '{input}': {e}")))?;

        let commit = id
            .object()?
            .try_into_commit()
            .map_err(|_| ChurnError::Parse(format!("Not a commit: {input}")))?;

        let secs = commit.time()?.seconds;
        DateTime::<Utc>::from_timestamp(secs, 0)
            .ok_or_else(|| ChurnError::InvalidDate(format!("Invalid timestamp: {secs}")))
    }

    /// Every commit reachable from HEAD within `range`, oldest first.
    pub fn collect_commits(&self, range: &DateRange) -> Result<Vec<CommitRecord>> {
        let mut head = self.repo.head()?;
        let head_commit = head.peel_to_commit_in_place()?;

        let mut commits = Vec::new();
        let mut seen: HashSet<ObjectId> = HashSet::new();
        let mut stack: VecDeque<ObjectId> = VecDeque::from([head_commit.id]);

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Collecting commits...");

        while let Some(commit_id) = stack.pop_back() {
            if !seen.insert(commit_id) {
                continue;
            }

            let commit = self.repo.find_commit(commit_id)?;
            let secs = commit.time()?.seconds;
            let timestamp = DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| ChurnError::InvalidDate(format!("Invalid timestamp: {secs}")))?;

            let parents: Vec<ObjectId> = commit.parent_ids().map(|id| id.into()).collect();
            stack.extend(parents.iter().copied());

            if !range.contains(&timestamp) {
                continue;
            }

            let author = commit.author()?;
            commits.push(CommitRecord {
                id: commit_id,
                parents,
                timestamp,
                author_name: author.name.to_string(),
                author_email: author.email.to_string(),
            });
            pb.inc(1);
        }

        pb.finish_with_message("Commits collected");
        commits.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        debug!(commits = commits.len(), "history collected");
        Ok(commits)
    }

    /// Inputs for `record` diffed against `parent`; `None` diffs a root commit against the
    /// empty tree.
    pub fn commit_view(
        &self,
        record: &CommitRecord,
        parent: Option<ObjectId>,
        day: u32,
        author: usize,
    ) -> Result<CommitDeps> {
        let tree = self.repo.find_commit(record.id)?.tree()?;
        let changes = match parent {
            Some(parent_id) => {
                let parent_tree = self.repo.find_commit(parent_id)?.tree()?;
                self.repo
                    .diff_tree_to_tree(Some(&parent_tree), Some(&tree), None)?
            }
            None => self
                .repo
                .diff_tree_to_tree(None::<&gix::Tree<'_>>, Some(&tree), None)?,
        };
        self.build_deps(record, changes, day, author)
    }

    fn build_deps(
        &self,
        record: &CommitRecord,
        changes: Vec<ChangeDetached>,
        day: u32,
        author: usize,
    ) -> Result<CommitDeps> {
        let mut tree_changes = Vec::new();
        let mut blobs: HashMap<ObjectId, Blob> = HashMap::new();
        let mut file_diffs: HashMap<String, FileDiff> = HashMap::new();

        for change in changes {
            match change {
                ChangeDetached::Addition { location, entry_mode, id, .. } => {
                    if entry_mode.is_tree() || entry_mode.is_commit() {
                        continue;
                    }
                    self.load_blob(id, &mut blobs)?;
                    tree_changes.push(TreeChange::insert(ChangeEntry::new(location.to_string(), id)));
                }
                ChangeDetached::Deletion { location, entry_mode, id, .. } => {
                    if entry_mode.is_tree() || entry_mode.is_commit() {
                        continue;
                    }
                    self.load_blob(id, &mut blobs)?;
                    tree_changes.push(TreeChange::delete(ChangeEntry::new(location.to_string(), id)));
                }
                ChangeDetached::Modification {
                    location,
                    previous_id,
                    entry_mode,
                    id,
                    ..
                } => {
                    if entry_mode.is_tree() || entry_mode.is_commit() {
                        continue;
                    }
                    self.load_blob(previous_id, &mut blobs)?;
                    self.load_blob(id, &mut blobs)?;
                    let path = location.to_string();
                    file_diffs.insert(path.clone(), line_diff(&blobs[&previous_id], &blobs[&id])?);
                    tree_changes.push(TreeChange::modify(
                        ChangeEntry::new(path.clone(), previous_id),
                        ChangeEntry::new(path, id),
                    ));
                }
                ChangeDetached::Rewrite {
                    source_location,
                    source_id,
                    location,
                    entry_mode,
                    id,
                    copy,
                    ..
                } => {
                    if entry_mode.is_tree() || entry_mode.is_commit() {
                        continue;
                    }
                    self.load_blob(source_id, &mut blobs)?;
                    self.load_blob(id, &mut blobs)?;
                    let path = location.to_string();
                    let diff = line_diff(&blobs[&source_id], &blobs[&id])?;
                    // a copy leaves its source in place, only the new lines count
                    let diff = if copy { diff.without_deletions() } else { diff };
                    file_diffs.insert(path.clone(), diff);
                    tree_changes.push(TreeChange::modify(
                        ChangeEntry::new(source_location.to_string(), source_id),
                        ChangeEntry::new(path, id),
                    ));
                }
            }
        }

        CommitDeps::builder()
            .commit(record.id, record.parents.len())
            .changes(tree_changes)
            .blobs(blobs)
            .file_diffs(file_diffs)
            .day(day)
            .author(author)
            .build()
    }

    fn load_blob(&self, id: ObjectId, blobs: &mut HashMap<ObjectId, Blob>) -> Result<()> {
        if blobs.contains_key(&id) {
            return Ok(());
        }
        let object = self.repo.find_object(id)?;
        blobs.insert(id, Blob::new(object.data.clone()));
        Ok(())
    }
}

/// Edit script between two blob revisions; binary revisions get an empty script.
fn line_diff(old: &Blob, new: &Blob) -> Result<FileDiff> {
    if old.is_binary() || new.is_binary() {
        return Ok(FileDiff::default());
    }
    let old_text = String::from_utf8_lossy(old.data());
    let new_text = String::from_utf8_lossy(new.data());
    FileDiff::between(&old_text, &new_text)
}
