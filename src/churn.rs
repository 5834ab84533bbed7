use crate::classify::classify;
use crate::cli::{CommonArgs, OutputFormat};
use crate::error::{ChurnError, Result};
use crate::git::{day_index, GitRepo, IdentityTable};
use crate::model::{ChurnOutput, ChurnResult, RawDelta, Series, SCHEMA_VERSION};
use crate::pipeline::{
    CommitDeps, CommitGate, CommitMeta, Config, ConfigValue, ConfigurationOption,
    ConfigurationOptionType, Dependency, Facts, LeafPipelineItem, MergePolicy, NoopMerger,
    OneShotMergeGate, Registry, Report, Stage,
};
use anyhow::Context;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use tracing::{debug, info};

pub const CONFIG_CHURN_TRACK_PEOPLE: &str = "Churn.TrackPeople";

const CHURN_REQUIRES: &[Dependency] = &[
    Dependency::Commit,
    Dependency::FileDiff,
    Dependency::TreeChanges,
    Dependency::BlobCache,
    Dependency::Day,
    Dependency::Author,
];

/// Raw deltas recorded so far, globally and per author id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChurnLogs {
    pub global: Vec<RawDelta>,
    pub people: HashMap<usize, Vec<RawDelta>>,
}

/// Collects the daily numbers of inserted and removed lines.
///
/// Lifecycle: `initialize`, any number of `consume` calls, then one `finalize`. If a change
/// fails to classify, the deltas already recorded for earlier changes of the same commit are
/// kept; nothing is rolled back.
#[derive(Debug, Clone)]
pub struct ChurnAnalysis {
    pub track_people: bool,
    stage: Stage,
    gate: OneShotMergeGate,
    merger: NoopMerger,
    logs: ChurnLogs,
}

impl Default for ChurnAnalysis {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ChurnAnalysis {
    pub fn new(track_people: bool) -> Self {
        Self {
            track_people,
            stage: Stage::Created,
            gate: OneShotMergeGate::default(),
            merger: NoopMerger,
            logs: ChurnLogs::default(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn logs(&self) -> &ChurnLogs {
        &self.logs
    }

    pub fn initialize(&mut self) -> Result<()> {
        if self.stage == Stage::Finalized {
            return Err(ChurnError::InvalidState(
                "cannot initialize a finalized analysis".to_string(),
            ));
        }
        self.logs = ChurnLogs::default();
        self.gate.reset();
        self.stage = Stage::Initialized;
        Ok(())
    }

    /// Whether a view of `commit` would be consumed; the gate is only asked, not updated.
    pub fn would_consume(&self, commit: &CommitMeta) -> bool {
        self.gate.would_consume(commit)
    }

    pub fn consume(&mut self, deps: &CommitDeps) -> Result<()> {
        if !matches!(self.stage, Stage::Initialized | Stage::Consuming) {
            return Err(ChurnError::InvalidState(format!(
                "cannot consume commit {} while {:?}",
                deps.commit.id, self.stage
            )));
        }
        if !self.gate.should_consume(&deps.commit) {
            debug!(commit = %deps.commit.id, "merge commit already consumed, skipping");
            return Ok(());
        }
        self.stage = Stage::Consuming;

        for change in &deps.changes {
            let (added, removed) = classify(change, deps)?;
            let delta = RawDelta::new(deps.day, added, removed);
            self.logs.global.push(delta);
            if self.track_people {
                self.logs.people.entry(deps.author).or_default().push(delta);
            }
        }

        debug!(
            commit = %deps.commit.id,
            day = deps.day,
            changes = deps.changes.len(),
            "consumed commit"
        );
        Ok(())
    }

    /// `n` independent copies of the current state, one per branch.
    pub fn fork(&self, n: usize) -> Vec<ChurnAnalysis> {
        (0..n).map(|_| self.clone()).collect()
    }

    pub fn merge(&mut self, branches: &[&ChurnAnalysis]) {
        let logs: Vec<&ChurnLogs> = branches.iter().map(|b| &b.logs).collect();
        self.merger.merge(&mut self.logs, &logs);
    }

    /// Aggregates the recorded deltas and resolves author ids to display names.
    ///
    /// The raw logs are released; the analysis accepts no further commits.
    pub fn finalize(&mut self, facts: &Facts) -> Result<ChurnResult> {
        if !matches!(self.stage, Stage::Initialized | Stage::Consuming) {
            return Err(ChurnError::InvalidState(format!(
                "cannot finalize while {:?}",
                self.stage
            )));
        }

        let logs = std::mem::take(&mut self.logs);
        let mut people = BTreeMap::new();
        if self.track_people {
            for (author, deltas) in &logs.people {
                let name = facts
                    .reversed_people_dict
                    .get(*author)
                    .ok_or(ChurnError::UnknownAuthor(*author))?;
                people.insert(name.clone(), aggregate(deltas));
            }
        }
        let result = ChurnResult {
            global: aggregate(&logs.global),
            people,
        };
        self.stage = Stage::Finalized;

        info!(
            days = result.global.len(),
            authors = result.people.len(),
            "churn finalized"
        );
        Ok(result)
    }
}

impl LeafPipelineItem for ChurnAnalysis {
    fn name(&self) -> &'static str {
        "ChurnAnalysis"
    }

    fn flag(&self) -> &'static str {
        "churn"
    }

    fn description(&self) -> &'static str {
        "Collects the daily numbers of inserted and removed lines."
    }

    fn requires(&self) -> &'static [Dependency] {
        CHURN_REQUIRES
    }

    fn list_configuration_options(&self) -> Vec<ConfigurationOption> {
        vec![ConfigurationOption {
            name: CONFIG_CHURN_TRACK_PEOPLE,
            description: "Record detailed statistics per each developer.",
            flag: "churn-people",
            kind: ConfigurationOptionType::Bool,
            default: ConfigValue::Bool(false),
        }]
    }

    fn configure(&mut self, config: &Config) {
        if let Some(track_people) = config.get_bool(CONFIG_CHURN_TRACK_PEOPLE) {
            self.track_people = track_people;
        }
    }

    fn initialize(&mut self) -> Result<()> {
        ChurnAnalysis::initialize(self)
    }

    fn would_consume(&self, commit: &CommitMeta) -> bool {
        ChurnAnalysis::would_consume(self, commit)
    }

    fn consume(&mut self, deps: &CommitDeps) -> Result<()> {
        ChurnAnalysis::consume(self, deps)
    }

    fn fork(&self, n: usize) -> Vec<Box<dyn LeafPipelineItem>> {
        ChurnAnalysis::fork(self, n)
            .into_iter()
            .map(|item| Box::new(item) as Box<dyn LeafPipelineItem>)
            .collect()
    }

    fn finalize(&mut self, facts: &Facts) -> Result<Box<dyn Report>> {
        Ok(Box::new(ChurnAnalysis::finalize(self, facts)?))
    }
}

/// Sums deltas per day and lays them out in ascending day order.
pub fn aggregate(deltas: &[RawDelta]) -> Series {
    let mut per_day: BTreeMap<u32, (u64, u64)> = BTreeMap::new();
    for delta in deltas {
        let entry = per_day.entry(delta.day).or_insert((0, 0));
        entry.0 += delta.added;
        entry.1 += delta.removed;
    }

    let mut series = Series {
        days: Vec::with_capacity(per_day.len()),
        additions: Vec::with_capacity(per_day.len()),
        removals: Vec::with_capacity(per_day.len()),
    };
    for (day, (added, removed)) in per_day {
        series.days.push(day);
        series.additions.push(added);
        series.removals.push(removed);
    }
    series
}

pub fn exec(common: CommonArgs, track_people: bool, format: OutputFormat) -> anyhow::Result<()> {
    let repo = GitRepo::open(common.repo.as_ref()).context("Failed to open git repository")?;

    let range = repo
        .resolve_range(common.since.as_deref(), common.until.as_deref())
        .context("Failed to resolve date range")?;

    let commits = repo
        .collect_commits(&range)
        .context("Failed to collect commits from repository")?;

    let mut registry = Registry::with_builtin();
    let mut analysis = registry.take("churn")?;
    let config = Config::new().with(CONFIG_CHURN_TRACK_PEOPLE, ConfigValue::Bool(track_people));
    analysis.configure(&config);
    analysis.initialize().context("Failed to initialize churn")?;

    let mut identities = IdentityTable::new();
    let first = commits.first().map(|c| c.timestamp);
    for commit in &commits {
        let author = identities.resolve(&commit.author_name, &commit.author_email);
        let day = first.map(|f| day_index(&f, &commit.timestamp)).unwrap_or(0);
        let meta = CommitMeta {
            id: commit.id,
            parent_count: commit.parents.len(),
        };
        let parents: Vec<Option<gix::ObjectId>> = if commit.parents.is_empty() {
            vec![None]
        } else {
            commit.parents.iter().copied().map(Some).collect()
        };
        for parent in parents {
            if !analysis.would_consume(&meta) {
                break;
            }
            let deps = repo
                .commit_view(commit, parent, day, author)
                .with_context(|| format!("Failed to diff commit {}", commit.id))?;
            analysis
                .consume(&deps)
                .with_context(|| format!("Failed to consume commit {}", commit.id))?;
        }
    }

    let facts = Facts {
        reversed_people_dict: identities.reversed_people_dict(),
    };
    let report = analysis.finalize(&facts).context("Failed to finalize churn")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Text => report.write_text(&mut out)?,
        OutputFormat::Binary => report.write_binary(&mut out)?,
        OutputFormat::Json => output_json(report.as_ref(), &repo, &common, track_people, &mut out)?,
    }
    out.flush()?;

    Ok(())
}

fn output_json(
    report: &dyn Report,
    repo: &GitRepo,
    common: &CommonArgs,
    track_people: bool,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let output = ChurnOutput {
        version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        repository_path: repo.path().to_string_lossy().to_string(),
        since: common.since.clone(),
        until: common.until.clone(),
        track_people,
        result: report.to_json()?,
    };
    writeln!(out, "{}", serde_json::to_string_pretty(&output)?)?;
    Ok(())
}
