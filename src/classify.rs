use crate::diff::{ChangeAction, ChangeEntry, EditOp, LineCountError, TreeChange};
use crate::error::{ChurnError, Result};
use crate::pipeline::CommitDeps;
use tracing::debug;

/// Line delta `(added, removed)` of one tree change.
///
/// Binary blobs count as zero lines. A modified path without an edit script and a blob
/// missing from the content cache are errors.
pub fn classify(change: &TreeChange, deps: &CommitDeps) -> Result<(u64, u64)> {
    match (change.action()?, &change.from, &change.to) {
        (ChangeAction::Insert, _, Some(to)) => Ok((count_blob_lines(to, deps)?, 0)),
        (ChangeAction::Delete, Some(from), _) => Ok((0, count_blob_lines(from, deps)?)),
        (ChangeAction::Modify, _, Some(to)) => {
            let diff = deps
                .file_diffs
                .get(&to.name)
                .ok_or_else(|| ChurnError::MissingDiffData { path: to.name.clone() })?;
            let mut added = 0u64;
            let mut removed = 0u64;
            for edit in &diff.edits {
                match edit.op {
                    EditOp::Equal => continue,
                    EditOp::Insert => added += edit.len() as u64,
                    EditOp::Delete => removed += edit.len() as u64,
                }
            }
            Ok((added, removed))
        }
        (action, _, _) => Err(ChurnError::Classification(format!(
            "{action:?} change of {} lacks the side it needs",
            change.path()
        ))),
    }
}

fn count_blob_lines(entry: &ChangeEntry, deps: &CommitDeps) -> Result<u64> {
    let blob = deps
        .blobs
        .get(&entry.hash)
        .ok_or(ChurnError::MissingBlob { hash: entry.hash })?;
    match blob.count_lines() {
        Ok(lines) => Ok(lines),
        Err(LineCountError::Binary) => {
            debug!(path = %entry.name, "binary blob, counting zero lines");
            Ok(0)
        }
    }
}
