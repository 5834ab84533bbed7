#![allow(dead_code)]

use gchurn::diff::{Blob, ChangeEntry, Edit, FileDiff, TreeChange};
use gchurn::pipeline::{CommitDeps, CommitDepsBuilder};
use gix::ObjectId;

pub fn oid(n: u32) -> ObjectId {
    ObjectId::from_hex(format!("{n:040x}").as_bytes()).unwrap()
}

pub fn lines(n: usize) -> String {
    (0..n).map(|i| format!("line {i}\n")).collect()
}

/// Builder for a regular commit with no changes yet.
pub fn commit(id: u32, day: u32, author: usize) -> CommitDepsBuilder {
    CommitDeps::builder()
        .commit(oid(id), 1)
        .changes(Vec::new())
        .blobs(Default::default())
        .file_diffs(Default::default())
        .day(day)
        .author(author)
}

pub fn with_insert(builder: CommitDepsBuilder, path: &str, blob_id: u32, content: &[u8]) -> CommitDepsBuilder {
    builder
        .change(TreeChange::insert(ChangeEntry::new(path, oid(blob_id))))
        .blob(oid(blob_id), Blob::new(content))
}

pub fn with_delete(builder: CommitDepsBuilder, path: &str, blob_id: u32, content: &[u8]) -> CommitDepsBuilder {
    builder
        .change(TreeChange::delete(ChangeEntry::new(path, oid(blob_id))))
        .blob(oid(blob_id), Blob::new(content))
}

pub fn with_modify(builder: CommitDepsBuilder, path: &str, from: u32, to: u32, edits: Vec<Edit>) -> CommitDepsBuilder {
    builder
        .change(TreeChange::modify(
            ChangeEntry::new(path, oid(from)),
            ChangeEntry::new(path, oid(to)),
        ))
        .file_diff(path, FileDiff::new(edits))
}
