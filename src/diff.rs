//! Inputs the classifier works on: tree changes, blob content and line-level edit scripts.

use crate::error::{ChurnError, Result};
use gix::ObjectId;
use similar::{Algorithm, DiffTag};
use std::collections::HashMap;
use thiserror::Error;

/// Blobs with a NUL byte within this prefix are treated as binary.
const BINARY_SNIFF_LEN: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    Equal,
    Insert,
    Delete,
}

/// One span of an edit script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub op: EditOp,
    pub text: String,
}

impl Edit {
    pub fn equal(text: impl Into<String>) -> Self {
        Self { op: EditOp::Equal, text: text.into() }
    }

    pub fn insert(text: impl Into<String>) -> Self {
        Self { op: EditOp::Insert, text: text.into() }
    }

    pub fn delete(text: impl Into<String>) -> Self {
        Self { op: EditOp::Delete, text: text.into() }
    }

    /// Length in Unicode code points.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Edit script of one modified path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDiff {
    pub old_lines: usize,
    pub new_lines: usize,
    pub edits: Vec<Edit>,
}

impl FileDiff {
    pub fn new(edits: Vec<Edit>) -> Self {
        let old_lines = edits
            .iter()
            .filter(|e| e.op != EditOp::Insert)
            .map(Edit::len)
            .sum();
        let new_lines = edits
            .iter()
            .filter(|e| e.op != EditOp::Delete)
            .map(Edit::len)
            .sum();
        Self { old_lines, new_lines, edits }
    }

    /// Line-level diff of two texts.
    ///
    /// Every distinct line is interned as a single code point, so the code point length of a
    /// span equals the number of lines it covers.
    pub fn between<'a>(old: &'a str, new: &'a str) -> Result<Self> {
        let mut interner: HashMap<&'a str, char> = HashMap::new();
        let old_runes = intern_lines(old, &mut interner)?;
        let new_runes = intern_lines(new, &mut interner)?;

        let mut edits = Vec::new();
        for op in similar::capture_diff_slices(Algorithm::Myers, &old_runes, &new_runes) {
            let (tag, old_range, new_range) = op.as_tag_tuple();
            match tag {
                DiffTag::Equal => edits.push(Edit::equal(collect(&old_runes[old_range]))),
                DiffTag::Delete => edits.push(Edit::delete(collect(&old_runes[old_range]))),
                DiffTag::Insert => edits.push(Edit::insert(collect(&new_runes[new_range]))),
                DiffTag::Replace => {
                    edits.push(Edit::delete(collect(&old_runes[old_range])));
                    edits.push(Edit::insert(collect(&new_runes[new_range])));
                }
            }
        }

        Ok(Self {
            old_lines: old_runes.len(),
            new_lines: new_runes.len(),
            edits,
        })
    }

    /// The same script with every deleted span dropped.
    pub fn without_deletions(self) -> Self {
        let edits: Vec<Edit> = self
            .edits
            .into_iter()
            .filter(|e| e.op != EditOp::Delete)
            .collect();
        Self::new(edits)
    }
}

fn intern_lines<'a>(text: &'a str, interner: &mut HashMap<&'a str, char>) -> Result<Vec<char>> {
    text.split_inclusive('\n')
        .map(|line| {
            if let Some(&rune) = interner.get(line) {
                return Ok(rune);
            }
            let rune = line_rune(interner.len()).ok_or_else(|| {
                ChurnError::Classification("too many distinct lines to diff".to_string())
            })?;
            interner.insert(line, rune);
            Ok(rune)
        })
        .collect()
}

fn line_rune(index: usize) -> Option<char> {
    let code = u32::try_from(index).ok()?;
    // skip the surrogate block
    let code = if code >= 0xD800 { code.checked_add(0x800)? } else { code };
    char::from_u32(code)
}

fn collect(runes: &[char]) -> String {
    runes.iter().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Insert,
    Delete,
    Modify,
}

/// One side of a tree change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEntry {
    pub name: String,
    pub hash: ObjectId,
}

impl ChangeEntry {
    pub fn new(name: impl Into<String>, hash: ObjectId) -> Self {
        Self { name: name.into(), hash }
    }
}

/// A file-level event in a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeChange {
    pub from: Option<ChangeEntry>,
    pub to: Option<ChangeEntry>,
}

impl TreeChange {
    pub fn insert(to: ChangeEntry) -> Self {
        Self { from: None, to: Some(to) }
    }

    pub fn delete(from: ChangeEntry) -> Self {
        Self { from: Some(from), to: None }
    }

    pub fn modify(from: ChangeEntry, to: ChangeEntry) -> Self {
        Self { from: Some(from), to: Some(to) }
    }

    pub fn action(&self) -> Result<ChangeAction> {
        match (&self.from, &self.to) {
            (None, Some(_)) => Ok(ChangeAction::Insert),
            (Some(_), None) => Ok(ChangeAction::Delete),
            (Some(_), Some(_)) => Ok(ChangeAction::Modify),
            (None, None) => Err(ChurnError::Classification(
                "tree change has neither a source nor a destination".to_string(),
            )),
        }
    }

    pub fn path(&self) -> &str {
        self.to
            .as_ref()
            .or(self.from.as_ref())
            .map(|e| e.name.as_str())
            .unwrap_or("")
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCountError {
    #[error("binary")]
    Binary,
}

/// Raw content of a blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blob {
    data: Vec<u8>,
}

impl Blob {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_binary(&self) -> bool {
        self.data.iter().take(BINARY_SNIFF_LEN).any(|&b| b == 0)
    }

    /// Number of lines; an unterminated last line still counts.
    pub fn count_lines(&self) -> std::result::Result<u64, LineCountError> {
        if self.is_binary() {
            return Err(LineCountError::Binary);
        }
        let newlines = self.data.iter().filter(|&&b| b == b'\n').count() as u64;
        match self.data.last() {
            Some(&b'\n') | None => Ok(newlines),
            Some(_) => Ok(newlines + 1),
        }
    }
}
