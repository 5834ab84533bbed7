//! Renderings of a finalized [`ChurnResult`]: indented YAML-like text, protobuf and JSON.

use crate::error::Result;
use crate::model::{ChurnResult, Series};
use crate::pipeline::Report;
use prost::Message;
use std::collections::BTreeMap;
use std::io::Write;

#[derive(Clone, PartialEq, Message)]
pub struct EditsMessage {
    #[prost(uint32, repeated, tag = "1")]
    pub days: Vec<u32>,
    #[prost(uint32, repeated, tag = "2")]
    pub additions: Vec<u32>,
    #[prost(uint32, repeated, tag = "3")]
    pub removals: Vec<u32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ChurnResultMessage {
    #[prost(message, optional, tag = "1")]
    pub global: Option<EditsMessage>,
    #[prost(btree_map = "string, message", tag = "2")]
    pub people: BTreeMap<String, EditsMessage>,
}

impl From<&Series> for EditsMessage {
    // Values beyond u32::MAX wrap.
    fn from(series: &Series) -> Self {
        Self {
            days: series.days.clone(),
            additions: series.additions.iter().map(|&v| v as u32).collect(),
            removals: series.removals.iter().map(|&v| v as u32).collect(),
        }
    }
}

impl From<&ChurnResult> for ChurnResultMessage {
    fn from(result: &ChurnResult) -> Self {
        Self {
            global: Some(EditsMessage::from(&result.global)),
            people: result
                .people
                .iter()
                .map(|(name, series)| (name.clone(), EditsMessage::from(series)))
                .collect(),
        }
    }
}

pub fn write_text(result: &ChurnResult, writer: &mut dyn Write) -> Result<()> {
    writeln!(writer, "  global:")?;
    write_series(&result.global, writer, 4)?;
    for (name, series) in &result.people {
        writeln!(writer, "  {}:", safe_yaml_string(name))?;
        write_series(series, writer, 4)?;
    }
    Ok(())
}

fn write_series(series: &Series, writer: &mut dyn Write, indent: usize) -> Result<()> {
    write_array(writer, indent, "days", series.days.iter().map(|&d| u64::from(d)))?;
    write_array(writer, indent, "additions", series.additions.iter().copied())?;
    write_array(writer, indent, "removals", series.removals.iter().copied())?;
    Ok(())
}

fn write_array(
    writer: &mut dyn Write,
    indent: usize,
    name: &str,
    values: impl Iterator<Item = u64>,
) -> Result<()> {
    let items: Vec<String> = values.map(|v| v.to_string()).collect();
    writeln!(writer, "{:indent$}{}: [{}]", "", name, items.join(", "), indent = indent)?;
    Ok(())
}

pub fn write_binary(result: &ChurnResult, writer: &mut dyn Write) -> Result<()> {
    let message = ChurnResultMessage::from(result);
    let mut buf = Vec::with_capacity(message.encoded_len());
    message.encode(&mut buf)?;
    writer.write_all(&buf)?;
    Ok(())
}

/// Renders `s` so it can be embedded as a YAML mapping key.
///
/// Plain scalars are kept as is; anything YAML would read differently is double-quoted.
pub fn safe_yaml_string(s: &str) -> String {
    let s = s.trim();
    if needs_quoting(s) {
        quote(s)
    } else {
        s.to_string()
    }
}

fn needs_quoting(s: &str) -> bool {
    const INDICATORS: &[char] = &[
        '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%',
        '@', '`',
    ];

    let Some(first) = s.chars().next() else {
        return true;
    };
    if INDICATORS.contains(&first) {
        return true;
    }
    if s.contains(": ") || s.contains(" #") || s.ends_with(':') {
        return true;
    }
    if s.chars().any(|c| c.is_control() || matches!(c, '"' | '\\' | '[' | ']' | '{' | '}' | ',')) {
        return true;
    }

    let lowered = s.to_ascii_lowercase();
    if matches!(
        lowered.as_str(),
        "~" | "null" | "true" | "false" | "yes" | "no" | "on" | "off" | "y" | "n"
    ) {
        return true;
    }
    s.parse::<f64>().is_ok() || s.parse::<i64>().is_ok()
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl Report for ChurnResult {
    fn write_text(&self, writer: &mut dyn Write) -> Result<()> {
        write_text(self, writer)
    }

    fn write_binary(&self, writer: &mut dyn Write) -> Result<()> {
        write_binary(self, writer)
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
