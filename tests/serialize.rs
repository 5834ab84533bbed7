mod common;

use common::{commit, with_delete, with_insert, with_modify};
use gchurn::diff::Edit;
use gchurn::pipeline::{Facts, Report};
use gchurn::serialize::{safe_yaml_string, write_binary, write_text, ChurnResultMessage, EditsMessage};
use gchurn::{ChurnAnalysis, ChurnResult, Series};
use pretty_assertions::assert_eq;
use prost::Message;

fn scenario_result() -> ChurnResult {
    let commits = vec![
        with_insert(commit(1, 0, 0), "a.txt", 100, b"one\ntwo\nthree\n").build().unwrap(),
        with_delete(commit(2, 0, 0), "b.txt", 101, b"gone\n").build().unwrap(),
        with_modify(commit(3, 2, 1), "c.txt", 102, 103, vec![Edit::insert("xy")])
            .build()
            .unwrap(),
    ];
    let mut analysis = ChurnAnalysis::new(true);
    analysis.initialize().unwrap();
    for deps in &commits {
        analysis.consume(deps).unwrap();
    }
    analysis
        .finalize(&Facts {
            reversed_people_dict: vec!["A".to_string(), "Jane: Doe".to_string()],
        })
        .unwrap()
}

fn text(result: &ChurnResult) -> String {
    let mut out = Vec::new();
    write_text(result, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

fn binary(result: &ChurnResult) -> Vec<u8> {
    let mut out = Vec::new();
    write_binary(result, &mut out).unwrap();
    out
}

#[test]
fn text_form_layout() {
    let expected = concat!(
        "  global:\n",
        "    days: [0, 2]\n",
        "    additions: [3, 2]\n",
        "    removals: [1, 0]\n",
        "  A:\n",
        "    days: [0]\n",
        "    additions: [3]\n",
        "    removals: [1]\n",
        "  \"Jane: Doe\":\n",
        "    days: [2]\n",
        "    additions: [2]\n",
        "    removals: [0]\n",
    );
    assert_eq!(text(&scenario_result()), expected);
}

#[test]
fn text_form_of_empty_result() {
    let expected = "  global:\n    days: []\n    additions: []\n    removals: []\n";
    assert_eq!(text(&ChurnResult::default()), expected);
}

#[test]
fn binary_form_decodes_to_the_same_series() {
    let result = scenario_result();
    let decoded = ChurnResultMessage::decode(binary(&result).as_slice()).unwrap();

    assert_eq!(
        decoded.global,
        Some(EditsMessage {
            days: vec![0, 2],
            additions: vec![3, 2],
            removals: vec![1, 0],
        })
    );
    assert_eq!(decoded.people.len(), 2);
    assert_eq!(decoded.people["A"].additions, vec![3]);
    assert_eq!(decoded.people["Jane: Doe"].days, vec![2]);
}

#[test]
fn renderings_are_repeatable() {
    let result = scenario_result();
    assert_eq!(text(&result), text(&result));
    assert_eq!(binary(&result), binary(&result));
    assert_eq!(text(&scenario_result()), text(&result));
    assert_eq!(binary(&scenario_result()), binary(&result));
}

#[test]
fn report_trait_matches_free_functions() {
    let result = scenario_result();
    let report: &dyn Report = &result;

    let mut out = Vec::new();
    report.write_text(&mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), text(&result));

    let mut out = Vec::new();
    report.write_binary(&mut out).unwrap();
    assert_eq!(out, binary(&result));

    let json = report.to_json().unwrap();
    let back: ChurnResult = serde_json::from_value(json).unwrap();
    assert_eq!(back, result);
}

#[test]
fn counts_wrap_to_u32_in_binary_form() {
    let result = ChurnResult {
        global: Series {
            days: vec![1],
            additions: vec![u64::from(u32::MAX) + 2],
            removals: vec![7],
        },
        people: Default::default(),
    };
    let decoded = ChurnResultMessage::decode(binary(&result).as_slice()).unwrap();
    assert_eq!(decoded.global.unwrap().additions, vec![1]);
}

#[test]
fn yaml_keys_are_quoted_when_ambiguous() {
    assert_eq!(safe_yaml_string("Jane Doe"), "Jane Doe");
    assert_eq!(safe_yaml_string("  padded  "), "padded");
    assert_eq!(safe_yaml_string("Łukasz Żółw"), "Łukasz Żółw");
    assert_eq!(safe_yaml_string("a: b"), "\"a: b\"");
    assert_eq!(safe_yaml_string("true"), "\"true\"");
    assert_eq!(safe_yaml_string("No"), "\"No\"");
    assert_eq!(safe_yaml_string("1234"), "\"1234\"");
    assert_eq!(safe_yaml_string("-dash"), "\"-dash\"");
    assert_eq!(safe_yaml_string("*star"), "\"*star\"");
    assert_eq!(safe_yaml_string(""), "\"\"");
    assert_eq!(safe_yaml_string("say \"hi\""), "\"say \\\"hi\\\"\"");
    assert_eq!(safe_yaml_string("back\\slash"), "\"back\\\\slash\"");
}
