// integration tests for the qtree binary

use crate::common::*;
use pretty_assertions::assert_eq;
use qtree::cli::exit_codes;
use qtree::RuleGroup;
use serde_json::json;
use std::process::Command;
use tempfile::TempDir;

fn setup() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let fields = write_file(dir.path(), "fields.json", SAMPLE_FIELDS);
    (dir, fields)
}

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

// ============================================================================
// fields
// ============================================================================

#[test]
fn test_fields_json_lists_in_declaration_order() {
    let (_dir, fields) = setup();
    let output = run_qtree(&["fields", "--json"], &fields);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let json = stdout_json(&output);
    assert_eq!(json["jsonrpc"], "2.0");
    let ids: Vec<&str> = json["result"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["age", "status", "nickname"]);

    let nickname = &json["result"][2];
    assert_eq!(
        nickname["operators"],
        json!(["=", "!=", "contains", "like", "is null", "is not null"])
    );
    assert_eq!(nickname["default_value"], "");
    assert_eq!(json["result"][1]["default_value"], "active");
}

#[test]
fn test_fields_single_text() {
    let (_dir, fields) = setup();
    let output = run_qtree(&["fields", "status", "--no-json"], &fields);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.starts_with("status (Status)"));
    assert!(text.contains("operators: =, !=, in, not in"));
    assert!(text.contains("options:   Active=\"active\", Inactive=\"inactive\""));
}

#[test]
fn test_fields_unknown_field_suggests() {
    let (_dir, fields) = setup();
    let output = run_qtree(&["fields", "stat", "--json"], &fields);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID_ARGS));

    let json = stdout_json(&output);
    assert_eq!(json["error"]["code"], -32004);
    assert_eq!(json["error"]["message"], "unknown field: 'stat'");
    assert_eq!(json["error"]["data"]["suggestions"], json!(["status"]));
}

#[test]
fn test_fields_names_and_format() {
    let (_dir, fields) = setup();

    let output = run_qtree(&["fields", "--names"], &fields);
    assert_eq!(stdout(&output), "age\nstatus\nnickname\n");

    let output = run_qtree(&["fields", "--format", "{id}:{type}"], &fields);
    assert_eq!(stdout(&output), "age:number\nstatus:category\nnickname:string\n");
}

// ============================================================================
// check
// ============================================================================

#[test]
fn test_check_valid_query() {
    let (dir, fields) = setup();
    let query = write_json(
        dir.path(),
        "query.json",
        &json!({"condition": "and", "rules": [
            {"field": "age", "operator": ">=", "value": 21},
            {"condition": "or", "rules": [{"field": "status", "operator": "=", "value": "active"}]}
        ]}),
    );

    let output = run_qtree(&["check", query.to_str().unwrap(), "--json"], &fields);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout_json(&output)["result"], json!({"valid": true, "rules": 2}));

    let output = run_qtree(&["check", query.to_str().unwrap(), "--no-json"], &fields);
    assert_eq!(stdout(&output).trim(), "✓ Query is valid (2 rule(s))");
}

#[test]
fn test_check_reports_validation_errors() {
    let (dir, fields) = setup();
    let query = write_json(
        dir.path(),
        "query.json",
        &json!({"condition": "and", "rules": [{"field": "age", "operator": "=", "value": 12}]}),
    );

    let output = run_qtree(&["check", query.to_str().unwrap(), "--json"], &fields);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID_QUERY));

    let json = stdout_json(&output);
    assert_eq!(json["error"]["code"], -32008);
    assert_eq!(json["error"]["data"]["report"], json!({"rules": ["Too young"]}));

    let output = run_qtree(&["check", query.to_str().unwrap(), "--no-json"], &fields);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID_QUERY));
    let err = stderr(&output);
    assert!(err.contains("error: query has 1 error(s)"));
    assert!(err.contains("  - Too young"));
}

#[test]
fn test_check_reads_stdin() {
    let (_dir, fields) = setup();
    let query = r#"{"condition":"or","rules":[{"field":"nickname","operator":"is null"}]}"#;

    let output = run_qtree_with_stdin(&["check", "-", "--json"], &fields, Some(query));
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout_json(&output)["result"]["rules"], 1);
}

#[test]
fn test_check_malformed_query() {
    let (_dir, fields) = setup();
    let query = r#"{"condition":"xor","rules":[]}"#;

    let output = run_qtree_with_stdin(&["check", "-", "--json"], &fields, Some(query));
    assert_eq!(output.status.code(), Some(exit_codes::INVALID_QUERY));
    let message = stdout_json(&output)["error"]["message"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(message.starts_with("invalid query:"), "{}", message);
    assert!(message.contains("unknown condition"), "{}", message);
}

#[test]
fn test_check_strict_rejects_empty_groups() {
    let (_dir, fields) = setup();
    let query = r#"{"condition":"and","rules":[{"condition":"or","rules":[]}]}"#;

    let output = run_qtree_with_stdin(&["check", "-", "--json"], &fields, Some(query));
    assert!(output.status.success());

    let output = run_qtree_with_stdin(&["check", "-", "--strict", "--json"], &fields, Some(query));
    assert_eq!(output.status.code(), Some(exit_codes::INVALID_QUERY));
    assert_eq!(
        stdout_json(&output)["error"]["data"]["report"],
        json!({"rules": [{"rules": [], "empty": "Empty rulesets are not allowed."}]})
    );
}

#[test]
fn test_check_missing_query_file() {
    let (dir, fields) = setup();
    let missing = dir.path().join("nope.json");
    let output = run_qtree(&["check", missing.to_str().unwrap(), "--no-json"], &fields);
    assert_eq!(output.status.code(), Some(exit_codes::ERROR));
    assert!(stderr(&output).contains("Failed to read query file"));
}

// ============================================================================
// new
// ============================================================================

#[test]
fn test_new_prints_default_rules() {
    let (_dir, fields) = setup();
    let output = run_qtree(&["new", "--rules", "2"], &fields);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let tree: RuleGroup = stdout(&output).parse().unwrap();
    assert_eq!(tree.to_string(), "and(age = 18, age = 18)");
}

#[test]
fn test_new_output_passes_check() {
    let (dir, fields) = setup();
    let output = run_qtree(&["new"], &fields);
    let query = dir.path().join("starter.json");
    std::fs::write(&query, &output.stdout).unwrap();

    let output = run_qtree(&["check", query.to_str().unwrap(), "--json"], &fields);
    assert!(output.status.success(), "stdout: {}", stdout(&output));
}

#[test]
fn test_new_shapes_default_value_for_list_operator() {
    let dir = TempDir::new().unwrap();
    let fields = write_file(
        dir.path(),
        "fields.json",
        r#"{"fields": {"status": {"type": "category", "operators": ["in", "not in"],
            "options": [{"name": "Active", "value": "active"}]}}}"#,
    );
    let output = run_qtree(&["new"], &fields);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let query: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(query["rules"][0]["operator"], "in");
    assert_eq!(query["rules"][0]["value"], json!(["active"]));
}

#[test]
fn test_new_with_no_fields_is_config_error() {
    let dir = TempDir::new().unwrap();
    let fields = write_json(dir.path(), "fields.json", &json!({"fields": {}}));
    let output = run_qtree(&["new", "--json"], &fields);
    assert_eq!(output.status.code(), Some(exit_codes::CONFIG_ERROR));
    assert_eq!(
        stdout_json(&output)["error"]["message"],
        "field registry has no fields"
    );
}

// ============================================================================
// coerce
// ============================================================================

#[test]
fn test_coerce_wraps_for_in() {
    let (_dir, fields) = setup();
    let output = run_qtree(
        &["coerce", "--field", "status", "--operator", "in", "active", "--json"],
        &fields,
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout_json(&output)["result"],
        json!({
            "field": "status",
            "operator": "in",
            "arity": "multi",
            "input": "active",
            "value": ["active"]
        })
    );
}

#[test]
fn test_coerce_text_output() {
    let dir = TempDir::new().unwrap();
    let fields = write_json(
        dir.path(),
        "fields.json",
        &json!({"fields": {"age": {"type": "number", "operators": ["=", "between"]}}}),
    );

    let output = run_qtree(&["coerce", "-f", "age", "-o", "between", "5", "--no-json"], &fields);
    assert_eq!(stdout(&output).trim(), "[5, 5]");

    let output = run_qtree(
        &["coerce", "-f", "age", "-o", "=", "[3, 9]", "--no-json"],
        &fields,
    );
    assert_eq!(stdout(&output).trim(), "3");
}

#[test]
fn test_coerce_rejects_disallowed_operator() {
    let (_dir, fields) = setup();
    let output = run_qtree(&["coerce", "-f", "age", "-o", "contains", "x", "--json"], &fields);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID_ARGS));

    let json = stdout_json(&output);
    assert_eq!(
        json["error"]["message"],
        "operator 'contains' is not allowed for field 'age'"
    );
    assert_eq!(
        json["error"]["data"]["suggestions"],
        json!(["=", "!=", ">", ">=", "<", "<="])
    );
}

// ============================================================================
// verify and fields file resolution
// ============================================================================

#[test]
fn test_verify_valid_file() {
    let (_dir, fields) = setup();
    let output = run_qtree(&["verify", "--json"], &fields);
    assert!(output.status.success(), "stdout: {}", stdout(&output));

    let json = stdout_json(&output);
    assert_eq!(json["result"]["valid"], true);
    assert_eq!(json["result"]["fields"], 3);
}

#[test]
fn test_verify_reports_errors() {
    let dir = TempDir::new().unwrap();
    let fields = write_json(
        dir.path(),
        "fields.json",
        &json!({
            "fields": {"age": {"type": "number", "entity": "person"}},
            "default_field": "name"
        }),
    );

    let output = run_qtree(&["verify", "--json"], &fields);
    assert_eq!(output.status.code(), Some(exit_codes::CONFIG_ERROR));
    assert_eq!(
        stdout_json(&output)["error"]["data"]["errors"],
        json!([
            "default_field: unknown field 'name'",
            "fields.age: unknown entity 'person'"
        ])
    );

    let output = run_qtree(&["verify", "--no-json"], &fields);
    assert_eq!(output.status.code(), Some(exit_codes::CONFIG_ERROR));
    assert!(stderr(&output).contains("  - default_field: unknown field 'name'"));
}

#[test]
fn test_missing_fields_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.json");
    let output = run_qtree(&["fields", "--json"], &missing);
    assert_eq!(output.status.code(), Some(exit_codes::CONFIG_ERROR));

    let json = stdout_json(&output);
    assert_eq!(json["error"]["code"], -32005);
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("fields file not found"));
}

#[test]
fn test_json5_fields_file() {
    let dir = TempDir::new().unwrap();
    let fields = dir.path().join("fields.json5");
    std::fs::write(
        &fields,
        "{\n  // single field\n  fields: { score: { type: 'number', default_value: 7, } },\n}\n",
    )
    .unwrap();

    let output = run_qtree(&["new"], &fields);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let tree: RuleGroup = stdout(&output).parse().unwrap();
    assert_eq!(tree.to_string(), "and(score = 7)");
}

#[test]
fn test_fields_path_from_env() {
    let (_dir, fields) = setup();
    let output = Command::new(qtree_binary_path())
        .args(["fields", "--names"])
        .env("QTREE_FIELDS", &fields)
        .env_remove("QTREE_LOG")
        .output()
        .expect("Failed to run qtree");
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "age\nstatus\nnickname\n");
}

#[test]
fn test_verbose_logging_goes_to_stderr() {
    let (_dir, fields) = setup();
    let output = run_qtree(&["fields", "--names", "-vv"], &fields);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "age\nstatus\nnickname\n");
    assert!(stderr(&output).contains("loaded fields file"));
}
