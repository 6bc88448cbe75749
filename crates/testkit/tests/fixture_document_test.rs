use std::fs;

use sqlregress_core::{DefinitionError, Expectation, RowOrder, Value};
use sqlregress_testkit::{
    TestkitError, load_fixtures_from_dir, load_fixtures_from_str, registry_from_dir,
};

#[test]
fn parses_single_fixture_document() {
    let yaml = r#"
name: privileges
depends_on: [test_setup, create_index]
statements:
  - sql: CREATE USER regress_priv_user1;
  - sql: SELECT unique1, stringu1 FROM onek WHERE unique1 < 2;
    rows:
      - [0, "AAAAAA"]
      - [1, ~]
    order: any
  - sql: SELECT 1/0;
    error: division by zero
  - sql: SELECT 1 WHERE false;
    rows: []
  - sql: SELECT 1.50::numeric;
    rows: [["1.50"]]
    normalize_numeric: true
    skip: true
"#;

    let fixtures = load_fixtures_from_str(yaml, "inline").expect("yaml must parse");
    assert_eq!(fixtures.len(), 1);

    let fixture = &fixtures[0];
    assert_eq!(fixture.name.as_str(), "privileges");
    assert_eq!(
        fixture
            .depends_on
            .iter()
            .map(|name| name.as_str())
            .collect::<Vec<_>>(),
        vec!["test_setup", "create_index"]
    );

    let cases = &fixture.statements;
    assert_eq!(cases[0].expectation, Expectation::Unchecked);
    assert_eq!(
        cases[1].expectation,
        Expectation::Rows(vec![
            vec![Value::Int(0), Value::text("AAAAAA")],
            vec![Value::Int(1), Value::Null],
        ])
    );
    assert_eq!(cases[1].row_order, RowOrder::Any);
    assert_eq!(
        cases[2].expectation,
        Expectation::Error("division by zero".to_string())
    );
    assert_eq!(cases[3].expectation, Expectation::Rows(Vec::new()));
    assert_eq!(cases[4].expectation, Expectation::Rows(vec![vec![Value::text("1.50")]]));
    assert!(cases[4].normalize_numeric);
    assert!(cases[4].skip);
}

#[test]
fn parses_list_of_fixtures() {
    let yaml = r#"
- name: test_setup
  statements:
    - sql: CREATE TABLE t (a int);
- name: select
  depends_on: [test_setup]
  skip: not supported yet
"#;

    let fixtures = load_fixtures_from_str(yaml, "inline").expect("yaml must parse");

    assert_eq!(fixtures.len(), 2);
    assert_eq!(fixtures[1].skip_reason(), Some("not supported yet"));
}

#[test]
fn rejects_rows_and_error_together() {
    let yaml = r#"
name: broken
statements:
  - sql: SELECT 1;
    rows: [[1]]
    error: boom
"#;

    let error = load_fixtures_from_str(yaml, "inline").expect_err("conflicting expectations");

    assert_eq!(
        error.to_string(),
        "fixture `broken` statement[0] declares both `rows` and `error`"
    );
}

#[test]
fn rejects_unknown_keys_and_nested_values() {
    let unknown = "name: x\nstatements:\n  - sql: SELECT 1;\n    expected: [[1]]\n";
    let error = load_fixtures_from_str(unknown, "unknown.yaml").expect_err("unknown field");
    assert!(matches!(error, TestkitError::Yaml { ref origin, .. } if origin == "unknown.yaml"));

    let nested = "name: x\nstatements:\n  - sql: SELECT 1;\n    rows: [[[1, 2]]]\n";
    let error = load_fixtures_from_str(nested, "nested.yaml").expect_err("nested value");
    assert!(matches!(error, TestkitError::UnsupportedValue { index: 0, .. }));
}

#[test]
fn rejects_unquoted_decimals() {
    let yaml = "name: numeric\nstatements:\n  - sql: SELECT 1.0;\n  - sql: SELECT 1.50;\n    rows: [[1.50]]\n";

    let error = load_fixtures_from_str(yaml, "numeric.yaml").expect_err("unquoted decimal");

    let TestkitError::UnsupportedValue { index, detail, .. } = error else {
        panic!("expected an unsupported value error");
    };
    assert_eq!(index, 1);
    assert!(detail.contains("quote decimal literals"), "{detail}");
}

#[test]
fn loads_directory_in_path_order_and_ignores_other_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("b_select.yaml"), "name: select\ndepends_on: [test_setup]\n")
        .expect("write");
    fs::write(dir.path().join("a_setup.yml"), "name: test_setup\n").expect("write");
    fs::write(dir.path().join("README.md"), "# not a fixture\n").expect("write");

    let fixtures = load_fixtures_from_dir(dir.path()).expect("load");
    let names = fixtures
        .iter()
        .map(|fixture| fixture.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["test_setup", "select"]);

    let registry = registry_from_dir(dir.path()).expect("registry");
    assert_eq!(registry.len(), 2);
}

#[test]
fn registry_from_dir_reports_definition_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("a.yaml"), "name: a\ndepends_on: [ghost]\n").expect("write");

    let error = registry_from_dir(dir.path()).expect_err("missing dependency");

    assert!(matches!(
        error,
        TestkitError::Definition(DefinitionError::UnknownDependency { .. })
    ));

    fs::write(dir.path().join("b.yaml"), "name: a\n").expect("write");
    let error = registry_from_dir(dir.path()).expect_err("duplicate");
    assert!(matches!(
        error,
        TestkitError::Definition(DefinitionError::DuplicateName { .. })
    ));
}
