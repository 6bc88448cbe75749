use crate::{
    ExecutionOutcome, Expectation, Row, RowOrder, StatementCase,
    value::{render_row, rows_match},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub ok: bool,
    pub diagnostic: String,
}

impl VerificationResult {
    #[must_use]
    pub fn pass() -> Self {
        Self {
            ok: true,
            diagnostic: String::new(),
        }
    }

    pub fn fail(diagnostic: impl Into<String>) -> Self {
        Self {
            ok: false,
            diagnostic: diagnostic.into(),
        }
    }
}

/// Compares what a statement produced with what its case declares.
/// Unchecked cases always pass.
#[must_use]
pub fn verify(case: &StatementCase, outcome: &ExecutionOutcome) -> VerificationResult {
    match (&case.expectation, outcome) {
        (Expectation::Unchecked, _) => VerificationResult::pass(),
        (_, ExecutionOutcome::Unsupported(command)) => VerificationResult::fail(format!(
            "unsupported meta-command {command} cannot produce a checked result"
        )),
        (Expectation::Rows(_), ExecutionOutcome::Error(message)) => {
            VerificationResult::fail(format!("expected success, got error: {message}"))
        }
        (Expectation::Rows(expected), ExecutionOutcome::Rows(result)) => compare_rows(
            expected,
            &result.rows,
            case.row_order,
            case.normalize_numeric,
        ),
        (Expectation::Error(substring), ExecutionOutcome::Rows(_)) => VerificationResult::fail(
            format!("expected error containing '{substring}', got success"),
        ),
        (Expectation::Error(substring), ExecutionOutcome::Error(message)) => {
            if message.contains(substring.as_str()) {
                VerificationResult::pass()
            } else {
                VerificationResult::fail(format!(
                    "expected error containing '{substring}', got '{message}'"
                ))
            }
        }
    }
}

fn compare_rows(
    expected: &[Row],
    actual: &[Row],
    order: RowOrder,
    normalize_numeric: bool,
) -> VerificationResult {
    if expected.len() != actual.len() {
        return VerificationResult::fail(format!(
            "row count mismatch: expected {} row(s), got {}\n{}",
            expected.len(),
            actual.len(),
            render_both(expected, actual)
        ));
    }

    match order {
        RowOrder::Exact => {
            let mismatch = expected
                .iter()
                .zip(actual)
                .position(|(expected, actual)| !rows_match(expected, actual, normalize_numeric));
            match mismatch {
                None => VerificationResult::pass(),
                Some(index) => VerificationResult::fail(format!(
                    "row {index} differs:\n  expected: {}\n  actual:   {}",
                    render_row(&expected[index]),
                    render_row(&actual[index])
                )),
            }
        }
        RowOrder::Any => {
            let mut unclaimed = actual.iter().collect::<Vec<_>>();
            for (index, row) in expected.iter().enumerate() {
                let found = unclaimed
                    .iter()
                    .position(|candidate| rows_match(row, candidate, normalize_numeric));
                match found {
                    Some(position) => {
                        unclaimed.swap_remove(position);
                    }
                    None => {
                        return VerificationResult::fail(format!(
                            "expected row {index} {} not found in result (order ignored)\n{}",
                            render_row(row),
                            render_both(expected, actual)
                        ));
                    }
                }
            }
            VerificationResult::pass()
        }
    }
}

fn render_both(expected: &[Row], actual: &[Row]) -> String {
    let render = |rows: &[Row]| {
        rows.iter()
            .map(|row| format!("    {}", render_row(row)))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "  expected:\n{}\n  actual:\n{}",
        render(expected),
        render(actual)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ResultSet, Value};

    fn rows(values: &[&[Value]]) -> Vec<Row> {
        values.iter().map(|row| row.to_vec()).collect()
    }

    fn outcome(values: &[&[Value]]) -> ExecutionOutcome {
        ExecutionOutcome::Rows(ResultSet::new(vec!["c".to_string()], rows(values)))
    }

    #[test]
    fn null_does_not_match_empty_string() {
        let case = StatementCase::new("SELECT NULL").expect_rows(rows(&[&[Value::Null]]));

        assert!(verify(&case, &outcome(&[&[Value::Null]])).ok);
        let result = verify(&case, &outcome(&[&[Value::text("")]]));
        assert!(!result.ok);
        assert!(result.diagnostic.contains("row 0 differs"), "{}", result.diagnostic);
    }

    #[test]
    fn row_count_mismatch_lists_both_counts() {
        let case = StatementCase::new("SELECT 1").expect_rows(rows(&[&[Value::text("1")]]));
        let result = verify(&case, &outcome(&[]));

        assert!(!result.ok);
        assert!(
            result.diagnostic.contains("expected 1 row(s), got 0"),
            "{}",
            result.diagnostic
        );
    }

    #[test]
    fn any_order_matches_multisets() {
        let case = StatementCase::new("SELECT x FROM t")
            .expect_rows(rows(&[&[Value::text("a")], &[Value::text("a")], &[Value::text("b")]]))
            .any_order();

        let shuffled = outcome(&[&[Value::text("b")], &[Value::text("a")], &[Value::text("a")]]);
        assert!(verify(&case, &shuffled).ok);

        let wrong = outcome(&[&[Value::text("b")], &[Value::text("b")], &[Value::text("a")]]);
        assert!(!verify(&case, &wrong).ok);
    }

    #[test]
    fn exact_order_rejects_permutation() {
        let case = StatementCase::new("SELECT x FROM t")
            .expect_rows(rows(&[&[Value::text("a")], &[Value::text("b")]]));

        let result = verify(&case, &outcome(&[&[Value::text("b")], &[Value::text("a")]]));
        assert!(!result.ok);
    }

    #[test]
    fn error_expectation_uses_substring() {
        let case = StatementCase::new("SELECT 1/0").expect_error("division by zero");

        let matching = ExecutionOutcome::Error("ERROR: division by zero".to_string());
        assert!(verify(&case, &matching).ok);

        let other = ExecutionOutcome::Error("ERROR: syntax error".to_string());
        let result = verify(&case, &other);
        assert_eq!(
            result.diagnostic,
            "expected error containing 'division by zero', got 'ERROR: syntax error'"
        );

        let result = verify(&case, &outcome(&[]));
        assert_eq!(
            result.diagnostic,
            "expected error containing 'division by zero', got success"
        );
    }

    #[test]
    fn rows_expected_but_error_returned() {
        let case = StatementCase::new("SELECT 1").expect_rows(Vec::new());
        let result = verify(&case, &ExecutionOutcome::Error("boom".to_string()));

        assert_eq!(result.diagnostic, "expected success, got error: boom");
    }

    #[test]
    fn unchecked_always_passes() {
        let case = StatementCase::new("CREATE TABLE t (a int)");

        assert!(verify(&case, &ExecutionOutcome::Error("boom".to_string())).ok);
        assert!(verify(&case, &ExecutionOutcome::Unsupported("\\d".to_string())).ok);
    }

    #[test]
    fn unsupported_fails_checked_case() {
        let case = StatementCase::new("\\d t").expect_rows(Vec::new());
        let result = verify(&case, &ExecutionOutcome::Unsupported("\\d".to_string()));

        assert!(!result.ok);
        assert!(result.diagnostic.contains("\\d"));
    }
}
