use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Write as _,
};

use crate::{FailureEntry, ReportFile, ReportTotals};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureChanges {
    pub fixture: String,
    pub statements: Vec<FailureEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportComparison {
    pub from: ReportTotals,
    pub to: ReportTotals,
    /// Statements failing in `to` that did not fail in `from`.
    pub regressions: Vec<FixtureChanges>,
    /// Statements failing in `from` that pass in `to`.
    pub progressions: Vec<FixtureChanges>,
}

/// Compares two report sets fixture by fixture. Statements are matched by
/// query text so that reordering inside a fixture does not show up as churn;
/// progressions therefore need the `queries` list of the newer report.
#[must_use]
pub fn compare_reports(from: &[ReportFile], to: &[ReportFile]) -> ReportComparison {
    let mut comparison = ReportComparison {
        from: sum_totals(from),
        to: sum_totals(to),
        ..ReportComparison::default()
    };

    let previous = from
        .iter()
        .map(|report| (report.fixture.as_str(), report))
        .collect::<BTreeMap<_, _>>();
    let mut current = to.iter().collect::<Vec<_>>();
    current.sort_by(|left, right| left.fixture.cmp(&right.fixture));

    for report in current {
        let Some(before) = previous.get(report.fixture.as_str()) else {
            continue;
        };

        let failed_before = before
            .failures
            .iter()
            .map(|failure| failure.query.as_str())
            .collect::<BTreeSet<_>>();
        let regressions = report
            .failures
            .iter()
            .filter(|failure| !failed_before.contains(failure.query.as_str()))
            .cloned()
            .collect::<Vec<_>>();
        if !regressions.is_empty() {
            comparison.regressions.push(FixtureChanges {
                fixture: report.fixture.clone(),
                statements: regressions,
            });
        }

        let failing_now = report
            .failures
            .iter()
            .map(|failure| failure.query.as_str())
            .collect::<BTreeSet<_>>();
        let progressions = before
            .failures
            .iter()
            .filter(|failure| !failing_now.contains(failure.query.as_str()))
            .filter(|failure| report.passed_query(&failure.query))
            .cloned()
            .collect::<Vec<_>>();
        if !progressions.is_empty() {
            comparison.progressions.push(FixtureChanges {
                fixture: report.fixture.clone(),
                statements: progressions,
            });
        }
    }

    comparison
}

impl ReportComparison {
    #[must_use]
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "|   | Before | After |");
        let _ = writeln!(out, "| --- | --- | --- |");
        let _ = writeln!(out, "| Total | {} | {} |", self.from.total(), self.to.total());
        let _ = writeln!(out, "| Successful | {} | {} |", self.from.passed, self.to.passed);
        let _ = writeln!(out, "| Failures | {} | {} |", self.from.failed, self.to.failed);
        let _ = writeln!(out, "| Skipped | {} | {} |", self.from.skipped, self.to.skipped);
        let _ = writeln!(out);
        let _ = writeln!(out, "|   | Before | After |");
        let _ = writeln!(out, "| --- | --- | --- |");
        let _ = writeln!(
            out,
            "| Successful | {:.4}% | {:.4}% |",
            percentage(self.from.passed, self.from.total()),
            percentage(self.to.passed, self.to.total())
        );
        let _ = writeln!(
            out,
            "| Failures | {:.4}% | {:.4}% |",
            percentage(self.from.failed, self.from.total()),
            percentage(self.to.failed, self.to.total())
        );

        if !self.regressions.is_empty() {
            let _ = writeln!(out, "\n## Regressions");
            for fixture in &self.regressions {
                let _ = writeln!(out, "### {}", fixture.fixture);
                for statement in &fixture.statements {
                    let _ = writeln!(
                        out,
                        "```\nQUERY:      {}\nDIAGNOSTIC: {}\n```",
                        statement.query.trim_end(),
                        statement.diagnostic
                    );
                }
            }
        }

        if !self.progressions.is_empty() {
            let _ = writeln!(out, "\n## Progressions");
            for fixture in &self.progressions {
                let _ = writeln!(out, "### {}", fixture.fixture);
                for statement in &fixture.statements {
                    let _ = writeln!(out, "```\nQUERY: {}\n```", statement.query.trim_end());
                }
            }
        }

        out
    }
}

fn sum_totals(reports: &[ReportFile]) -> ReportTotals {
    reports
        .iter()
        .map(ReportFile::totals)
        .fold(ReportTotals::default(), |sum, totals| ReportTotals {
            passed: sum.passed + totals.passed,
            skipped: sum.skipped + totals.skipped,
            failed: sum.failed + totals.failed,
        })
}

#[allow(clippy::cast_precision_loss)]
fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}
