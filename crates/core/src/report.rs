use std::fmt;

use crate::FixtureName;

/// Terminal state of one harness invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    ResolvingDependencies,
    ExecutingFixture(usize),
    Verifying(usize),
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureRole {
    Target,
    Dependency,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementStatus {
    Passed,
    Failed { diagnostic: String },
    Skipped,
    /// Never reached because an earlier statement failed in fail-fast mode.
    NotRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementReport {
    pub index: usize,
    pub statement: String,
    pub status: StatementStatus,
}

impl StatementReport {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.status, StatementStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureReport {
    pub name: FixtureName,
    pub role: FixtureRole,
    pub statements: Vec<StatementReport>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub not_run: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure<'a> {
    pub fixture: &'a FixtureName,
    pub role: FixtureRole,
    pub statement: &'a StatementReport,
    pub diagnostic: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReport {
    pub target: FixtureName,
    pub state: RunState,
    /// Set when the target itself carries a fixture-level skip marker.
    pub skipped: Option<String>,
    pub fixtures: Vec<FixtureReport>,
}

impl TestReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.state == RunState::Done
    }

    /// Counts every statement in the chain, dependencies included.
    #[must_use]
    pub fn totals(&self) -> Totals {
        let mut totals = Totals::default();
        for statement in self.fixtures.iter().flat_map(|fixture| &fixture.statements) {
            match statement.status {
                StatementStatus::Passed => totals.passed += 1,
                StatementStatus::Failed { .. } => totals.failed += 1,
                StatementStatus::Skipped => totals.skipped += 1,
                StatementStatus::NotRun => totals.not_run += 1,
            }
        }
        totals
    }

    pub fn failures(&self) -> impl Iterator<Item = Failure<'_>> {
        self.fixtures.iter().flat_map(|fixture| {
            fixture
                .statements
                .iter()
                .filter_map(move |statement| match &statement.status {
                    StatementStatus::Failed { diagnostic } => Some(Failure {
                        fixture: &fixture.name,
                        role: fixture.role,
                        statement,
                        diagnostic,
                    }),
                    _ => None,
                })
        })
    }

    #[must_use]
    pub fn fixture(&self, name: &str) -> Option<&FixtureReport> {
        self.fixtures
            .iter()
            .find(|fixture| fixture.name.as_str() == name)
    }
}

impl fmt::Display for TestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let totals = self.totals();
        let verdict = if self.passed() { "ok" } else { "FAILED" };
        write!(
            f,
            "fixture `{}`: {verdict}. {} passed; {} failed; {} skipped",
            self.target, totals.passed, totals.failed, totals.skipped
        )?;
        if totals.not_run > 0 {
            write!(f, "; {} not run", totals.not_run)?;
        }
        if let Some(reason) = &self.skipped {
            write!(f, " (target skipped: {reason})")?;
        }

        for failure in self.failures() {
            let role = match failure.role {
                FixtureRole::Target => "",
                FixtureRole::Dependency => " (dependency)",
            };
            write!(
                f,
                "\n\n--- {}{role} statement[{}]\n{}\n{}",
                failure.fixture,
                failure.statement.index,
                failure.statement.statement.trim_end(),
                failure.diagnostic
            )?;
        }
        Ok(())
    }
}
