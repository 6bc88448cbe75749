use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use sqlregress_core::{
    DefinitionError, FixtureName, FixtureRole, StatementStatus, TestReport,
};

use crate::{Result, TestkitError};

const REPORT_EXTENSION: &str = "yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub index: usize,
    pub query: String,
    pub diagnostic: String,
}

/// Persisted outcome of one target fixture. Dependencies are not recorded;
/// they are tracked by their own report when run as targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFile {
    pub fixture: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    #[serde(default)]
    pub pass_ids: Vec<usize>,
    #[serde(default)]
    pub skip_ids: Vec<usize>,
    #[serde(default)]
    pub fail_ids: Vec<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_run_ids: Vec<usize>,
    #[serde(default)]
    pub failures: Vec<FailureEntry>,
    /// Statement text by index; lets comparisons match statements by query.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportTotals {
    pub passed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ReportTotals {
    #[must_use]
    pub fn total(&self) -> usize {
        self.passed + self.failed
    }
}

impl ReportFile {
    #[must_use]
    pub fn from_report(report: &TestReport) -> Self {
        let mut file = Self {
            fixture: report.target.to_string(),
            skipped: report.skipped.clone(),
            ..Self::default()
        };

        let statements = report
            .fixtures
            .iter()
            .filter(|fixture| fixture.role == FixtureRole::Target)
            .flat_map(|fixture| &fixture.statements);
        for statement in statements {
            file.queries.push(statement.statement.clone());
            match &statement.status {
                StatementStatus::Passed => file.pass_ids.push(statement.index),
                StatementStatus::Skipped => file.skip_ids.push(statement.index),
                StatementStatus::NotRun => file.not_run_ids.push(statement.index),
                StatementStatus::Failed { diagnostic } => {
                    file.fail_ids.push(statement.index);
                    file.failures.push(FailureEntry {
                        index: statement.index,
                        query: statement.statement.clone(),
                        diagnostic: diagnostic.clone(),
                    });
                }
            }
        }
        file
    }

    #[must_use]
    pub fn totals(&self) -> ReportTotals {
        ReportTotals {
            passed: self.pass_ids.len(),
            skipped: self.skip_ids.len(),
            failed: self.fail_ids.len(),
        }
    }

    /// Whether a statement with exactly this text passed.
    #[must_use]
    pub fn passed_query(&self, query: &str) -> bool {
        self.pass_ids
            .iter()
            .any(|index| self.queries.get(*index).is_some_and(|text| text == query))
    }

    /// Writes `<dir>/<fixture>.yaml`, creating `dir` if needed.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let name = FixtureName::new(self.fixture.as_str());
        if !name.is_valid() {
            return Err(DefinitionError::InvalidName { name }.into());
        }
        fs::create_dir_all(dir).map_err(|source| TestkitError::io(dir, source))?;
        let path = dir.join(format!("{}.{REPORT_EXTENSION}", self.fixture));
        let yaml = serde_yaml::to_string(self)
            .map_err(|source| TestkitError::yaml(path.display().to_string(), source))?;
        fs::write(&path, yaml).map_err(|source| TestkitError::io(&path, source))?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path).map_err(|source| TestkitError::io(path, source))?;
        serde_yaml::from_str(&yaml)
            .map_err(|source| TestkitError::yaml(path.display().to_string(), source))
    }
}

/// Reads every report in `dir`, sorted by fixture name.
pub fn load_reports_from_dir(dir: &Path) -> Result<Vec<ReportFile>> {
    let entries = fs::read_dir(dir).map_err(|source| TestkitError::io(dir, source))?;
    let mut reports = Vec::new();
    for entry in entries {
        let path = entry.map_err(|source| TestkitError::io(dir, source))?.path();
        if path.is_file()
            && path
                .extension()
                .is_some_and(|extension| extension == REPORT_EXTENSION)
        {
            reports.push(ReportFile::load(&path)?);
        }
    }
    reports.sort_by(|left, right| left.fixture.cmp(&right.fixture));
    Ok(reports)
}
