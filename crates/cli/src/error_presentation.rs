use std::path::{Path, PathBuf};

use miette::Report;
use sqlregress_testkit::TestkitError;

const HARNESS_CONTEXT: &str = "while running fixtures";
const FIXTURES_CONTEXT: &str = "while loading fixtures from";
const WRITE_REPORTS_CONTEXT: &str = "while writing reports to";
const READ_REPORTS_CONTEXT: &str = "while reading reports from";

pub(crate) type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug)]
pub(crate) enum CliError {
    LoadFixtures {
        dir: PathBuf,
        source: TestkitError,
    },
    WriteReports {
        dir: PathBuf,
        source: TestkitError,
    },
    ReadReports {
        dir: PathBuf,
        source: TestkitError,
    },
    Core(sqlregress_core::Error),
}

impl From<sqlregress_core::Error> for CliError {
    fn from(value: sqlregress_core::Error) -> Self {
        Self::Core(value)
    }
}

pub(crate) fn render_runtime_error(error: CliError) -> String {
    match error {
        CliError::LoadFixtures { dir, source } => {
            let category = testkit_category(&source);
            let report = report_with_context(source, in_dir(FIXTURES_CONTEXT, &dir));
            format!("[{category}] {report}")
        }
        CliError::WriteReports { dir, source } => {
            let category = testkit_category(&source);
            let report = report_with_context(source, in_dir(WRITE_REPORTS_CONTEXT, &dir));
            format!("[{category}] {report}")
        }
        CliError::ReadReports { dir, source } => {
            let category = testkit_category(&source);
            let report = report_with_context(source, in_dir(READ_REPORTS_CONTEXT, &dir));
            format!("[{category}] {report}")
        }
        CliError::Core(source) => {
            let category = core_category(&source);
            let report = report_with_context(source, HARNESS_CONTEXT);
            format!("[{category}] {report}")
        }
    }
}

fn report_with_context<E, C>(source: E, context: C) -> Report
where
    E: std::error::Error + Send + Sync + 'static,
    C: Into<String>,
{
    let anyhow_error = anyhow::Error::new(source).context(context.into());
    miette::miette!("{anyhow_error:#}")
}

fn in_dir(context: &str, dir: &Path) -> String {
    format!("{context} `{}`", dir.display())
}

fn core_category(error: &sqlregress_core::Error) -> &'static str {
    match error {
        sqlregress_core::Error::Definition(_) => "definition",
        sqlregress_core::Error::Session(_) => "session",
        sqlregress_core::Error::Cancelled { .. } => "cancelled",
    }
}

fn testkit_category(error: &TestkitError) -> &'static str {
    match error {
        TestkitError::Io { .. } => "io",
        TestkitError::Definition(_) => "definition",
        TestkitError::Yaml { .. }
        | TestkitError::ConflictingExpectation { .. }
        | TestkitError::UnsupportedValue { .. } => "fixture",
    }
}
