mod compare;
mod error;
mod fixture_file;
mod report_file;

pub use compare::{FixtureChanges, ReportComparison, compare_reports};
pub use error::{Result, TestkitError};
pub use fixture_file::{
    FixtureDocument, OrderDocument, StatementDocument, load_fixtures_from_dir,
    load_fixtures_from_str, registry_from_dir,
};
pub use report_file::{
    FailureEntry, ReportFile, ReportTotals, load_reports_from_dir,
};
